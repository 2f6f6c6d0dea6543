//! Provider error types.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by resource operations.
///
/// A missing remote resource is not an error: reads return `None` and deletes
/// report [`Deleted::AlreadyGone`](crate::resource::Deleted::AlreadyGone).
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP request could not complete.
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: TransportError,
    },

    /// The controller answered with a non-success status.
    #[error("{context}, status: {status}, response: {body}")]
    Rejected {
        context: String,
        status: u16,
        body: String,
    },

    /// The awaited resource never showed up in its listing.
    #[error("{kind} {target} not found in {scope} after {attempts} attempts")]
    NotFoundAfterPolling {
        kind: &'static str,
        target: String,
        scope: String,
        attempts: u32,
    },

    /// Success status, but the body did not have the expected shape.
    #[error("{context}: malformed response: {reason}")]
    Malformed { context: String, reason: String },

    /// A lookup by name found no match.
    #[error("{kind} with name '{name}' not found in {scope}")]
    NotFound {
        kind: &'static str,
        name: String,
        scope: String,
    },

    #[error("invalid import id {id:?}: expected {expected}")]
    InvalidImportId { id: String, expected: &'static str },

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// The controller assigned `id`, then a follow-up step of the create
    /// failed. The resource exists remotely and must be tracked by `id`.
    #[error("{kind} {id} was created but not finished: {source}")]
    PartiallyCreated {
        kind: &'static str,
        id: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn partially_created(kind: &'static str, id: impl Into<String>, source: Error) -> Self {
        Error::PartiallyCreated {
            kind,
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Id of a resource that exists remotely despite this error.
    pub fn created_id(&self) -> Option<&str> {
        match self {
            Error::PartiallyCreated { id, .. } => Some(id),
            _ => None,
        }
    }
}


/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, Error>;
