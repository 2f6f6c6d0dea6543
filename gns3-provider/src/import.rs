//! Import identifier parsing.

use crate::error::{Error, Result};

/// An existing remote resource to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedId {
    pub project_id: Option<String>,
    pub id: String,
}

fn non_empty(raw: &str, first: &str, second: &str, expected: &'static str) -> Result<()> {
    if first.trim().is_empty() || second.trim().is_empty() {
        return Err(Error::InvalidImportId {
            id: raw.to_string(),
            expected,
        });
    }
    Ok(())
}

/// Nodes: `<node_id>,<project_id>` or `<project_id>/<node_id>`.
pub fn node(raw: &str) -> Result<ImportedId> {
    const EXPECTED: &str = "<node_id>,<project_id> or <project_id>/<node_id>";
    let (project_id, node_id) = if let Some((node_id, project_id)) = raw.split_once(',') {
        (project_id, node_id)
    } else if let Some((project_id, node_id)) = raw.split_once('/') {
        (project_id, node_id)
    } else {
        return Err(Error::InvalidImportId {
            id: raw.to_string(),
            expected: EXPECTED,
        });
    };
    non_empty(raw, project_id, node_id, EXPECTED)?;
    Ok(ImportedId {
        project_id: Some(project_id.to_string()),
        id: node_id.to_string(),
    })
}

/// Links: `<project_id>/<link_id>`.
pub fn link(raw: &str) -> Result<ImportedId> {
    const EXPECTED: &str = "<project_id>/<link_id>";
    let Some((project_id, link_id)) = raw.split_once('/') else {
        return Err(Error::InvalidImportId {
            id: raw.to_string(),
            expected: EXPECTED,
        });
    };
    non_empty(raw, project_id, link_id, EXPECTED)?;
    Ok(ImportedId {
        project_id: Some(project_id.to_string()),
        id: link_id.to_string(),
    })
}

/// Projects are imported by their own id.
pub fn project(raw: &str) -> Result<ImportedId> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidImportId {
            id: raw.to_string(),
            expected: "<project_id>",
        });
    }
    Ok(ImportedId {
        project_id: None,
        id: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_accepts_both_forms() {
        let comma = node("n1,p1").unwrap();
        let slash = node("p1/n1").unwrap();
        assert_eq!(comma, slash);
        assert_eq!(comma.project_id.as_deref(), Some("p1"));
        assert_eq!(comma.id, "n1");
    }

    #[test]
    fn test_node_rejects_bare_and_empty_ids() {
        assert!(matches!(node("n1"), Err(Error::InvalidImportId { .. })));
        assert!(node("p1/").is_err());
        assert!(node(",p1").is_err());
    }

    #[test]
    fn test_link_form() {
        let imported = link("p1/l1").unwrap();
        assert_eq!(imported.project_id.as_deref(), Some("p1"));
        assert_eq!(imported.id, "l1");
        assert!(link("l1").is_err());
    }

    #[test]
    fn test_project_passthrough() {
        assert_eq!(project("p1").unwrap().id, "p1");
        assert!(project("").is_err());
    }
}
