//! The fixed catalog of prompt block kinds.
//!
//! The catalog is static: six kinds, each with a display label, a placeholder
//! hint for editors, and a required flag. It never changes at runtime.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// The category of a prompt block.
///
/// Variant order is the catalog order, so `Ord` sorts kinds the way
/// [`all_kinds`] lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Context,
    Task,
    Role,
    Constraints,
    Examples,
    Format,
}

/// Static metadata for one block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub kind: BlockKind,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub required: bool,
}

static CATALOG: [BlockSpec; 6] = [
    BlockSpec {
        kind: BlockKind::Context,
        label: "Context",
        placeholder: "Describe the context of the task...",
        required: true,
    },
    BlockSpec {
        kind: BlockKind::Task,
        label: "Task",
        placeholder: "Your task is to...",
        required: true,
    },
    BlockSpec {
        kind: BlockKind::Role,
        label: "Role",
        placeholder: "You are an expert in...",
        required: false,
    },
    BlockSpec {
        kind: BlockKind::Constraints,
        label: "Constraints",
        placeholder: "Take the following constraints into account:...",
        required: false,
    },
    BlockSpec {
        kind: BlockKind::Examples,
        label: "Examples",
        placeholder: "For example:...",
        required: false,
    },
    BlockSpec {
        kind: BlockKind::Format,
        label: "Response format",
        placeholder: "Provide the answer as:...",
        required: false,
    },
];

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Context => "context",
            BlockKind::Task => "task",
            BlockKind::Role => "role",
            BlockKind::Constraints => "constraints",
            BlockKind::Examples => "examples",
            BlockKind::Format => "format",
        }
    }

    pub fn spec(&self) -> &'static BlockSpec {
        // CATALOG is declared in variant order.
        &CATALOG[*self as usize]
    }

    pub fn label(&self) -> &'static str {
        self.spec().label
    }

    pub fn placeholder(&self) -> &'static str {
        self.spec().placeholder
    }

    pub fn is_required(&self) -> bool {
        self.spec().required
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        find(s).map(|spec| spec.kind)
    }
}

/// Every block kind in catalog order: context, task, role, constraints,
/// examples, format.
pub fn all_kinds() -> &'static [BlockSpec] {
    &CATALOG
}

/// The kinds every document must contain.
pub fn required_kinds() -> BTreeSet<BlockKind> {
    CATALOG
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.kind)
        .collect()
}

/// Looks up a kind by its lowercase name.
pub fn find(name: &str) -> Result<&'static BlockSpec, DocumentError> {
    CATALOG
        .iter()
        .find(|spec| spec.kind.as_str() == name)
        .ok_or_else(|| DocumentError::UnknownBlockKind(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let kinds: Vec<BlockKind> = all_kinds().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Context,
                BlockKind::Task,
                BlockKind::Role,
                BlockKind::Constraints,
                BlockKind::Examples,
                BlockKind::Format,
            ]
        );
    }

    #[test]
    fn test_spec_matches_kind() {
        for spec in all_kinds() {
            assert_eq!(spec.kind.spec(), spec);
        }
    }

    #[test]
    fn test_required_kinds() {
        let required = required_kinds();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&BlockKind::Context));
        assert!(required.contains(&BlockKind::Task));
        assert!(!BlockKind::Role.is_required());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("examples").unwrap().kind, BlockKind::Examples);
        assert_eq!("format".parse::<BlockKind>().unwrap(), BlockKind::Format);
        assert_eq!(
            find("summary"),
            Err(DocumentError::UnknownBlockKind("summary".to_string()))
        );
        // Names are matched exactly.
        assert!(find("Context").is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&BlockKind::Constraints).unwrap();
        assert_eq!(json, "\"constraints\"");
    }
}
