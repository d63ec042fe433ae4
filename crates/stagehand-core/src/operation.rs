//! Pending operation kinds

use serde::{Deserialize, Serialize};

/// The kind of write an entity is staged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    /// Order in which pending operations are flushed
    pub const FLUSH_ORDER: [OperationKind; 3] = [
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    /// Stable lowercase name, used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
