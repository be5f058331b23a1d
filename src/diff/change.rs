use crate::foundation::path::DataPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happened at a path between two data trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Scalar value changed.
    ValueChange,
    /// Value changed category (string, number, boolean, object-like).
    TypeChange,
    /// Object gained a key.
    PropertyAdded,
    /// Object lost a key.
    PropertyRemoved,
    /// Array grew at this index.
    ArrayItemAdded,
    /// Array shrank at this index.
    ArrayItemRemoved,
    /// Array length differs; `old_value`/`new_value` hold the lengths.
    ArrayLengthChange,
    /// Object-like values of different shape (`null`, array, object), or a subtree too deep to
    /// compare.
    StructureChange,
}

/// Coarse structural significance of a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Document geometry, layout and theme background/borders.
    High,
    /// Repeating collections and the theme as a whole.
    Medium,
    /// Everything else.
    Low,
}

impl Impact {
    /// Operation ordering priority (`high=1`, `medium=2`, `low=3`).
    pub fn priority(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

/// One entry of a change-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Where the change happened.
    pub path: DataPath,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Previous value, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// New value, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// Classified impact of `path`.
    pub impact: Impact,
}
