use crate::diff::change::ChangeRecord;
use crate::foundation::path::DataPath;
use crate::patch::efficiency::PatchEfficiency;
use crate::pipeline::fingerprint::CacheKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Markup node an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// An attribute of the document root element (`width`, `height`, `viewBox`).
    Root {
        /// Attribute name.
        attribute: String,
    },
    /// A theme variable, by its flattened key (`colors.primary`).
    Theme {
        /// Flattened variable key.
        variable: String,
    },
    /// A whole layout section.
    Section {
        /// Data path of the section.
        path: DataPath,
    },
    /// One item of a repeated collection.
    Item {
        /// Array path.
        collection: DataPath,
        /// Position in the array.
        index: usize,
    },
    /// Any other data-bound node.
    Path {
        /// Data path the node is bound to.
        path: DataPath,
    },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root { attribute } => write!(f, "root@{attribute}"),
            Self::Theme { variable } => write!(f, "theme:{variable}"),
            Self::Section { path } => write!(f, "section:{path}"),
            Self::Item { collection, index } => write!(f, "item:{collection}[{index}]"),
            Self::Path { path } => write!(f, "path:{path}"),
        }
    }
}

/// One attribute of an [`Operation::UpdateAttributes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Changed data path.
    pub path: DataPath,
    /// New value.
    pub value: Value,
}

/// Markup mutation derived from one or more change records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Set one attribute to a new value.
    UpdateAttribute {
        /// Addressed node.
        target: Target,
        /// Changed data path.
        path: DataPath,
        /// New value.
        value: Value,
    },
    /// Add an attribute that did not exist.
    AddAttribute {
        /// Addressed node.
        target: Target,
        /// Added data path.
        path: DataPath,
        /// Added value.
        value: Value,
    },
    /// Remove an attribute.
    RemoveAttribute {
        /// Addressed node.
        target: Target,
        /// Removed data path.
        path: DataPath,
    },
    /// Several attribute updates on the same node.
    UpdateAttributes {
        /// Addressed node.
        target: Target,
        /// Updates in application order.
        changes: Vec<AttributeChange>,
    },
    /// Insert a collection item.
    AddElement {
        /// Array path.
        collection: DataPath,
        /// Position of the new item.
        index: usize,
        /// Item data.
        value: Value,
    },
    /// Remove a collection item.
    RemoveElement {
        /// Array path.
        collection: DataPath,
        /// Position of the removed item.
        index: usize,
    },
    /// Re-render everything bound to `path`.
    RebuildSection {
        /// Addressed node.
        target: Target,
        /// Root of the rebuilt subtree.
        path: DataPath,
    },
}

/// Fieldless discriminant of [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// [`Operation::UpdateAttribute`]
    UpdateAttribute,
    /// [`Operation::AddAttribute`]
    AddAttribute,
    /// [`Operation::RemoveAttribute`]
    RemoveAttribute,
    /// [`Operation::UpdateAttributes`]
    UpdateAttributes,
    /// [`Operation::AddElement`]
    AddElement,
    /// [`Operation::RemoveElement`]
    RemoveElement,
    /// [`Operation::RebuildSection`]
    RebuildSection,
}

impl Operation {
    /// Discriminant.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::UpdateAttribute { .. } => OperationKind::UpdateAttribute,
            Self::AddAttribute { .. } => OperationKind::AddAttribute,
            Self::RemoveAttribute { .. } => OperationKind::RemoveAttribute,
            Self::UpdateAttributes { .. } => OperationKind::UpdateAttributes,
            Self::AddElement { .. } => OperationKind::AddElement,
            Self::RemoveElement { .. } => OperationKind::RemoveElement,
            Self::RebuildSection { .. } => OperationKind::RebuildSection,
        }
    }

    /// Data paths this operation writes.
    pub fn paths(&self) -> Vec<DataPath> {
        match self {
            Self::UpdateAttribute { path, .. }
            | Self::AddAttribute { path, .. }
            | Self::RemoveAttribute { path, .. }
            | Self::RebuildSection { path, .. } => vec![path.clone()],
            Self::UpdateAttributes { changes, .. } => {
                changes.iter().map(|c| c.path.clone()).collect()
            }
            Self::AddElement {
                collection, index, ..
            }
            | Self::RemoveElement { collection, index } => vec![collection.index(*index)],
        }
    }

    /// Short human-readable form used in failures and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::UpdateAttribute { target, path, .. } => format!("update_attribute {target} ({path})"),
            Self::AddAttribute { target, path, .. } => format!("add_attribute {target} ({path})"),
            Self::RemoveAttribute { target, path } => format!("remove_attribute {target} ({path})"),
            Self::UpdateAttributes { target, changes } => {
                format!("update_attributes {target} ({} changes)", changes.len())
            }
            Self::AddElement {
                collection, index, ..
            } => format!("add_element {collection}[{index}]"),
            Self::RemoveElement { collection, index } => {
                format!("remove_element {collection}[{index}]")
            }
            Self::RebuildSection { target, path } => format!("rebuild_section {target} ({path})"),
        }
    }
}

/// A change-set turned into markup operations, with the cost estimate that decided whether it is
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    /// Pipeline-unique id.
    pub id: u64,
    /// Cache key of the data the patch produces.
    pub cache_key: CacheKey,
    /// Source change records.
    pub changes: Vec<ChangeRecord>,
    /// Optimized operations in application priority order.
    pub operations: Vec<Operation>,
    /// Cost estimate and decision.
    pub efficiency: PatchEfficiency,
}
