//! Error types for the superset-layout crate.

use thiserror::Error;

use crate::id::ItemId;
use crate::item::ItemType;

/// Errors that can occur while building or (de)serializing a position tree.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The requested parent is a leaf and cannot hold children.
    #[error("{parent_type} {parent} does not accept children")]
    AcceptChild {
        /// Id of the rejecting parent.
        parent: ItemId,
        /// Type of the rejecting parent.
        parent_type: ItemType,
    },

    /// The item type may not be nested under the requested parent type.
    #[error("invalid nesting: {0}")]
    InvalidNesting(String),

    /// The target row has no room left for the item.
    #[error(
        "not enough space for this component: total width {total} exceeds the maximum of {max} (item width {width})"
    )]
    Capacity {
        /// Width of the item being placed.
        width: u32,
        /// Row width the placement would have produced.
        total: u32,
        /// Maximum width of a row.
        max: u32,
    },

    /// A row loaded from the wire already holds more than the maximum width.
    #[error("row {row} is over budget: total width {total} exceeds the maximum of {max}")]
    RowOverBudget {
        /// Id of the overfull row.
        row: ItemId,
        /// Summed width of the row's charts and markdown blocks.
        total: u32,
        /// Maximum width of a row.
        max: u32,
    },

    /// The item itself is malformed (missing metadata, zero size, ...).
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// An item with the same id already exists in the tree.
    #[error("duplicate item id: {0}")]
    DuplicateId(ItemId),

    /// No node with the given id exists in the tree.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A referenced entry is absent from the position payload.
    #[error("position entry missing for {0}")]
    MissingEntry(String),

    /// The type tag is not one of the known item types.
    #[error("unknown item type: {0}")]
    UnknownItemType(String),

    /// Malformed position JSON.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LayoutError {
    /// Whether this error reports a violation of the item nesting hierarchy.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::AcceptChild { .. }
                | Self::InvalidNesting(_)
                | Self::DuplicateId(_)
                | Self::NodeNotFound(_)
        )
    }

    /// Whether this error reports an exhausted row width budget.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. } | Self::RowOverBudget { .. })
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
