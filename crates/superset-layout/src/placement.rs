//! Row placement for charts and markdown blocks.
//!
//! Leaves never hang directly off an arbitrary node: they always land in a
//! ROW (or a COLUMN), and a ROW holds at most [`MAX_WIDTH`] units of leaf
//! width. Given the anchor the caller asked for, [`resolve_placement`]
//! decides which row actually receives the item:
//!
//! | Anchor | Behaviour |
//! |--------|-----------|
//! | ROW    | the row itself if it has room; else the first sibling row with room (relocate), else a new sibling row (relocate), else a capacity error |
//! | TAB    | the first row of the tab with room; else a new row in the tab (relocate, or no rows yet), else a capacity error |
//! | COLUMN | the column itself, no width arithmetic |
//! | other  | a new row under the anchor |
//!
//! Rows are always scanned in child order and the first one that fits wins.

use tracing::trace;

use crate::error::{LayoutError, Result};
use crate::id::ItemId;
use crate::item::{Item, ItemType, MAX_WIDTH};
use crate::tree::{NodeIndex, Tree};

/// Where a leaf item goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Append to an existing ROW or COLUMN.
    Attach(ItemId),
    /// Create a ROW under `parent` and append to it.
    NewRow {
        /// Parent of the new row.
        parent: ItemId,
    },
}

/// Resolve the row that receives `item` when it is inserted at `anchor`.
///
/// The tree is not modified.
///
/// # Errors
///
/// - [`LayoutError::NodeNotFound`] if `anchor` does not exist.
/// - [`LayoutError::AcceptChild`] if `anchor` is a leaf.
/// - [`LayoutError::InvalidNesting`] if `item` is not a chart or markdown block.
/// - [`LayoutError::Capacity`] if no row has room and `item` may not be
///   relocated, or if `item` is wider than a whole row.
pub fn resolve_placement(tree: &Tree, anchor: &str, item: &Item) -> Result<Placement> {
    let width = item.width().ok_or_else(|| {
        LayoutError::InvalidNesting(format!(
            "{} items are not placed in rows",
            item.item_type()
        ))
    })?;

    let anchor_idx = tree.index_of(anchor)?;
    let anchor_node = tree.node_at(anchor_idx);
    if !anchor_node.accepts_children() {
        return Err(LayoutError::AcceptChild {
            parent: anchor_node.id().clone(),
            parent_type: anchor_node.item_type(),
        });
    }

    let anchor_type = anchor_node.item_type();
    if anchor_type == ItemType::Column {
        trace!(anchor, "column anchor, attaching directly");
        return Ok(Placement::Attach(anchor_node.id().clone()));
    }

    if width > MAX_WIDTH {
        return Err(LayoutError::Capacity {
            width,
            total: width,
            max: MAX_WIDTH,
        });
    }

    let placement = match anchor_type {
        ItemType::Row => place_in_row(tree, anchor_idx, width, item.relocate())?,
        ItemType::Tab => place_in_tab(tree, anchor_idx, width, item.relocate())?,
        _ => Placement::NewRow {
            parent: anchor_node.id().clone(),
        },
    };
    trace!(anchor, width, ?placement, "resolved placement");
    Ok(placement)
}

fn place_in_row(tree: &Tree, row: NodeIndex, width: u32, relocate: bool) -> Result<Placement> {
    let used = tree.used_width_at(row);
    if fits(used, width) {
        return Ok(Placement::Attach(tree.node_at(row).id().clone()));
    }
    if !relocate {
        return Err(capacity(used, width));
    }

    let Some(parent) = tree.node_at(row).parent_index() else {
        return Err(LayoutError::InvalidNesting(
            "ROW has no parent".to_string(),
        ));
    };
    if let Some(sibling) = first_fit(tree, parent, width, Some(row)) {
        return Ok(Placement::Attach(tree.node_at(sibling).id().clone()));
    }
    Ok(Placement::NewRow {
        parent: tree.node_at(parent).id().clone(),
    })
}

fn place_in_tab(tree: &Tree, tab: NodeIndex, width: u32, relocate: bool) -> Result<Placement> {
    if let Some(row) = first_fit(tree, tab, width, None) {
        return Ok(Placement::Attach(tree.node_at(row).id().clone()));
    }

    let first_row = rows_of(tree, tab).next();
    match first_row {
        Some(row) if !relocate => Err(capacity(tree.used_width_at(row), width)),
        _ => Ok(Placement::NewRow {
            parent: tree.node_at(tab).id().clone(),
        }),
    }
}

/// First ROW child of `parent`, in child order, with room for `width`.
fn first_fit(
    tree: &Tree,
    parent: NodeIndex,
    width: u32,
    skip: Option<NodeIndex>,
) -> Option<NodeIndex> {
    rows_of(tree, parent)
        .filter(|row| Some(*row) != skip)
        .find(|row| fits(tree.used_width_at(*row), width))
}

fn rows_of(tree: &Tree, parent: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
    tree.node_at(parent)
        .child_indices()
        .iter()
        .copied()
        .filter(|c| tree.node_at(*c).item_type() == ItemType::Row)
}

const fn fits(used: u32, width: u32) -> bool {
    used.saturating_add(width) <= MAX_WIDTH
}

fn capacity(used: u32, width: u32) -> LayoutError {
    LayoutError::Capacity {
        width,
        total: used.saturating_add(width),
        max: MAX_WIDTH,
    }
}
