//! # superset-layout
//!
//! Dashboard position trees for Superset.
//!
//! A dashboard layout is stored server-side as `position_json`: a flat map
//! from item id to `{type, children, parents, meta}`. This crate turns that
//! map into a typed tree and back, and enforces the layout rules while the
//! tree is edited:
//!
//! - **Nesting**: GRID lives under ROOT, TABs live under TABS containers,
//!   charts and markdown blocks are leaves that sit in ROWs or COLUMNs.
//! - **Row budget**: the leaves of one ROW are at most [`MAX_WIDTH`] units
//!   wide in total.
//! - **Placement**: charts and markdown blocks are routed to the right row,
//!   creating rows as needed when the item may be relocated.
//!
//! ## Architecture
//!
//! ```text
//! ROOT_ID (ROOT)
//! └── GRID_ID (GRID)
//!     ├── ROW-xxxxxxxxxx (ROW)          <- at most 12 units of leaves
//!     │   ├── CHART-xxxxxxxxxx (CHART)   width 4
//!     │   └── MARKDOWN-xxxxxxxxxx        width 8
//!     └── TABS-xxxxxxxxxx (TABS)
//!         └── TAB-xxxxxxxxxx (TAB)
//!             └── ROW-xxxxxxxxxx (ROW)
//!                 └── COLUMN-xxxxxxxxxx (COLUMN)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use superset_layout::{ChartMeta, GRID_ID, Item, MarkdownMeta, Tree};
//!
//! let mut tree = Tree::new();
//!
//! // Leaves under GRID get a fresh row.
//! let intro = Item::markdown(MarkdownMeta::new("# Sales").with_size(4, 50), true)?;
//! let intro_id = tree.insert(intro, GRID_ID)?;
//! let row = tree.path_of(intro_id.as_str())?.pop().expect("markdown has a parent row");
//!
//! // A chart anchored at that row fits next to the markdown block.
//! let chart = Item::chart(ChartMeta::new(42, "Revenue").with_size(8, 50), false)?;
//! tree.insert(chart, row.as_str())?;
//! assert_eq!(tree.free_width(row.as_str())?, 0);
//!
//! // Serialize for the server and read it back.
//! let position = tree.to_value()?;
//! let restored = Tree::from_value(&position)?;
//! assert_eq!(restored.to_value()?, position);
//!
//! # Ok::<(), superset_layout::LayoutError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod item;
pub mod placement;
pub mod tree;
pub mod wire;

#[cfg(test)]
mod tests;

pub use error::{LayoutError, Result};
pub use id::{GRID_ID, IdGenerator, ItemId, ROOT_ID, RandomIds, SequentialIds};
pub use item::{
    ChartMeta, ColumnMeta, DEFAULT_HEIGHT, DEFAULT_WIDTH, Item, ItemKind, ItemType, MAX_WIDTH,
    MarkdownMeta, RowMeta, TabMeta, validate_size,
};
pub use placement::{Placement, resolve_placement};
pub use tree::{Node, Tree};
pub use wire::{DASHBOARD_VERSION, DASHBOARD_VERSION_KEY, ItemEntry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
