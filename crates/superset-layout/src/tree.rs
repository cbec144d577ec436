//! Arena-backed position tree.

use std::collections::HashMap;
use std::fmt::{self, Write as _};

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{LayoutError, Result};
use crate::id::{GRID_ID, IdGenerator, ItemId, ROOT_ID, RandomIds};
use crate::item::{Extra, Item, ItemKind, ItemType, MAX_WIDTH, RowMeta};
use crate::placement::{Placement, resolve_placement};
use crate::wire::{DASHBOARD_VERSION, DASHBOARD_VERSION_KEY, ItemEntry};

/// Attempts at drawing an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 64;

/// Position of a node inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeIndex(usize);

/// An item placed in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: ItemId,
    kind: ItemKind,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

impl Node {
    /// Item id.
    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    /// Type and metadata.
    #[must_use]
    pub const fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// Type tag.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    /// Width, for charts and markdown blocks.
    #[must_use]
    pub const fn width(&self) -> Option<u32> {
        self.kind.width()
    }

    /// Whether this node may hold children.
    #[must_use]
    pub const fn accepts_children(&self) -> bool {
        self.item_type().accepts_children()
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) const fn parent_index(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub(crate) fn child_indices(&self) -> &[NodeIndex] {
        &self.children
    }
}

/// Dashboard layout tree.
///
/// Every node lives in a single arena; parent and child links are stored
/// once, as arena indices, and the `children`/`parents` id lists of the wire
/// format are derived from them on serialization. A fresh tree holds `ROOT_ID`
/// with `GRID_ID` as its only child.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    index: HashMap<ItemId, NodeIndex>,
    ids: Box<dyn IdGenerator>,
    /// Payload entries not reachable from the root (e.g. `HEADER_ID`).
    detached: Map<String, Value>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Empty layout with random ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(RandomIds))
    }

    /// Empty layout drawing ids from `ids`.
    #[must_use]
    pub fn with_id_generator(ids: Box<dyn IdGenerator>) -> Self {
        let mut tree = Self::bare(ids);
        let root = tree.attach(ItemId::root(), ItemKind::Root(Extra::new()), None, None);
        tree.attach(ItemId::grid(), ItemKind::Grid(Extra::new()), Some(root), None);
        tree
    }

    fn bare(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            ids,
            detached: Map::new(),
        }
    }

    // ==================== Lookup ====================

    /// The ROOT node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// The GRID node.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NodeNotFound`] if the tree has no GRID.
    pub fn grid(&self) -> Result<&Node> {
        self.find_by_id(GRID_ID)
            .ok_or_else(|| LayoutError::NodeNotFound(GRID_ID.to_string()))
    }

    /// Look up a node by id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|idx| self.node_at(*idx))
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of nodes, root and grid included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children of `id`, in render order.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NodeNotFound`] for unknown ids.
    pub fn children_of(&self, id: &str) -> Result<Vec<&Node>> {
        let idx = self.index_of(id)?;
        Ok(self.children_at(idx).map(|c| self.node_at(c)).collect())
    }

    /// Parent of `id`, `None` for the root.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NodeNotFound`] for unknown ids.
    pub fn parent_of(&self, id: &str) -> Result<Option<&Node>> {
        let idx = self.index_of(id)?;
        Ok(self.node_at(idx).parent.map(|p| self.node_at(p)))
    }

    /// Ancestor ids of `id`, root first, immediate parent last.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NodeNotFound`] for unknown ids.
    pub fn path_of(&self, id: &str) -> Result<Vec<ItemId>> {
        let mut current = self.node_at(self.index_of(id)?).parent;
        let mut path = Vec::new();
        while let Some(idx) = current {
            let node = self.node_at(idx);
            path.push(node.id.clone());
            current = node.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// All nodes in depth-first order, starting at the root.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.depth_first().into_iter().map(|idx| self.node_at(idx))
    }

    /// Total width of the charts and markdown blocks directly under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NodeNotFound`] for unknown ids.
    pub fn used_width(&self, id: &str) -> Result<u32> {
        Ok(self.used_width_at(self.index_of(id)?))
    }

    /// Width still available in the row `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NodeNotFound`] for unknown ids.
    pub fn free_width(&self, id: &str) -> Result<u32> {
        Ok(MAX_WIDTH.saturating_sub(self.used_width(id)?))
    }

    /// Verify that no ROW holds more than [`MAX_WIDTH`] units.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::RowOverBudget`] naming the first overfull row.
    pub fn check_row_budgets(&self) -> Result<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            if node.item_type() != ItemType::Row {
                continue;
            }
            let total = self.used_width_at(NodeIndex(i));
            if total > MAX_WIDTH {
                return Err(LayoutError::RowOverBudget {
                    row: node.id.clone(),
                    total,
                    max: MAX_WIDTH,
                });
            }
        }
        Ok(())
    }

    // ==================== Insertion ====================

    /// Insert `item` under `parent`, applying the nesting rules.
    ///
    /// - TAB items are moved into a TABS container: `parent` itself when it is
    ///   one, else its first TABS child, else a new TABS child.
    /// - CHART and MARKDOWN items go through row placement, which may pick or
    ///   create a different ROW than `parent`.
    /// - Everything else is appended to `parent`'s children.
    ///
    /// Returns the id of the inserted item.
    ///
    /// # Errors
    ///
    /// Returns a structural error when the nesting is not allowed and
    /// [`LayoutError::Capacity`] when no row can take a chart or markdown
    /// block. The tree is unchanged on error.
    pub fn insert(&mut self, item: Item, parent: &str) -> Result<ItemId> {
        let parent = self.index_of(parent)?;
        match item.item_type() {
            ItemType::Root => Err(LayoutError::InvalidNesting(
                "ROOT cannot have a parent".to_string(),
            )),
            ItemType::Tab => self.insert_tab(item, parent, None),
            ItemType::Chart | ItemType::Markdown => self.insert_leaf(item, parent),
            item_type => {
                self.check_nesting(parent, item_type)?;
                let id = self.claim_id(&item)?;
                let (_, kind) = item.into_parts();
                Ok(self.append(id, kind, parent))
            }
        }
    }

    /// Insert `item` immediately before `anchor` under the same parent.
    ///
    /// # Errors
    ///
    /// Fails when `anchor` is the root, the nesting is not allowed, or a
    /// chart/markdown block does not fit the anchor's row.
    pub fn insert_sibling_left(&mut self, anchor: &str, item: Item) -> Result<ItemId> {
        let (parent, position) = self.sibling_slot(anchor)?;
        self.insert_positioned(parent, position, item)
    }

    /// Insert `item` immediately after `anchor` under the same parent.
    ///
    /// # Errors
    ///
    /// Fails when `anchor` is the root, the nesting is not allowed, or a
    /// chart/markdown block does not fit the anchor's row.
    pub fn insert_sibling_right(&mut self, anchor: &str, item: Item) -> Result<ItemId> {
        let (parent, position) = self.sibling_slot(anchor)?;
        self.insert_positioned(parent, position + 1, item)
    }

    /// Insert `item` as child number `position` of `parent`.
    ///
    /// Positions past the end are clamped to an append. A TAB under a
    /// non-TABS parent is moved into that parent's TABS container as in
    /// [`Tree::insert`], and `position` then indexes the container's tabs.
    ///
    /// # Errors
    ///
    /// Fails when the nesting is not allowed or a chart/markdown block does
    /// not fit the row.
    pub fn insert_child(&mut self, parent: &str, item: Item, position: usize) -> Result<ItemId> {
        let parent = self.index_of(parent)?;
        let position = position.min(self.node_at(parent).children.len());
        self.insert_positioned(parent, position, item)
    }

    fn insert_tab(
        &mut self,
        item: Item,
        parent: NodeIndex,
        position: Option<usize>,
    ) -> Result<ItemId> {
        let tabs = if self.node_at(parent).item_type() == ItemType::Tabs {
            Some(parent)
        } else {
            self.ensure_accepts_children(parent)?;
            self.children_at(parent)
                .find(|c| self.node_at(*c).item_type() == ItemType::Tabs)
        };

        let id = self.claim_id(&item)?;
        let tabs = match tabs {
            Some(tabs) => tabs,
            None => {
                let tabs_id = self.generate_id(ItemType::Tabs)?;
                debug!(parent = %self.node_at(parent).id, tabs = %tabs_id, "creating TABS container");
                self.attach(tabs_id, ItemKind::Tabs(Extra::new()), Some(parent), None)
            }
        };

        let (_, kind) = item.into_parts();
        self.attach(id.clone(), kind, Some(tabs), position);
        trace!(item = %id, tabs = %self.node_at(tabs).id, ?position, "inserted TAB");
        Ok(id)
    }

    fn insert_leaf(&mut self, item: Item, anchor: NodeIndex) -> Result<ItemId> {
        let id = self.claim_id(&item)?;
        let anchor_id = self.node_at(anchor).id.clone();
        let placement = resolve_placement(self, anchor_id.as_str(), &item)?;

        let row = match placement {
            Placement::Attach(target) => {
                let target = self.index_of(target.as_str())?;
                self.check_nesting(target, item.item_type())?;
                target
            }
            Placement::NewRow { parent } => {
                let parent = self.index_of(parent.as_str())?;
                self.check_nesting(parent, ItemType::Row)?;
                let row_id = self.generate_id(ItemType::Row)?;
                debug!(parent = %self.node_at(parent).id, row = %row_id, "creating ROW for placement");
                self.attach(row_id, ItemKind::Row(RowMeta::default()), Some(parent), None)
            }
        };

        trace!(item = %id, row = %self.node_at(row).id, "attaching leaf");
        let (_, kind) = item.into_parts();
        Ok(self.append(id, kind, row))
    }

    fn insert_positioned(&mut self, parent: NodeIndex, position: usize, item: Item) -> Result<ItemId> {
        let item_type = item.item_type();
        if item_type == ItemType::Tab && self.node_at(parent).item_type() != ItemType::Tabs {
            return self.insert_tab(item, parent, Some(position));
        }
        self.check_nesting(parent, item_type)?;

        if let Some(width) = item.width() {
            if self.node_at(parent).item_type() == ItemType::Row {
                let total = self.used_width_at(parent).saturating_add(width);
                if total > MAX_WIDTH {
                    return Err(LayoutError::Capacity {
                        width,
                        total,
                        max: MAX_WIDTH,
                    });
                }
            }
        }

        let id = self.claim_id(&item)?;
        let (_, kind) = item.into_parts();
        self.attach(id.clone(), kind, Some(parent), Some(position));
        trace!(item = %id, parent = %self.node_at(parent).id, position, "inserted at position");
        Ok(id)
    }

    fn sibling_slot(&self, anchor: &str) -> Result<(NodeIndex, usize)> {
        let anchor = self.index_of(anchor)?;
        let parent = self.node_at(anchor).parent.ok_or_else(|| {
            LayoutError::InvalidNesting("ROOT cannot have siblings".to_string())
        })?;
        let position = self
            .node_at(parent)
            .children
            .iter()
            .position(|c| *c == anchor)
            .unwrap_or(self.node_at(parent).children.len());
        Ok((parent, position))
    }

    // ==================== Validation ====================

    fn ensure_accepts_children(&self, parent: NodeIndex) -> Result<()> {
        let node = self.node_at(parent);
        if node.accepts_children() {
            Ok(())
        } else {
            Err(LayoutError::AcceptChild {
                parent: node.id.clone(),
                parent_type: node.item_type(),
            })
        }
    }

    /// Nesting rules checked on every insertion.
    fn check_nesting(&self, parent: NodeIndex, child: ItemType) -> Result<()> {
        self.ensure_accepts_children(parent)?;
        let parent_type = self.node_at(parent).item_type();
        match child {
            ItemType::Root => Err(LayoutError::InvalidNesting(
                "ROOT cannot have a parent".to_string(),
            )),
            ItemType::Grid if parent_type != ItemType::Root => Err(LayoutError::InvalidNesting(
                format!("the GRID parent must be ROOT, not {parent_type}"),
            )),
            ItemType::Tab if parent_type != ItemType::Tabs => Err(LayoutError::InvalidNesting(
                format!("the TAB parent must be TABS, not {parent_type}"),
            )),
            ItemType::Chart | ItemType::Markdown
                if !matches!(parent_type, ItemType::Row | ItemType::Column) =>
            {
                Err(LayoutError::InvalidNesting(format!(
                    "{child} must be placed in a ROW or COLUMN, not {parent_type}"
                )))
            }
            _ => Ok(()),
        }
    }

    // ==================== Ids ====================

    /// The item's own id if it is free, else a freshly generated one.
    fn claim_id(&mut self, item: &Item) -> Result<ItemId> {
        match item.id() {
            Some(id) if self.index.contains_key(id) => Err(LayoutError::DuplicateId(id.clone())),
            Some(id) => Ok(id.clone()),
            None => self.generate_id(item.item_type()),
        }
    }

    fn generate_id(&mut self, item_type: ItemType) -> Result<ItemId> {
        let mut last = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id(item_type);
            if !self.index.contains_key(&id) {
                return Ok(id);
            }
            last = Some(id);
        }
        Err(LayoutError::DuplicateId(
            last.unwrap_or_else(|| ItemId::new(item_type.as_str())),
        ))
    }

    // ==================== Arena ====================

    pub(crate) fn index_of(&self, id: &str) -> Result<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| LayoutError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx.0]
    }

    pub(crate) fn children_at(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.node_at(idx).children.iter().copied()
    }

    pub(crate) fn used_width_at(&self, idx: NodeIndex) -> u32 {
        self.children_at(idx)
            .filter_map(|c| self.node_at(c).width())
            .fold(0, u32::saturating_add)
    }

    fn append(&mut self, id: ItemId, kind: ItemKind, parent: NodeIndex) -> ItemId {
        self.attach(id.clone(), kind, Some(parent), None);
        id
    }

    fn attach(
        &mut self,
        id: ItemId,
        kind: ItemKind,
        parent: Option<NodeIndex>,
        position: Option<usize>,
    ) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(Node {
            id: id.clone(),
            kind,
            parent,
            children: Vec::new(),
        });
        self.index.insert(id, idx);
        if let Some(parent) = parent {
            let children = &mut self.nodes[parent.0].children;
            let position = position.unwrap_or(children.len()).min(children.len());
            children.insert(position, idx);
        }
        idx
    }

    fn depth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeIndex(0)];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.node_at(idx).children.iter().rev().copied());
        }
        order
    }

    // ==================== Serialization ====================

    /// Serialize to the flat `position_json` object.
    ///
    /// # Errors
    ///
    /// Returns an error if item metadata cannot be serialized.
    pub fn to_value(&self) -> Result<Value> {
        let mut out = Map::new();
        for idx in self.depth_first() {
            let node = self.node_at(idx);
            let children = node
                .children
                .iter()
                .map(|c| self.node_at(*c).id.clone())
                .collect();
            let parents = self.path_of(node.id.as_str())?;
            let entry = ItemEntry::new(node.id.clone(), &node.kind, children, parents)?;
            out.insert(node.id.to_string(), entry.to_value()?);
        }
        for (key, value) in &self.detached {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
        out.insert(
            DASHBOARD_VERSION_KEY.to_string(),
            Value::String(DASHBOARD_VERSION.to_string()),
        );
        Ok(Value::Object(out))
    }

    /// Rebuild a tree from a `position_json` object, with random ids for
    /// later insertions.
    ///
    /// # Errors
    ///
    /// See [`Tree::from_value_with`].
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::from_value_with(value, Box::new(RandomIds))
    }

    /// Rebuild a tree from a `position_json` object.
    ///
    /// Links are reconstructed exactly as listed in each entry's `children`,
    /// walking depth-first from `ROOT_ID`; the `parents` lists are not
    /// consulted. Entries that are not reachable from the root are kept and
    /// written back unchanged by [`Tree::to_value`].
    ///
    /// # Errors
    ///
    /// Fails when `ROOT_ID` or `GRID_ID` is missing, a child id has no entry,
    /// an id is listed twice, a leaf lists children, or a reachable entry has
    /// an unknown type.
    pub fn from_value_with(value: &Value, ids: Box<dyn IdGenerator>) -> Result<Self> {
        let data = value.as_object().ok_or_else(|| {
            LayoutError::Serialization("position must be a JSON object".to_string())
        })?;

        let root_value = data
            .get(ROOT_ID)
            .ok_or_else(|| LayoutError::MissingEntry(ROOT_ID.to_string()))?;
        if !data.contains_key(GRID_ID) {
            return Err(LayoutError::MissingEntry(GRID_ID.to_string()));
        }

        let root_entry = ItemEntry::from_value(ROOT_ID, root_value)?;
        let root_kind = root_entry.kind()?;
        if root_kind.item_type() != ItemType::Root {
            return Err(LayoutError::InvalidItem(format!(
                "{ROOT_ID} must have type ROOT, found {}",
                root_entry.item_type
            )));
        }

        let mut tree = Self::bare(ids);
        let root = tree.attach(ItemId::root(), root_kind, None, None);
        tree.load_children(root, &root_entry.children, data)?;

        match tree.find_by_id(GRID_ID) {
            None => return Err(LayoutError::MissingEntry(GRID_ID.to_string())),
            Some(grid) => {
                let parent_type = grid.parent.map(|p| tree.node_at(p).item_type());
                if parent_type != Some(ItemType::Root) {
                    return Err(LayoutError::InvalidNesting(
                        "the GRID parent must be ROOT".to_string(),
                    ));
                }
            }
        }

        tree.detached = data
            .iter()
            .filter(|(k, _)| k.as_str() != DASHBOARD_VERSION_KEY && !tree.index.contains_key(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        debug!(
            nodes = tree.nodes.len(),
            detached = tree.detached.len(),
            "loaded position tree"
        );
        Ok(tree)
    }

    fn load_children(
        &mut self,
        parent: NodeIndex,
        children: &[ItemId],
        data: &Map<String, Value>,
    ) -> Result<()> {
        if !children.is_empty() {
            self.ensure_accepts_children(parent)?;
        }
        for child_id in children {
            if self.index.contains_key(child_id) {
                return Err(LayoutError::DuplicateId(child_id.clone()));
            }
            let value = data
                .get(child_id.as_str())
                .ok_or_else(|| LayoutError::MissingEntry(child_id.to_string()))?;
            let entry = ItemEntry::from_value(child_id.as_str(), value)?;
            let kind = entry.kind()?;
            let idx = self.attach(child_id.clone(), kind, Some(parent), None);
            self.load_children(idx, &entry.children, data)?;
        }
        Ok(())
    }

    // ==================== Rendering ====================

    /// Indented text rendering, one node per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(NodeIndex(0), "", "", &mut out);
        out
    }

    fn render_node(&self, idx: NodeIndex, lead: &str, child_lead: &str, out: &mut String) {
        let node = self.node_at(idx);
        let _ = write!(out, "{lead}{} ({})", node.id, node.item_type());
        if let Some(label) = node.kind.label() {
            let _ = write!(out, " {label}");
        }
        out.push('\n');

        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            let last = i + 1 == count;
            let (branch, extension) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            self.render_node(
                *child,
                &format!("{child_lead}{branch}"),
                &format!("{child_lead}{extension}"),
                out,
            );
        }
    }

    /// Graphviz DOT rendering of the tree.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph position {\n");
        for idx in self.depth_first() {
            let node = self.node_at(idx);
            let mut label = format!("{}\n{}", node.id, node.item_type());
            if let Some(extra) = node.kind.label() {
                label.push('\n');
                label.push_str(&extra);
            }
            let _ = writeln!(out, "    \"{}\" [label=\"{}\"];", dot_escape(node.id.as_str()), dot_escape(&label));
            if let Some(parent) = node.parent {
                let _ = writeln!(
                    out,
                    "    \"{}\" -> \"{}\";",
                    dot_escape(self.node_at(parent).id.as_str()),
                    dot_escape(node.id.as_str())
                );
            }
        }
        out.push_str("}\n");
        out
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
