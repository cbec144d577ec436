//! Dashboards: title and ownership, the position tree and metadata.
//!
//! A [`Dashboard`] owns its layout as a [`Tree`] and its `json_metadata` as
//! [`DashboardMetadata`]. Both travel as JSON-encoded strings
//! (`position_json`, `json_metadata`) and are decoded on read.
//!
//! [`Dashboard::add_chart`] is the one operation that touches the server
//! while editing: it saves the chart if needed, links it to the dashboard,
//! registers it for cross-filtering and places it in the tree. The dashboard
//! itself is only written by [`Dashboards::save`].

pub mod metadata;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use superset_layout::{
    ChartMeta, DEFAULT_HEIGHT, DEFAULT_WIDTH, GRID_ID, Item, ItemId, ItemKind, ItemType,
    MarkdownMeta, Tree, resolve_placement, validate_size,
};
use tracing::{debug, info};

use crate::chart::{Chart, Charts};
use crate::error::{ClientError, Result};
use crate::json_field;
use crate::resource::{Factory, Resource};

pub use metadata::{
    ChartConfiguration, CrossFilters, DashboardMetadata, GlobalChartConfiguration, GlobalScope,
};

/// Where and how large a chart is placed by [`Dashboard::add_chart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPlacement {
    /// Title shown instead of the slice name.
    pub title: Option<String>,
    /// Anchor node; the last row of the grid (or the grid) when unset.
    pub parent: Option<ItemId>,
    /// Width in grid columns.
    pub width: u32,
    /// Height in grid units.
    pub height: u32,
    /// Whether the chart may move to another row when the anchor is full.
    pub relocate: bool,
}

impl Default for ChartPlacement {
    fn default() -> Self {
        Self {
            title: None,
            parent: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            relocate: true,
        }
    }
}

impl ChartPlacement {
    /// Default placement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title override.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Anchor the chart at `parent`.
    #[must_use]
    pub fn under(mut self, parent: impl Into<ItemId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set width and height.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid relocation.
    #[must_use]
    pub const fn with_relocate(mut self, relocate: bool) -> Self {
        self.relocate = relocate;
        self
    }
}

/// A dashboard.
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// Remote id.
    pub id: Option<i64>,
    /// Title.
    pub dashboard_title: String,
    /// Whether the dashboard is published.
    pub published: bool,
    /// URL slug.
    pub slug: Option<String>,
    /// Custom CSS.
    pub css: Option<String>,
    /// Owner user ids.
    pub owners: Vec<i64>,
    /// Role ids allowed to see the dashboard.
    pub roles: Vec<i64>,
    /// Parsed `json_metadata`.
    pub metadata: DashboardMetadata,
    /// Parsed `position_json`.
    pub position: Tree,
    charts: Vec<String>,
    changed_on: Option<String>,
}

/// Server shape of a dashboard.
#[derive(Debug, Deserialize)]
struct DashboardRecord {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    dashboard_title: Option<String>,
    #[serde(default)]
    published: Option<bool>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    css: Option<String>,
    #[serde(default, deserialize_with = "json_field::ids")]
    owners: Vec<i64>,
    #[serde(default, deserialize_with = "json_field::ids")]
    roles: Vec<i64>,
    #[serde(default)]
    charts: Option<Vec<String>>,
    #[serde(default)]
    changed_on: Option<String>,
    #[serde(default)]
    position_json: Value,
    #[serde(default)]
    json_metadata: Value,
}

impl Dashboard {
    /// Unsaved dashboard with an empty layout.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            dashboard_title: title.into(),
            published: false,
            slug: None,
            css: None,
            owners: Vec::new(),
            roles: Vec::new(),
            metadata: DashboardMetadata::default(),
            position: Tree::new(),
            charts: Vec::new(),
            changed_on: None,
        }
    }

    /// Replace the layout.
    #[must_use]
    pub fn with_position(mut self, position: Tree) -> Self {
        self.position = position;
        self
    }

    /// Decode a dashboard as returned by the server.
    ///
    /// `position_json` and `json_metadata` may be JSON strings, inline
    /// objects, `null` or empty; missing layouts decode to an empty tree.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] for malformed fields and
    /// [`ClientError::Layout`] for an inconsistent position tree.
    pub fn from_json(value: Value) -> Result<Self> {
        let record: DashboardRecord = serde_json::from_value(value)?;

        let position = match json_field::decode::<Value>(record.position_json)? {
            Value::Null => Tree::new(),
            Value::Object(map) if map.is_empty() => Tree::new(),
            other => Tree::from_value(&other)?,
        };
        let metadata: DashboardMetadata = json_field::decode(record.json_metadata)?;

        Ok(Self {
            id: record.id,
            dashboard_title: record.dashboard_title.unwrap_or_default(),
            published: record.published.unwrap_or(false),
            slug: record.slug.filter(|s| !s.is_empty()),
            css: record.css,
            owners: record.owners,
            roles: record.roles,
            metadata,
            position,
            charts: record.charts.unwrap_or_default(),
            changed_on: record.changed_on,
        })
    }

    /// Slice names of the charts the server reports for this dashboard.
    #[must_use]
    pub fn chart_slices(&self) -> &[String] {
        &self.charts
    }

    /// Ids of the charts placed in the layout, in tree order.
    #[must_use]
    pub fn chart_ids(&self) -> Vec<i64> {
        self.position
            .iter()
            .filter_map(|node| match node.kind() {
                ItemKind::Chart(meta) => Some(meta.chart_id),
                _ => None,
            })
            .collect()
    }

    /// Last modification time reported by the server.
    #[must_use]
    pub fn changed_on(&self) -> Option<&str> {
        self.changed_on.as_deref()
    }

    /// Label colors.
    #[must_use]
    pub const fn colors(&self) -> &BTreeMap<String, String> {
        self.metadata.colors()
    }

    /// Merge `patch` into the label colors. Later keys win.
    pub fn update_colors<I, K, V>(&mut self, patch: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata.update_colors(patch);
    }

    /// Anchor used when the caller names none: the last child of the grid
    /// if it is a row, otherwise the grid.
    #[must_use]
    pub fn default_anchor(&self) -> ItemId {
        self.position
            .children_of(GRID_ID)
            .ok()
            .and_then(|children| children.last().copied())
            .filter(|node| node.item_type() == ItemType::Row)
            .map_or_else(ItemId::grid, |node| node.id().clone())
    }

    /// Put `chart` on this dashboard.
    ///
    /// Saves the chart first when it has no id, links it to the dashboard,
    /// registers it for cross-filtering and inserts a CHART item. Placement
    /// is checked against the current layout before any request is sent.
    /// Steps already done on the server are not undone when a later one
    /// fails. The dashboard itself still needs [`Dashboards::save`].
    ///
    /// # Errors
    ///
    /// - [`ClientError::Precondition`] if the dashboard has no id or the
    ///   chart is invalid.
    /// - [`ClientError::Layout`] for an invalid size, an unknown anchor, a
    ///   nesting violation, or a full row when relocation is off.
    /// - [`ClientError::Api`] if saving or linking the chart fails.
    pub fn add_chart(
        &mut self,
        charts: &Charts,
        chart: &mut Chart,
        placement: ChartPlacement,
    ) -> Result<ItemId> {
        let dashboard_id = self.id.ok_or_else(|| {
            ClientError::Precondition("dashboard has no id, save the dashboard first".to_string())
        })?;
        chart.validate()?;
        validate_size(placement.width, placement.height, placement.relocate)?;

        let anchor = placement
            .parent
            .clone()
            .unwrap_or_else(|| self.default_anchor());
        let candidate = Item::markdown(
            MarkdownMeta::new("").with_size(placement.width, placement.height),
            placement.relocate,
        )?;
        let planned = resolve_placement(&self.position, anchor.as_str(), &candidate)?;
        debug!(dashboard_id, anchor = %anchor, ?planned, "placement checked");

        let chart_id = match chart.id {
            Some(id) => id,
            None => charts.add(chart)?,
        };
        chart.dashboards = charts.link_dashboard(chart_id, dashboard_id)?;
        self.metadata.add_chart(chart_id);

        let mut meta = ChartMeta::new(chart_id, chart.slice_name.clone())
            .with_size(placement.width, placement.height);
        if let Some(title) = placement.title.or_else(|| chart.title_override.clone()) {
            meta = meta.with_override(title);
        }
        let item = Item::chart(meta, placement.relocate)?;
        let id = self.position.insert(item, anchor.as_str())?;
        info!(dashboard_id, chart_id, item = %id, "chart added to dashboard");
        Ok(id)
    }

    /// Insert a markdown block. Local only; nothing is sent until saved.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Layout`] when the block cannot be placed.
    pub fn add_markdown(
        &mut self,
        code: impl Into<String>,
        placement: ChartPlacement,
    ) -> Result<ItemId> {
        let anchor = placement.parent.unwrap_or_else(|| self.default_anchor());
        let item = Item::markdown(
            MarkdownMeta::new(code).with_size(placement.width, placement.height),
            placement.relocate,
        )?;
        let id = self.position.insert(item, anchor.as_str())?;
        debug!(item = %id, "markdown added");
        Ok(id)
    }
}

impl Resource for Dashboard {
    const ENDPOINT: &'static str = "dashboard/";
    const KIND: &'static str = "dashboard";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_result(value: Value) -> Result<Self> {
        Self::from_json(value)
    }

    fn to_payload(&self) -> Result<Value> {
        let mut payload = Map::new();
        payload.insert("dashboard_title".into(), json!(self.dashboard_title));
        payload.insert("published".into(), json!(self.published));
        payload.insert("owners".into(), json!(self.owners));
        payload.insert("roles".into(), json!(self.roles));
        if let Some(slug) = &self.slug {
            payload.insert("slug".into(), json!(slug));
        }
        if let Some(css) = &self.css {
            payload.insert("css".into(), json!(css));
        }
        payload.insert(
            "position_json".into(),
            Value::String(json_field::encode(&self.position.to_value()?)?),
        );
        payload.insert(
            "json_metadata".into(),
            Value::String(json_field::encode(&self.metadata)?),
        );
        Ok(Value::Object(payload))
    }

    fn validate(&self) -> Result<()> {
        self.position.check_row_budgets()?;
        Ok(())
    }
}

/// Access to dashboards.
pub type Dashboards = Factory<Dashboard>;

impl Dashboards {
    /// Create the dashboard if it has no id, otherwise update it.
    /// Returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Layout`] if a row is over budget and
    /// [`ClientError::Api`] if the server rejects the dashboard.
    pub fn save(&self, dashboard: &mut Dashboard) -> Result<i64> {
        match dashboard.id {
            Some(id) => {
                self.update(dashboard)?;
                Ok(id)
            }
            None => self.add(dashboard),
        }
    }

    /// Fetch the charts listed by slice name on `dashboard`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] or [`ClientError::MultipleFound`]
    /// when a slice name does not identify exactly one chart.
    pub fn charts_of(&self, dashboard: &Dashboard, charts: &Charts) -> Result<Vec<Chart>> {
        dashboard
            .chart_slices()
            .iter()
            .map(|name| charts.by_name(name))
            .collect()
    }
}
