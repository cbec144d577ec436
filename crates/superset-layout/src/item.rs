//! Dashboard item values: type tags and per-type metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LayoutError, Result};
use crate::id::ItemId;

/// Maximum total width of the leaves held by one ROW (12-column grid).
pub const MAX_WIDTH: u32 = 12;

/// Default width of charts and markdown blocks.
pub const DEFAULT_WIDTH: u32 = 4;

/// Default height of charts and markdown blocks.
pub const DEFAULT_HEIGHT: u32 = 50;

/// Default title and placeholder of a new tab.
pub const DEFAULT_TAB_TEXT: &str = "Tab title";

/// Default background of rows and columns.
pub const DEFAULT_BACKGROUND: &str = "BACKGROUND_TRANSPARENT";

/// Metadata keys that are not described by a typed field.
pub type Extra = Map<String, Value>;

/// Type tag of a dashboard element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    /// Top of the tree, id `ROOT_ID`.
    Root,
    /// Main canvas, id `GRID_ID`.
    Grid,
    /// Container of tabs.
    Tabs,
    /// A single tab.
    Tab,
    /// Horizontal row with a width budget.
    Row,
    /// Vertical column.
    Column,
    /// Chart reference.
    Chart,
    /// Markdown block.
    Markdown,
    /// Horizontal divider.
    Divider,
}

impl ItemType {
    /// Every item type.
    pub const ALL: [Self; 9] = [
        Self::Root,
        Self::Grid,
        Self::Tabs,
        Self::Tab,
        Self::Row,
        Self::Column,
        Self::Chart,
        Self::Markdown,
        Self::Divider,
    ];

    /// Wire tag of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::Grid => "GRID",
            Self::Tabs => "TABS",
            Self::Tab => "TAB",
            Self::Row => "ROW",
            Self::Column => "COLUMN",
            Self::Chart => "CHART",
            Self::Markdown => "MARKDOWN",
            Self::Divider => "DIVIDER",
        }
    }

    /// Whether items of this type may hold children.
    #[must_use]
    pub const fn accepts_children(self) -> bool {
        !matches!(self, Self::Chart | Self::Markdown | Self::Divider)
    }

    /// Whether items of this type count against a row's width budget.
    #[must_use]
    pub const fn has_width(self) -> bool {
        matches!(self, Self::Chart | Self::Markdown)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LayoutError::UnknownItemType(s.to_string()))
    }
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

fn default_tab_text() -> String {
    DEFAULT_TAB_TEXT.to_string()
}

/// TAB metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabMeta {
    /// Tab title.
    #[serde(default)]
    pub text: String,
    /// Title shown before the user edits it.
    #[serde(rename = "defaultText", default = "default_tab_text")]
    pub default_text: String,
    /// Editor placeholder.
    #[serde(default = "default_tab_text")]
    pub placeholder: String,
    /// Unrecognized keys, kept for round trips.
    #[serde(flatten)]
    pub extra: Extra,
}

impl TabMeta {
    /// Tab titled `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            default_text: default_tab_text(),
            placeholder: default_tab_text(),
            extra: Extra::new(),
        }
    }
}

/// ROW metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMeta {
    /// Background style.
    #[serde(default = "default_background")]
    pub background: String,
    /// Unrecognized keys, kept for round trips.
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for RowMeta {
    fn default() -> Self {
        Self {
            background: default_background(),
            extra: Extra::new(),
        }
    }
}

/// COLUMN metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column width in grid units, when the editor recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Background style.
    #[serde(default = "default_background")]
    pub background: String,
    /// Unrecognized keys, kept for round trips.
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for ColumnMeta {
    fn default() -> Self {
        Self {
            width: None,
            background: default_background(),
            extra: Extra::new(),
        }
    }
}

/// CHART metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMeta {
    /// Remote chart id.
    #[serde(rename = "chartId")]
    pub chart_id: i64,
    /// Chart name as stored remotely.
    #[serde(rename = "sliceName", default)]
    pub slice_name: String,
    /// Title shown on the dashboard instead of the slice name.
    #[serde(
        rename = "sliceNameOverride",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub slice_name_override: Option<String>,
    /// Width in grid units.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Height in grid units.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Chart uuid, present on exported dashboards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Unrecognized keys, kept for round trips.
    #[serde(flatten)]
    pub extra: Extra,
}

impl ChartMeta {
    /// Metadata for chart `chart_id` at the default size.
    #[must_use]
    pub fn new(chart_id: i64, slice_name: impl Into<String>) -> Self {
        Self {
            chart_id,
            slice_name: slice_name.into(),
            slice_name_override: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            uuid: None,
            extra: Extra::new(),
        }
    }

    /// Set the displayed title.
    #[must_use]
    pub fn with_override(mut self, title: impl Into<String>) -> Self {
        self.slice_name_override = Some(title.into());
        self
    }

    /// Set width and height.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the chart uuid.
    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}

/// MARKDOWN metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownMeta {
    /// Markdown source.
    #[serde(default)]
    pub code: String,
    /// Width in grid units.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Height in grid units.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Unrecognized keys, kept for round trips.
    #[serde(flatten)]
    pub extra: Extra,
}

impl MarkdownMeta {
    /// Markdown block with the given source at the default size.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            extra: Extra::new(),
        }
    }

    /// Set width and height.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// An item type together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// ROOT.
    Root(Extra),
    /// GRID.
    Grid(Extra),
    /// TABS.
    Tabs(Extra),
    /// TAB.
    Tab(TabMeta),
    /// ROW.
    Row(RowMeta),
    /// COLUMN.
    Column(ColumnMeta),
    /// CHART.
    Chart(ChartMeta),
    /// MARKDOWN.
    Markdown(MarkdownMeta),
    /// DIVIDER.
    Divider(Extra),
}

impl ItemKind {
    /// Type tag of this kind.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        match self {
            Self::Root(_) => ItemType::Root,
            Self::Grid(_) => ItemType::Grid,
            Self::Tabs(_) => ItemType::Tabs,
            Self::Tab(_) => ItemType::Tab,
            Self::Row(_) => ItemType::Row,
            Self::Column(_) => ItemType::Column,
            Self::Chart(_) => ItemType::Chart,
            Self::Markdown(_) => ItemType::Markdown,
            Self::Divider(_) => ItemType::Divider,
        }
    }

    /// Width for types that take part in the row budget.
    #[must_use]
    pub const fn width(&self) -> Option<u32> {
        match self {
            Self::Chart(meta) => Some(meta.width),
            Self::Markdown(meta) => Some(meta.width),
            _ => None,
        }
    }

    /// Height for types that take part in the row budget.
    #[must_use]
    pub const fn height(&self) -> Option<u32> {
        match self {
            Self::Chart(meta) => Some(meta.height),
            Self::Markdown(meta) => Some(meta.height),
            _ => None,
        }
    }

    /// Short human-readable description used by tree renderings.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Tab(meta) => Some(meta.text.clone()),
            Self::Chart(meta) => Some(format!(
                "{} - {} [{}x{}]",
                meta.chart_id, meta.slice_name, meta.width, meta.height
            )),
            Self::Markdown(meta) => {
                let first_line = meta.code.lines().next().unwrap_or_default();
                Some(format!("{first_line} [{}x{}]", meta.width, meta.height))
            }
            _ => None,
        }
    }

    /// Metadata as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be serialized.
    pub fn meta_to_value(&self) -> Result<Map<String, Value>> {
        let value = match self {
            Self::Root(extra) | Self::Grid(extra) | Self::Tabs(extra) | Self::Divider(extra) => {
                return Ok(extra.clone());
            }
            Self::Tab(meta) => serde_json::to_value(meta)?,
            Self::Row(meta) => serde_json::to_value(meta)?,
            Self::Column(meta) => serde_json::to_value(meta)?,
            Self::Chart(meta) => serde_json::to_value(meta)?,
            Self::Markdown(meta) => serde_json::to_value(meta)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Err(LayoutError::Serialization(format!(
                "metadata serialized to a non-object: {other}"
            ))),
        }
    }

    /// Rebuild a kind from its type tag and metadata object.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata does not match the type.
    pub fn from_meta(item_type: ItemType, meta: Map<String, Value>) -> Result<Self> {
        let value = Value::Object(meta);
        let kind = match item_type {
            ItemType::Root => Self::Root(into_map(value)),
            ItemType::Grid => Self::Grid(into_map(value)),
            ItemType::Tabs => Self::Tabs(into_map(value)),
            ItemType::Divider => Self::Divider(into_map(value)),
            ItemType::Tab => Self::Tab(serde_json::from_value(value)?),
            ItemType::Row => Self::Row(serde_json::from_value(value)?),
            ItemType::Column => Self::Column(serde_json::from_value(value)?),
            ItemType::Chart => Self::Chart(serde_json::from_value(value)?),
            ItemType::Markdown => Self::Markdown(serde_json::from_value(value)?),
        };
        Ok(kind)
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A dashboard element waiting to be inserted into a tree.
///
/// The id is optional: the tree generates one when it is absent. The
/// `relocate` flag only matters for charts and markdown blocks; it lets the
/// placement engine pick another row when the requested one is full.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: Option<ItemId>,
    kind: ItemKind,
    relocate: bool,
}

impl Item {
    /// Wrap an already-validated kind.
    #[must_use]
    pub const fn from_kind(kind: ItemKind) -> Self {
        Self {
            id: None,
            kind,
            relocate: true,
        }
    }

    /// A ROOT item. Trees create their own; inserting another one fails.
    #[must_use]
    pub fn root() -> Self {
        Self::from_kind(ItemKind::Root(Extra::new())).with_id(ItemId::root())
    }

    /// A GRID item with the well-known id.
    #[must_use]
    pub fn grid() -> Self {
        Self::from_kind(ItemKind::Grid(Extra::new())).with_id(ItemId::grid())
    }

    /// A TABS container.
    #[must_use]
    pub fn tabs() -> Self {
        Self::from_kind(ItemKind::Tabs(Extra::new()))
    }

    /// A TAB titled `text`.
    #[must_use]
    pub fn tab(text: impl Into<String>) -> Self {
        Self::from_kind(ItemKind::Tab(TabMeta::new(text)))
    }

    /// A ROW with a transparent background.
    #[must_use]
    pub fn row() -> Self {
        Self::from_kind(ItemKind::Row(RowMeta::default()))
    }

    /// A ROW with the given background.
    #[must_use]
    pub fn row_with_background(background: impl Into<String>) -> Self {
        Self::from_kind(ItemKind::Row(RowMeta {
            background: background.into(),
            extra: Extra::new(),
        }))
    }

    /// A COLUMN.
    #[must_use]
    pub fn column() -> Self {
        Self::from_kind(ItemKind::Column(ColumnMeta::default()))
    }

    /// A DIVIDER.
    #[must_use]
    pub fn divider() -> Self {
        Self::from_kind(ItemKind::Divider(Extra::new()))
    }

    /// A CHART item.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidItem`] if the chart id or slice name is
    /// missing, if width or height is zero, or if the width exceeds
    /// [`MAX_WIDTH`] while `relocate` is false.
    pub fn chart(meta: ChartMeta, relocate: bool) -> Result<Self> {
        if meta.chart_id <= 0 {
            return Err(LayoutError::InvalidItem(
                "chartId must reference a saved chart".to_string(),
            ));
        }
        if meta.slice_name.trim().is_empty() {
            return Err(LayoutError::InvalidItem(
                "sliceName cannot be empty".to_string(),
            ));
        }
        validate_size(meta.width, meta.height, relocate)?;
        Ok(Self {
            id: None,
            kind: ItemKind::Chart(meta),
            relocate,
        })
    }

    /// A MARKDOWN item.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::InvalidItem`] if width or height is zero, or if
    /// the width exceeds [`MAX_WIDTH`] while `relocate` is false.
    pub fn markdown(meta: MarkdownMeta, relocate: bool) -> Result<Self> {
        validate_size(meta.width, meta.height, relocate)?;
        Ok(Self {
            id: None,
            kind: ItemKind::Markdown(meta),
            relocate,
        })
    }

    /// Use a fixed id instead of a generated one.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Requested id, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&ItemId> {
        self.id.as_ref()
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

    /// Whether placement may move the item to another row.
    #[must_use]
    pub const fn relocate(&self) -> bool {
        self.relocate
    }

    pub(crate) fn into_parts(self) -> (Option<ItemId>, ItemKind) {
        (self.id, self.kind)
    }
}

/// Check the size of a chart or markdown block.
///
/// # Errors
///
/// Returns [`LayoutError::InvalidItem`] when a dimension is zero or the
/// width is over the row budget and the item may not be relocated.
pub fn validate_size(width: u32, height: u32, relocate: bool) -> Result<()> {
    if width == 0 {
        return Err(LayoutError::InvalidItem(
            "width must be greater than zero".to_string(),
        ));
    }
    if height == 0 {
        return Err(LayoutError::InvalidItem(
            "height must be greater than zero".to_string(),
        ));
    }
    if !relocate && width > MAX_WIDTH {
        return Err(LayoutError::InvalidItem(format!(
            "maximum width allowed is {MAX_WIDTH}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(ItemType::Root, true)]
    #[test_case(ItemType::Grid, true)]
    #[test_case(ItemType::Tabs, true)]
    #[test_case(ItemType::Tab, true)]
    #[test_case(ItemType::Row, true)]
    #[test_case(ItemType::Column, true)]
    #[test_case(ItemType::Chart, false)]
    #[test_case(ItemType::Markdown, false)]
    #[test_case(ItemType::Divider, false)]
    fn test_accepts_children(item_type: ItemType, expected: bool) {
        assert_eq!(item_type.accepts_children(), expected);
    }

    #[test]
    fn test_item_type_parse() {
        for t in ItemType::ALL {
            assert_eq!(t.as_str().parse::<ItemType>().unwrap(), t);
        }
        assert!(matches!(
            "HEADER".parse::<ItemType>(),
            Err(LayoutError::UnknownItemType(_))
        ));
    }

    #[test]
    fn test_chart_requires_id_and_name() {
        assert!(Item::chart(ChartMeta::new(0, "sales"), true).is_err());
        assert!(Item::chart(ChartMeta::new(7, "  "), true).is_err());
        assert!(Item::chart(ChartMeta::new(7, "sales"), true).is_ok());
    }

    #[test_case(0, 50, true ; "zero width")]
    #[test_case(4, 0, true ; "zero height")]
    #[test_case(13, 50, false ; "too wide without relocate")]
    fn test_invalid_sizes(width: u32, height: u32, relocate: bool) {
        let result = Item::markdown(MarkdownMeta::new("# hi").with_size(width, height), relocate);
        assert!(matches!(result, Err(LayoutError::InvalidItem(_))));
    }

    #[test]
    fn test_wide_item_deferred_with_relocate() {
        let item = Item::markdown(MarkdownMeta::new("").with_size(13, 50), true);
        assert!(item.is_ok());
    }

    #[test]
    fn test_chart_meta_wire_names() {
        let kind = ItemKind::Chart(
            ChartMeta::new(42, "Revenue")
                .with_override("Revenue (EUR)")
                .with_size(6, 40),
        );
        let meta = kind.meta_to_value().unwrap();
        assert_eq!(meta["chartId"], json!(42));
        assert_eq!(meta["sliceName"], json!("Revenue"));
        assert_eq!(meta["sliceNameOverride"], json!("Revenue (EUR)"));
        assert_eq!(meta["width"], json!(6));
        assert_eq!(meta["height"], json!(40));
        assert!(!meta.contains_key("uuid"));
    }

    #[test]
    fn test_meta_keeps_unknown_keys() {
        let raw = json!({"background": "BACKGROUND_WHITE", "custom": [1, 2]});
        let Value::Object(map) = raw else { unreachable!() };
        let kind = ItemKind::from_meta(ItemType::Row, map.clone()).unwrap();
        assert_eq!(kind.meta_to_value().unwrap(), map);
    }

    #[test]
    fn test_chart_meta_requires_chart_id() {
        let raw = json!({"sliceName": "x"});
        let Value::Object(map) = raw else { unreachable!() };
        assert!(ItemKind::from_meta(ItemType::Chart, map).is_err());
    }

    #[test]
    fn test_tab_defaults() {
        let item = Item::tab("Overview");
        let ItemKind::Tab(meta) = item.kind() else { unreachable!() };
        assert_eq!(meta.text, "Overview");
        assert_eq!(meta.default_text, DEFAULT_TAB_TEXT);
        assert_eq!(meta.placeholder, DEFAULT_TAB_TEXT);
    }

    #[test]
    fn test_labels() {
        let chart = ItemKind::Chart(ChartMeta::new(3, "Orders"));
        assert_eq!(chart.label().unwrap(), "3 - Orders [4x50]");
        let md = ItemKind::Markdown(MarkdownMeta::new("# Title\nbody"));
        assert_eq!(md.label().unwrap(), "# Title [4x50]");
        assert!(ItemKind::Row(RowMeta::default()).label().is_none());
    }
}
