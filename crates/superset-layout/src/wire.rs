//! Per-node entries of the `position_json` payload.
//!
//! The server stores a dashboard layout as a flat object keyed by item id:
//!
//! ```json
//! {
//!   "DASHBOARD_VERSION_KEY": "v2",
//!   "ROOT_ID": {"id": "ROOT_ID", "type": "ROOT", "children": ["GRID_ID"], "parents": []},
//!   "GRID_ID": {"id": "GRID_ID", "type": "GRID", "children": ["ROW-x"], "parents": ["ROOT_ID"]},
//!   "ROW-x": {"id": "ROW-x", "type": "ROW", "children": [], "parents": ["ROOT_ID", "GRID_ID"],
//!             "meta": {"background": "BACKGROUND_TRANSPARENT"}}
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LayoutError, Result};
use crate::id::ItemId;
use crate::item::{ItemKind, ItemType};

/// Key of the layout version marker.
pub const DASHBOARD_VERSION_KEY: &str = "DASHBOARD_VERSION_KEY";

/// Layout version written next to the entries.
pub const DASHBOARD_VERSION: &str = "v2";

const STRUCTURAL_KEYS: [&str; 5] = ["id", "type", "children", "parents", "meta"];

/// One `id -> attributes` entry of the position payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntry {
    /// Item id.
    pub id: ItemId,
    /// Type tag, kept raw so unknown types can be reported by name.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Ordered child ids.
    #[serde(default)]
    pub children: Vec<ItemId>,
    /// Ancestor ids, root first.
    #[serde(default)]
    pub parents: Vec<ItemId>,
    /// Type-specific metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ItemEntry {
    /// Build the entry for an item at a known tree position.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be serialized.
    pub fn new(
        id: ItemId,
        kind: &ItemKind,
        children: Vec<ItemId>,
        parents: Vec<ItemId>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            item_type: kind.item_type().to_string(),
            children,
            parents,
            meta: kind.meta_to_value()?,
        })
    }

    /// Parse the entry stored under `key`.
    ///
    /// Metadata is read from the nested `meta` object when it is present and
    /// otherwise from the non-structural keys of the entry itself. The map
    /// key is authoritative for the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not an object or lacks a type tag.
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            LayoutError::Serialization(format!("position entry {key} is not an object"))
        })?;

        let item_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LayoutError::Serialization(format!("position entry {key} has no type"))
            })?
            .to_string();

        let children = id_list(obj.get("children"), key)?;
        let parents = id_list(obj.get("parents"), key)?;

        let meta = match obj.get("meta") {
            Some(Value::Object(meta)) if !meta.is_empty() => meta.clone(),
            _ => obj
                .iter()
                .filter(|(k, _)| !STRUCTURAL_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        Ok(Self {
            id: ItemId::new(key),
            item_type,
            children,
            parents,
            meta,
        })
    }

    /// Resolve the type tag and metadata into an [`ItemKind`].
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types or metadata that does not fit the type.
    pub fn kind(&self) -> Result<ItemKind> {
        let item_type: ItemType = self.item_type.parse()?;
        ItemKind::from_meta(item_type, self.meta.clone())
    }

    /// Serialize to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn id_list(value: Option<&Value>, key: &str) -> Result<Vec<ItemId>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str().map(ItemId::new).ok_or_else(|| {
                    LayoutError::Serialization(format!("non-string id in entry {key}"))
                })
            })
            .collect(),
        Some(_) => Err(LayoutError::Serialization(format!(
            "id list in entry {key} is not an array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ChartMeta, ItemKind};
    use serde_json::json;

    #[test]
    fn test_reads_nested_meta() {
        let value = json!({
            "id": "CHART-a",
            "type": "CHART",
            "children": [],
            "parents": ["ROOT_ID", "GRID_ID", "ROW-a"],
            "meta": {"chartId": 5, "sliceName": "Sales", "width": 3, "height": 40}
        });
        let entry = ItemEntry::from_value("CHART-a", &value).unwrap();
        assert_eq!(entry.parents.len(), 3);
        let ItemKind::Chart(meta) = entry.kind().unwrap() else { unreachable!() };
        assert_eq!(meta.chart_id, 5);
        assert_eq!(meta.width, 3);
    }

    #[test]
    fn test_reads_flattened_meta() {
        let value = json!({
            "type": "MARKDOWN",
            "children": [],
            "code": "hello",
            "width": 5,
            "height": 20
        });
        let entry = ItemEntry::from_value("MARKDOWN-a", &value).unwrap();
        assert_eq!(entry.id, "MARKDOWN-a");
        let ItemKind::Markdown(meta) = entry.kind().unwrap() else { unreachable!() };
        assert_eq!(meta.code, "hello");
        assert_eq!(meta.width, 5);
    }

    #[test]
    fn test_missing_type_rejected() {
        let err = ItemEntry::from_value("X", &json!({"children": []})).unwrap_err();
        assert!(matches!(err, LayoutError::Serialization(_)));
    }

    #[test]
    fn test_unknown_type_reported() {
        let entry = ItemEntry::from_value("HEADER_ID", &json!({"type": "HEADER"})).unwrap();
        assert!(matches!(entry.kind(), Err(LayoutError::UnknownItemType(t)) if t == "HEADER"));
    }

    #[test]
    fn test_writes_nested_meta() {
        let kind = ItemKind::Chart(ChartMeta::new(9, "Users"));
        let entry = ItemEntry::new(ItemId::new("CHART-b"), &kind, vec![], vec![ItemId::root()])
            .unwrap();
        let value = entry.to_value().unwrap();
        assert_eq!(value["type"], json!("CHART"));
        assert_eq!(value["meta"]["chartId"], json!(9));
        assert!(value.get("chartId").is_none());
    }
}
