//! Dashboard `json_metadata`: colors, refresh settings and cross-filter
//! scopes.
//!
//! Every chart placed on a dashboard gets a `chart_configuration` entry whose
//! cross-filter scope lists the charts registered before it, and is added to
//! the global scope. Keys this module does not model are kept in
//! [`DashboardMetadata::extra`] and written back unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json_field;

/// Scope used by new chart configurations.
pub const SCOPE_GLOBAL: &str = "global";

fn global_scope() -> Value {
    Value::String(SCOPE_GLOBAL.to_string())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Cross-filter settings of one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossFilters {
    /// `"global"` or a scope object.
    #[serde(default = "global_scope")]
    pub scope: Value,
    /// Charts this chart's filters apply to.
    #[serde(default)]
    pub charts_in_scope: Vec<i64>,
}

impl Default for CrossFilters {
    fn default() -> Self {
        Self {
            scope: global_scope(),
            charts_in_scope: Vec::new(),
        }
    }
}

/// `chart_configuration` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfiguration {
    /// Chart id.
    pub id: i64,
    /// Cross-filter scope.
    #[serde(default)]
    pub cross_filters: CrossFilters,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartConfiguration {
    /// Configuration of `id` filtering the charts `peers`.
    #[must_use]
    pub fn new(id: i64, peers: Vec<i64>) -> Self {
        Self {
            id,
            cross_filters: CrossFilters {
                scope: global_scope(),
                charts_in_scope: peers,
            },
            extra: Map::new(),
        }
    }
}

/// Scope of the dashboard-wide cross-filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalScope {
    /// Layout ids the scope starts from.
    #[serde(default)]
    pub root_path: Vec<String>,
    /// Excluded chart ids.
    #[serde(default)]
    pub excluded: Vec<i64>,
}

/// `global_chart_configuration`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalChartConfiguration {
    /// Scope.
    #[serde(default)]
    pub scope: GlobalScope,
    /// Every chart taking part in cross-filtering.
    #[serde(default)]
    pub charts_in_scope: Vec<i64>,
}

/// Parsed `json_metadata` of a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetadata {
    /// Color scheme name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,
    /// Auto-refresh interval in seconds, 0 for none.
    #[serde(default)]
    pub refresh_frequency: i64,
    /// Colors shared across charts.
    #[serde(default = "empty_object")]
    pub shared_label_colors: Value,
    /// Labels in color-scheme order.
    #[serde(default)]
    pub color_scheme_domain: Vec<String>,
    /// Expanded state per chart.
    #[serde(default)]
    pub expanded_slices: Map<String, Value>,
    /// Label to color code.
    #[serde(default)]
    pub label_colors: BTreeMap<String, String>,
    /// Charts exempt from auto-refresh.
    #[serde(default)]
    pub timed_refresh_immune_slices: Vec<i64>,
    /// Whether cross-filtering is on.
    #[serde(default)]
    pub cross_filters_enabled: bool,
    /// Legacy filter-box scopes.
    #[serde(default)]
    pub filter_scopes: Map<String, Value>,
    /// Per-chart configuration keyed by chart id.
    #[serde(default)]
    pub chart_configuration: BTreeMap<String, ChartConfiguration>,
    /// Dashboard-wide cross-filter configuration.
    #[serde(default)]
    pub global_chart_configuration: GlobalChartConfiguration,
    /// Default filter values, a JSON string on the wire.
    #[serde(default, with = "json_field::string")]
    pub default_filters: Map<String, Value>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DashboardMetadata {
    fn default() -> Self {
        Self {
            color_scheme: None,
            refresh_frequency: 0,
            shared_label_colors: empty_object(),
            color_scheme_domain: Vec::new(),
            expanded_slices: Map::new(),
            label_colors: BTreeMap::new(),
            timed_refresh_immune_slices: Vec::new(),
            cross_filters_enabled: false,
            filter_scopes: Map::new(),
            chart_configuration: BTreeMap::new(),
            global_chart_configuration: GlobalChartConfiguration::default(),
            default_filters: Map::new(),
            extra: Map::new(),
        }
    }
}

impl DashboardMetadata {
    /// Register `chart_id` for cross-filtering.
    ///
    /// The chart's scope holds every chart already in the global scope; the
    /// chart then joins the global scope itself.
    pub fn add_chart(&mut self, chart_id: i64) {
        let global = &mut self.global_chart_configuration.charts_in_scope;
        let peers = global
            .iter()
            .copied()
            .filter(|id| *id != chart_id)
            .collect();
        self.chart_configuration
            .insert(chart_id.to_string(), ChartConfiguration::new(chart_id, peers));
        if !global.contains(&chart_id) {
            global.push(chart_id);
        }
    }

    /// Label colors.
    #[must_use]
    pub const fn colors(&self) -> &BTreeMap<String, String> {
        &self.label_colors
    }

    /// Merge `patch` into the label colors. Later keys win.
    pub fn update_colors<I, K, V>(&mut self, patch: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.label_colors
            .extend(patch.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_object() {
        let metadata: DashboardMetadata = serde_json::from_value(json!({})).unwrap();
        assert_eq!(metadata, DashboardMetadata::default());
    }

    #[test]
    fn test_add_chart_scopes() {
        let mut metadata = DashboardMetadata::default();
        metadata.add_chart(1);
        metadata.add_chart(2);
        metadata.add_chart(3);

        assert_eq!(metadata.global_chart_configuration.charts_in_scope, vec![1, 2, 3]);
        assert!(metadata.chart_configuration["1"].cross_filters.charts_in_scope.is_empty());
        assert_eq!(metadata.chart_configuration["3"].cross_filters.charts_in_scope, vec![1, 2]);
        assert_eq!(metadata.chart_configuration["3"].cross_filters.scope, json!("global"));
    }

    #[test]
    fn test_add_chart_twice_keeps_single_scope_entry() {
        let mut metadata = DashboardMetadata::default();
        metadata.add_chart(1);
        metadata.add_chart(2);
        metadata.add_chart(1);
        assert_eq!(metadata.global_chart_configuration.charts_in_scope, vec![1, 2]);
        assert_eq!(metadata.chart_configuration["1"].cross_filters.charts_in_scope, vec![2]);
    }

    #[test]
    fn test_update_colors_merges() {
        let mut metadata = DashboardMetadata::default();
        metadata.update_colors([("boys", "#ADD8E6"), ("girls", "#FF69B4")]);
        metadata.update_colors([("girls", "#FFC0CB")]);
        assert_eq!(metadata.colors().len(), 2);
        assert_eq!(metadata.colors()["boys"], "#ADD8E6");
        assert_eq!(metadata.colors()["girls"], "#FFC0CB");
    }

    #[test]
    fn test_update_colors_leaves_other_fields() {
        let mut metadata = DashboardMetadata {
            refresh_frequency: 60,
            ..DashboardMetadata::default()
        };
        metadata.add_chart(7);
        let before = metadata.clone();
        metadata.update_colors([("a", "#000000")]);
        assert_eq!(metadata.refresh_frequency, 60);
        assert_eq!(metadata.chart_configuration, before.chart_configuration);
    }

    #[test]
    fn test_wire_shape() {
        let mut metadata = DashboardMetadata::default();
        metadata.default_filters.insert("12".into(), json!({"region": ["EU"]}));
        metadata.add_chart(5);
        let value = serde_json::to_value(&metadata).unwrap();

        assert!(value["default_filters"].is_string());
        assert_eq!(
            value["chart_configuration"]["5"],
            json!({"id": 5, "crossFilters": {"scope": "global", "chartsInScope": []}})
        );
        assert_eq!(
            value["global_chart_configuration"],
            json!({"scope": {"rootPath": [], "excluded": []}, "chartsInScope": [5]})
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_scope_lists_earlier_charts(ids in prop::collection::vec(1i64..50, 0..20)) {
            let mut metadata = DashboardMetadata::default();
            for id in &ids {
                metadata.add_chart(*id);
            }

            let global = &metadata.global_chart_configuration.charts_in_scope;
            let mut seen = Vec::new();
            for id in &ids {
                if !seen.contains(id) {
                    seen.push(*id);
                }
            }
            prop_assert_eq!(global, &seen);

            for (key, config) in &metadata.chart_configuration {
                prop_assert_eq!(key, &config.id.to_string());
                prop_assert!(!config.cross_filters.charts_in_scope.contains(&config.id));
            }
        }

        #[test]
        fn prop_update_colors_last_write_wins(
            patches in prop::collection::vec(
                prop::collection::vec(("[a-c]", "#[0-9a-f]{6}"), 0..5),
                0..5,
            )
        ) {
            let mut metadata = DashboardMetadata::default();
            let mut expected = BTreeMap::new();
            for patch in &patches {
                metadata.update_colors(patch.clone());
                for (label, color) in patch {
                    expected.insert(label.clone(), color.clone());
                }
            }
            prop_assert_eq!(metadata.colors(), &expected);
        }
    }

    #[test]
    fn test_unknown_keys_survive() {
        let raw = json!({
            "positions": {},
            "native_filter_configuration": [{"id": "NATIVE_FILTER-1"}],
            "label_colors": {"a": "#111111"},
            "default_filters": "{}"
        });
        let metadata: DashboardMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(metadata.extra["native_filter_configuration"][0]["id"], json!("NATIVE_FILTER-1"));
        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back["positions"], json!({}));
        assert_eq!(back["label_colors"]["a"], json!("#111111"));
    }
}
