//! Charts (slices).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::{ClientError, Result};
use crate::json_field;
use crate::query::Query;
use crate::resource::{Factory, Resource, decode_result, encode_payload};

/// Datasource type of charts built on a dataset.
pub const DATASOURCE_TABLE: &str = "table";

fn default_datasource_type() -> String {
    DATASOURCE_TABLE.to_string()
}

/// A saved chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    /// Remote id.
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    /// Chart name.
    #[serde(default)]
    pub slice_name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Visualization type (`table`, `pie`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz_type: Option<String>,
    /// Dataset id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource_id: Option<i64>,
    /// Dataset type.
    #[serde(default = "default_datasource_type")]
    pub datasource_type: String,
    /// Form data, a JSON string on the wire.
    #[serde(default, with = "json_field::string")]
    pub params: Map<String, Value>,
    /// Cache timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_timeout: Option<i64>,
    /// Ids of the dashboards showing the chart.
    #[serde(default, deserialize_with = "json_field::ids")]
    pub dashboards: Vec<i64>,
    /// Title shown on dashboards instead of the slice name.
    #[serde(skip)]
    pub title_override: Option<String>,
}

impl Chart {
    /// Unsaved chart over the dataset `datasource_id`.
    #[must_use]
    pub fn new(slice_name: impl Into<String>, datasource_id: i64) -> Self {
        Self {
            id: None,
            slice_name: slice_name.into(),
            description: None,
            viz_type: None,
            datasource_id: Some(datasource_id),
            datasource_type: default_datasource_type(),
            params: Map::new(),
            cache_timeout: None,
            dashboards: Vec::new(),
            title_override: None,
        }
    }

    /// Set the visualization type.
    #[must_use]
    pub fn with_viz_type(mut self, viz_type: impl Into<String>) -> Self {
        let viz_type = viz_type.into();
        self.params
            .insert("viz_type".to_string(), Value::String(viz_type.clone()));
        self.viz_type = Some(viz_type);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a form-data parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Title to show on dashboards.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title_override = Some(title.into());
        self
    }

    /// `"{id}__{type}"` datasource reference used in form data.
    #[must_use]
    pub fn datasource(&self) -> Option<String> {
        self.datasource_id
            .map(|id| format!("{id}__{}", self.datasource_type))
    }

    /// Unsaved copy named `slice_name`, detached from every dashboard.
    #[must_use]
    pub fn duplicate(&self, slice_name: impl Into<String>) -> Self {
        Self {
            id: None,
            slice_name: slice_name.into(),
            dashboards: Vec::new(),
            ..self.clone()
        }
    }
}

impl Resource for Chart {
    const ENDPOINT: &'static str = "chart/";
    const KIND: &'static str = "chart";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_result(value: Value) -> Result<Self> {
        decode_result(value)
    }

    fn to_payload(&self) -> Result<Value> {
        let mut chart = self.clone();
        if let Some(datasource) = self.datasource() {
            chart
                .params
                .entry("datasource")
                .or_insert(Value::String(datasource));
        }
        encode_payload(&chart)
    }

    fn validate(&self) -> Result<()> {
        if self.slice_name.trim().is_empty() {
            return Err(ClientError::Precondition("chart has no slice name".to_string()));
        }
        if self.id.is_none() && self.datasource_id.is_none() {
            return Err(ClientError::Precondition(
                "a new chart needs a datasource id, look the dataset up by name".to_string(),
            ));
        }
        Ok(())
    }
}

/// Access to charts.
pub type Charts = Factory<Chart>;

impl Charts {
    /// The chart called `slice_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] or [`ClientError::MultipleFound`].
    pub fn by_name(&self, slice_name: &str) -> Result<Chart> {
        self.find_one(&Query::new().eq("slice_name", slice_name))
    }

    /// Associate chart `chart_id` with dashboard `dashboard_id`.
    ///
    /// Existing associations are kept. Returns the chart's dashboard ids.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if either request fails.
    pub fn link_dashboard(&self, chart_id: i64, dashboard_id: i64) -> Result<Vec<i64>> {
        let chart = self.get(chart_id)?;
        let mut dashboards = chart.dashboards;
        if dashboards.contains(&dashboard_id) {
            return Ok(dashboards);
        }
        dashboards.push(dashboard_id);
        self.transport()
            .put(&self.object_path(chart_id), json!({ "dashboards": dashboards }))?;
        info!(chart_id, dashboard_id, "chart linked to dashboard");
        Ok(dashboards)
    }
}
