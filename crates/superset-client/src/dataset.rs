//! Datasets (physical tables and virtual SQL datasets).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::json_field;
use crate::query::Query;
use crate::resource::{Factory, Resource, decode_result, encode_payload};

/// A dataset charts are built on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Remote id.
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    /// Table name.
    pub table_name: String,
    /// Database id.
    #[serde(default, deserialize_with = "json_field::id")]
    pub database: Option<i64>,
    /// Schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// SQL of a virtual dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Column definitions as returned by the server.
    #[serde(default, skip_serializing)]
    pub columns: Vec<Value>,
}

impl Dataset {
    /// Unsaved dataset over `table_name` in `database`.
    #[must_use]
    pub fn new(table_name: impl Into<String>, database: i64) -> Self {
        Self {
            id: None,
            table_name: table_name.into(),
            database: Some(database),
            schema: None,
            sql: None,
            description: None,
            columns: Vec::new(),
        }
    }

    /// Set the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Make this a virtual dataset over `sql`.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Names of the dataset columns.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|c| c.get("column_name").and_then(Value::as_str))
            .collect()
    }
}

impl Resource for Dataset {
    const ENDPOINT: &'static str = "dataset/";
    const KIND: &'static str = "dataset";

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
        encode_payload(self)
    }
}

/// Access to datasets.
pub type Datasets = Factory<Dataset>;

impl Datasets {
    /// Id of the dataset over `table_name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::NotFound`] or
    /// [`crate::ClientError::MultipleFound`].
    pub fn id_by_name(&self, table_name: &str) -> Result<i64> {
        let query = Query::new()
            .eq("table_name", table_name)
            .columns(["id", "table_name"]);
        let dataset = self.find_one(&query)?;
        dataset
            .id
            .ok_or_else(|| crate::ClientError::NotFound(format!("dataset {table_name} has no id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::transport::HttpMethod;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_decode_nested_database() {
        let dataset = Dataset::from_result(json!({
            "id": 4,
            "table_name": "orders",
            "database": {"id": 1, "database_name": "examples"},
            "schema": "public",
            "columns": [{"column_name": "id"}, {"column_name": "total"}]
        }))
        .unwrap();
        assert_eq!(dataset.database, Some(1));
        assert_eq!(dataset.column_names(), vec!["id", "total"]);
    }

    #[test]
    fn test_payload() {
        let payload = Dataset::new("orders", 1)
            .with_schema("public")
            .to_payload()
            .unwrap();
        assert_eq!(payload, json!({"table_name": "orders", "database": 1, "schema": "public"}));
    }

    #[test]
    fn test_id_by_name() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            HttpMethod::Get,
            "dataset",
            200,
            json!({"count": 1, "result": [{"id": 9, "table_name": "orders"}]}),
        );
        assert_eq!(Datasets::new(mock, 100).id_by_name("orders").unwrap(), 9);
    }
}
