//! Database connections and SQL Lab execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::Result;
use crate::json_field;
use crate::resource::{Factory, Resource, decode_result, encode_payload};

/// A database connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Remote id.
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    /// Display name.
    pub database_name: String,
    /// `SQLAlchemy` URI. The server masks the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlalchemy_uri: Option<String>,
    /// Whether SQL Lab may query it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_in_sqllab: Option<bool>,
    /// CREATE TABLE AS allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ctas: Option<bool>,
    /// CREATE VIEW AS allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_cvas: Option<bool>,
    /// DML allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_dml: Option<bool>,
    /// Async query execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_run_async: Option<bool>,
    /// Engine-specific settings, a JSON string on the wire.
    #[serde(default, with = "json_field::string")]
    pub extra: Map<String, Value>,
}

impl Database {
    /// Unsaved connection.
    #[must_use]
    pub fn new(database_name: impl Into<String>, sqlalchemy_uri: impl Into<String>) -> Self {
        Self {
            id: None,
            database_name: database_name.into(),
            sqlalchemy_uri: Some(sqlalchemy_uri.into()),
            expose_in_sqllab: None,
            allow_ctas: None,
            allow_cvas: None,
            allow_dml: None,
            allow_run_async: None,
            extra: Map::new(),
        }
    }
}

impl Resource for Database {
    const ENDPOINT: &'static str = "database/";
    const KIND: &'static str = "database";

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

/// Access to database connections.
pub type Databases = Factory<Database>;

impl Databases {
    /// Run `sql` synchronously in SQL Lab and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::Api`] when the query fails.
    pub fn run(&self, database_id: i64, sql: &str, schema: Option<&str>) -> Result<Value> {
        let mut body = json!({
            "database_id": database_id,
            "sql": sql,
            "runAsync": false,
        });
        if let Some(schema) = schema {
            body["schema"] = Value::String(schema.to_string());
        }
        debug!(database_id, "executing sql");
        self.transport().post("sqllab/execute/", body)?.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::transport::HttpMethod;
    use std::sync::Arc;

    #[test]
    fn test_decode_extra_string() {
        let db = Database::from_result(json!({
            "id": 1,
            "database_name": "examples",
            "extra": "{\"allows_virtual_table_explore\": true}",
            "expose_in_sqllab": true,
            "backend": "postgresql"
        }))
        .unwrap();
        assert_eq!(db.extra["allows_virtual_table_explore"], json!(true));
        assert_eq!(db.expose_in_sqllab, Some(true));
    }

    #[test]
    fn test_run_posts_query() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            HttpMethod::Post,
            "sqllab/execute",
            200,
            json!({"status": "success", "data": [{"n": 1}]}),
        );
        let databases = Databases::new(mock.clone(), 100);
        let result = databases.run(1, "select 1 as n", Some("public")).unwrap();
        assert_eq!(result["data"][0]["n"], json!(1));

        let body = mock.last_request().unwrap().body.unwrap();
        assert_eq!(body["database_id"], json!(1));
        assert_eq!(body["schema"], json!("public"));
    }

    #[test]
    fn test_run_surfaces_errors() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            HttpMethod::Post,
            "sqllab/execute",
            400,
            json!({"errors": [{"message": "syntax error"}]}),
        );
        let err = Databases::new(mock, 100).run(1, "selec", None).unwrap_err();
        assert_eq!(err.status(), Some(400));
    }
}
