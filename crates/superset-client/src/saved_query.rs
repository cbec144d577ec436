//! Saved SQL Lab queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::json_field;
use crate::resource::{Factory, Resource, decode_result, encode_payload};

/// A saved query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    /// Remote id.
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    /// Label.
    pub label: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// SQL text.
    #[serde(default)]
    pub sql: String,
    /// Database id. Read from the nested `database` object.
    #[serde(default, alias = "database", deserialize_with = "json_field::id")]
    pub db_id: Option<i64>,
    /// Schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl SavedQuery {
    /// Unsaved query against `db_id`.
    #[must_use]
    pub fn new(label: impl Into<String>, sql: impl Into<String>, db_id: i64) -> Self {
        Self {
            id: None,
            label: label.into(),
            description: None,
            sql: sql.into(),
            db_id: Some(db_id),
            schema: None,
        }
    }
}

impl Resource for SavedQuery {
    const ENDPOINT: &'static str = "saved_query/";
    const KIND: &'static str = "saved query";

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

/// Access to saved queries.
pub type SavedQueries = Factory<SavedQuery>;
