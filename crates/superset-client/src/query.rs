//! List query filters (the `q` parameter of list endpoints).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One `{col, opr, value}` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Column name.
    pub col: String,
    /// Operator (`eq`, `ct`, `sw`, `rel_o_m`, ...).
    pub opr: String,
    /// Operand.
    pub value: Value,
}

impl QueryFilter {
    /// Filter `col <opr> value`.
    #[must_use]
    pub fn new(col: impl Into<String>, opr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            col: col.into(),
            opr: opr.into(),
            value: value.into(),
        }
    }

    /// Equality filter.
    #[must_use]
    pub fn eq(col: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(col, "eq", value)
    }

    /// Substring filter.
    #[must_use]
    pub fn contains(col: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(col, "ct", value.into())
    }
}

/// Filters, selected columns and paging of a list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Filters, all of which must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<QueryFilter>,
    /// Columns to return; all when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Zero-based page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Query {
    /// Query with no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(self, col: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(QueryFilter::eq(col, value))
    }

    /// Restrict the returned columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Select a page.
    #[must_use]
    pub const fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    /// Encode for the `q` query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::Serialization`] if the filters cannot
    /// be encoded.
    pub fn to_param(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_wire_shape() {
        let filter = QueryFilter::eq("slice_name", "Revenue");
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"col": "slice_name", "opr": "eq", "value": "Revenue"})
        );
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(Query::new().to_param().unwrap(), "{}");
    }

    #[test]
    fn test_query_param() {
        let query = Query::new()
            .eq("database", 3)
            .filter(QueryFilter::contains("table_name", "orders"))
            .columns(["id", "table_name"])
            .page(2, 50);
        let value: Value = serde_json::from_str(&query.to_param().unwrap()).unwrap();
        assert_eq!(value["filters"][0], json!({"col": "database", "opr": "eq", "value": 3}));
        assert_eq!(value["filters"][1]["opr"], json!("ct"));
        assert_eq!(value["columns"], json!(["id", "table_name"]));
        assert_eq!(value["page"], json!(2));
        assert_eq!(value["page_size"], json!(50));
    }
}
