//! Database port.
//!
//! The agent only talks to storage through `DatabasePort`. Row values are
//! opaque JSON maps; adapters coerce binary payloads to text before handing
//! rows to the agent.

pub mod sqlite;

pub use sqlite::SqliteDatabase;

use crate::schema::SchemaSnapshot;
use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Materialized result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in select order
    pub columns: Vec<String>,

    /// One map per row, keyed by column name
    pub rows: Vec<Map<String, JsonValue>>,

    /// Number of rows returned
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Map<String, JsonValue>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    /// First `n` rows, for prompt previews.
    pub fn preview(&self, n: usize) -> &[Map<String, JsonValue>] {
        &self.rows[..self.rows.len().min(n)]
    }
}

/// Storage collaborator used by the agent.
///
/// Implementations enforce their own timeouts; a timed-out call is reported
/// as the error of the corresponding operation.
#[async_trait]
pub trait DatabasePort: Send + Sync {
    /// Dry-run a statement without materializing rows.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::StructuralError` carrying the driver message
    async fn validate_structure(&self, sql: &str) -> Result<()>;

    /// Execute a statement returning at most `row_cap` rows.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ExecutionError` carrying the driver message
    async fn execute(&self, sql: &str, row_cap: usize) -> Result<QueryResult>;

    /// Introspect tables, columns and foreign keys.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::SchemaUnavailable` if introspection fails
    async fn describe_schema(&self) -> Result<SchemaSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview_caps_rows() {
        let rows: Vec<Map<String, JsonValue>> = (0..8)
            .map(|i| {
                let mut row = Map::new();
                row.insert("n".into(), json!(i));
                row
            })
            .collect();
        let result = QueryResult::new(vec!["n".into()], rows);
        assert_eq!(result.row_count, 8);
        assert_eq!(result.preview(5).len(), 5);
        assert_eq!(result.preview(20).len(), 8);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(QueryResult::default()).unwrap();
        assert_eq!(value, json!({"columns": [], "rows": [], "row_count": 0}));
    }
}
