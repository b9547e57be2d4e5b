//! Caller-facing pipeline result.

use crate::agent::reasoning::ReasoningStep;
use crate::db::QueryResult;
use serde::{Deserialize, Serialize};

/// Outcome of one pipeline invocation.
///
/// Either a success carrying an answer (and usually results), or a reported
/// failure carrying an error. `reasoning` is always serialized, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,

    pub answer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<QueryResult>,

    #[serde(default)]
    pub reasoning: Vec<ReasoningStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    /// Successful invocation.
    pub fn succeeded(
        answer: impl Into<String>,
        sql: impl Into<String>,
        results: Option<QueryResult>,
        reasoning: Vec<ReasoningStep>,
    ) -> Self {
        Self {
            success: true,
            answer: Some(answer.into()),
            sql: Some(sql.into()),
            results,
            reasoning,
            error: None,
        }
    }

    /// Reported failure. `sql` is the statement that was rejected, if any.
    pub fn failed(error: impl Into<String>, sql: Option<String>, reasoning: Vec<ReasoningStep>) -> Self {
        Self {
            success: false,
            answer: None,
            sql,
            results: None,
            reasoning,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_failure_serialization_omits_results() {
        let result = PipelineResult::failed("Only read-only queries are allowed in readonly mode", None, vec![]);
        let json: Value = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert!(json["answer"].is_null());
        assert!(json.get("sql").is_none());
        assert!(json.get("results").is_none());
        assert_eq!(json["reasoning"], Value::Array(vec![]));
        assert!(json["error"].as_str().unwrap().contains("read-only"));
    }

    #[test]
    fn test_success_serialization_omits_error() {
        let results = QueryResult::new(vec!["n".into()], vec![]);
        let result = PipelineResult::succeeded("none", "SELECT 1;", Some(results), vec![]);
        let json: Value = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["sql"], "SELECT 1;");
        assert_eq!(json["results"]["row_count"], 0);
        assert!(json.get("error").is_none());
    }
}
