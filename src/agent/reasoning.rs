//! Per-invocation reasoning trace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline action recorded in a reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningAction {
    AnalyzeSchema,
    ListTables,
    AnalyzeQuestion,
    GenerateSql,
    ValidateSql,
    PreflightCheck,
    FixViaPreflight,
    ExecuteQuery,
    FixAndRetry,
    GenerateAnswer,
}

impl ReasoningAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeSchema => "analyze_schema",
            Self::ListTables => "list_tables",
            Self::AnalyzeQuestion => "analyze_question",
            Self::GenerateSql => "generate_sql",
            Self::ValidateSql => "validate_sql",
            Self::PreflightCheck => "preflight_check",
            Self::FixViaPreflight => "fix_via_preflight",
            Self::ExecuteQuery => "execute_query",
            Self::FixAndRetry => "fix_and_retry",
            Self::GenerateAnswer => "generate_answer",
        }
    }
}

impl fmt::Display for ReasoningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic record of a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 1-based, monotonic across the whole invocation
    pub step: usize,
    pub action: ReasoningAction,
    pub observation: String,
    pub thought: String,
}

/// Ordered steps for one invocation. Numbering is assigned on record.
#[derive(Debug, Clone, Default)]
pub struct ReasoningTrace {
    steps: Vec<ReasoningStep>,
}

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action: ReasoningAction,
        observation: impl Into<String>,
        thought: impl Into<String>,
    ) {
        let step = self.steps.len() + 1;
        self.steps.push(ReasoningStep {
            step,
            action,
            observation: observation.into(),
            thought: thought.into(),
        });
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ReasoningStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_numbered_in_order() {
        let mut trace = ReasoningTrace::new();
        trace.record(ReasoningAction::AnalyzeSchema, "Found 2 tables", "Reading schema");
        trace.record(ReasoningAction::GenerateSql, "SELECT 1;", "Generated SQL");
        trace.record(ReasoningAction::ExecuteQuery, "Retrieved 1 rows", "Executed");

        let numbers: Vec<usize> = trace.steps().iter().map(|s| s.step).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(trace.steps()[1].action, ReasoningAction::GenerateSql);
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&ReasoningAction::FixViaPreflight).unwrap();
        assert_eq!(json, r#""fix_via_preflight""#);
        assert_eq!(ReasoningAction::FixAndRetry.to_string(), "fix_and_retry");
    }
}
