//! Query orchestration agent.
//!
//! Turns a question into a checked SQL statement, runs it, and explains the
//! result:
//!
//! 1. Resolve the schema (cached; fatal on failure)
//! 2. Answer "list tables" questions straight from the schema
//! 3. Plan, then generate SQL (model failures are fatal)
//! 4. Safety gate (when validation is enabled)
//! 5. Structural preflight, with one repair attempt
//! 6. Execution, with one repair attempt
//! 7. Answer synthesis (falls back to a fixed message)
//! 8. Record the exchange in conversation history
//!
//! Statement-level failures come back as `PipelineResult { success: false }`;
//! only infrastructure faults are returned as `Err`.
//!
//! # Concurrency
//!
//! All mutable state (schema cache and history) sits behind one
//! `tokio::sync::Mutex` per agent. The lock is held while the schema loads
//! and for each history read or append, never across model calls.

pub mod history;
pub mod intent;
pub mod reasoning;
pub mod result;

pub use history::{ConversationHistory, ConversationTurn, Role};
pub use intent::SCHEMA_QUERY_MARKER;
pub use reasoning::{ReasoningAction, ReasoningStep, ReasoningTrace};
pub use result::PipelineResult;

use crate::config::AgentConfig;
use crate::db::{DatabasePort, QueryResult};
use crate::hint::{HintProvider, PatternHinter};
use crate::llm::LanguageModel;
use crate::prompt;
use crate::schema::{SchemaCache, SchemaSnapshot};
use crate::sql::{extract, SafetyGate, SafetyViolation};
use crate::telemetry::{llm_span, pipeline_span};
use crate::types::{AgentError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Answer used when the query succeeded but synthesis failed.
pub const FALLBACK_ANSWER: &str = "Query executed successfully. See results below.";

#[derive(Debug, Default)]
struct AgentState {
    schema: SchemaCache,
    history: ConversationHistory,
}

/// Database stage that gets one repair attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Preflight,
    Execute,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Execute => "execute",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Preflight => "SQL preflight failed",
            Self::Execute => "Query execution failed",
        }
    }

    fn check_action(&self) -> ReasoningAction {
        match self {
            Self::Preflight => ReasoningAction::PreflightCheck,
            Self::Execute => ReasoningAction::ExecuteQuery,
        }
    }

    fn repair_action(&self) -> ReasoningAction {
        match self {
            Self::Preflight => ReasoningAction::FixViaPreflight,
            Self::Execute => ReasoningAction::FixAndRetry,
        }
    }
}

/// Terminal state of a stage after at most one repair.
#[derive(Debug)]
enum StageOutcome {
    /// First attempt or repaired statement passed
    Passed {
        sql: String,
        results: Option<QueryResult>,
    },
    /// Repaired statement was refused by the safety gate; the error keeps
    /// the original failure and its hint
    Refused { sql: String, error: String },
    /// Rendered error for the original statement, with hint when one matched
    Failed { sql: String, error: String },
}

/// Orchestration engine. One per database connection.
pub struct Agent {
    llm: Arc<dyn LanguageModel>,
    db: Arc<dyn DatabasePort>,
    hinter: Arc<dyn HintProvider>,
    config: AgentConfig,
    gate: SafetyGate,
    state: Mutex<AgentState>,
}

impl Agent {
    /// Create an agent over shared model and database ports.
    pub fn new(llm: Arc<dyn LanguageModel>, db: Arc<dyn DatabasePort>, config: AgentConfig) -> Self {
        let gate = SafetyGate::new(config.readonly_mode, config.parse_check);
        Self {
            llm,
            db,
            hinter: Arc::new(PatternHinter),
            config,
            gate,
            state: Mutex::new(AgentState::default()),
        }
    }

    /// Replace the hint provider.
    pub fn with_hinter(mut self, hinter: Arc<dyn HintProvider>) -> Self {
        self.hinter = hinter;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Cached schema, introspected on first use.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::SchemaUnavailable` if introspection fails
    pub async fn schema(&self) -> Result<Arc<SchemaSnapshot>> {
        let mut state = self.state.lock().await;
        state.schema.get(self.db.as_ref()).await
    }

    /// Re-introspect and replace the cached schema.
    pub async fn refresh_schema(&self) -> Result<Arc<SchemaSnapshot>> {
        let mut state = self.state.lock().await;
        state.schema.refresh(self.db.as_ref()).await
    }

    /// Copy of the conversation so far.
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.history.turns().to_vec()
    }

    pub async fn clear_history(&self) {
        self.state.lock().await.history.clear();
        info!("Conversation history cleared");
    }

    /// Answer a natural-language question.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for fatal faults: schema unavailable, or a model
    /// failure while planning or generating SQL. Safety violations and
    /// database errors that survive one repair are reported in the result.
    pub async fn process_query(&self, question: &str) -> Result<PipelineResult> {
        let request_id = Uuid::new_v4().to_string();
        let span = pipeline_span(&request_id, question);

        let result = self.run_pipeline(question).instrument(span.clone()).await;
        match &result {
            Ok(r) => {
                span.record("pipeline.success", r.success);
            }
            Err(e) => {
                span.record("pipeline.success", false);
                warn!(request_id = %request_id, error = %e, "Pipeline aborted");
            }
        }
        result
    }

    async fn run_pipeline(&self, question: &str) -> Result<PipelineResult> {
        info!("Processing question");
        let mut trace = ReasoningTrace::new();

        let schema = self.schema().await?;
        trace.record(
            ReasoningAction::AnalyzeSchema,
            format!("Found {} tables in database", schema.tables().len()),
            "Understanding database structure",
        );

        if intent::is_list_tables(question) {
            let names = schema.table_names();
            let answer = intent::list_tables_answer(&names, question);
            trace.record(
                ReasoningAction::ListTables,
                format!("Listed {} tables from schema", names.len()),
                "Answering from the cached schema without a query",
            );
            return Ok(PipelineResult::succeeded(
                answer,
                SCHEMA_QUERY_MARKER,
                None,
                trace.into_steps(),
            ));
        }

        // Plan
        let history = self.history().await;
        let plan = self
            .ask("plan", &prompt::planning(schema.summary(), question, &history))
            .await
            .map_err(|e| AgentError::model(format!("failed to generate plan: {}", e.detail())))?;
        debug!(plan = %plan, "Plan generated");
        trace.record(ReasoningAction::AnalyzeQuestion, plan.clone(), "Planning query approach");

        // Generate SQL
        let output = self
            .ask(
                "generate_sql",
                &prompt::sql_generation(schema.summary(), question, &plan, self.config.max_results),
            )
            .await
            .map_err(|e| AgentError::model(format!("failed to generate SQL: {}", e.detail())))?;
        let sql = extract(&output);
        info!(sql = %sql, "Generated SQL");
        trace.record(ReasoningAction::GenerateSql, sql.clone(), "Generated SQL query");

        // Safety gate
        if let Err(violation) = self.check_safety(&sql) {
            warn!(sql = %sql, violation = %violation, "SQL refused");
            return Ok(PipelineResult::failed(
                violation.to_string(),
                Some(sql),
                trace.into_steps(),
            ));
        }
        if self.config.enable_query_validation {
            trace.record(
                ReasoningAction::ValidateSql,
                "SQL validation passed",
                "Query is safe to execute",
            );
        }

        // Preflight
        let sql = match self
            .attempt(Stage::Preflight, &schema, question, sql, &mut trace)
            .await
        {
            StageOutcome::Passed { sql, .. } => sql,
            StageOutcome::Refused { sql, error } | StageOutcome::Failed { sql, error } => {
                return Ok(PipelineResult::failed(error, Some(sql), trace.into_steps()))
            }
        };

        // Execute
        let (sql, results) = match self
            .attempt(Stage::Execute, &schema, question, sql, &mut trace)
            .await
        {
            StageOutcome::Passed { sql, results } => (sql, results.unwrap_or_default()),
            StageOutcome::Refused { sql, error } | StageOutcome::Failed { sql, error } => {
                return Ok(PipelineResult::failed(error, Some(sql), trace.into_steps()))
            }
        };
        trace.record(
            ReasoningAction::ExecuteQuery,
            format!("Retrieved {} rows", results.row_count),
            "Query executed successfully",
        );

        // Synthesize
        let answer = match self
            .ask("answer", &prompt::answer(question, &sql, &results))
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer synthesis failed, using fallback");
                FALLBACK_ANSWER.to_string()
            }
        };
        trace.record(
            ReasoningAction::GenerateAnswer,
            answer.clone(),
            "Formulated natural language response",
        );

        // Commit
        self.state
            .lock()
            .await
            .history
            .push_exchange(question, answer.clone());

        info!(rows = results.row_count, "Question answered");
        Ok(PipelineResult::succeeded(answer, sql, Some(results), trace.into_steps()))
    }

    /// One model call under the shared system preamble.
    async fn ask(&self, stage: &str, prompt: &str) -> Result<String> {
        let span = llm_span(stage, self.llm.model_name());
        self.llm
            .complete(prompt, prompt::SYSTEM_PREAMBLE)
            .instrument(span)
            .await
    }

    fn check_safety(&self, sql: &str) -> std::result::Result<(), SafetyViolation> {
        if !self.config.enable_query_validation {
            return Ok(());
        }
        self.gate.check(sql)
    }

    async fn run_stage(&self, stage: Stage, sql: &str) -> Result<Option<QueryResult>> {
        match stage {
            Stage::Preflight => self.db.validate_structure(sql).await.map(|_| None),
            Stage::Execute => self
                .db
                .execute(sql, self.config.max_results)
                .await
                .map(Some),
        }
    }

    /// Run a stage, repairing a failed statement at most once.
    ///
    /// Attempt, then on failure: repair, re-check safety, attempt once more.
    /// The hint is always computed from the first failure.
    async fn attempt(
        &self,
        stage: Stage,
        schema: &SchemaSnapshot,
        question: &str,
        sql: String,
        trace: &mut ReasoningTrace,
    ) -> StageOutcome {
        let first = self.run_stage(stage, &sql).await;
        let detail = match first {
            Ok(results) => {
                if stage == Stage::Preflight {
                    trace.record(
                        ReasoningAction::PreflightCheck,
                        "Structural validation passed",
                        "Statement references valid tables and columns",
                    );
                }
                return StageOutcome::Passed { sql, results };
            }
            Err(e) => e.detail(),
        };

        warn!(stage = stage.as_str(), error = %detail, "Statement failed, attempting repair");
        trace.record(
            stage.check_action(),
            detail.clone(),
            "Statement failed, asking the model for one repair",
        );

        let mut retry_detail = None;
        if let Some(fixed) = self.repair(schema, question, &sql, &detail).await {
            if let Err(violation) = self.check_safety(&fixed) {
                warn!(sql = %fixed, violation = %violation, "Repaired SQL refused");
                let failure = self.failure_message(stage, schema, &sql, &detail, None);
                return StageOutcome::Refused {
                    sql: fixed,
                    error: format!("{}\n{}", violation, failure),
                };
            }

            match self.run_stage(stage, &fixed).await {
                Ok(results) => {
                    info!(stage = stage.as_str(), sql = %fixed, "Repaired SQL passed");
                    trace.record(
                        stage.repair_action(),
                        format!("Repaired SQL passed {}: {}", stage.as_str(), fixed),
                        "Corrected the statement using the database error",
                    );
                    return StageOutcome::Passed { sql: fixed, results };
                }
                Err(e) => {
                    warn!(stage = stage.as_str(), error = %e, "Repaired SQL failed");
                    retry_detail = Some(e.detail());
                }
            }
        }

        let error = self.failure_message(stage, schema, &sql, &detail, retry_detail.as_deref());
        StageOutcome::Failed { sql, error }
    }

    /// `<prefix>: <detail>`, the retry failure if any, then the hint for the
    /// original statement.
    fn failure_message(
        &self,
        stage: Stage,
        schema: &SchemaSnapshot,
        sql: &str,
        detail: &str,
        retry: Option<&str>,
    ) -> String {
        let mut message = format!("{}: {}", stage.failure_prefix(), detail);
        if let Some(retry) = retry {
            message.push_str(&format!("\nRepaired SQL also failed: {}", retry));
        }
        if let Some(hint) = self.hinter.hint(sql, detail, schema) {
            message.push_str("\n\n");
            message.push_str(&hint);
        }
        message
    }

    /// Ask the model to fix a failed statement.
    ///
    /// `None` when the call fails or the result is empty or unchanged.
    async fn repair(
        &self,
        schema: &SchemaSnapshot,
        question: &str,
        sql: &str,
        error: &str,
    ) -> Option<String> {
        let output = match self
            .ask("repair", &prompt::repair(schema.summary(), question, sql, error))
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Repair call failed");
                return None;
            }
        };

        let fixed = extract(&output);
        if fixed.is_empty() || fixed == sql {
            debug!(sql = %fixed, "Repair produced no usable change");
            return None;
        }
        Some(fixed)
    }
}
