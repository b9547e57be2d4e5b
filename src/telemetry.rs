//! Tracing setup and span helpers.
//!
//! Span attributes follow the OpenTelemetry semantic conventions for
//! database client spans:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//!
//! **Span naming**: `{db.operation.name} {target}`
//! - Example: `execute sqlite`, `describe sqlite`
//!
//! Model calls get a `gen_ai` span carrying the pipeline stage and model name.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatdb::telemetry::{db_query_span, DbOperation};
//!
//! let result = run_statement()
//!     .instrument(db_query_span(DbOperation::Execute, "SELECT * FROM students;"))
//!     .await?;
//! ```

use tracing::{field, span, Level, Span};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "chatdb=info";

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; falls back to [`DEFAULT_FILTER`]. Calling this twice
/// is harmless (the second install is ignored).
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Database operation types (maps to `db.operation.name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOperation {
    /// Schema introspection
    Describe,
    /// Structural dry run
    Validate,
    /// Statement execution
    Execute,
}

impl DbOperation {
    /// Get operation name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Describe => "describe",
            Self::Validate => "validate",
            Self::Execute => "execute",
        }
    }
}

/// Create database query span.
///
/// # Arguments
///
/// * `operation` - Database operation type
/// * `query_text` - SQL text (empty for introspection)
pub fn db_query_span(operation: DbOperation, query_text: &str) -> Span {
    span!(
        Level::INFO,
        "db.query",
        otel.name = %format!("{} sqlite", operation.as_str()),
        otel.kind = "client",
        db.system.name = "sqlite",
        db.operation.name = operation.as_str(),
        db.query.text = query_text,
        db.response.returned_rows = field::Empty,
    )
}

/// Record returned row count on a database span.
pub fn record_db_metrics(span: &Span, rows_returned: usize) {
    span.record("db.response.returned_rows", rows_returned);
}

/// Create a span for one language model call.
///
/// # Arguments
///
/// * `stage` - Pipeline stage issuing the call (`plan`, `generate_sql`, ...)
/// * `model` - Model name
pub fn llm_span(stage: &str, model: &str) -> Span {
    span!(
        Level::INFO,
        "gen_ai.request",
        otel.kind = "client",
        gen_ai.operation.name = "text_completion",
        gen_ai.request.model = model,
        chatdb.stage = stage,
    )
}

/// Create the root span for one pipeline invocation.
pub fn pipeline_span(request_id: &str, question: &str) -> Span {
    span!(
        Level::INFO,
        "pipeline",
        otel.kind = "internal",
        request.id = request_id,
        question = question,
        pipeline.success = field::Empty,
    )
}
