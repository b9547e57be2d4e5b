//! HTTP API.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Liveness
//! - `POST /api/query` - Answer a question (`{"question": "..."}`)
//! - `GET /api/schema` - Cached schema snapshot
//! - `POST /api/schema/refresh` - Re-introspect the schema
//! - `GET /api/tables` - Table names
//! - `GET /api/tables/:table` - One table's columns
//! - `GET /api/history` - Conversation so far
//! - `POST /api/history/clear` - Forget the conversation
//!
//! Reported pipeline failures are `200` with `success: false`; fatal faults
//! are `500` with `{"error": ...}`. Statement-level port errors that escape a
//! handler map to `422`.

use crate::agent::{Agent, ConversationTurn, PipelineResult};
use crate::schema::{SchemaSnapshot, TableDescriptor};
use crate::types::{AgentError, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

/// Request body for `POST /api/query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Error response with an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        let status = match err {
            AgentError::TableNotFound(_) => StatusCode::NOT_FOUND,
            ref e if !e.is_fatal() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "Request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/query", post(query))
        .route("/api/schema", get(schema))
        .route("/api/schema/refresh", post(refresh_schema))
        .route("/api/tables", get(list_tables))
        .route("/api/tables/:table", get(table_info))
        .route("/api/history", get(history))
        .route("/api/history/clear", post(clear_history))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
///
/// # Errors
///
/// Returns `AgentError::IoError` if the address cannot be bound
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api/query
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> std::result::Result<Json<PipelineResult>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("question must not be empty"));
    }
    let result = state.agent.process_query(question).await?;
    Ok(Json(result))
}

/// GET /api/schema
async fn schema(State(state): State<AppState>) -> std::result::Result<Json<SchemaSnapshot>, ApiError> {
    let snapshot = state.agent.schema().await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// POST /api/schema/refresh
async fn refresh_schema(State(state): State<AppState>) -> std::result::Result<Json<SchemaSnapshot>, ApiError> {
    let snapshot = state.agent.refresh_schema().await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// GET /api/tables
async fn list_tables(State(state): State<AppState>) -> std::result::Result<Json<TablesResponse>, ApiError> {
    let snapshot = state.agent.schema().await?;
    let tables = snapshot.table_names().into_iter().map(str::to_string).collect();
    Ok(Json(TablesResponse { tables }))
}

/// GET /api/tables/:table
async fn table_info(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> std::result::Result<Json<TableDescriptor>, ApiError> {
    let snapshot = state.agent.schema().await?;
    let descriptor = snapshot
        .table(&table)
        .cloned()
        .ok_or(AgentError::TableNotFound(table))?;
    Ok(Json(descriptor))
}

/// GET /api/history
async fn history(State(state): State<AppState>) -> Json<Vec<ConversationTurn>> {
    Json(state.agent.history().await)
}

/// POST /api/history/clear
async fn clear_history(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.agent.clear_history().await;
    Json(json!({ "status": "cleared" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AgentError::TableNotFound("t".into()), StatusCode::NOT_FOUND),
            (AgentError::execution("no such column: x"), StatusCode::UNPROCESSABLE_ENTITY),
            (AgentError::StructuralError("near \"FORM\"".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AgentError::model("timeout"), StatusCode::INTERNAL_SERVER_ERROR),
            (AgentError::schema("locked"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let message = err.to_string();
            let api = ApiError::from(err);
            assert_eq!(api.status, expected, "error: {message}");
            assert_eq!(api.message, message);
        }
    }
}
