//! Lazily populated schema snapshot.

use crate::db::DatabasePort;
use crate::schema::SchemaSnapshot;
use crate::types::{AgentError, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Memoized schema snapshot.
///
/// Holds at most one snapshot behind an `Arc`. Readers clone the `Arc`, so a
/// refresh swaps the whole value and nobody observes a partial update.
/// Introspection failures are not retried.
#[derive(Debug, Default)]
pub struct SchemaCache {
    snapshot: Option<Arc<SchemaSnapshot>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot, if already loaded.
    pub fn cached(&self) -> Option<Arc<SchemaSnapshot>> {
        self.snapshot.clone()
    }

    /// Return the cached snapshot, introspecting on first use.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::SchemaUnavailable` if introspection fails
    pub async fn get(&mut self, db: &dyn DatabasePort) -> Result<Arc<SchemaSnapshot>> {
        if let Some(snapshot) = &self.snapshot {
            debug!(tables = snapshot.tables().len(), "Schema cache hit");
            return Ok(snapshot.clone());
        }
        self.refresh(db).await
    }

    /// Force introspection and replace the cached snapshot.
    ///
    /// On failure the previous snapshot (if any) is kept.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::SchemaUnavailable` if introspection fails
    pub async fn refresh(&mut self, db: &dyn DatabasePort) -> Result<Arc<SchemaSnapshot>> {
        let snapshot = db.describe_schema().await.map_err(|e| match e {
            AgentError::SchemaUnavailable(_) => e,
            other => AgentError::schema(other.detail()),
        })?;

        let snapshot = Arc::new(snapshot);
        info!(
            tables = snapshot.tables().len(),
            relationships = snapshot.relationships().len(),
            "Schema snapshot loaded"
        );
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }
}
