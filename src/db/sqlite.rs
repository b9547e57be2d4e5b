//! SQLite adapter for the database port.
//!
//! The `rusqlite` connection is synchronous, so every operation runs on the
//! blocking thread pool behind a mutex.

use crate::db::{DatabasePort, QueryResult};
use crate::schema::{ColumnDescriptor, SchemaSnapshot, TableDescriptor};
use crate::telemetry::{db_query_span, record_db_metrics, DbOperation};
use crate::types::{AgentError, Result};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn, Instrument};

/// SQLite-backed `DatabasePort`.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open (or create) a database file. `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::DatabaseError` if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AgentError::InternalError("SQLite connection mutex poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AgentError::InternalError(format!("Blocking task failed: {}", e)))?
    }

    /// Apply a batch of statements (DDL, seed data).
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| Ok(conn.execute_batch(&sql)?)).await
    }

    /// User table names, ordered by name.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| list_tables(conn)).await
    }

    /// Describe a single table.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::TableNotFound` if the table has no columns
    pub async fn table_info(&self, table: &str) -> Result<TableDescriptor> {
        let table = table.to_string();
        self.with_conn(move |conn| table_info(conn, &table)).await
    }
}

#[async_trait]
impl DatabasePort for SqliteDatabase {
    async fn validate_structure(&self, sql: &str) -> Result<()> {
        let statement = strip_terminator(sql).to_string();
        self.with_conn(move |conn| {
            conn.prepare(&format!("EXPLAIN {}", statement))
                .map(|_| ())
                .map_err(|e| AgentError::StructuralError(driver_message(&e)))
        })
        .instrument(db_query_span(DbOperation::Validate, sql))
        .await
    }

    async fn execute(&self, sql: &str, row_cap: usize) -> Result<QueryResult> {
        let span = db_query_span(DbOperation::Execute, sql);
        let statement = apply_row_cap(sql, row_cap);
        debug!(sql = %statement, "Executing statement");

        let result = self
            .with_conn(move |conn| {
                run_query(conn, &statement, row_cap)
                    .map_err(|e| AgentError::execution(driver_message(&e)))
            })
            .instrument(span.clone())
            .await?;

        record_db_metrics(&span, result.row_count);
        Ok(result)
    }

    async fn describe_schema(&self) -> Result<SchemaSnapshot> {
        self.with_conn(|conn| {
            let names = list_tables(conn).map_err(|e| AgentError::schema(e.detail()))?;
            let mut tables = Vec::with_capacity(names.len());
            for name in names {
                match table_info(conn, &name) {
                    Ok(table) => tables.push(table),
                    Err(e) => warn!(table = %name, error = %e, "Skipping unreadable table"),
                }
            }
            Ok(SchemaSnapshot::new(tables))
        })
        .instrument(db_query_span(DbOperation::Describe, ""))
        .await
    }
}

fn driver_message(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
        other => other.to_string(),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn strip_terminator(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Append `LIMIT <cap>` to row-producing statements that have none.
fn apply_row_cap(sql: &str, row_cap: usize) -> String {
    let statement = strip_terminator(sql);
    let upper = statement.to_uppercase();
    let produces_rows = upper.starts_with("SELECT") || upper.starts_with("WITH");

    if row_cap > 0 && produces_rows && !upper.contains("LIMIT") {
        format!("{} LIMIT {};", statement, row_cap)
    } else {
        format!("{};", statement)
    }
}

fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

fn table_info(conn: &Connection, table: &str) -> Result<TableDescriptor> {
    let quoted = quote_ident(table);

    let mut fk_stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", quoted))?;
    let foreign_keys: HashMap<String, String> = fk_stmt
        .query_map([], |row| {
            let target_table: String = row.get(2)?;
            let from: String = row.get(3)?;
            let to: Option<String> = row.get(4)?;
            Ok((from, target_table, to))
        })?
        .filter_map(|r| r.ok())
        .filter_map(|(from, target_table, to)| to.map(|to| (from, format!("{}.{}", target_table, to))))
        .collect();

    let mut col_stmt = conn.prepare(&format!("PRAGMA table_info({})", quoted))?;
    let columns = col_stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let data_type: String = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let pk: i64 = row.get(5)?;
            Ok(ColumnDescriptor {
                foreign_key: foreign_keys.get(&name).cloned(),
                name,
                data_type,
                nullable: not_null == 0 && pk == 0,
                primary_key: pk > 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(AgentError::TableNotFound(table.to_string()));
    }

    let row_count = conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| row.get::<_, i64>(0))
        .unwrap_or(0);

    Ok(TableDescriptor {
        name: table.to_string(),
        columns,
        row_count,
    })
}

fn run_query(conn: &Connection, sql: &str, row_cap: usize) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(strip_terminator(sql))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        if row_cap > 0 && rows.len() >= row_cap {
            break;
        }
        let mut map = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            map.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        rows.push(map);
    }

    Ok(QueryResult::new(columns, rows))
}

/// Convert a SQLite value to JSON; blobs become lossy UTF-8 text.
fn to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            JsonValue::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
