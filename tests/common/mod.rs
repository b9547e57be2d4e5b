//! Scripted model and database ports for agent tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chatdb::db::{DatabasePort, QueryResult};
use chatdb::llm::LanguageModel;
use chatdb::schema::{ColumnDescriptor, SchemaSnapshot, TableDescriptor};
use chatdb::{AgentError, Result};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Model that replays canned responses in order and records every prompt.
///
/// `None` in the script (or running out of script) is a model failure.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responses: &[&str]) -> Self {
        Self::from_script(responses.iter().map(|r| Some(r.to_string())).collect())
    }

    pub fn from_script(script: Vec<Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Some(response)) => Ok(response),
            Some(None) => Err(AgentError::model("connection refused")),
            None => Err(AgentError::model("script exhausted")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Database with a fixed schema and per-statement failures.
pub struct ScriptedDb {
    schema: SchemaSnapshot,
    schema_fails: bool,
    preflight_errors: HashMap<String, String>,
    execute_errors: HashMap<String, String>,
    result: QueryResult,
    describe_calls: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl ScriptedDb {
    pub fn new(schema: SchemaSnapshot) -> Self {
        Self {
            schema,
            schema_fails: false,
            preflight_errors: HashMap::new(),
            execute_errors: HashMap::new(),
            result: sample_result(),
            describe_calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            schema_fails: true,
            ..Self::new(SchemaSnapshot::empty())
        }
    }

    pub fn fail_preflight(mut self, sql: &str, error: &str) -> Self {
        self.preflight_errors.insert(sql.to_string(), error.to_string());
        self
    }

    pub fn fail_execute(mut self, sql: &str, error: &str) -> Self {
        self.execute_errors.insert(sql.to_string(), error.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabasePort for ScriptedDb {
    async fn validate_structure(&self, sql: &str) -> Result<()> {
        match self.preflight_errors.get(sql) {
            Some(error) => Err(AgentError::StructuralError(error.clone())),
            None => Ok(()),
        }
    }

    async fn execute(&self, sql: &str, row_cap: usize) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(error) = self.execute_errors.get(sql) {
            return Err(AgentError::execution(error.clone()));
        }
        let rows = self.result.rows.iter().take(row_cap).cloned().collect();
        Ok(QueryResult::new(self.result.columns.clone(), rows))
    }

    async fn describe_schema(&self) -> Result<SchemaSnapshot> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.schema_fails {
            return Err(AgentError::schema("connection refused"));
        }
        Ok(self.schema.clone())
    }
}

/// `students` and `schools`, in that order.
pub fn school_schema() -> SchemaSnapshot {
    SchemaSnapshot::new(vec![
        TableDescriptor::new(
            "students",
            vec![
                ColumnDescriptor::new("id", "INTEGER").primary_key(),
                ColumnDescriptor::new("name", "TEXT").not_null(),
                ColumnDescriptor::new("school_id", "INTEGER").references("schools.id"),
            ],
        )
        .with_row_count(3),
        TableDescriptor::new(
            "schools",
            vec![
                ColumnDescriptor::new("id", "INTEGER").primary_key(),
                ColumnDescriptor::new("city", "TEXT"),
            ],
        )
        .with_row_count(2),
    ])
}

pub fn sample_result() -> QueryResult {
    let rows = ["Ana", "Budi", "Citra"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut row = Map::new();
            row.insert("id".into(), json!(i + 1));
            row.insert("name".into(), Value::String(name.to_string()));
            row
        })
        .collect();
    QueryResult::new(vec!["id".into(), "name".into()], rows)
}

/// SQLite seed used by the end-to-end tests.
pub const SCHOOL_SEED: &str = "
CREATE TABLE schools (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
CREATE TABLE students (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    grade INTEGER,
    school_id INTEGER REFERENCES schools(id)
);
INSERT INTO schools (id, name, city) VALUES (1, 'North High', 'Bandung'), (2, 'South High', 'Jakarta');
INSERT INTO students (name, grade, school_id) VALUES
    ('Ana', 10, 1), ('Budi', 11, 2), ('Citra', 12, 1), ('Dewi', 10, 2);
";
