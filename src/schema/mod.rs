//! Normalized description of the connected database.
//!
//! A `SchemaSnapshot` is built once from table descriptors; relationships and
//! the human-readable summary are derived from the tables at construction and
//! never mutated afterwards. Refreshing replaces the whole snapshot.

pub mod cache;

pub use cache::SchemaCache;

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Declared type as reported by the database
    #[serde(rename = "type")]
    pub data_type: String,

    /// Whether NULL is allowed
    pub nullable: bool,

    /// Part of the primary key
    pub primary_key: bool,

    /// Foreign key target as `table.column`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl ColumnDescriptor {
    /// Nullable, non-key column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            foreign_key: None,
        }
    }

    /// Mark as primary key (implies NOT NULL).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set foreign key target (`table.column`).
    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.foreign_key = Some(target.into());
        self
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<ColumnDescriptor>,

    /// Advisory row count (0 when counting failed)
    pub row_count: i64,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
            row_count: 0,
        }
    }

    pub fn with_row_count(mut self, row_count: i64) -> Self {
        self.row_count = row_count;
        self
    }
}

/// Foreign key edge derived from a column's `foreign_key` target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Point-in-time schema description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    tables: Vec<TableDescriptor>,
    relationships: Vec<ForeignKeyEdge>,
    summary: String,
}

impl SchemaSnapshot {
    /// Build a snapshot, deriving relationships and summary from `tables`.
    ///
    /// Foreign key targets that are not exactly `table.column` are ignored
    /// for relationship purposes but still shown on the column.
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        let relationships = derive_relationships(&tables);
        let summary = render_summary(&tables, &relationships);
        Self {
            tables,
            relationships,
            summary,
        }
    }

    /// Empty database.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn relationships(&self) -> &[ForeignKeyEdge] {
        &self.relationships
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Table names in schema order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Every `(table, column)` pair in schema order.
    pub fn columns(&self) -> impl Iterator<Item = (&TableDescriptor, &ColumnDescriptor)> {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter().map(move |c| (t, c)))
    }
}

fn derive_relationships(tables: &[TableDescriptor]) -> Vec<ForeignKeyEdge> {
    let mut edges = Vec::new();
    for table in tables {
        for column in &table.columns {
            let Some(target) = column.foreign_key.as_deref() else {
                continue;
            };
            let parts: Vec<&str> = target.split('.').collect();
            if let [to_table, to_column] = parts.as_slice() {
                let edge = ForeignKeyEdge {
                    from_table: table.name.clone(),
                    from_column: column.name.clone(),
                    to_table: to_table.to_string(),
                    to_column: to_column.to_string(),
                };
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
    }
    edges
}

fn render_summary(tables: &[TableDescriptor], relationships: &[ForeignKeyEdge]) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Database contains {} tables:\n", tables.len());

    for table in tables {
        let _ = writeln!(out, "Table: {} ({} rows)", table.name, table.row_count);
        out.push_str("Columns:\n");
        for col in &table.columns {
            let mut markers = Vec::new();
            if col.primary_key {
                markers.push("PK".to_string());
            }
            if let Some(fk) = &col.foreign_key {
                markers.push(format!("FK->{}", fk));
            }
            if !col.nullable {
                markers.push("NOT NULL".to_string());
            }

            let marker_str = if markers.is_empty() {
                String::new()
            } else {
                format!(" [{}]", markers.join(", "))
            };
            let _ = writeln!(out, "  - {}: {}{}", col.name, col.data_type, marker_str);
        }
        out.push('\n');
    }

    if !relationships.is_empty() {
        let _ = writeln!(out, "Relationships ({}):", relationships.len());
        for rel in relationships {
            let _ = writeln!(
                out,
                "  - {}.{} -> {}.{}",
                rel.from_table, rel.from_column, rel.to_table, rel.to_column
            );
        }
    }

    out
}
