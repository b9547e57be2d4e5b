//! Keyword-based safety gate for generated SQL.
//!
//! Two checks, both dialect-agnostic string heuristics:
//!
//! - [`classify`]: denylist of schema-mutating / data-destroying statement
//!   forms, matched case-insensitively anywhere in the statement. Matching is
//!   by substring, so a read-only statement that merely mentions a forbidden
//!   phrase (inside a string literal, say) is also rejected.
//! - [`is_read_only`]: the first token must be one of [`READ_ONLY_KEYWORDS`].
//!   `WITH` is not in the set, so CTE-led queries are not considered read-only,
//!   and a nested mutating clause behind a read-only keyword is not detected.
//!
//! Neither is a parser. [`SafetyGate`] can add an optional `sqlparser` pass
//! on top of the keyword gate.

use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::fmt;

/// Statement forms rejected outright.
pub const DENYLIST: &[&str] = &[
    "DROP TABLE",
    "DROP DATABASE",
    "DROP SCHEMA",
    "DROP VIEW",
    "DROP INDEX",
    "TRUNCATE",
    "ALTER TABLE",
    "ALTER DATABASE",
    "CREATE TABLE",
    "CREATE DATABASE",
];

/// Leading keywords accepted in read-only mode.
pub const READ_ONLY_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "EXPLAIN"];

/// Keyword gate verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Contains a denylisted form
    Forbidden(&'static str),
    Allowed,
}

impl Classification {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

/// Classify a statement against the denylist.
///
/// Whitespace runs are collapsed before matching, so `drop\n  table` is
/// caught the same as `DROP TABLE`.
pub fn classify(sql: &str) -> Classification {
    let normalized = sql
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    DENYLIST
        .iter()
        .copied()
        .find(|pattern| normalized.contains(pattern))
        .map(Classification::Forbidden)
        .unwrap_or(Classification::Allowed)
}

/// Leading keyword of a statement, uppercased.
pub fn leading_keyword(sql: &str) -> String {
    sql.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

/// Check whether the first token is a read-only keyword.
///
/// # Examples
///
/// - `"  select 1;"` → true
/// - `"DELETE FROM t;"` → false
/// - `"WITH x AS (SELECT 1) SELECT * FROM x;"` → false
pub fn is_read_only(sql: &str) -> bool {
    let keyword = leading_keyword(sql);
    READ_ONLY_KEYWORDS.contains(&keyword.as_str())
}

/// Reason a statement was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    /// Denylisted pattern found
    Forbidden(String),
    /// Read-only mode and statement is not read-only
    NotReadOnly,
    /// Optional parser gate rejected the statement
    ParseRejected(String),
}

impl fmt::Display for SafetyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden(pattern) => write!(
                f,
                "SQL validation failed: potentially dangerous SQL pattern detected: {}",
                pattern
            ),
            Self::NotReadOnly => write!(f, "Only read-only queries are allowed in readonly mode"),
            Self::ParseRejected(detail) => write!(f, "SQL parse check failed: {}", detail),
        }
    }
}

/// Combined gate applied by the agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGate {
    readonly_mode: bool,
    parse_check: bool,
}

impl SafetyGate {
    pub fn new(readonly_mode: bool, parse_check: bool) -> Self {
        Self {
            readonly_mode,
            parse_check,
        }
    }

    /// Run the keyword gate, then the read-only check, then the optional parser gate.
    pub fn check(&self, sql: &str) -> std::result::Result<(), SafetyViolation> {
        if let Classification::Forbidden(pattern) = classify(sql) {
            return Err(SafetyViolation::Forbidden(pattern.to_string()));
        }

        if self.readonly_mode && !is_read_only(sql) {
            return Err(SafetyViolation::NotReadOnly);
        }

        if self.parse_check {
            parse_gate(sql, self.readonly_mode).map_err(SafetyViolation::ParseRejected)?;
        }

        Ok(())
    }
}

/// Parser-based second gate.
///
/// Requires exactly one statement; in read-only mode that statement must be a
/// query, `EXPLAIN` or `SHOW`.
fn parse_gate(sql: &str, readonly_mode: bool) -> std::result::Result<(), String> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| e.to_string())?;

    let [statement] = statements.as_slice() else {
        return Err(format!("expected exactly one statement, found {}", statements.len()));
    };

    if readonly_mode {
        let read_only = matches!(
            statement,
            Statement::Query(_)
                | Statement::Explain { .. }
                | Statement::ExplainTable { .. }
                | Statement::ShowTables { .. }
                | Statement::ShowColumns { .. }
        );
        if !read_only {
            return Err("statement is not a read-only query".to_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_denylist() {
        assert_eq!(classify("DROP TABLE students;"), Classification::Forbidden("DROP TABLE"));
        assert_eq!(classify("drop\n\t table students"), Classification::Forbidden("DROP TABLE"));
        assert_eq!(classify("truncate schools"), Classification::Forbidden("TRUNCATE"));
        assert_eq!(classify("SELECT * FROM students;"), Classification::Allowed);
        assert_eq!(classify("DELETE FROM students;"), Classification::Allowed);
    }

    #[test]
    fn test_classify_flags_mentions_in_literals() {
        let sql = "SELECT * FROM logs WHERE message = 'drop table happened';";
        assert!(classify(sql).is_forbidden());
    }

    #[test]
    fn test_is_read_only() {
        assert!(is_read_only("  select 1;"));
        assert!(is_read_only("SELECT*FROM t"));
        assert!(is_read_only("EXPLAIN SELECT 1"));
        assert!(is_read_only("show tables"));
        assert!(!is_read_only("DELETE FROM t;"));
        assert!(!is_read_only("WITH x AS (SELECT 1) SELECT * FROM x;"));
        assert!(!is_read_only("SELECTED"));
        assert!(!is_read_only(""));
    }

    #[test]
    fn test_gate_order_and_messages() {
        let gate = SafetyGate::new(true, false);
        let err = gate.check("DROP TABLE t;").unwrap_err();
        assert_eq!(
            err.to_string(),
            "SQL validation failed: potentially dangerous SQL pattern detected: DROP TABLE"
        );
        assert_eq!(gate.check("UPDATE t SET a = 1;"), Err(SafetyViolation::NotReadOnly));
        assert!(gate.check("SELECT 1;").is_ok());

        let permissive = SafetyGate::new(false, false);
        assert!(permissive.check("UPDATE t SET a = 1;").is_ok());
    }

    #[test]
    fn test_parse_gate() {
        let gate = SafetyGate::new(true, true);
        assert!(gate.check("SELECT id FROM students WHERE id = 1;").is_ok());
        assert!(matches!(
            gate.check("SELECT 1; DELETE FROM t;"),
            Err(SafetyViolation::ParseRejected(_))
        ));

        let lenient = SafetyGate::new(false, true);
        assert!(lenient.check("INSERT INTO t (a) VALUES (1);").is_ok());
        assert!(matches!(
            lenient.check("SELECT * FROM (;"),
            Err(SafetyViolation::ParseRejected(_))
        ));
    }
}
