//! Schema-aware hints for reference errors.
//!
//! When the database rejects a statement because a column or table does not
//! exist, the missing identifier is matched against the cached schema to
//! propose what the model probably meant. Best effort only.

use crate::schema::SchemaSnapshot;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum edit distance for a non-substring candidate.
pub const MAX_DISTANCE: usize = 3;

/// Maximum number of suggestions rendered.
pub const MAX_SUGGESTIONS: usize = 5;

static MISSING_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)column\s+["'`]?([\w.]+)["'`]?\s+(?:does not exist|not found)|unknown column\s+["'`]?([\w.]+)|no such column:\s*["'`]?([\w.]+)"#,
    )
    .expect("valid column regex")
});

static MISSING_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:relation|table)\s+["'`]?([\w.]+)["'`]?\s+(?:does not exist|doesn't exist)|no such table:\s*["'`]?([\w.]+)"#,
    )
    .expect("valid table regex")
});

/// Source of hints for a failed statement.
///
/// The agent only depends on this trait so the error shapes can be extended,
/// or replaced by structured errors from the database, without touching the
/// pipeline.
pub trait HintProvider: Send + Sync {
    /// Suggest likely intended identifiers, or `None` when nothing useful matched.
    fn hint(&self, failing_sql: &str, error_message: &str, schema: &SchemaSnapshot) -> Option<String>;
}

/// Identifier the database reported as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReference {
    Column(String),
    Table(String),
}

impl MissingReference {
    /// Recognize a missing column or table in a driver error message.
    ///
    /// Understands the PostgreSQL, MySQL and SQLite phrasings.
    pub fn from_error(message: &str) -> Option<Self> {
        if let Some(ident) = first_capture(&MISSING_COLUMN, message) {
            return Some(Self::Column(ident));
        }
        first_capture(&MISSING_TABLE, message).map(Self::Table)
    }

    /// Trailing identifier with any `table.` qualifier removed.
    pub fn wanted(&self) -> &str {
        let ident = match self {
            Self::Column(s) | Self::Table(s) => s.as_str(),
        };
        ident.rsplit('.').next().unwrap_or(ident)
    }
}

fn first_capture(re: &Regex, message: &str) -> Option<String> {
    let caps = re.captures(message)?;
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .map(|m| m.as_str().to_string())
}

/// Default hint provider: regex shapes plus substring / edit-distance ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternHinter;

impl HintProvider for PatternHinter {
    fn hint(&self, _failing_sql: &str, error_message: &str, schema: &SchemaSnapshot) -> Option<String> {
        let suggestions = suggest(error_message, schema);
        if suggestions.is_empty() {
            return None;
        }
        let list = suggestions.join(", ");
        Some(format!(
            "Hint: did you mean {}? / Petunjuk: mungkin maksud Anda {}?",
            list, list
        ))
    }
}

/// Ranked suggestions for the identifier reported missing in `error_message`.
///
/// Names containing the wanted identifier, or that are a prefix of it, rank
/// at distance zero; other names within [`MAX_DISTANCE`] edits follow. Ties
/// keep schema order.
pub fn suggest(error_message: &str, schema: &SchemaSnapshot) -> Vec<String> {
    let Some(missing) = MissingReference::from_error(error_message) else {
        return Vec::new();
    };
    let wanted = missing.wanted().to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<(usize, String)> = match missing {
        MissingReference::Column(_) => schema
            .columns()
            .filter_map(|(table, column)| {
                score(&wanted, &column.name).map(|d| (d, format!("{}.{}", table.name, column.name)))
            })
            .collect(),
        MissingReference::Table(_) => schema
            .tables()
            .iter()
            .filter_map(|table| score(&wanted, &table.name).map(|d| (d, table.name.clone())))
            .collect(),
    };

    candidates.sort_by_key(|(distance, _)| *distance);
    candidates.truncate(MAX_SUGGESTIONS);
    candidates.into_iter().map(|(_, label)| label).collect()
}

fn score(wanted: &str, name: &str) -> Option<usize> {
    let name = name.to_lowercase();
    if name.is_empty() {
        return None;
    }
    if name.contains(wanted) || wanted.starts_with(&name) {
        return Some(0);
    }
    let distance = levenshtein(wanted, &name);
    (distance <= MAX_DISTANCE).then_some(distance)
}

/// Case-insensitive Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = (matrix[i][j + 1] + 1)
                .min(matrix[i + 1][j] + 1)
                .min(matrix[i][j] + cost);
        }
    }

    matrix[a.len()][b.len()]
}
