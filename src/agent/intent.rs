//! Deterministic "list tables" intent.
//!
//! Answered straight from the cached schema, without a model call or SQL.
//! English and Indonesian phrasings are recognized.

/// Placeholder returned in the `sql` field for schema-only answers.
pub const SCHEMA_QUERY_MARKER: &str = "-- Schema query (no SQL execution needed)";

const LIST_VERBS: &[&str] = &["show", "list", "tampilkan", "daftar"];
const PHRASES: &[&str] = &["what table", "which table", "apa saja tabel"];
const INDONESIAN_MARKERS: &[&str] = &["tabel", "tampilkan", "daftar", "apa", "saja", "berapa"];

fn words(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Does the question ask which tables exist?
///
/// # Examples
///
/// - "show tables" → true
/// - "List all tables" → true
/// - "apa saja tabel di database ini?" → true
/// - "how many students are there?" → false
pub fn is_list_tables(question: &str) -> bool {
    let lower = question.to_lowercase();
    if PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }

    let words = words(question);
    let has_verb = words.iter().any(|w| LIST_VERBS.contains(&w.as_str()));
    let has_table = words
        .iter()
        .any(|w| matches!(w.as_str(), "table" | "tables" | "tabel"));
    has_verb && has_table
}

/// Whether to answer in Indonesian.
fn is_indonesian(question: &str) -> bool {
    words(question)
        .iter()
        .any(|w| INDONESIAN_MARKERS.contains(&w.as_str()))
}

/// Enumerate table names in schema order, in the question's language.
pub fn list_tables_answer(table_names: &[&str], question: &str) -> String {
    let indonesian = is_indonesian(question);

    let mut answer = if indonesian {
        format!("Database ini memiliki {} tabel:\n\n", table_names.len())
    } else {
        format!("This database has {} tables:\n\n", table_names.len())
    };

    for (i, name) in table_names.iter().enumerate() {
        answer.push_str(&format!("{}. **{}**\n", i + 1, name));
    }

    let example = table_names.first().copied().unwrap_or("students");
    if indonesian {
        answer.push_str(&format!(
            "\nAnda bisa bertanya tentang data di tabel-tabel ini. Misalnya: 'tampilkan data dari tabel {}' atau 'berapa jumlah data di tabel {}'.",
            example, example
        ));
    } else {
        answer.push_str(&format!(
            "\nYou can ask about the data in these tables, for example: 'show the first rows of {}' or 'how many rows are in {}?'.",
            example, example
        ));
    }

    answer
}
