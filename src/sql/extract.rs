//! Pull a single SQL statement out of free-form model output.
//!
//! Never fails: malformed output degrades to an unusable string that the
//! safety gate or the preflight check rejects later.

/// Leading keywords that start a query when scanning lines.
const QUERY_KEYWORDS: &[&str] = &["SELECT", "WITH"];

/// Words that open a statement, so a fence line holding one is not a tag.
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "EXPLAIN", "PRAGMA", "VALUES", "INSERT", "UPDATE",
    "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "REPLACE",
];

/// Extract a statement from model output.
///
/// 1. Prefer the body of the first fenced block (```` ```sql ... ``` ````).
/// 2. Within that text, take the run of lines starting at the first line whose
///    first token is `SELECT`/`WITH`, up to the first line ending in `;`.
/// 3. Otherwise use the whole text.
///
/// Backticks are removed and the result ends in exactly one `;`. Blank input
/// yields an empty string.
pub fn extract(output: &str) -> String {
    let candidate = fenced_block(output)
        .unwrap_or(output)
        .replace('`', "");

    let statement = scan_query_lines(&candidate).unwrap_or(candidate);
    normalize(&statement)
}

/// Body of the first complete fenced block, skipping a language tag line.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];

    let body_start = match after.find('\n') {
        Some(nl) if is_language_tag(&after[..nl]) => nl + 1,
        _ => 0,
    };
    let body = &after[body_start..];
    let close = body.find("```")?;
    let inner = strip_inline_tag(&body[..close]);

    if inner.trim().is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Empty, or a single word that does not open a statement.
fn is_language_tag(line: &str) -> bool {
    let tag = line.trim();
    tag.is_empty()
        || (tag.chars().all(|c| c.is_ascii_alphanumeric())
            && !STATEMENT_KEYWORDS.contains(&tag.to_uppercase().as_str()))
}

/// Drop a `sql` tag written on the same line as the statement.
fn strip_inline_tag(inner: &str) -> &str {
    let text = inner.trim_start();
    match (text.get(..3), text.get(3..)) {
        (Some(tag), Some(rest))
            if tag.eq_ignore_ascii_case("sql") && rest.starts_with(char::is_whitespace) =>
        {
            rest
        }
        _ => inner,
    }
}

fn first_token_upper(line: &str) -> String {
    line.trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

fn scan_query_lines(text: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut in_sql = false;

    for line in text.lines() {
        if !in_sql && QUERY_KEYWORDS.contains(&first_token_upper(line).as_str()) {
            in_sql = true;
        }
        if in_sql {
            lines.push(line);
            if line.trim_end().ends_with(';') {
                break;
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn normalize(sql: &str) -> String {
    let body = sql
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    if body.is_empty() {
        String::new()
    } else {
        format!("{};", body)
    }
}
