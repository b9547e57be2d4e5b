//! Prompt templates for the query pipeline.
//!
//! Pure rendering only: every function takes the schema summary and stage
//! artifacts and returns the text sent to the model. Nothing here touches the
//! network or agent state.

use crate::agent::ConversationTurn;
use crate::db::QueryResult;

/// Rows of a result set shown to the model when writing the answer.
pub const PREVIEW_ROWS: usize = 5;

/// Conversation turns included in the planning prompt.
pub const HISTORY_TURNS: usize = 6;

/// System preamble sent with every model call.
pub const SYSTEM_PREAMBLE: &str = r#"You are "DB Assistant", a friendly database assistant that helps people explore their data by asking questions in plain language.

Responsibilities:
1. Understand the database schema, including table relationships and foreign keys
2. Translate questions into correct, efficient SQL for the connected database
3. Explain query results clearly and point out anything noteworthy

SQL guidelines:
- Use only tables and columns that appear in the schema
- Join related tables through their foreign keys
- Apply filters, aggregations and ordering where the question calls for them
- Keep result sets small (default 100 rows)
- Handle NULL values explicitly

Answer guidelines:
- Start with a short summary, then highlight patterns or outliers
- Give numbers context and avoid unnecessary jargon
- Be honest about what the data does not show"#;

/// Planning prompt: ask for a short plan naming the tables to query.
///
/// The most recent [`HISTORY_TURNS`] turns of `history` are included so
/// follow-up questions can refer to earlier answers.
pub fn planning(summary: &str, question: &str, history: &[ConversationTurn]) -> String {
    let mut prompt = format!("Database schema:\n\n{}\n\n", summary);

    let start = history.len().saturating_sub(HISTORY_TURNS);
    let recent = &history[start..];
    if !recent.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in recent {
            prompt.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        r#"User question: "{}"

Write a short plan for answering this question. Consider:
1. Which tables from the schema hold the relevant data?
2. Which relationships connect those tables?
3. Which filters, aggregations or calculations are needed?
4. How should the results be ordered or limited?

Use the data tables listed in the schema. Do not plan to query information_schema or other system tables unless the question asks for them.

Reply with 2-3 sentences that name the tables you will query."#,
        question
    ));

    prompt
}

/// SQL generation prompt.
///
/// Demands a single raw statement ending in one `;`. The row cap is stated
/// for the model's benefit only; the database adapter enforces it.
pub fn sql_generation(summary: &str, question: &str, plan: &str, row_cap: usize) -> String {
    format!(
        r#"Database schema:

{summary}

User question: "{question}"

Plan: {plan}

Write one SQL statement that answers the question.

Output rules:
- Return ONLY the SQL statement, with no explanation
- Do not use markdown code blocks, backticks or quotes around the statement
- End the statement with exactly one semicolon

Query rules:
- Use the table and column names exactly as they appear in the schema
- Do not query information_schema or system tables unless asked
- Join related tables where the question spans them
- Add a LIMIT clause (default: {row_cap}) unless the query aggregates to a few rows
- Give computed columns readable aliases

Examples:
- "show data from students": SELECT * FROM students LIMIT 10;
- "how many schools are there": SELECT COUNT(*) AS total_schools FROM schools;"#
    )
}

/// Answer synthesis prompt with a preview of the first [`PREVIEW_ROWS`] rows.
pub fn answer(question: &str, sql: &str, result: &QueryResult) -> String {
    let preview = result.preview(PREVIEW_ROWS);
    let rows_json = serde_json::to_string_pretty(preview).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"User asked: "{}"

SQL executed:
{}

Results ({} rows total, showing first {}):
{}

Answer the user's question from these results, in the same language the user asked in.

Include:
1. A short summary of what the data shows (2-3 sentences)
2. The key numbers, with context
3. Any interesting pattern or outlier
4. Optionally, a follow-up question worth asking

Keep it friendly and concise."#,
        question,
        sql,
        result.row_count,
        preview.len(),
        rows_json
    )
}

/// Repair prompt for a statement the database rejected.
pub fn repair(summary: &str, question: &str, sql: &str, error: &str) -> String {
    format!(
        r#"The following SQL query failed.

SQL:
{sql}

Error:
{error}

Original question: "{question}"

Database schema:
{summary}

Fix the query so it runs against this schema. Return ONLY the corrected SQL statement, ending with one semicolon."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ConversationTurn, Role};
    use serde_json::{json, Map, Value};

    fn row(id: i64) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("id".into(), json!(id));
        row
    }

    #[test]
    fn test_planning_includes_schema_and_question() {
        let prompt = planning("Table: students (3 rows)", "How many students?", &[]);
        assert!(prompt.contains("Table: students (3 rows)"));
        assert!(prompt.contains(r#"User question: "How many students?""#));
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn test_planning_keeps_recent_history_only() {
        let history: Vec<ConversationTurn> = (0..10)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                ConversationTurn::new(role, format!("turn-{}", i))
            })
            .collect();

        let prompt = planning("summary", "and by school?", &history);
        assert!(prompt.contains("Conversation so far"));
        assert!(!prompt.contains("turn-3\n"));
        assert!(prompt.contains("user: turn-4"));
        assert!(prompt.contains("assistant: turn-9"));
    }

    #[test]
    fn test_sql_generation_rules() {
        let prompt = sql_generation("summary", "list schools", "Query schools.", 100);
        assert!(prompt.contains("Plan: Query schools."));
        assert!(prompt.contains("Return ONLY the SQL statement"));
        assert!(prompt.contains("exactly one semicolon"));
        assert!(prompt.contains("default: 100"));
    }

    #[test]
    fn test_answer_preview_is_capped() {
        let result = QueryResult::new(vec!["id".into()], (0..8).map(row).collect());
        let prompt = answer("ids?", "SELECT id FROM t;", &result);
        assert!(prompt.contains("Results (8 rows total, showing first 5)"));
        assert!(prompt.contains(r#""id": 4"#));
        assert!(!prompt.contains(r#""id": 5"#));
    }

    #[test]
    fn test_repair_embeds_error() {
        let prompt = repair("summary", "q", "SELECT foo FROM m;", "no such column: foo");
        assert!(prompt.contains("SELECT foo FROM m;"));
        assert!(prompt.contains("no such column: foo"));
        assert!(prompt.contains(r#"Original question: "q""#));
    }
}
