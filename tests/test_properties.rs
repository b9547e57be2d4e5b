//! Property tests for the pure helpers.

use chatdb::hint::levenshtein;
use chatdb::sql::{classify, extract, is_read_only, Classification};
use chatdb::sql::safety::DENYLIST;
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,12}"
}

proptest! {
    #[test]
    fn levenshtein_is_symmetric(a in ident(), b in ident()) {
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
    }

    #[test]
    fn levenshtein_zero_iff_equal_ignoring_case(a in ident(), b in ident()) {
        let zero = levenshtein(&a, &b) == 0;
        prop_assert_eq!(zero, a.to_lowercase() == b.to_lowercase());
    }

    #[test]
    fn levenshtein_triangle_inequality(a in ident(), b in ident(), c in ident()) {
        prop_assert!(levenshtein(&a, &c) <= levenshtein(&a, &b) + levenshtein(&b, &c));
    }

    #[test]
    fn extract_is_idempotent(
        table in "[a-z]{1,10}",
        column in "[a-z]{1,10}",
        limit in 1usize..500,
    ) {
        let sql = format!("SELECT {} FROM {} LIMIT {};", column, table, limit);
        let once = extract(&sql);
        prop_assert_eq!(&once, &sql);
        prop_assert_eq!(extract(&once), once.clone());
    }

    #[test]
    fn extract_never_panics(output in ".{0,200}") {
        let sql = extract(&output);
        prop_assert!(sql.is_empty() || sql.ends_with(';'));
        prop_assert!(!sql.ends_with(";;"));
    }

    #[test]
    fn denylisted_forms_are_forbidden(
        index in 0..DENYLIST.len(),
        pad in "[ \t\n]{1,4}",
        lower in any::<bool>(),
    ) {
        let pattern = DENYLIST[index].replace(' ', &pad);
        let pattern = if lower { pattern.to_lowercase() } else { pattern };
        let sql = format!("SELECT 1; {} things;", pattern);
        prop_assert!(matches!(classify(&sql), Classification::Forbidden(_)));
    }

    #[test]
    fn read_only_follows_leading_keyword(
        keyword in prop::sample::select(vec!["select", "SHOW", "Describe", "EXPLAIN", "DELETE", "update", "WITH", "insert"]),
        lead in "[ \t\n]{0,3}",
    ) {
        let sql = format!("{}{} x;", lead, keyword);
        let expected = matches!(
            keyword.to_uppercase().as_str(),
            "SELECT" | "SHOW" | "DESCRIBE" | "EXPLAIN"
        );
        prop_assert_eq!(is_read_only(&sql), expected);
    }
}
