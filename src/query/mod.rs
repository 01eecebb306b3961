//! JQL compilation from a base fragment and a `FilterSet`.
//!
//! The compiler is a pure function: the same base fragment and facet list
//! always produce a byte-identical query string.

use crate::model::{Facet, FilterSet};
use chrono::{Days, NaiveDate};

const ORDER_BY: &str = "ORDER BY";

/// Compile the final query.
///
/// Each present facet becomes an `AND` clause, in insertion order. Clauses
/// are placed before a trailing `ORDER BY` of the base fragment, and a base
/// fragment with a top-level `OR` is parenthesized first.
#[must_use]
pub fn compile(base: &str, filters: &FilterSet) -> String {
    let clauses: Vec<String> = filters.facets().iter().map(facet_clause).collect();
    if clauses.is_empty() {
        return base.trim().to_string();
    }

    let (condition, order_by) = split_order_by(base);
    let mut query = String::new();
    if !condition.is_empty() {
        if has_top_level_or(condition) {
            query.push('(');
            query.push_str(condition);
            query.push(')');
        } else {
            query.push_str(condition);
        }
        query.push_str(" AND ");
    }
    query.push_str(&clauses.join(" AND "));
    if let Some(order_by) = order_by {
        query.push(' ');
        query.push_str(order_by);
    }
    query
}

/// Build the clause for a single facet.
#[must_use]
pub fn facet_clause(facet: &Facet) -> String {
    match facet {
        Facet::Status(value) => equals("status", value),
        Facet::Assignee(value) => equals("assignee", value),
        Facet::Reporter(value) => equals("reporter", value),
        Facet::IssueType(value) => equals("issuetype", value),
        Facet::Priority(value) => equals("priority", value),
        Facet::Labels(labels) => {
            let quoted: Vec<String> = labels.iter().map(|label| quote(label)).collect();
            format!("labels IN ({})", quoted.join(","))
        }
        Facet::CreatedOn(date) => {
            let (start, end) = day_window(*date);
            format!(
                "created >= {} AND created < {}",
                quote(&start.format("%Y-%m-%d").to_string()),
                quote(&end.format("%Y-%m-%d").to_string())
            )
        }
    }
}

/// Half-open whole-day window `[date, date + 1)`.
#[must_use]
pub fn day_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    (date, next)
}

/// Double-quote a JQL value, escaping backslashes and quotes.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn equals(field: &str, value: &str) -> String {
    format!("{field} = {}", quote(value))
}

/// Split a base fragment into its condition and trailing `ORDER BY` clause.
fn split_order_by(base: &str) -> (&str, Option<&str>) {
    let trimmed = base.trim();
    let last = find_top_level_keyword(trimmed, ORDER_BY).into_iter().last();
    match last {
        Some(idx) => (trimmed[..idx].trim_end(), Some(&trimmed[idx..])),
        None => (trimmed, None),
    }
}

fn has_top_level_or(condition: &str) -> bool {
    !find_top_level_keyword(condition, "OR").is_empty()
}

/// Byte offsets of whole-word, case-insensitive keyword matches that sit
/// outside every string literal and parenthesized group.
///
/// Both `'` and `"` delimit strings, and a backslash escapes the character
/// after it wherever it appears.
fn find_top_level_keyword(text: &str, keyword: &str) -> Vec<usize> {
    let upper = text.to_ascii_uppercase();
    let bytes = text.as_bytes();
    let mut hits = Vec::new();
    let mut open_quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0i32;

    for (idx, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (open_quote, c) {
            (_, '\\') => escaped = true,
            (Some(quote), _) if c == quote => open_quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => open_quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, _) if depth == 0 && upper[idx..].starts_with(keyword) => {
                let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
                let end = idx + keyword.len();
                let after_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
                if before_ok && after_ok {
                    hits.push(idx);
                }
            }
            (None, _) => {}
        }
    }
    hits
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use tracing::info;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compile_without_filters_returns_base() {
        init_test_logging();
        info!("test_compile_without_filters_returns_base: starting");
        assert_eq!(
            compile("project = SEC ORDER BY Rank ASC", &FilterSet::new()),
            "project = SEC ORDER BY Rank ASC"
        );
        info!("test_compile_without_filters_returns_base: assertions passed");
    }

    #[test]
    fn test_compile_board_scenario() {
        let filters = FilterSet::new()
            .with(Facet::Status("To Do".to_string()))
            .with(Facet::Labels(vec!["security".to_string(), "bug".to_string()]));
        insta::assert_snapshot!(
            compile("project = SEC", &filters),
            @r#"project = SEC AND status = "To Do" AND labels IN ("security","bug")"#
        );
    }

    #[test]
    fn test_compile_keeps_order_by_last() {
        let filters = FilterSet::new().with(Facet::Assignee("alice@example.com".to_string()));
        insta::assert_snapshot!(
            compile("project = SEC ORDER BY Rank ASC", &filters),
            @r#"project = SEC AND assignee = "alice@example.com" ORDER BY Rank ASC"#
        );
    }

    #[test]
    fn test_compile_parenthesizes_or_base() {
        let filters = FilterSet::new().with(Facet::Priority("High".to_string()));
        assert_eq!(
            compile("project = A OR project = B order by created DESC", &filters),
            r#"(project = A OR project = B) AND priority = "High" order by created DESC"#
        );
    }

    #[test]
    fn test_compile_ignores_keywords_inside_quotes() {
        let filters = FilterSet::new().with(Facet::IssueType("Bug".to_string()));
        assert_eq!(
            compile(r#"summary ~ "fix OR ORDER BY""#, &filters),
            r#"summary ~ "fix OR ORDER BY" AND issuetype = "Bug""#
        );
    }

    #[test]
    fn test_nested_or_is_not_wrapped() {
        let filters = FilterSet::new().with(Facet::Reporter("bob".to_string()));
        assert_eq!(
            compile("project = A AND (status = X OR status = Y)", &filters),
            r#"project = A AND (status = X OR status = Y) AND reporter = "bob""#
        );
    }

    #[test]
    fn test_created_on_window() {
        assert_eq!(
            facet_clause(&Facet::CreatedOn(date(2025, 8, 12))),
            r#"created >= "2025-08-12" AND created < "2025-08-13""#
        );
        assert_eq!(
            facet_clause(&Facet::CreatedOn(date(2024, 12, 31))),
            r#"created >= "2024-12-31" AND created < "2025-01-01""#
        );
        assert_eq!(
            facet_clause(&Facet::CreatedOn(date(2024, 2, 28))),
            r#"created >= "2024-02-28" AND created < "2024-02-29""#
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote(r"back\slash"), r#""back\\slash""#);
    }

    #[test]
    fn test_compile_ignores_keywords_inside_single_quotes() {
        let filters = FilterSet::new().with(Facet::Status("Open".to_string()));
        assert_eq!(
            compile("project = SEC AND summary ~ 'sort order by hand'", &filters),
            r#"project = SEC AND summary ~ 'sort order by hand' AND status = "Open""#
        );
        assert_eq!(
            compile("summary ~ 'this or that'", &filters),
            r#"summary ~ 'this or that' AND status = "Open""#
        );
    }

    #[test]
    fn test_escaped_quote_does_not_hide_group_end() {
        let filters = FilterSet::new().with(Facet::Status("Open".to_string()));
        assert_eq!(
            compile(r#"(summary ~ "a\"" AND b = c) OR d = e"#, &filters),
            r#"((summary ~ "a\"" AND b = c) OR d = e) AND status = "Open""#
        );
        assert_eq!(
            compile(r"(summary ~ 'it\'s' AND b = c) OR d = e ORDER BY key", &filters),
            r#"((summary ~ 'it\'s' AND b = c) OR d = e) AND status = "Open" ORDER BY key"#
        );
    }

    #[test]
    fn test_quoted_paren_does_not_shift_group_depth() {
        let filters = FilterSet::new().with(Facet::Status("Open".to_string()));
        assert_eq!(
            compile(r#"summary ~ ")" AND (status = X OR status = Y)"#, &filters),
            r#"summary ~ ")" AND (status = X OR status = Y) AND status = "Open""#
        );
        assert_eq!(
            compile(r#"summary ~ "(" OR status = X"#, &filters),
            r#"(summary ~ "(" OR status = X) AND status = "Open""#
        );
    }

    #[test]
    fn test_order_by_keyword_needs_word_boundary() {
        let filters = FilterSet::new().with(Facet::Status("Open".to_string()));
        assert_eq!(
            compile("labels = REORDER", &filters),
            r#"labels = REORDER AND status = "Open""#
        );
    }
}
