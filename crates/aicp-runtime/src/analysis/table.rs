//! Column typing and markdown rendering for query results.

use serde_json::Value;

use crate::executor::QueryResult;

/// Numeric values of column `index`, nulls skipped.
///
/// Returns `None` unless every non-null value is a JSON number and at least
/// one exists.
pub fn numeric_column(result: &QueryResult, index: usize) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    for value in result.column_values(index) {
        match value {
            Value::Null => {}
            Value::Number(n) => out.push(n.as_f64()?),
            _ => return None,
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Text values of column `index`, nulls skipped.
///
/// Returns `None` when any non-null value is not a string.
pub fn text_column(result: &QueryResult, index: usize) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    for value in result.column_values(index) {
        match value {
            Value::Null => {}
            Value::String(s) => out.push(s.as_str()),
            _ => return None,
        }
    }
    Some(out)
}

/// Indices of columns whose non-null values are all numeric.
pub fn numeric_columns(result: &QueryResult) -> Vec<(usize, Vec<f64>)> {
    (0..result.column_count())
        .filter_map(|i| numeric_column(result, i).map(|values| (i, values)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Pipe-style markdown table.
pub fn markdown_table(headers: &[String], align: &[Align], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&headers.join(" | "));
    out.push_str(" |\n|");
    for (i, header) in headers.iter().enumerate() {
        let width = header.chars().count().max(3);
        let dashes = "-".repeat(width);
        match align.get(i).copied().unwrap_or(Align::Left) {
            Align::Left => out.push_str(&format!(":{dashes}|")),
            Align::Right => out.push_str(&format!("{dashes}:|")),
        }
    }
    for row in rows {
        out.push_str("\n| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |");
    }
    out
}

/// Plain rendering of a JSON cell for tables and prompts.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First `limit` rows of a result as a markdown table, or `(no rows)`.
pub fn preview_markdown(result: &QueryResult, limit: usize) -> String {
    if result.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(limit)
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    let align: Vec<Align> = (0..result.column_count())
        .map(|i| {
            if numeric_column(result, i).is_some() {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect();
    markdown_table(&result.columns, &align, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> QueryResult {
        QueryResult::new(
            vec!["sex".into(), "age".into()],
            vec![
                vec![json!("F"), json!(30)],
                vec![json!(null), json!(40.5)],
                vec![json!("M"), json!(null)],
            ],
        )
    }

    #[test]
    fn columns_are_typed_by_non_null_values() {
        let r = sample();
        assert_eq!(numeric_column(&r, 1), Some(vec![30.0, 40.5]));
        assert_eq!(numeric_column(&r, 0), None);
        assert_eq!(text_column(&r, 0), Some(vec!["F", "M"]));
        assert_eq!(text_column(&r, 1), None);
    }

    #[test]
    fn preview_renders_markdown() {
        let md = preview_markdown(&sample(), 2);
        assert_eq!(md, "| sex | age |\n|:---|---:|\n| F | 30 |\n|  | 40.5 |");
        assert_eq!(preview_markdown(&QueryResult::default(), 5), "(no rows)");
    }
}
