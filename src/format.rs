//! Plain-text rendering of query results.

use crate::executor::{QueryResult, Value};

const SEPARATOR: &str = " | ";

/// Render `result` as an aligned table with a header and a rule line.
///
/// Numbers are right-aligned, everything else left-aligned. Trailing
/// whitespace is trimmed from every line.
pub fn render_table(result: &QueryResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| single_line(&v.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(cells.len() + 2);

    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| pad_right(name, w))
        .collect();
    lines.push(header.join(SEPARATOR).trim_end().to_string());

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    lines.push(rule.join("-+-"));

    for (row, values) in cells.iter().zip(&result.rows) {
        let rendered: Vec<String> = row
            .iter()
            .zip(&widths)
            .zip(values)
            .map(|((cell, &w), value)| {
                if is_numeric(value) {
                    pad_left(cell, w)
                } else {
                    pad_right(cell, w)
                }
            })
            .collect();
        lines.push(rendered.join(SEPARATOR).trim_end().to_string());
    }

    lines.join("\n")
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_))
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(len)))
}

fn pad_left(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", " ".repeat(width.saturating_sub(len)), s)
}
