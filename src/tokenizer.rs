//! Quote-aware CSV tokenizer.
//!
//! Produces the header list and one cell vector per data line. Rows are
//! always padded or truncated to the header width, so callers can index cells
//! positionally without bounds checks.

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedCsv {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn parse(text: &str) -> Result<ParsedCsv> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = normalized.split('\n').filter(|line| !line.trim().is_empty());

    let header_line = lines
        .next()
        .ok_or_else(|| DashboardError::MalformedInput("no header line found".to_string()))?;
    let headers = header_line
        .split(',')
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let rows = lines
        .map(|line| {
            let mut cells = split_line(line);
            cells.resize(headers.len(), String::new());
            cells
        })
        .collect();

    Ok(ParsedCsv { headers, rows })
}

/// Splits one data line, honouring `"` quoting and `""` escapes.
pub fn split_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => {
                if !quoted && current.trim().is_empty() {
                    current.clear();
                }
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                cells.push(finish_cell(&mut current, quoted));
                quoted = false;
            }
            other if quoted && !in_quotes && other.is_whitespace() => {}
            other => current.push(other),
        }
    }
    cells.push(finish_cell(&mut current, quoted));
    cells
}

fn finish_cell(current: &mut String, quoted: bool) -> String {
    let cell = std::mem::take(current);
    if quoted { cell } else { cell.trim().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty_and_blank_input() {
        assert!(matches!(parse(""), Err(DashboardError::MalformedInput(_))));
        assert!(matches!(
            parse("\n  \r\n\t\n"),
            Err(DashboardError::MalformedInput(_))
        ));
    }

    #[test]
    fn header_only_input_yields_empty_dataset() {
        let parsed = parse("date, region ,revenue\n").unwrap();
        assert_eq!(parsed.headers, vec!["date", "region", "revenue"]);
        assert!(parsed.is_empty());
    }

    #[test]
    fn parse_normalizes_line_endings_and_skips_blank_lines() {
        let parsed = parse("a,b\r\n1,2\r\n\r\n3,4\r5,6").unwrap();
        assert_eq!(parsed.rows, vec![vec!["1", "2"], vec!["3", "4"], vec!["5", "6"]]);
    }

    #[test]
    fn quoted_field_keeps_commas_and_escaped_quotes() {
        let cells = split_line(r#"x,"a,b""c",y"#);
        assert_eq!(cells, vec!["x", "a,b\"c", "y"]);
    }

    #[test]
    fn short_rows_pad_and_long_rows_truncate() {
        let parsed = parse("a,b,c\n1\n1,2,3,4,5\n").unwrap();
        assert_eq!(parsed.rows[0], vec!["1", "", ""]);
        assert_eq!(parsed.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn unquoted_cells_are_trimmed() {
        assert_eq!(split_line(" East , 10 ,\" padded \""), vec!["East", "10", " padded "]);
    }

    #[test]
    fn whitespace_around_quoted_cells_is_dropped() {
        assert_eq!(
            split_line("East, \"Widget, Large\" , \" padded \" ,9"),
            vec!["East", "Widget, Large", " padded ", "9"]
        );
        let parsed = parse("region,product\nWest, \"a\" \n").unwrap();
        assert_eq!(parsed.rows[0], vec!["West", "a"]);
    }
}
