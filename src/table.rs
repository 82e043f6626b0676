use std::{borrow::Cow, cmp::Ordering, fmt::Write as _};

use serde::Serialize;

use crate::{
    data::{MarginMode, NormalizedRow, Value, to_number},
    format,
    pipeline::PipelineResult,
    roles::{ColumnRoleMap, Role},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Click-to-sort state of the row table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: Option<usize>,
    pub direction: SortDirection,
}

impl SortState {
    /// Clicking the active column flips direction; any other column starts ascending.
    pub fn click(&mut self, column: usize) {
        if self.column == Some(column) {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.column = Some(column);
            self.direction = SortDirection::Asc;
        }
    }
}

/// Numeric cells order numerically and come before non-numeric cells, which
/// order lexically. Numerically equal cells fall back to their text.
pub fn compare_cells(left: &str, right: &str) -> Ordering {
    let (a, b) = (to_number(left), to_number(right));
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b).then_with(|| left.cmp(right)),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => left.cmp(right),
    }
}

fn cell_text(row: &NormalizedRow, column: usize) -> String {
    row.values.get(column).map(Value::as_display).unwrap_or_default()
}

/// Stable sort of `rows` by the state's column; unsorted when no column is set.
pub fn sorted_rows<'a>(rows: &'a [NormalizedRow], sort: &SortState) -> Vec<&'a NormalizedRow> {
    let mut ordered = rows.iter().collect::<Vec<_>>();
    if let Some(column) = sort.column {
        ordered.sort_by(|a, b| {
            let ordering = compare_cells(&cell_text(a, column), &cell_text(b, column));
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
    ordered
}

fn format_cell(value: &Value, role: Option<Role>, mode: MarginMode) -> String {
    match (value, role) {
        (Value::Number(n), _) if n.is_nan() => String::new(),
        (Value::Number(n), Some(Role::Revenue | Role::Cost)) => format::money(*n),
        (Value::Number(n), Some(Role::Margin)) if mode == MarginMode::PercentageAverage => {
            format::percent(*n)
        }
        (Value::Number(n), Some(Role::Margin)) => format::money(*n),
        (Value::Number(n), Some(Role::Price)) => format::price(*n),
        (Value::Number(n), Some(Role::Units)) => format::count(*n),
        (other, _) => other.as_display(),
    }
}

/// Display headers for a result: the dataset headers plus a `margin` column
/// when margin is derived and the file has no margin column of its own.
pub fn display_headers(result: &PipelineResult) -> Vec<String> {
    let mut headers = result.headers.clone();
    if appends_margin(&result.roles, result.margin_mode) {
        headers.push("margin".to_string());
    }
    headers
}

fn appends_margin(roles: &ColumnRoleMap, mode: MarginMode) -> bool {
    mode == MarginMode::CurrencySum && !roles.has(Role::Margin)
}

pub fn display_rows(result: &PipelineResult, sort: &SortState) -> Vec<Vec<String>> {
    let append = appends_margin(&result.roles, result.margin_mode);
    sorted_rows(&result.rows, sort)
        .into_iter()
        .map(|row| {
            let mut cells = row
                .values
                .iter()
                .enumerate()
                .map(|(idx, value)| {
                    format_cell(value, result.roles.role_of(idx), result.margin_mode)
                })
                .collect::<Vec<_>>();
            if append {
                cells.push(
                    row.derived_margin
                        .filter(|m| !m.is_nan())
                        .map(format::money)
                        .unwrap_or_default(),
                );
            }
            cells
        })
        .collect()
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separators = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separators, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
