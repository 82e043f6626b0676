use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::{
    error::Result,
    roles::{ColumnRoleMap, Role, RoleTable},
    tokenizer::{self, ParsedCsv},
};

/// A normalized cell. Numbers use NaN for values that failed coercion and
/// dates use `None` for the invalid-date sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(Option<NaiveDate>),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Date(d) => format_date(*d),
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => to_number(s),
            Value::Date(_) => f64::NAN,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => *d,
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) => serializer.serialize_none(),
            other => serializer.serialize_str(&other.as_display()),
        }
    }
}

/// Strips `$`, `,`, `%` and whitespace before parsing; anything left that is
/// not a decimal number becomes NaN.
pub fn to_number(raw: &str) -> f64 {
    let cleaned = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect::<String>();
    if cleaned.is_empty() {
        return f64::NAN;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(f64::NAN)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let value = raw.trim().trim_end_matches('Z');
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn month_of(date: Option<NaiveDate>) -> Option<u32> {
    date.map(|d| d.month())
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// How the margin KPI is aggregated for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarginMode {
    /// `revenue - cost` per row, summed.
    CurrencySum,
    /// A precomputed margin percentage column, averaged.
    PercentageAverage,
    Unavailable,
}

impl MarginMode {
    pub fn select(roles: &ColumnRoleMap) -> Self {
        if roles.has(Role::Revenue) && roles.has(Role::Cost) {
            MarginMode::CurrencySum
        } else if roles.has(Role::Margin) {
            MarginMode::PercentageAverage
        } else {
            MarginMode::Unavailable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_margin: Option<f64>,
}

impl NormalizedRow {
    pub fn get(&self, roles: &ColumnRoleMap, role: Role) -> Option<&Value> {
        roles.index(role).and_then(|idx| self.values.get(idx))
    }

    /// Numeric value of a role; NaN when absent or not a number.
    pub fn number(&self, roles: &ColumnRoleMap, role: Role) -> f64 {
        self.get(roles, role).map_or(f64::NAN, Value::as_number)
    }

    pub fn text(&self, roles: &ColumnRoleMap, role: Role) -> String {
        self.get(roles, role)
            .map(Value::as_display)
            .unwrap_or_default()
    }

    pub fn date(&self, roles: &ColumnRoleMap) -> Option<NaiveDate> {
        self.get(roles, Role::Date).and_then(Value::as_date)
    }

    pub fn margin(&self, roles: &ColumnRoleMap, mode: MarginMode) -> f64 {
        match mode {
            MarginMode::CurrencySum => self.derived_margin.unwrap_or(f64::NAN),
            MarginMode::PercentageAverage => self.number(roles, Role::Margin),
            MarginMode::Unavailable => f64::NAN,
        }
    }
}

pub fn normalize(raw: &[String], roles: &ColumnRoleMap, mode: MarginMode) -> NormalizedRow {
    let values = raw
        .iter()
        .enumerate()
        .map(|(idx, cell)| match roles.role_of(idx) {
            Some(Role::Date) => Value::Date(parse_date(cell)),
            Some(role) if role.is_numeric() => Value::Number(to_number(cell)),
            _ => Value::Text(cell.clone()),
        })
        .collect::<Vec<_>>();
    let derived_margin = (mode == MarginMode::CurrencySum).then(|| {
        let at = |role| roles.index(role).map_or(f64::NAN, |idx| values[idx].as_number());
        at(Role::Revenue) - at(Role::Cost)
    });
    NormalizedRow {
        values,
        derived_margin,
    }
}

/// Position of `name` among `headers`: an exact match wins, otherwise the
/// first ASCII case-insensitive match.
pub fn header_position(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
}

/// One loaded CSV file with its resolved roles. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<NormalizedRow>,
    pub roles: ColumnRoleMap,
    pub margin_mode: MarginMode,
}

impl Dataset {
    pub fn from_parsed(parsed: ParsedCsv, table: &RoleTable) -> Self {
        let roles = table.resolve(&parsed.headers);
        let margin_mode = MarginMode::select(&roles);
        let rows = parsed
            .rows
            .iter()
            .map(|raw| normalize(raw, &roles, margin_mode))
            .collect();
        Self {
            headers: parsed.headers,
            rows,
            roles,
            margin_mode,
        }
    }

    pub fn from_text(text: &str, table: &RoleTable) -> Result<Self> {
        Ok(Self::from_parsed(tokenizer::parse(text)?, table))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        header_position(&self.headers, name)
    }
}
