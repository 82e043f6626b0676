//! Display formatting for KPI cards and table cells (en-US grouping only).

pub fn group_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rendered = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, ch) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && rendered.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Whole-dollar amount, e.g. `$12,345`. NaN renders as `$0`.
pub fn money(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let body = group_thousands(value, 0);
    match body.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${body}"),
    }
}

/// Two-decimal price, e.g. `$9.50`.
pub fn price(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("${value:.2}")
}

/// Count with at most one fractional digit, e.g. `1,234.5` or `15`.
pub fn count(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        group_thousands(rounded, 0)
    } else {
        group_thousands(rounded, 1)
    }
}

pub fn percent(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}%")
    } else {
        String::new()
    }
}
