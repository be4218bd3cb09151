//! Display formats shared by forms, tables and exports.
//!
//! - Dates: `DD/MM/YYYY`, no time zone.
//! - Money: Brazilian real, `R$ 1.234,56`.
//! - Timestamps: `DD/MM/YYYY HH:MM:SS`.

use chrono::{NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `DD/MM/YYYY` date; surrounding whitespace is ignored.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats an amount as `R$ 1.234,56`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

/// Parses currency text as typed into the entry form.
///
/// Accepts `R$ 1.500,00`, `1500,00`, `1.500` and plain `1500.50`. A comma is
/// always the decimal separator when present; without a comma, a single dot
/// followed by one or two digits is a decimal point and any other dot groups
/// thousands.
pub fn parse_currency(input: &str) -> Option<f64> {
    let text = input.trim();
    let text = text.strip_prefix("R$").unwrap_or(text).trim();
    if text.is_empty() {
        return None;
    }

    let normalized = if text.contains(',') {
        text.replace('.', "").replace(',', ".")
    } else {
        match text.rsplit_once('.') {
            Some((head, tail)) if !head.contains('.') && (1..=2).contains(&tail.len()) => text.to_string(),
            _ => text.replace('.', ""),
        }
    };

    if !normalized.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
