//! Cell preprocessing.
//!
//! Turns raw row fields into per-column display data. Preprocessing is
//! idempotent: running it twice over the same row and columns produces the
//! same cells, so it is simply re-run whenever either side changes.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use crate::column::{Column, ColumnType};
use crate::config::GridConfig;

/// Derived display data for one column of one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Display text.
    pub text: Option<String>,
    /// Parsed date for temporal columns.
    pub date: Option<NaiveDateTime>,
    /// Icon name for icon columns.
    pub icon: Option<String>,
    /// Image source for image columns.
    pub src: Option<String>,
}

/// Looks up a row field. A key containing dots first tries the literal key,
/// then walks nested objects.
pub fn lookup_field<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = fields.get(path) {
        return Some(value);
    }
    if !path.contains('.') {
        return None;
    }
    let mut parts = path.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Renders a field value as display text. `null` and empty strings have no text.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Parses a field value into a date-time.
///
/// Strings may be RFC 3339, a date, a date-time, or a time of day (placed on
/// 1970-01-01). Numbers are epoch milliseconds.
pub fn parse_temporal(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
        }
        Value::String(s) => parse_temporal_str(s.trim()),
        _ => None,
    }
}

fn parse_temporal_str(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(s, format) {
            return NaiveDate::from_ymd_opt(1970, 1, 1).map(|d| d.and_time(time));
        }
    }
    None
}

/// Formats a date-time, returning `None` for an invalid format string.
fn format_temporal(date: &NaiveDateTime, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).ok()?;
    Some(out)
}

/// Derives the cell for one column from a row's fields.
pub fn preprocess_cell(fields: &Map<String, Value>, column: &Column, config: &GridConfig) -> Cell {
    let Some(value) = lookup_field(fields, &column.field) else {
        return Cell::default();
    };

    match column.column_type {
        ColumnType::Text | ColumnType::Email | ColumnType::Link | ColumnType::Number => Cell {
            text: value_text(value),
            ..Cell::default()
        },
        ColumnType::Date | ColumnType::Time | ColumnType::DateTime => {
            let configured = match column.column_type {
                ColumnType::Date => &config.date_format,
                ColumnType::Time => &config.time_format,
                _ => &config.date_time_format,
            };
            let format = column.format.as_deref().unwrap_or(configured);
            match parse_temporal(value) {
                Some(date) => Cell {
                    text: format_temporal(&date, format)
                        .or_else(|| format_temporal(&date, configured)),
                    date: Some(date),
                    ..Cell::default()
                },
                // Unparsable dates still show what the caller gave us.
                None => Cell {
                    text: value_text(value),
                    ..Cell::default()
                },
            }
        }
        ColumnType::Icon => Cell {
            icon: value_text(value),
            ..Cell::default()
        },
        ColumnType::Image => Cell {
            src: value_text(value),
            ..Cell::default()
        },
        ColumnType::Actions => Cell::default(),
    }
}

/// Derives every cell of a row. The result always has one cell per column.
pub fn preprocess_cells(
    fields: &Map<String, Value>,
    columns: &[Column],
    config: &GridConfig,
) -> Vec<Cell> {
    columns
        .iter()
        .map(|column| preprocess_cell(fields, column, config))
        .collect()
}
