use super::{ConversionContext, Converter};
use crate::error::ConversionError;
use crate::value::Value;
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Returns the context pattern if it is a valid strftime pattern, otherwise
/// the default, so formatting never fails.
fn effective_pattern<'a>(ctxt: &'a ConversionContext, default: &'a str) -> &'a str {
    match ctxt.pattern.as_deref() {
        Some(p) if !StrftimeItems::new(p).any(|item| matches!(item, Item::Error)) => p,
        _ => default,
    }
}

fn render(formatted: impl std::fmt::Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).ok()?;
    Some(out)
}

/// Calendar dates using a strftime-style pattern (default `%Y-%m-%d`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let pattern = effective_pattern(ctxt, DEFAULT_DATE_PATTERN);
        NaiveDate::parse_from_str(trimmed, pattern)
            .map(Value::Date)
            .map_err(|e| {
                let today = ctxt.now().date_naive();
                let example = render(today.format(pattern)).unwrap_or_default();
                ctxt.pattern_failure(text, pattern, &example).with_cause(e)
            })
    }

    fn format(&self, value: &Value, ctxt: &ConversionContext) -> String {
        let pattern = effective_pattern(ctxt, DEFAULT_DATE_PATTERN);
        match value {
            Value::Date(d) => render(d.format(pattern)).unwrap_or_else(|| d.to_string()),
            Value::DateTime(dt) => {
                render(dt.date().format(pattern)).unwrap_or_else(|| dt.date().to_string())
            }
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Local date-times (wall-clock time in the field's timezone).
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConverter;

impl Converter for DateTimeConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let pattern = effective_pattern(ctxt, DEFAULT_DATETIME_PATTERN);
        NaiveDateTime::parse_from_str(trimmed, pattern)
            .map(Value::DateTime)
            .map_err(|e| {
                let now = ctxt.now().naive_local();
                let example = render(now.format(pattern)).unwrap_or_default();
                ctxt.pattern_failure(text, pattern, &example).with_cause(e)
            })
    }

    fn format(&self, value: &Value, ctxt: &ConversionContext) -> String {
        let pattern = effective_pattern(ctxt, DEFAULT_DATETIME_PATTERN);
        match value {
            Value::DateTime(dt) => render(dt.format(pattern)).unwrap_or_else(|| dt.to_string()),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
