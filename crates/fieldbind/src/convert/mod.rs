//! # String ↔ value conversion
//!
//! A [`Converter`] turns user text into a typed [`Value`] and back:
//!
//! - `parse(text, ctxt)` fails with [`ConversionError`] when the text cannot be
//!   interpreted under the context's locale, timezone and format pattern.
//! - `format(value, ctxt)` never fails.
//! - Round-trip law: `parse(format(v)) == v` for every value the field can
//!   legally hold.
//!
//! Converters are pure; everything they depend on comes from the
//! [`ConversionContext`]. Blank text converts to `Value::Null` for every kind.
//! Every failure carries the resource key its message was localized from.
//!
//! Format-aware converters (dates, patterned decimals) report failures with the
//! expected pattern and a live example; the others use a generic message.

use crate::error::ConversionError;
use crate::messages::Localizer;
use crate::value::{Value, ValueKind};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod date;
mod list;
mod number;
mod text;

pub use date::{DateConverter, DateTimeConverter, DEFAULT_DATETIME_PATTERN, DEFAULT_DATE_PATTERN};
pub use list::ListConverter;
pub use number::{DecimalConverter, IntegerConverter};
pub use text::{BoolConverter, ChoiceConverter, TextConverter};

pub trait Converter: fmt::Debug + Send + Sync {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError>;

    fn format(&self, value: &Value, ctxt: &ConversionContext) -> String;
}

/// Number formatting conventions of a locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for Locale {
    fn default() -> Self {
        Self::parse("en-US")
    }
}

impl Locale {
    /// Builds a locale from a BCP-47 style tag. Only the language subtag is
    /// used to pick separators; unknown languages use English conventions.
    pub fn parse(tag: &str) -> Self {
        let language = tag
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let (decimal_separator, grouping_separator) = match language.as_str() {
            "de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr" => (',', '.'),
            "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" | "uk" => (',', ' '),
            _ => ('.', ','),
        };
        Self {
            tag: tag.to_string(),
            decimal_separator,
            grouping_separator,
        }
    }
}

/// An entry of a field's option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub key: String,
    pub label: String,
}

impl OptionItem {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Everything a converter may depend on for one field.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    pub locale: Locale,
    pub timezone: FixedOffset,
    pub pattern: Option<String>,
    /// Field label used in messages
    pub label: String,
    /// Current option set, for choice fields
    pub options: Option<Vec<OptionItem>>,
    localizer: Arc<dyn Localizer + Send + Sync>,
}

impl ConversionContext {
    pub fn new(
        label: impl Into<String>,
        locale: Locale,
        timezone: FixedOffset,
        localizer: Arc<dyn Localizer + Send + Sync>,
    ) -> Self {
        Self {
            locale,
            timezone,
            pattern: None,
            label: label.into(),
            options: None,
            localizer,
        }
    }

    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_options(mut self, options: Option<Vec<OptionItem>>) -> Self {
        self.options = options;
        self
    }

    /// Current time in the field's timezone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Generic "cannot convert" failure.
    pub fn conversion_failure(&self, text: &str) -> ConversionError {
        self.failure("conversion.failed", &[text.to_string()])
    }

    /// Failure naming the expected pattern and a live example.
    pub fn pattern_failure(&self, text: &str, pattern: &str, example: &str) -> ConversionError {
        self.failure(
            "conversion.pattern",
            &[text.to_string(), pattern.to_string(), example.to_string()],
        )
    }

    /// Failure localized from `key`, with the field label as `{0}`.
    pub fn failure(&self, key: &str, args: &[String]) -> ConversionError {
        ConversionError::new(self.localizer.localize(&self.label, key, args)).with_key(key)
    }
}

/// Selects the stock converter for a value kind.
///
/// `element` is the element kind for `List` fields (defaults to text).
pub fn converter_for(kind: ValueKind, element: Option<ValueKind>) -> Arc<dyn Converter> {
    match kind {
        ValueKind::Integer => Arc::new(IntegerConverter),
        ValueKind::Decimal => Arc::new(DecimalConverter),
        ValueKind::Text => Arc::new(TextConverter),
        ValueKind::Bool => Arc::new(BoolConverter),
        ValueKind::Date => Arc::new(DateConverter),
        ValueKind::DateTime => Arc::new(DateTimeConverter),
        ValueKind::Choice => Arc::new(ChoiceConverter),
        ValueKind::List => {
            let inner = match element.unwrap_or(ValueKind::Text) {
                // nested lists collapse to text elements
                ValueKind::List => ValueKind::Text,
                other => other,
            };
            Arc::new(ListConverter::new(converter_for(inner, None)))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ctxt;
    use super::*;

    #[test]
    fn locale_picks_separators_by_language() {
        let de = Locale::parse("de-DE");
        assert_eq!(de.decimal_separator, ',');
        assert_eq!(de.grouping_separator, '.');

        let en = Locale::parse("en_GB");
        assert_eq!(en.decimal_separator, '.');

        let unknown = Locale::parse("xx");
        assert_eq!(unknown.decimal_separator, '.');
    }

    #[test]
    fn converter_for_round_trips_each_kind() {
        let c = ctxt();
        let samples = [
            (ValueKind::Integer, Value::Integer(-17)),
            (ValueKind::Decimal, Value::Decimal(3.25)),
            (ValueKind::Text, Value::text("hello")),
            (ValueKind::Bool, Value::Bool(true)),
            (ValueKind::Choice, Value::Choice("red".into())),
            (ValueKind::Integer, Value::Null),
        ];
        for (kind, value) in samples {
            let conv = converter_for(kind, None);
            let text = conv.format(&value, &c);
            assert_eq!(conv.parse(&text, &c).unwrap(), value, "kind {:?}", kind);
        }
    }

    #[test]
    fn generic_failure_names_field_and_text() {
        let err = ctxt().conversion_failure("abc");
        assert_eq!(err.message, "field: cannot convert 'abc'");
        assert_eq!(err.key, "conversion.failed");
    }

    #[test]
    fn pattern_failure_carries_its_key() {
        let err = ctxt().pattern_failure("x", "%Y", "2024");
        assert_eq!(err.key, "conversion.pattern");
        assert!(err.message.contains("%Y"));
    }
}
