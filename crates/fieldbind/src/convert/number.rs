use super::{ConversionContext, Converter, Locale};
use crate::error::ConversionError;
use crate::value::Value;

const SAMPLE_DECIMAL: f64 = 1234.5;

/// Strips grouping separators so "1,234" and "1 234" read as 1234.
fn strip_grouping(text: &str, locale: &Locale) -> String {
    text.chars()
        .filter(|c| {
            *c != locale.grouping_separator
                && !(locale.grouping_separator == ' ' && *c == '\u{a0}')
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl Converter for IntegerConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        strip_grouping(trimmed, &ctxt.locale)
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| ctxt.conversion_failure(text).with_cause(e))
    }

    fn format(&self, value: &Value, _ctxt: &ConversionContext) -> String {
        match value {
            Value::Integer(n) => n.to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Decimal numbers in the locale's notation.
///
/// An optional pattern such as `0.00` or `#,##0.000` fixes the number of
/// fraction digits. Formatting pads to that precision and parsing rejects
/// input carrying more significant fraction digits or an exponent.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalConverter;

impl DecimalConverter {
    fn fraction_digits(pattern: &str) -> Option<usize> {
        match pattern.split_once('.') {
            Some((_, fraction)) => Some(fraction.chars().filter(|c| *c == '0' || *c == '#').count()),
            None if !pattern.is_empty() && pattern.chars().all(|c| matches!(c, '0' | '#' | ',')) => {
                Some(0)
            }
            None => None,
        }
    }

    /// Whether normalized (`.`-separated) input fits `digits` fraction digits.
    fn fits_precision(normalized: &str, digits: usize) -> bool {
        if normalized.contains(['e', 'E']) {
            return false;
        }
        let fraction = normalized.split_once('.').map_or("", |(_, f)| f);
        fraction.trim_end_matches('0').len() <= digits
    }

    fn render(value: f64, ctxt: &ConversionContext) -> String {
        let raw = match ctxt.pattern.as_deref().and_then(Self::fraction_digits) {
            Some(digits) => format!("{:.*}", digits, value),
            None => format!("{}", value),
        };
        if ctxt.locale.decimal_separator == '.' {
            raw
        } else {
            raw.replace('.', &ctxt.locale.decimal_separator.to_string())
        }
    }
}

impl Converter for DecimalConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }

        let normalized = strip_grouping(trimmed, &ctxt.locale)
            .replace(ctxt.locale.decimal_separator, ".");
        let failure = || match ctxt.pattern.as_deref() {
            Some(pattern) => {
                ctxt.pattern_failure(text, pattern, &Self::render(SAMPLE_DECIMAL, ctxt))
            }
            None => ctxt.conversion_failure(text),
        };

        if let Some(digits) = ctxt.pattern.as_deref().and_then(Self::fraction_digits) {
            if !Self::fits_precision(&normalized, digits) {
                return Err(failure());
            }
        }

        match normalized.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Decimal(n)),
            Ok(_) => Err(failure()),
            Err(e) => Err(failure().with_cause(e)),
        }
    }

    fn format(&self, value: &Value, ctxt: &ConversionContext) -> String {
        match value {
            Value::Decimal(n) => Self::render(*n, ctxt),
            Value::Integer(n) => Self::render(*n as f64, ctxt),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
