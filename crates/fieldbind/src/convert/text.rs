use super::{ConversionContext, Converter};
use crate::error::ConversionError;
use crate::value::Value;

/// Plain text. Blank input (empty or whitespace only) is `Null`; trimming is
/// the pipeline's job, so other text keeps its surrounding whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextConverter;

impl Converter for TextConverter {
    fn parse(&self, text: &str, _ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::Text(text.to_string()))
        }
    }

    fn format(&self, value: &Value, _ctxt: &ConversionContext) -> String {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(ctxt.conversion_failure(text)),
        }
    }

    fn format(&self, value: &Value, _ctxt: &ConversionContext) -> String {
        match value {
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// One entry of the field's option set. Input matches an option's key exactly
/// or its label case-insensitively, and always parses to the key; anything
/// else is a conversion failure. Without an option set in the context any
/// non-blank key is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceConverter;

impl Converter for ChoiceConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let Some(options) = &ctxt.options else {
            return Ok(Value::Choice(trimmed.to_string()));
        };
        options
            .iter()
            .find(|o| o.key == trimmed)
            .or_else(|| {
                options
                    .iter()
                    .find(|o| o.label.eq_ignore_ascii_case(trimmed))
            })
            .map(|o| Value::Choice(o.key.clone()))
            .ok_or_else(|| ctxt.conversion_failure(text))
    }

    fn format(&self, value: &Value, _ctxt: &ConversionContext) -> String {
        value.to_string()
    }
}
