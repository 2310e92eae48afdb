use super::{ConversionContext, Converter, Locale};
use crate::error::ConversionError;
use crate::value::Value;
use std::sync::Arc;

const ESCAPE: char = '\\';

/// Multi-valued fields: separated text, each piece converted by the element
/// converter. Blank pieces are skipped; a list with no items is `Null`.
///
/// Items are separated by `,`, or by `;` in locales that write decimals with a
/// comma. A separator, a backslash, or whitespace at either end of an item is
/// escaped with a backslash when formatting, so every item reads back intact.
#[derive(Debug, Clone)]
pub struct ListConverter {
    element: Arc<dyn Converter>,
}

impl ListConverter {
    pub fn new(element: Arc<dyn Converter>) -> Self {
        Self { element }
    }

    pub fn separator(locale: &Locale) -> char {
        if locale.decimal_separator == ',' {
            ';'
        } else {
            ','
        }
    }
}

fn escape(item: &str, separator: char) -> String {
    let last = item.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(item.len());
    for (i, c) in item.chars().enumerate() {
        if c == ESCAPE || c == separator || (c.is_whitespace() && (i == 0 || i == last)) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Splits on unescaped separators and drops unescaped whitespace around each
/// piece. A trailing lone backslash is kept literally.
fn split(text: &str, separator: char) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current: Vec<(char, bool)> = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(next) => current.push((next, true)),
                None => current.push((ESCAPE, true)),
            }
        } else if c == separator {
            pieces.push(finish(&current));
            current.clear();
        } else {
            current.push((c, false));
        }
    }
    pieces.push(finish(&current));
    pieces
}

fn finish(chars: &[(char, bool)]) -> String {
    let kept = |(c, escaped): &(char, bool)| *escaped || !c.is_whitespace();
    let Some(start) = chars.iter().position(kept) else {
        return String::new();
    };
    let end = chars.iter().rposition(kept).unwrap_or(start);
    chars[start..=end].iter().map(|(c, _)| *c).collect()
}

impl Converter for ListConverter {
    fn parse(&self, text: &str, ctxt: &ConversionContext) -> Result<Value, ConversionError> {
        let separator = Self::separator(&ctxt.locale);
        let mut items = Vec::new();
        for piece in split(text, separator).iter().filter(|p| !p.is_empty()) {
            match self.element.parse(piece, ctxt)? {
                Value::Null => {}
                value => items.push(value),
            }
        }
        if items.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::List(items))
        }
    }

    fn format(&self, value: &Value, ctxt: &ConversionContext) -> String {
        let separator = Self::separator(&ctxt.locale);
        match value {
            Value::List(items) => items
                .iter()
                .map(|item| escape(&self.element.format(item, ctxt), separator))
                .collect::<Vec<_>>()
                .join(&format!("{} ", separator)),
            Value::Null => String::new(),
            other => escape(&self.element.format(other, ctxt), separator),
        }
    }
}
