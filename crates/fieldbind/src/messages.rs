//! # Messages
//!
//! Conversion and validation failures never surface as errors to the caller of
//! `set_value`; they are posted here instead, keyed by severity, resource key
//! and arguments. The UI layer decides how to render them.
//!
//! - [`MessageSink`]: where messages go. [`MessageLog`] is the in-memory sink.
//! - [`Localizer`]: turns `(field, key, args)` into display text. [`Catalog`]
//!   is a template table with English defaults.
//!
//! Dismissing a message that belongs to a field also releases the field's
//! retained invalid value (see `Binder::dismiss_message`).

use crate::tree::FieldId;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub severity: Severity,
    /// Field the message is about, `None` for form-level messages
    pub field: Option<FieldId>,
    pub key: String,
    pub args: Vec<String>,
    /// Localized text
    pub text: String,
}

impl Message {
    pub fn error(field: FieldId, key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: Some(field),
            key: key.into(),
            args: Vec::new(),
            text: text.into(),
        }
    }

    pub fn info(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            field: None,
            key: key.into(),
            args: Vec::new(),
            text: text.into(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Destination for user-visible messages.
pub trait MessageSink {
    /// Post a message and return its id.
    fn post(&mut self, message: Message) -> MessageId;

    /// Remove a message. Returns it if it was still present.
    fn dismiss(&mut self, id: MessageId) -> Option<Message>;

    /// Drop all messages about `field`.
    fn clear_field(&mut self, field: FieldId);
}

/// In-memory message sink.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<(MessageId, Message)>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|(_, m)| m)
    }

    pub fn entries(&self) -> &[(MessageId, Message)] {
        &self.entries
    }

    pub fn for_field(&self, field: FieldId) -> Vec<&Message> {
        self.messages()
            .filter(|m| m.field == Some(field))
            .collect()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<&Message> {
        self.messages().filter(|m| m.severity == severity).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl MessageSink for MessageLog {
    fn post(&mut self, message: Message) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.entries.push((id, message));
        id
    }

    fn dismiss(&mut self, id: MessageId) -> Option<Message> {
        let pos = self.entries.iter().position(|(mid, _)| *mid == id)?;
        Some(self.entries.remove(pos).1)
    }

    fn clear_field(&mut self, field: FieldId) {
        self.entries.retain(|(_, m)| m.field != Some(field));
    }
}

/// Message resolution: `localize(field, key, args...) -> String`.
pub trait Localizer: fmt::Debug {
    fn localize(&self, field: &str, key: &str, args: &[String]) -> String;
}

/// Template table with `{0}`, `{1}`, ... placeholders.
///
/// Lookup order: `<field>.<key>`, then `<key>`, then the key itself. The field
/// label is always passed as `{0}`; the caller's arguments follow.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: HashMap<String, String>,
}

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("conversion.failed", "{0}: cannot convert '{1}'"),
    (
        "conversion.pattern",
        "{0}: '{1}' does not match the format {2} (for example {3})",
    ),
    ("conversion.kind", "{0}: '{1}' is not a valid {2} value"),
    ("validation.required", "{0} is required"),
    ("validation.too_low", "{0} must be at least {1}"),
    ("validation.too_high", "{0} must be at most {1}"),
    ("validation.too_short", "{0} is too short (minimum {1})"),
    ("validation.too_long", "{0} is too long (maximum {1})"),
    ("validation.invalid", "{0}: {1}"),
    ("validation.constraint", "{0}: {1}"),
];

impl Default for Catalog {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template. Use `<field>.<key>` for a field-specific one.
    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }
}

impl Localizer for Catalog {
    fn localize(&self, field: &str, key: &str, args: &[String]) -> String {
        let template = self
            .templates
            .get(&format!("{}.{}", field, key))
            .or_else(|| self.templates.get(key))
            .map(String::as_str)
            .unwrap_or(key);

        let mut text = template.replace("{0}", field);
        for (i, arg) in args.iter().enumerate() {
            text = text.replace(&format!("{{{}}}", i + 1), arg);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_substitutes_field_and_args() {
        let catalog = Catalog::new();
        let text = catalog.localize("age", "validation.too_high", &["100".into()]);
        assert_eq!(text, "age must be at most 100");
    }

    #[test]
    fn field_specific_template_wins() {
        let catalog = Catalog::new().with("age.validation.too_high", "Nobody is older than {1}");
        let text = catalog.localize("age", "validation.too_high", &["100".into()]);
        assert_eq!(text, "Nobody is older than 100");

        let other = catalog.localize("score", "validation.too_high", &["10".into()]);
        assert_eq!(other, "score must be at most 10");
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        let catalog = Catalog::new();
        assert_eq!(catalog.localize("x", "no.such.key", &[]), "no.such.key");
    }

    #[test]
    fn log_assigns_ids_and_dismisses() {
        let mut log = MessageLog::new();
        let field = FieldId::from_raw(3);
        let a = log.post(Message::error(field, "k", "first"));
        let b = log.post(Message::info("k", "second"));
        assert_ne!(a, b);
        assert_eq!(log.len(), 2);

        let dismissed = log.dismiss(a).unwrap();
        assert_eq!(dismissed.text, "first");
        assert!(log.dismiss(a).is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn clear_field_keeps_other_messages() {
        let mut log = MessageLog::new();
        let age = FieldId::from_raw(1);
        let name = FieldId::from_raw(2);
        log.post(Message::error(age, "k", "a"));
        log.post(Message::error(name, "k", "b"));
        log.clear_field(age);
        assert!(log.for_field(age).is_empty());
        assert_eq!(log.for_field(name).len(), 1);
    }

    #[test]
    fn message_serializes_severity_lowercase() {
        let msg = Message::info("hello", "Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"severity\":\"info\""));
    }
}
