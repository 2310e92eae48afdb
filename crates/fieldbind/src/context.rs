//! Per-field formatting context.
//!
//! The locale, timezone and format pattern a converter sees come from a
//! [`FormatProvider`]. [`StaticFormats`] serves the configured defaults plus
//! per-path pattern overrides; a field kind's own pattern applies when no
//! override exists.

use crate::config::BindConfig;
use crate::convert::Locale;
use crate::error::Result;
use chrono::{FixedOffset, Offset, Utc};
use std::collections::HashMap;
use std::fmt;

pub trait FormatProvider: fmt::Debug {
    fn locale(&self, path: &str) -> Locale;

    fn timezone(&self, path: &str) -> FixedOffset;

    /// Pattern override for the field at `path`.
    fn pattern(&self, path: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct StaticFormats {
    locale: Locale,
    timezone: FixedOffset,
    patterns: HashMap<String, String>,
}

impl Default for StaticFormats {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            timezone: Utc.fix(),
            patterns: HashMap::new(),
        }
    }
}

impl StaticFormats {
    pub fn from_config(config: &BindConfig) -> Result<Self> {
        Ok(Self {
            locale: Locale::parse(&config.locale),
            timezone: config.timezone()?,
            patterns: HashMap::new(),
        })
    }

    pub fn with_pattern(mut self, path: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.insert(path.into(), pattern.into());
        self
    }
}

impl FormatProvider for StaticFormats {
    fn locale(&self, _path: &str) -> Locale {
        self.locale.clone()
    }

    fn timezone(&self, _path: &str) -> FixedOffset {
        self.timezone
    }

    fn pattern(&self, path: &str) -> Option<String> {
        self.patterns.get(path).cloned()
    }
}
