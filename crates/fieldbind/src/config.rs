//! # Configuration
//!
//! Pipeline defaults are managed by [`confique`]: compiled defaults, then a
//! TOML file, then environment variables (highest priority).
//!
//! | Key | Default | Env | Description |
//! |-----|---------|-----|-------------|
//! | `max_undo_items` | `3` | `FIELDBIND_MAX_UNDO_ITEMS` | Undo queue cap |
//! | `max_redo_items` | `3` | `FIELDBIND_MAX_REDO_ITEMS` | Redo queue cap |
//! | `redo_policy` | `clear` | `FIELDBIND_REDO_POLICY` | `clear` or `preserve` |
//! | `trim_input` | `true` | `FIELDBIND_TRIM_INPUT` | Trim text before conversion |
//! | `validate_eagerly` | `true` | `FIELDBIND_VALIDATE_EAGERLY` | Validate on `set_value` |
//! | `locale` | `en-US` | `FIELDBIND_LOCALE` | Default locale tag |
//! | `utc_offset_minutes` | `0` | `FIELDBIND_UTC_OFFSET_MINUTES` | Default timezone |
//!
//! Field kinds may override `trim_input` and `validate_eagerly` individually.

use crate::error::{BindError, Result};
use chrono::FixedOffset;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a new undoable command does to pending redo entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedoPolicy {
    /// Drop them: a fresh edit starts a new branch of history.
    #[default]
    Clear,
    /// Keep them; only an irreversible command empties the redo queue.
    Preserve,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BindConfig {
    #[config(default = 3, env = "FIELDBIND_MAX_UNDO_ITEMS")]
    pub max_undo_items: usize,

    #[config(default = 3, env = "FIELDBIND_MAX_REDO_ITEMS")]
    pub max_redo_items: usize,

    #[config(default = "clear", env = "FIELDBIND_REDO_POLICY")]
    pub redo_policy: RedoPolicy,

    #[config(default = true, env = "FIELDBIND_TRIM_INPUT")]
    pub trim_input: bool,

    #[config(default = true, env = "FIELDBIND_VALIDATE_EAGERLY")]
    pub validate_eagerly: bool,

    #[config(default = "en-US", env = "FIELDBIND_LOCALE")]
    pub locale: String,

    #[config(default = 0, env = "FIELDBIND_UTC_OFFSET_MINUTES")]
    pub utc_offset_minutes: i32,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            max_undo_items: 3,
            max_redo_items: 3,
            redo_policy: RedoPolicy::Clear,
            trim_input: true,
            validate_eagerly: true,
            locale: "en-US".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl BindConfig {
    /// Loads from environment overrides plus an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        let config = builder.load()?;
        config.timezone()?;
        Ok(config)
    }

    /// Fixed timezone from `utc_offset_minutes`.
    pub fn timezone(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                BindError::InvalidConfig(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = BindConfig::default();
        assert_eq!(config.max_undo_items, 3);
        assert_eq!(config.max_redo_items, 3);
        assert_eq!(config.redo_policy, RedoPolicy::Clear);
        assert!(config.trim_input);
        assert_eq!(config.timezone().unwrap(), FixedOffset::east_opt(0).unwrap());
    }

    #[test]
    fn test_partial_toml_deserializes() {
        let config: BindConfig = toml::from_str(
            r#"
            max_undo_items = 5
            max_redo_items = 2
            redo_policy = "preserve"
            trim_input = false
            validate_eagerly = true
            locale = "de-DE"
            utc_offset_minutes = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.max_undo_items, 5);
        assert_eq!(config.redo_policy, RedoPolicy::Preserve);
        assert_eq!(
            config.timezone().unwrap(),
            FixedOffset::east_opt(3600).unwrap()
        );
    }

    #[test]
    fn test_load_from_file_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_undo_items = 10").unwrap();
        writeln!(file, "redo_policy = \"preserve\"").unwrap();

        let config = BindConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.max_undo_items, 10);
        assert_eq!(config.redo_policy, RedoPolicy::Preserve);
        assert_eq!(config.max_redo_items, 3);
        assert_eq!(config.locale, "en-US");
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let config = BindConfig {
            utc_offset_minutes: 24 * 60,
            ..Default::default()
        };
        assert!(matches!(
            config.timezone(),
            Err(BindError::InvalidConfig(_))
        ));
    }
}
