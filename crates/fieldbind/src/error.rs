use crate::tree::FieldId;
use crate::value::Value;
use thiserror::Error;

/// Text that could not be turned into a typed value.
///
/// Field-local: the pipeline converts it into a posted message and never lets
/// it escape `set_value`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ConversionError {
    /// Resource key the message was localized from
    pub key: String,
    pub message: String,
    pub cause: Option<String>,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            key: "conversion.failed".to_string(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_cause(mut self, cause: impl ToString) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// A typed value that violates a structural bound or a bean rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("value is required")]
    Required,

    #[error("value is below the minimum of {0}")]
    TooLow(Value),

    #[error("value is above the maximum of {0}")]
    TooHigh(Value),

    #[error("value is shorter than {0}")]
    TooShort(usize),

    #[error("value is longer than {0}")]
    TooLong(usize),

    /// A custom per-kind check failed.
    #[error("{message}")]
    Invalid { key: String, message: String },

    /// A bean-level constraint was violated.
    #[error("{message}")]
    Constraint { constraint: String, message: String },
}

impl ValidationError {
    /// Resource key used to localize this error.
    pub fn message_key(&self) -> &str {
        match self {
            ValidationError::Required => "validation.required",
            ValidationError::TooLow(_) => "validation.too_low",
            ValidationError::TooHigh(_) => "validation.too_high",
            ValidationError::TooShort(_) => "validation.too_short",
            ValidationError::TooLong(_) => "validation.too_long",
            ValidationError::Invalid { key, .. } => key,
            ValidationError::Constraint { .. } => "validation.constraint",
        }
    }

    /// Positional arguments for the localized message (after the field label).
    pub fn message_args(&self) -> Vec<String> {
        match self {
            ValidationError::Required => vec![],
            ValidationError::TooLow(limit) | ValidationError::TooHigh(limit) => {
                vec![limit.to_string()]
            }
            ValidationError::TooShort(limit) | ValidationError::TooLong(limit) => {
                vec![limit.to_string()]
            }
            ValidationError::Invalid { message, .. } => vec![message.clone()],
            ValidationError::Constraint { message, .. } => vec![message.clone()],
        }
    }
}

#[derive(Error, Debug)]
pub enum BindError {
    #[error("Unknown field: {0}")]
    UnknownField(FieldId),

    #[error("Unknown field path: {0}")]
    UnknownPath(String),

    #[error("Unknown field kind: {0}")]
    UnknownKind(String),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Value container is empty")]
    EmptyContainer,

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Rule evaluation failed: {0}")]
    Rule(String),

    #[error("Configuration error: {0}")]
    Config(#[from] confique::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Name resolution failed: {0}")]
    NameResolution(String),
}

pub type Result<T> = std::result::Result<T, BindError>;
