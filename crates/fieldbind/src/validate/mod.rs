//! # Validator chain
//!
//! Validation runs in two short-circuiting stages:
//!
//! 1. **Structural**: required, numeric min/max (inclusive), length min/max,
//!    then custom per-kind checks. Empty values skip everything but
//!    `required`. The first violation aborts the stage.
//! 2. **Bean rules**: an optional injected [`BeanValidator`]. Runs only when
//!    the structural stage passed, and reports every violated constraint.
//!
//! Gating (hidden, disabled, read-only, or still holding a conversion error)
//! is decided by the caller; a [`Validator`] only looks at the value.

use crate::error::{Result, ValidationError};
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

mod bean;

pub use bean::{BeanValidator, ConstraintViolation, Rule, RuleSet};

/// Structural limits of a field kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub required: bool,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
}

impl Bounds {
    /// First violated bound, if any.
    pub fn check(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        if value.is_empty() {
            return if self.required {
                Err(ValidationError::Required)
            } else {
                Ok(())
            };
        }

        if let Some(min) = &self.min {
            if value.compare(min) == Some(Ordering::Less) {
                return Err(ValidationError::TooLow(min.clone()));
            }
        }
        if let Some(max) = &self.max {
            if value.compare(max) == Some(Ordering::Greater) {
                return Err(ValidationError::TooHigh(max.clone()));
            }
        }

        if let Some(len) = value.length() {
            if let Some(min_len) = self.min_len {
                if len < min_len {
                    return Err(ValidationError::TooShort(min_len));
                }
            }
            if let Some(max_len) = self.max_len {
                if len > max_len {
                    return Err(ValidationError::TooLong(max_len));
                }
            }
        }

        Ok(())
    }
}

type CheckFn = dyn Fn(&Value) -> std::result::Result<(), ValidationError> + Send + Sync;

/// A custom structural check, run after the bounds on non-empty values.
#[derive(Clone)]
pub struct Check {
    name: String,
    check: Arc<CheckFn>,
}

impl Check {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Outcome of one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Structural violation that aborted the chain
    pub structural: Option<ValidationError>,
    /// All bean-level violations, in rule order
    pub violations: Vec<ConstraintViolation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.structural.is_none() && self.violations.is_empty()
    }

    /// All failures as validation errors, structural first.
    pub fn errors(&self) -> Vec<ValidationError> {
        self.structural
            .iter()
            .cloned()
            .chain(self.violations.iter().map(|v| ValidationError::Constraint {
                constraint: v.constraint.clone(),
                message: v.message.clone(),
            }))
            .collect()
    }
}

/// Structural bounds, custom checks and an optional bean validator for one
/// field kind. Built once, shared read-only by every field of that kind.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    bounds: Bounds,
    checks: Vec<Check>,
    bean: Option<Arc<dyn BeanValidator>>,
}

impl Validator {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_bean(mut self, bean: Arc<dyn BeanValidator>) -> Self {
        self.bean = Some(bean);
        self
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Stage 1 only.
    pub fn check_structure(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        self.bounds.check(value)?;
        if value.is_empty() {
            return Ok(());
        }
        for check in &self.checks {
            (check.check)(value)?;
        }
        Ok(())
    }

    /// Runs both stages.
    ///
    /// Returns `Err` only when the bean rule engine itself fails; constraint
    /// violations are part of the report.
    pub fn validate(&self, field: &str, value: &Value) -> Result<ValidationReport> {
        if let Err(e) = self.check_structure(value) {
            return Ok(ValidationReport {
                structural: Some(e),
                violations: Vec::new(),
            });
        }
        let violations = match &self.bean {
            Some(bean) => bean.validate(field, value)?,
            None => Vec::new(),
        };
        Ok(ValidationReport {
            structural: None,
            violations,
        })
    }
}
