//! Bean-level (business rule) validation.

use crate::error::{BindError, Result};
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    pub constraint: String,
    pub message: String,
}

/// Pluggable rule engine. Reports every violated constraint in one pass.
///
/// An `Err` means the engine itself failed (not that the value is invalid);
/// it is treated as an unexpected runtime failure by the pipeline.
pub trait BeanValidator: fmt::Debug + Send + Sync {
    fn validate(&self, field: &str, value: &Value) -> Result<Vec<ConstraintViolation>>;
}

type Predicate = dyn Fn(&Value) -> std::result::Result<bool, String> + Send + Sync;

#[derive(Clone)]
pub struct Rule {
    constraint: String,
    message: String,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("constraint", &self.constraint)
            .finish()
    }
}

/// Named predicates, evaluated in order, all of them.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint. The predicate returns `Ok(true)` when satisfied.
    pub fn rule<F>(mut self, constraint: impl Into<String>, message: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<bool, String> + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            constraint: constraint.into(),
            message: message.into(),
            predicate: Arc::new(f),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl BeanValidator for RuleSet {
    fn validate(&self, field: &str, value: &Value) -> Result<Vec<ConstraintViolation>> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            let satisfied = (rule.predicate)(value)
                .map_err(|e| BindError::Rule(format!("{}: {}: {}", field, rule.constraint, e)))?;
            if !satisfied {
                violations.push(ConstraintViolation {
                    constraint: rule.constraint.clone(),
                    message: rule.message.clone(),
                });
            }
        }
        Ok(violations)
    }
}
