//! Field kind configuration and registry.
//!
//! A [`FieldKind`] is the immutable description of a family of fields: value
//! kind, converter, validator, option provider, computed-value function and
//! policy flags. Kinds are built once, registered in a [`FieldRegistry`], and
//! then shared read-only (via `Arc`) by every field instance of that kind.
//!
//! Construction is two-phase: register everything with
//! [`FieldRegistry::builder`], then freeze it with `build()`. Nothing is
//! computed lazily on first use.

use crate::convert::{converter_for, Converter, OptionItem};
use crate::error::{BindError, Result};
use crate::tree::{FieldId, Lookup};
use crate::validate::{BeanValidator, Bounds, Check, Validator};
use crate::value::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type ComputeFn = dyn Fn(&Lookup<'_>, FieldId) -> Value + Send + Sync;
pub type OptionsFn = dyn Fn(&Lookup<'_>, FieldId) -> Vec<OptionItem> + Send + Sync;

pub struct FieldKind {
    pub name: String,
    pub value_kind: ValueKind,
    /// Element kind for `List` fields
    pub element_kind: Option<ValueKind>,
    pub converter: Arc<dyn Converter>,
    pub validator: Validator,
    pub pattern: Option<String>,
    /// `None` defers to the configured default
    pub trim: Option<bool>,
    /// `None` defers to the configured default
    pub validate_eagerly: Option<bool>,
    /// Opt out of propagated (subtree / context chain) cache clearing
    pub never_auto_clear: bool,
    pub default_value: Value,
    options: Option<Arc<OptionsFn>>,
    compute: Option<Arc<ComputeFn>>,
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKind")
            .field("name", &self.name)
            .field("value_kind", &self.value_kind)
            .field("element_kind", &self.element_kind)
            .field("converter", &self.converter)
            .field("validator", &self.validator)
            .field("pattern", &self.pattern)
            .field("never_auto_clear", &self.never_auto_clear)
            .field("has_options", &self.options.is_some())
            .field("is_computed", &self.compute.is_some())
            .finish()
    }
}

impl FieldKind {
    pub fn builder(name: impl Into<String>, value_kind: ValueKind) -> FieldKindBuilder {
        FieldKindBuilder::new(name, value_kind)
    }

    pub fn is_computed(&self) -> bool {
        self.compute.is_some()
    }

    pub fn has_options(&self) -> bool {
        self.options.is_some()
    }

    pub fn compute(&self, lookup: &Lookup<'_>, id: FieldId) -> Option<Value> {
        self.compute.as_ref().map(|f| f(lookup, id))
    }

    pub fn options(&self, lookup: &Lookup<'_>, id: FieldId) -> Option<Vec<OptionItem>> {
        self.options.as_ref().map(|f| f(lookup, id))
    }

    /// Fits a typed value to this kind, or `None` when it is of another kind.
    ///
    /// `Null` always fits and integers widen into decimal fields. List items
    /// are checked against the element kind (text when unset).
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match self.value_kind {
            ValueKind::List => match value {
                Value::List(items) => {
                    let element = match self.element_kind.unwrap_or(ValueKind::Text) {
                        ValueKind::List => ValueKind::Text,
                        other => other,
                    };
                    items
                        .into_iter()
                        .map(|item| coerce_scalar(element, item))
                        .collect::<Option<Vec<_>>>()
                        .map(Value::List)
                }
                Value::Null => Some(Value::Null),
                _ => None,
            },
            kind => coerce_scalar(kind, value),
        }
    }
}

fn coerce_scalar(kind: ValueKind, value: Value) -> Option<Value> {
    match (kind, value) {
        (_, Value::Null) => Some(Value::Null),
        (ValueKind::Decimal, Value::Integer(n)) => Some(Value::Decimal(n as f64)),
        (kind, value) if value.kind() == Some(kind) => Some(value),
        _ => None,
    }
}

pub struct FieldKindBuilder {
    name: String,
    value_kind: ValueKind,
    element_kind: Option<ValueKind>,
    converter: Option<Arc<dyn Converter>>,
    bounds: Bounds,
    checks: Vec<Check>,
    bean: Option<Arc<dyn BeanValidator>>,
    pattern: Option<String>,
    trim: Option<bool>,
    validate_eagerly: Option<bool>,
    never_auto_clear: bool,
    default_value: Value,
    options: Option<Arc<OptionsFn>>,
    compute: Option<Arc<ComputeFn>>,
}

impl FieldKindBuilder {
    fn new(name: impl Into<String>, value_kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            value_kind,
            element_kind: None,
            converter: None,
            bounds: Bounds::default(),
            checks: Vec::new(),
            bean: None,
            pattern: None,
            trim: None,
            validate_eagerly: None,
            never_auto_clear: false,
            default_value: Value::Null,
            options: None,
            compute: None,
        }
    }

    pub fn element(mut self, kind: ValueKind) -> Self {
        self.element_kind = Some(kind);
        self
    }

    /// Replace the stock converter for the value kind.
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn required(mut self) -> Self {
        self.bounds.required = true;
        self
    }

    pub fn min(mut self, min: impl Into<Value>) -> Self {
        self.bounds.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.bounds.max = Some(max.into());
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        self.bounds.min_len = Some(len);
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        self.bounds.max_len = Some(len);
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn bean(mut self, bean: Arc<dyn BeanValidator>) -> Self {
        self.bean = Some(bean);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn validate_eagerly(mut self, eager: bool) -> Self {
        self.validate_eagerly = Some(eager);
        self
    }

    pub fn never_auto_clear(mut self) -> Self {
        self.never_auto_clear = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn options<F>(mut self, f: F) -> Self
    where
        F: Fn(&Lookup<'_>, FieldId) -> Vec<OptionItem> + Send + Sync + 'static,
    {
        self.options = Some(Arc::new(f));
        self
    }

    /// Static option set.
    pub fn choices(self, items: Vec<OptionItem>) -> Self {
        self.options(move |_, _| items.clone())
    }

    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: Fn(&Lookup<'_>, FieldId) -> Value + Send + Sync + 'static,
    {
        self.compute = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> FieldKind {
        let converter = self
            .converter
            .unwrap_or_else(|| converter_for(self.value_kind, self.element_kind));
        let mut validator = Validator::new(self.bounds);
        for check in self.checks {
            validator = validator.with_check(check);
        }
        if let Some(bean) = self.bean {
            validator = validator.with_bean(bean);
        }
        FieldKind {
            name: self.name,
            value_kind: self.value_kind,
            element_kind: self.element_kind,
            converter,
            validator,
            pattern: self.pattern,
            trim: self.trim,
            validate_eagerly: self.validate_eagerly,
            never_auto_clear: self.never_auto_clear,
            default_value: self.default_value,
            options: self.options,
            compute: self.compute,
        }
    }
}

/// Frozen set of field kinds, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct FieldRegistry {
    kinds: HashMap<String, Arc<FieldKind>>,
}

impl FieldRegistry {
    pub fn builder() -> FieldRegistryBuilder {
        FieldRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Result<Arc<FieldKind>> {
        self.kinds
            .get(name)
            .cloned()
            .ok_or_else(|| BindError::UnknownKind(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FieldRegistryBuilder {
    kinds: HashMap<String, Arc<FieldKind>>,
}

impl FieldRegistryBuilder {
    /// Registers a kind; a later registration with the same name replaces it.
    pub fn register(mut self, kind: FieldKind) -> Self {
        self.kinds.insert(kind.name.clone(), Arc::new(kind));
        self
    }

    pub fn build(self) -> FieldRegistry {
        FieldRegistry { kinds: self.kinds }
    }
}
