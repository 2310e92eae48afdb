//! Per-field mutable state.
//!
//! An [`AttributeState`] is created lazily the first time a field is mutated or
//! its cache is touched; fields that are never edited never allocate one.

use crate::container::ValueContainer;
use crate::convert::OptionItem;
use crate::messages::MessageId;

/// A value slot with a "never set" sentinel distinct from null.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot<V> {
    #[default]
    Unchanged,
    Set(V),
}

impl<V> Slot<V> {
    pub fn is_set(&self) -> bool {
        matches!(self, Slot::Set(_))
    }

    pub fn get(&self) -> Option<&V> {
        match self {
            Slot::Set(v) => Some(v),
            Slot::Unchanged => None,
        }
    }
}

/// Cache categories a field can hold.
///
/// `Value` and `Options` live in [`AttributeState`]; `Visibility` and `Title`
/// belong to the surrounding tree and are forwarded to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Value,
    Options,
    Visibility,
    Title,
}

impl CacheKind {
    pub const ALL: &'static [CacheKind] = &[
        CacheKind::Value,
        CacheKind::Options,
        CacheKind::Visibility,
        CacheKind::Title,
    ];

    /// What a committed change invalidates on the field itself.
    pub const COMPUTED: &'static [CacheKind] = &[CacheKind::Value, CacheKind::Options];
}

#[derive(Debug, Clone)]
pub struct AttributeState<V> {
    local: Slot<V>,
    original: Slot<V>,
    invalid: Option<ValueContainer<V>>,
    /// Message posted for the retained invalid value
    invalid_message: Option<MessageId>,
    /// The retained container never produced a usable typed value
    unconverted: bool,
    cached_value: Option<V>,
    cached_options: Option<Vec<OptionItem>>,
    /// Validity at the last `validate()`, for transition detection
    last_validity: Option<bool>,
}

impl<V> Default for AttributeState<V> {
    fn default() -> Self {
        Self {
            local: Slot::Unchanged,
            original: Slot::Unchanged,
            invalid: None,
            invalid_message: None,
            unconverted: false,
            cached_value: None,
            cached_options: None,
            last_validity: None,
        }
    }
}

impl<V: Clone + PartialEq> AttributeState<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(&self) -> &Slot<V> {
        &self.local
    }

    /// Writes the local value. Returns whether it differs from the previous
    /// local value (an `Unchanged` slot always counts as different).
    pub fn set_local(&mut self, value: V) -> bool {
        let changed = self.local.get() != Some(&value);
        self.local = Slot::Set(value);
        changed
    }

    pub fn original(&self) -> &Slot<V> {
        &self.original
    }

    /// Snapshots the original value once; later calls are ignored.
    pub fn snapshot_original(&mut self, value: V) {
        if !self.original.is_set() {
            self.original = Slot::Set(value);
        }
    }

    /// Makes `value` the new baseline for change detection.
    pub fn reset_original(&mut self, value: V) {
        self.original = Slot::Set(value);
    }

    /// `current != original`, sentinel-aware: a field whose original was
    /// never captured has not changed.
    pub fn is_changed(&self, current: &V) -> bool {
        match &self.original {
            Slot::Set(original) => original != current,
            Slot::Unchanged => false,
        }
    }

    pub fn invalid(&self) -> Option<&ValueContainer<V>> {
        self.invalid.as_ref()
    }

    pub fn invalid_message(&self) -> Option<MessageId> {
        self.invalid_message
    }

    pub fn set_invalid(&mut self, container: ValueContainer<V>, message: Option<MessageId>) {
        self.invalid = Some(container);
        self.invalid_message = message;
        self.unconverted = false;
    }

    /// Retains a container that failed conversion, even one carrying a typed
    /// value of the wrong kind.
    pub fn set_unconverted(&mut self, container: ValueContainer<V>, message: Option<MessageId>) {
        self.set_invalid(container, message);
        self.unconverted = true;
    }

    /// Drops the retained invalid value. Returns whether there was one.
    pub fn clear_invalid(&mut self) -> bool {
        self.invalid_message = None;
        self.unconverted = false;
        self.invalid.take().is_some()
    }

    /// True while the field holds input that failed conversion.
    pub fn has_conversion_error(&self) -> bool {
        self.invalid
            .as_ref()
            .is_some_and(|c| self.unconverted || !c.has_value())
    }

    pub fn cached_value(&self) -> Option<&V> {
        self.cached_value.as_ref()
    }

    pub fn store_cached_value(&mut self, value: V) {
        self.cached_value = Some(value);
    }

    pub fn cached_options(&self) -> Option<&[OptionItem]> {
        self.cached_options.as_deref()
    }

    pub fn store_cached_options(&mut self, options: Vec<OptionItem>) {
        self.cached_options = Some(options);
    }

    /// Clears the requested cache categories held here. Returns whether
    /// anything was actually cleared; clearing an empty cache is a no-op.
    pub fn clear(&mut self, kinds: &[CacheKind]) -> bool {
        let mut cleared = false;
        for kind in kinds {
            match kind {
                CacheKind::Value => cleared |= self.cached_value.take().is_some(),
                CacheKind::Options => cleared |= self.cached_options.take().is_some(),
                CacheKind::Visibility | CacheKind::Title => {}
            }
        }
        cleared
    }

    /// Records the validity of this pass. Returns `true` on a transition
    /// (including the first evaluation that finds the field invalid).
    pub fn record_validity(&mut self, valid: bool) -> bool {
        let previous = self.last_validity.replace(valid);
        previous.unwrap_or(true) != valid
    }
}
