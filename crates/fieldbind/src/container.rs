//! Dual string/typed value carrier.
//!
//! A [`ValueContainer`] travels through conversion and validation. It may carry
//! the raw text the user typed, the typed value, or both. Each form has its own
//! "is set" flag, so an explicitly null text form is distinct from an absent one.
//! A container with neither form set is empty and cannot be committed.

#[derive(Debug, Clone, PartialEq)]
pub struct ValueContainer<V> {
    text: Option<String>,
    has_text: bool,
    value: Option<V>,
    has_value: bool,
}

impl<V> Default for ValueContainer<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> ValueContainer<V> {
    pub fn empty() -> Self {
        Self {
            text: None,
            has_text: false,
            value: None,
            has_value: false,
        }
    }

    /// Container carrying user-entered text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            has_text: true,
            ..Self::empty()
        }
    }

    /// Container whose text form is set but null (e.g. a cleared input).
    pub fn null_text() -> Self {
        Self {
            has_text: true,
            ..Self::empty()
        }
    }

    /// Container carrying an already-typed value; conversion is skipped.
    pub fn from_value(value: V) -> Self {
        Self {
            value: Some(value),
            has_value: true,
            ..Self::empty()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.has_text && !self.has_value
    }

    pub fn has_text(&self) -> bool {
        self.has_text
    }

    pub fn has_value(&self) -> bool {
        self.has_value
    }

    /// The text form, `None` when absent or null.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }

    /// Records the typed form produced by conversion, keeping the text form.
    pub fn set_value(&mut self, value: V) {
        self.value = Some(value);
        self.has_value = true;
    }

    /// Rewrites the text form in place (trimming, normalization).
    pub fn map_text(&mut self, f: impl FnOnce(&str) -> String) {
        if let Some(text) = self.text.take() {
            self.text = Some(f(&text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_container_has_no_forms() {
        let c: ValueContainer<i64> = ValueContainer::empty();
        assert!(c.is_empty());
        assert!(!c.has_text());
        assert!(!c.has_value());
    }

    #[test]
    fn null_text_is_not_empty() {
        let c: ValueContainer<i64> = ValueContainer::null_text();
        assert!(!c.is_empty());
        assert!(c.has_text());
        assert_eq!(c.text(), None);
    }

    #[test]
    fn conversion_keeps_text_form() {
        let mut c = ValueContainer::from_text("42");
        c.set_value(42);
        assert_eq!(c.text(), Some("42"));
        assert_eq!(c.value(), Some(&42));
        assert!(c.has_text() && c.has_value());
    }

    #[test]
    fn map_text_skips_null_text() {
        let mut c: ValueContainer<i64> = ValueContainer::null_text();
        c.map_text(|t| t.trim().to_string());
        assert_eq!(c.text(), None);

        let mut c: ValueContainer<i64> = ValueContainer::from_text("  7 ");
        c.map_text(|t| t.trim().to_string());
        assert_eq!(c.text(), Some("7"));
    }
}
