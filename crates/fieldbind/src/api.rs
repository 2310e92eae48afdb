//! # API Facade
//!
//! [`Binder`] is the single entry point the surrounding UI layer talks to. It
//! owns a [`Form`], a [`DataSource`], a [`MessageSink`], the decorator chain
//! and the undo/redo history, and runs every operation through them in order:
//!
//! ```text
//! set_value(container)
//!   trim ─► convert ─┬─ failure: retain as invalid value, post message, stop
//!                    ▼
//!               validate ─┬─ failure: retain as invalid value, post messages, stop
//!                         ▼
//!               Command ─► before hooks ─┬─ veto: stop
//!                                        ▼
//!                 commit (local value or source, clear caches) ─► after hooks ─► History
//! ```
//!
//! Conversion and validation failures never surface as `Err`; they are
//! reported through [`SetOutcome`] and the message sink. An `Err` means an
//! unexpected failure (rule engine, data source, command) that no decorator
//! claimed.

use crate::cache::CacheController;
use crate::command::{Command, CommandDecorator, CommandDecoratorChain, Execution, History, Origin};
use crate::config::BindConfig;
use crate::container::ValueContainer;
use crate::context::{FormatProvider, StaticFormats};
use crate::convert::{ConversionContext, OptionItem};
use crate::error::{BindError, ConversionError, Result, ValidationError};
use crate::field::FieldKind;
use crate::messages::{Catalog, Localizer, Message, MessageId, MessageLog, MessageSink};
use crate::source::DataSource;
use crate::state::{CacheKind, Slot};
use crate::tree::{FieldId, Form, Lookup};
use crate::value::Value;
use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What became of a `set_value` (or an executed command).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was committed; `changed` reports whether it differed.
    Committed { changed: bool },
    /// The text could not be converted. It is kept as the invalid value.
    ConversionFailed,
    /// The value failed validation. It is kept as the invalid value.
    Invalid,
    /// A decorator declined the command.
    Vetoed,
    /// The command failed and a decorator claimed the failure.
    FailureHandled,
}

impl SetOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SetOutcome::Committed { .. })
    }
}

impl From<Execution> for SetOutcome {
    fn from(execution: Execution) -> Self {
        match execution {
            Execution::Done => SetOutcome::Committed { changed: true },
            Execution::Vetoed => SetOutcome::Vetoed,
            Execution::Handled => SetOutcome::FailureHandled,
        }
    }
}

/// Result of an explicit validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub valid: bool,
    /// Validity differs from the previous pass
    pub changed: bool,
}

/// Checks a typed value against the field: it must be of the field's kind
/// and survive a format/parse round trip. Blank values become `Null`.
fn fit_typed(
    kind: &FieldKind,
    value: Value,
    ctxt: &ConversionContext,
) -> std::result::Result<Value, ConversionError> {
    let shown = value.to_string();
    let Some(value) = kind.coerce(value) else {
        return Err(ctxt.failure(
            "conversion.kind",
            &[shown, kind.value_kind.to_string()],
        ));
    };
    let text = kind.converter.format(&value, ctxt);
    match kind.converter.parse(&text, ctxt) {
        Ok(back) if back == value => Ok(value),
        Ok(Value::Null) if value.is_empty() => Ok(Value::Null),
        Ok(_) => Err(ctxt.conversion_failure(&shown)),
        Err(e) => Err(e),
    }
}

/// Everything a command touches; kept apart from the decorator chain and the
/// history so both can be borrowed while a command runs.
struct Core<S, M> {
    form: Form,
    source: S,
    sink: M,
    config: BindConfig,
    formats: Box<dyn FormatProvider>,
    localizer: Arc<dyn Localizer + Send + Sync>,
}

impl<S: DataSource, M: MessageSink> Core<S, M> {
    /// Local value, then data source, then the kind's default. No caching.
    fn current_value(&self, id: FieldId, kind: &FieldKind) -> Result<Value> {
        if let Some(Slot::Set(local)) = self.form.state(id).map(|s| s.local()) {
            return Ok(local.clone());
        }
        if let Some(path) = self.form.binding(id) {
            if let Some(value) = self.source.read(path)? {
                return Ok(value);
            }
        }
        Ok(kind.default_value.clone())
    }

    fn get_value(&mut self, id: FieldId) -> Result<Value> {
        let kind = self.form.kind(id)?;
        if kind.is_computed() {
            if let Some(cached) = self.form.state(id).and_then(|s| s.cached_value()) {
                return Ok(cached.clone());
            }
            let value = {
                let lookup = Lookup::new(&self.form, &self.source);
                kind.compute(&lookup, id).unwrap_or_default()
            };
            trace!(field = %id, "Computed value cached");
            self.form.state_mut(id)?.store_cached_value(value.clone());
            return Ok(value);
        }

        let value = self.current_value(id, &kind)?;
        if self.form.binding(id).is_some() {
            self.form.state_mut(id)?.snapshot_original(value.clone());
        }
        Ok(value)
    }

    fn options(&mut self, id: FieldId) -> Result<Vec<OptionItem>> {
        let kind = self.form.kind(id)?;
        if !kind.has_options() {
            return Ok(Vec::new());
        }
        if let Some(cached) = self.form.state(id).and_then(|s| s.cached_options()) {
            return Ok(cached.to_vec());
        }
        let items = {
            let lookup = Lookup::new(&self.form, &self.source);
            kind.options(&lookup, id).unwrap_or_default()
        };
        self.form.state_mut(id)?.store_cached_options(items.clone());
        Ok(items)
    }

    fn context(&mut self, id: FieldId, kind: &FieldKind) -> Result<ConversionContext> {
        let path = self.form.path(id);
        let options = if kind.has_options() {
            Some(self.options(id)?)
        } else {
            None
        };
        let label = self.form.label(id)?.to_string();
        Ok(ConversionContext::new(
            label,
            self.formats.locale(&path),
            self.formats.timezone(&path),
            Arc::clone(&self.localizer),
        )
        .with_pattern(self.formats.pattern(&path).or_else(|| kind.pattern.clone()))
        .with_options(options))
    }

    /// Hidden, disabled and read-only fields are never validated.
    fn validation_applies(&mut self, id: FieldId) -> bool {
        self.form.is_visible(id) && self.form.is_enabled(id) && !self.form.is_read_only(id)
    }

    fn post_conversion_error(&mut self, id: FieldId, text: &str, err: &ConversionError) -> MessageId {
        self.sink.clear_field(id);
        self.sink.post(
            Message::error(id, err.key.clone(), err.message.clone())
                .with_args(vec![text.to_string()]),
        )
    }

    /// Replaces the field's messages with one per error. Returns the first id.
    fn post_validation_errors(
        &mut self,
        id: FieldId,
        label: &str,
        errors: &[ValidationError],
    ) -> Option<MessageId> {
        self.sink.clear_field(id);
        let mut first = None;
        for err in errors {
            let args = err.message_args();
            let text = self.localizer.localize(label, err.message_key(), &args);
            let mid = self
                .sink
                .post(Message::error(id, err.message_key(), text).with_args(args));
            if first.is_none() {
                first = Some(mid);
            }
        }
        first
    }

    /// Writes the command's new value and invalidates what depends on it.
    fn apply(&mut self, cmd: &Command) -> Result<()> {
        let id = cmd.target();
        let kind = self.form.kind(id)?;
        if kind.is_computed() {
            return Err(BindError::Command(format!(
                "{} is computed and cannot be set",
                self.form.path(id)
            )));
        }
        let current = self.current_value(id, &kind)?;
        let value = cmd.new_value().clone();

        match self.form.binding(id).map(str::to_string) {
            Some(path) => {
                self.form.state_mut(id)?.snapshot_original(current);
                self.source.write(&path, value)?;
            }
            None => {
                let state = self.form.state_mut(id)?;
                state.snapshot_original(current);
                state.set_local(value);
            }
        }

        self.form.state_mut(id)?.clear_invalid();
        self.sink.clear_field(id);
        let mut caches = CacheController::new(&mut self.form);
        caches.clear(id, CacheKind::COMPUTED);
        caches.clear_along_context_chain(id, true, CacheKind::COMPUTED);
        debug!(field = %id, command = %cmd.id(), "Committed");
        Ok(())
    }
}

/// The attribute value pipeline over one field tree.
pub struct Binder<S: DataSource, M: MessageSink = MessageLog> {
    core: Core<S, M>,
    decorators: CommandDecoratorChain,
    history: History,
}

impl<S: DataSource> Binder<S, MessageLog> {
    pub fn new(form: Form, source: S, config: BindConfig) -> Result<Self> {
        Binder::with_sink(form, source, MessageLog::new(), config)
    }
}

impl<S: DataSource, M: MessageSink> Binder<S, M> {
    pub fn with_sink(form: Form, source: S, sink: M, config: BindConfig) -> Result<Self> {
        let formats = StaticFormats::from_config(&config)?;
        Ok(Self {
            history: History::from_config(&config),
            decorators: CommandDecoratorChain::new(),
            core: Core {
                form,
                source,
                sink,
                config,
                formats: Box::new(formats),
                localizer: Arc::new(Catalog::new()),
            },
        })
    }

    pub fn with_formats(mut self, formats: impl FormatProvider + 'static) -> Self {
        self.core.formats = Box::new(formats);
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer + Send + Sync>) -> Self {
        self.core.localizer = localizer;
        self
    }

    pub fn form(&self) -> &Form {
        &self.core.form
    }

    /// Structural access (visibility, labels, bindings).
    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.core.form
    }

    pub fn source(&self) -> &S {
        &self.core.source
    }

    pub fn sink(&self) -> &M {
        &self.core.sink
    }

    pub fn config(&self) -> &BindConfig {
        &self.core.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Field at a dotted path.
    pub fn field(&self, path: &str) -> Result<FieldId> {
        self.core.form.find(path)
    }

    pub fn register_decorator(&mut self, decorator: Rc<dyn CommandDecorator>) {
        self.decorators.register(decorator);
    }

    /// Runs `cmd` through the decorator chain. Failures are offered to
    /// exception-aware decorators and re-raised unless one claims them.
    fn run(
        core: &mut Core<S, M>,
        decorators: &CommandDecoratorChain,
        cmd: &Command,
        origin: Origin,
    ) -> Result<Execution> {
        if !decorators.before_all(cmd, origin) {
            return Ok(Execution::Vetoed);
        }
        match core.apply(cmd) {
            Ok(()) => {
                decorators.after_all(cmd, origin);
                Ok(Execution::Done)
            }
            Err(e) => Self::fail(decorators, cmd, e),
        }
    }

    fn fail(decorators: &CommandDecoratorChain, cmd: &Command, err: BindError) -> Result<Execution> {
        if decorators.on_exception(cmd, &err) {
            return Err(err);
        }
        warn!(command = %cmd.id(), error = %err, "Failure claimed by decorator");
        Ok(Execution::Handled)
    }

    /// Converts, validates and commits one value.
    pub fn set_value(&mut self, id: FieldId, mut container: ValueContainer<Value>) -> Result<SetOutcome> {
        if container.is_empty() {
            return Err(BindError::EmptyContainer);
        }
        let kind = self.core.form.kind(id)?;
        if kind.is_computed() {
            return Err(BindError::Command(format!(
                "{} is computed and cannot be set",
                self.core.form.path(id)
            )));
        }

        if kind.trim.unwrap_or(self.core.config.trim_input) {
            container.map_text(|text| text.trim().to_string());
        }

        let value = if container.has_text() {
            let text = container.text().unwrap_or_default().to_string();
            let ctxt = self.core.context(id, &kind)?;
            match kind.converter.parse(&text, &ctxt) {
                Ok(value) => {
                    container.set_value(value.clone());
                    value
                }
                Err(e) => {
                    debug!(field = %id, error = %e, "Conversion failed");
                    let mid = self.core.post_conversion_error(id, &text, &e);
                    self.core.form.state_mut(id)?.set_unconverted(container, Some(mid));
                    return Ok(SetOutcome::ConversionFailed);
                }
            }
        } else {
            let typed = container.value().cloned().unwrap_or_default();
            let ctxt = self.core.context(id, &kind)?;
            match fit_typed(&kind, typed, &ctxt) {
                Ok(value) => {
                    container.set_value(value.clone());
                    value
                }
                Err(e) => {
                    let shown = container.value().map(Value::to_string).unwrap_or_default();
                    debug!(field = %id, error = %e, "Typed value rejected");
                    let mid = self.core.post_conversion_error(id, &shown, &e);
                    self.core.form.state_mut(id)?.set_unconverted(container, Some(mid));
                    return Ok(SetOutcome::ConversionFailed);
                }
            }
        };

        let current = self.core.current_value(id, &kind)?;
        let cmd = Command::new(id, current, value.clone());

        let eager = kind.validate_eagerly.unwrap_or(self.core.config.validate_eagerly);
        if eager && self.core.validation_applies(id) {
            let label = self.core.form.label(id)?.to_string();
            let report = match kind.validator.validate(&label, &value) {
                Ok(report) => report,
                Err(e) => {
                    Self::fail(&self.decorators, &cmd, e)?;
                    return Ok(SetOutcome::FailureHandled);
                }
            };
            if !report.is_valid() {
                let errors = report.errors();
                debug!(field = %id, errors = errors.len(), "Validation failed");
                let mid = self.core.post_validation_errors(id, &label, &errors);
                let state = self.core.form.state_mut(id)?;
                state.set_invalid(container, mid);
                state.record_validity(false);
                return Ok(SetOutcome::Invalid);
            }
            self.core.form.state_mut(id)?.record_validity(true);
        }

        if cmd.old() == cmd.new_value() {
            // nothing to record, but a pending invalid value is resolved
            if let Some(state) = self.core.form.existing_state_mut(id) {
                if state.clear_invalid() {
                    self.core.sink.clear_field(id);
                }
            }
            return Ok(SetOutcome::Committed { changed: false });
        }

        let execution = Self::run(&mut self.core, &self.decorators, &cmd, Origin::User)?;
        if execution == Execution::Done {
            self.history.command_done(cmd, Origin::User);
        }
        Ok(execution.into())
    }

    /// Shorthand for a text container.
    pub fn set_text(&mut self, id: FieldId, text: &str) -> Result<SetOutcome> {
        self.set_value(id, ValueContainer::from_text(text))
    }

    /// Current value: computed (cached), local, data source, or default.
    pub fn get_value(&mut self, id: FieldId) -> Result<Value> {
        self.core.get_value(id)
    }

    /// What the field displays: the retained invalid input if any, otherwise
    /// the formatted current value.
    pub fn display_text(&mut self, id: FieldId) -> Result<String> {
        let kind = self.core.form.kind(id)?;
        let invalid = self
            .core
            .form
            .state(id)
            .and_then(|s| s.invalid())
            .cloned();
        if let Some(text) = invalid.as_ref().and_then(|c| c.text()) {
            return Ok(text.to_string());
        }
        let value = match invalid.and_then(|c| c.into_value()) {
            Some(value) => value,
            None => self.core.get_value(id)?,
        };
        let ctxt = self.core.context(id, &kind)?;
        Ok(kind.converter.format(&value, &ctxt))
    }

    pub fn invalid_value(&self, id: FieldId) -> Option<&ValueContainer<Value>> {
        self.core.form.state(id).and_then(|s| s.invalid())
    }

    /// Current value differs from the snapshotted original.
    pub fn is_changed(&self, id: FieldId) -> Result<bool> {
        let kind = self.core.form.kind(id)?;
        if kind.is_computed() {
            return Ok(false);
        }
        let current = self.core.current_value(id, &kind)?;
        Ok(self
            .core
            .form
            .state(id)
            .is_some_and(|s| s.is_changed(&current)))
    }

    /// Current option set, cached until `CacheKind::Options` is cleared.
    pub fn options(&mut self, id: FieldId) -> Result<Vec<OptionItem>> {
        self.core.options(id)
    }

    /// Drops the retained invalid value and the field's messages.
    pub fn clear_invalid_value(&mut self, id: FieldId) -> Result<bool> {
        self.core.form.kind(id)?;
        let cleared = self
            .core
            .form
            .existing_state_mut(id)
            .is_some_and(|s| s.clear_invalid());
        if cleared {
            self.core.sink.clear_field(id);
        }
        Ok(cleared)
    }

    /// Dismisses a message. A field message takes the field's retained
    /// invalid value with it.
    pub fn dismiss_message(&mut self, message: MessageId) -> Option<Message> {
        let dismissed = self.core.sink.dismiss(message)?;
        if let Some(field) = dismissed.field {
            if let Some(state) = self.core.form.existing_state_mut(field) {
                if state.clear_invalid() {
                    trace!(%field, %message, "Invalid value released with its message");
                }
            }
        }
        Some(dismissed)
    }

    pub fn clear_cache(&mut self, id: FieldId, kinds: &[CacheKind]) -> Result<bool> {
        self.core.form.name(id)?;
        Ok(CacheController::new(&mut self.core.form).clear(id, kinds))
    }

    pub fn clear_subtree(&mut self, id: FieldId, kinds: &[CacheKind]) -> Result<usize> {
        self.core.form.name(id)?;
        Ok(CacheController::new(&mut self.core.form).clear_subtree(id, kinds))
    }

    pub fn clear_context_chain(
        &mut self,
        id: FieldId,
        include_root: bool,
        kinds: &[CacheKind],
    ) -> Result<usize> {
        self.core.form.name(id)?;
        Ok(CacheController::new(&mut self.core.form).clear_along_context_chain(id, include_root, kinds))
    }

    /// Re-validates the field's current (or pending invalid) value.
    ///
    /// A field still holding a conversion error is invalid without running
    /// the validators. Gated fields are reported valid and leave the
    /// transition state alone.
    pub fn validate(&mut self, id: FieldId) -> Result<Validity> {
        let kind = self.core.form.kind(id)?;
        if !self.core.validation_applies(id) {
            return Ok(Validity {
                valid: true,
                changed: false,
            });
        }
        let (conversion_error, pending) = match self.core.form.state(id) {
            Some(state) => (
                state.has_conversion_error(),
                state.invalid().and_then(|c| c.value().cloned()),
            ),
            None => (false, None),
        };
        if conversion_error {
            let changed = self.core.form.state_mut(id)?.record_validity(false);
            return Ok(Validity {
                valid: false,
                changed,
            });
        }
        let value = match pending {
            Some(value) => value,
            None => self.core.get_value(id)?,
        };

        let label = self.core.form.label(id)?.to_string();
        let report = kind.validator.validate(&label, &value)?;
        let valid = report.is_valid();
        if valid {
            self.core.sink.clear_field(id);
        } else {
            self.core
                .post_validation_errors(id, &label, &report.errors());
        }
        let changed = self.core.form.state_mut(id)?.record_validity(valid);
        if changed {
            debug!(field = %id, valid, "Validity changed");
        }
        Ok(Validity { valid, changed })
    }

    /// Validates every field. Returns whether all of them are valid.
    pub fn validate_all(&mut self) -> Result<bool> {
        let mut all_valid = true;
        for id in self.core.form.fields() {
            all_valid &= self.validate(id)?.valid;
        }
        Ok(all_valid)
    }

    /// Restores the original value (as an undoable command) and drops any
    /// retained invalid value.
    pub fn revert(&mut self, id: FieldId) -> Result<SetOutcome> {
        let kind = self.core.form.kind(id)?;
        self.clear_invalid_value(id)?;
        let original = self
            .core
            .form
            .state(id)
            .and_then(|s| s.original().get().cloned());
        let Some(original) = original else {
            return Ok(SetOutcome::Committed { changed: false });
        };
        let current = self.core.current_value(id, &kind)?;
        if current == original {
            return Ok(SetOutcome::Committed { changed: false });
        }
        self.execute(Command::new(id, current, original))
    }

    /// Runs a command through the decorator chain and records it.
    pub fn execute(&mut self, cmd: Command) -> Result<SetOutcome> {
        let execution = Self::run(&mut self.core, &self.decorators, &cmd, Origin::User)?;
        if execution == Execution::Done {
            self.history.command_done(cmd, Origin::User);
        }
        Ok(execution.into())
    }

    /// Undoes the latest command. Returns whether anything was undone.
    pub fn undo_next(&mut self) -> Result<bool> {
        let core = &mut self.core;
        let decorators = &self.decorators;
        self.history
            .undo_next(|cmd, origin| Self::run(core, decorators, cmd, origin))
    }

    /// Replays the latest undone command. Returns whether anything was redone.
    pub fn redo_next(&mut self) -> Result<bool> {
        let core = &mut self.core;
        let decorators = &self.decorators;
        self.history
            .redo_next(|cmd, origin| Self::run(core, decorators, cmd, origin))
    }

    /// Resolves a named object shared across the tree, building it once.
    pub fn resolve_name<T, F>(&self, name: &str, init: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T>,
    {
        self.core.form.names().resolve(name, init)
    }
}
