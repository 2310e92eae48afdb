use super::{Command, Origin};
use crate::error::BindError;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Hooks wrapped around command execution.
pub trait CommandDecorator {
    /// Returning `false` vetoes the command.
    fn before(&self, _cmd: &Command, _origin: Origin) -> bool {
        true
    }

    /// Runs after the command's action completed successfully.
    fn after(&self, _cmd: &Command, _origin: Origin) {}

    /// Decorators that want to see failures return themselves here.
    fn exception_handler(&self) -> Option<&dyn ExceptionDecorator> {
        None
    }
}

pub trait ExceptionDecorator {
    /// Returns `true` when the failure is handled and standard error handling
    /// should not run.
    fn on_exception(&self, cmd: &Command, err: &BindError) -> bool;
}

/// Ordered, append-only list of decorators.
///
/// Registration copies the list when a snapshot of it is still alive, so a
/// chain being iterated is never modified underneath the iteration.
#[derive(Clone, Default)]
pub struct CommandDecoratorChain {
    decorators: Rc<Vec<Rc<dyn CommandDecorator>>>,
}

impl fmt::Debug for CommandDecoratorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDecoratorChain")
            .field("len", &self.decorators.len())
            .finish()
    }
}

impl CommandDecoratorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, decorator: Rc<dyn CommandDecorator>) {
        Rc::make_mut(&mut self.decorators).push(decorator);
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Runs `before` hooks in order; the first veto stops the rest.
    pub fn before_all(&self, cmd: &Command, origin: Origin) -> bool {
        let snapshot = Rc::clone(&self.decorators);
        for (i, decorator) in snapshot.iter().enumerate() {
            if !decorator.before(cmd, origin) {
                debug!(command = %cmd.id(), decorator = i, ?origin, "Command vetoed");
                return false;
            }
        }
        true
    }

    pub fn after_all(&self, cmd: &Command, origin: Origin) {
        let snapshot = Rc::clone(&self.decorators);
        for decorator in snapshot.iter() {
            decorator.after(cmd, origin);
        }
    }

    /// Offers the failure to every exception-aware decorator. Returns whether
    /// standard handling should still proceed.
    pub fn on_exception(&self, cmd: &Command, err: &BindError) -> bool {
        let snapshot = Rc::clone(&self.decorators);
        let mut handled = false;
        for handler in snapshot.iter().filter_map(|d| d.exception_handler()) {
            handled |= handler.on_exception(cmd, err);
        }
        !handled
    }
}
