//! # Commands
//!
//! Every committed change is wrapped in a [`Command`]: target field, old value,
//! new value, and whether it can be inverted. Commands are immutable; undo
//! runs a command's [`inverse`](Command::inverse), redo runs the stored
//! forward command again.
//!
//! Execution goes through a [`CommandDecoratorChain`] (veto, observe, claim
//! failures) and successful executions are recorded in a [`History`].

use crate::tree::FieldId;
use crate::value::Value;
use uuid::Uuid;

mod decorator;
mod history;

pub use decorator::{CommandDecorator, CommandDecoratorChain, ExceptionDecorator};
pub use history::History;

/// Why a command is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: Uuid,
    target: FieldId,
    old: Value,
    new: Value,
    reversible: bool,
}

impl Command {
    /// An undoable change of `target` from `old` to `new`.
    pub fn new(target: FieldId, old: Value, new: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            old,
            new,
            reversible: true,
        }
    }

    /// A change without an inverse. Recording it wipes the history.
    pub fn irreversible(target: FieldId, old: Value, new: Value) -> Self {
        Self {
            reversible: false,
            ..Self::new(target, old, new)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> FieldId {
        self.target
    }

    pub fn old(&self) -> &Value {
        &self.old
    }

    pub fn new_value(&self) -> &Value {
        &self.new
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    /// The command that undoes this one. Its own inverse restores the
    /// forward change.
    pub fn inverse(&self) -> Option<Command> {
        self.reversible
            .then(|| Command::new(self.target, self.new.clone(), self.old.clone()))
    }

    /// Same change, different identity. Two commands with equal effects
    /// compare equal only through this.
    pub fn same_effect(&self, other: &Command) -> bool {
        self.target == other.target && self.old == other.old && self.new == other.new
    }
}

/// Result of running a command through the decorator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Done,
    /// A `before` hook declined.
    Vetoed,
    /// The action failed and a decorator claimed the failure.
    Handled,
}
