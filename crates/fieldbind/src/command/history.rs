use super::{Command, Execution, Origin};
use crate::config::{BindConfig, RedoPolicy};
use crate::error::Result;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Bounded undo/redo queues.
///
/// Undo entries are forward commands; undoing runs their inverse. Redo entries
/// are forward commands too and are replayed as-is. Replays (`Origin::Undo`,
/// `Origin::Redo`) never reach [`History::command_done`]'s recording logic, so
/// a redo does not re-populate the undo queue.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Command>,
    redo: VecDeque<Command>,
    max_undo: usize,
    max_redo: usize,
    policy: RedoPolicy,
}

impl Default for History {
    fn default() -> Self {
        Self::from_config(&BindConfig::default())
    }
}

fn push_capped(queue: &mut VecDeque<Command>, cmd: Command, cap: usize, name: &str) {
    queue.push_back(cmd);
    while queue.len() > cap {
        if let Some(evicted) = queue.pop_front() {
            trace!(queue = name, command = %evicted.id(), "History entry evicted");
        }
    }
}

impl History {
    pub fn new(max_undo: usize, max_redo: usize, policy: RedoPolicy) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            max_undo,
            max_redo,
            policy,
        }
    }

    pub fn from_config(config: &BindConfig) -> Self {
        Self::new(config.max_undo_items, config.max_redo_items, config.redo_policy)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &Command> {
        self.undo.iter()
    }

    /// Oldest first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &Command> {
        self.redo.iter()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Records a successfully executed command.
    pub fn command_done(&mut self, cmd: Command, origin: Origin) {
        if origin != Origin::User {
            return;
        }
        if !cmd.is_reversible() {
            debug!(command = %cmd.id(), "Irreversible command, history cleared");
            self.clear();
            return;
        }
        push_capped(&mut self.undo, cmd, self.max_undo, "undo");
        if self.policy == RedoPolicy::Clear {
            self.redo.clear();
        }
    }

    /// Pops the latest undo entry and runs its inverse through `exec`.
    ///
    /// Returns `Ok(false)` when there was nothing to undo or the inverse did
    /// not run; in the latter case the entry stays on the undo queue.
    pub fn undo_next<F>(&mut self, mut exec: F) -> Result<bool>
    where
        F: FnMut(&Command, Origin) -> Result<Execution>,
    {
        let Some(cmd) = self.undo.pop_back() else {
            return Ok(false);
        };
        let Some(inverse) = cmd.inverse() else {
            return Ok(false);
        };
        match exec(&inverse, Origin::Undo) {
            Ok(Execution::Done) => {
                debug!(command = %cmd.id(), "Undone");
                if let Some(forward) = inverse.inverse() {
                    push_capped(&mut self.redo, forward, self.max_redo, "redo");
                }
                Ok(true)
            }
            Ok(_) => {
                self.undo.push_back(cmd);
                Ok(false)
            }
            Err(e) => {
                self.undo.push_back(cmd);
                Err(e)
            }
        }
    }

    /// Pops the latest redo entry and replays it through `exec`.
    pub fn redo_next<F>(&mut self, mut exec: F) -> Result<bool>
    where
        F: FnMut(&Command, Origin) -> Result<Execution>,
    {
        let Some(cmd) = self.redo.pop_back() else {
            return Ok(false);
        };
        match exec(&cmd, Origin::Redo) {
            Ok(Execution::Done) => {
                debug!(command = %cmd.id(), "Redone");
                Ok(true)
            }
            Ok(_) => {
                self.redo.push_back(cmd);
                Ok(false)
            }
            Err(e) => {
                self.redo.push_back(cmd);
                Err(e)
            }
        }
    }
}
