//! # Field tree
//!
//! Bound fields live in a tree: groups (scopes) contain fields, and fields may
//! contain further fields. The pipeline only needs a narrow view of it, the
//! [`FieldTree`] trait: parent, children and whether a node was ever
//! initialized. [`Form`] is the arena-backed implementation used by
//! [`Binder`](crate::api::Binder).
//!
//! A node is *initialized* once its [`AttributeState`] has been created or one
//! of its tree-held caches (effective visibility, title) was filled. Marking a
//! node initialized also marks its ancestors, so a subtree walk can skip any
//! uninitialized node together with everything below it.

use crate::cache::{CacheController, CacheTarget};
use crate::error::{BindError, Result};
use crate::field::FieldKind;
use crate::names::NameRegistry;
use crate::source::DataSource;
use crate::state::{AttributeState, CacheKind, Slot};
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Index of a node in a [`Form`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId(usize);

impl FieldId {
    pub fn from_raw(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Traversal primitive the cache protocol walks.
pub trait FieldTree {
    fn root(&self) -> FieldId;

    fn parent(&self, id: FieldId) -> Option<FieldId>;

    fn children(&self, id: FieldId) -> &[FieldId];

    /// Whether the node ever allocated state or cache.
    fn is_initialized(&self, id: FieldId) -> bool;
}

#[derive(Debug)]
struct Node {
    name: String,
    label: String,
    kind: Option<Arc<FieldKind>>,
    parent: Option<FieldId>,
    children: Vec<FieldId>,
    visible: bool,
    enabled: bool,
    read_only: bool,
    /// Path into the data source, when bound
    binding: Option<String>,
    state: Option<AttributeState<Value>>,
    initialized: bool,
    visibility_cache: Option<bool>,
    title_cache: Option<String>,
}

impl Node {
    fn new(name: String, kind: Option<Arc<FieldKind>>, parent: Option<FieldId>) -> Self {
        Self {
            label: name.clone(),
            name,
            kind,
            parent,
            children: Vec::new(),
            visible: true,
            enabled: true,
            read_only: false,
            binding: None,
            state: None,
            initialized: false,
            visibility_cache: None,
            title_cache: None,
        }
    }
}

/// Arena of groups and fields, rooted at a single top-level scope.
#[derive(Debug)]
pub struct Form {
    nodes: Vec<Node>,
    names: NameRegistry,
}

impl Form {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(name.into(), None, None)],
            names: NameRegistry::default(),
        }
    }

    fn node(&self, id: FieldId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(BindError::UnknownField(id))
    }

    fn node_mut(&mut self, id: FieldId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(BindError::UnknownField(id))
    }

    fn push(&mut self, parent: FieldId, name: String, kind: Option<Arc<FieldKind>>) -> Result<FieldId> {
        self.node(parent)?;
        if self.child_named(parent, &name).is_some() {
            return Err(BindError::UnknownPath(format!(
                "{}.{} already exists",
                self.path(parent),
                name
            )));
        }
        let id = FieldId(self.nodes.len());
        self.nodes.push(Node::new(name, kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Adds a scope without a value of its own.
    pub fn add_group(&mut self, parent: FieldId, name: impl Into<String>) -> Result<FieldId> {
        self.push(parent, name.into(), None)
    }

    pub fn add_field(
        &mut self,
        parent: FieldId,
        name: impl Into<String>,
        kind: Arc<FieldKind>,
    ) -> Result<FieldId> {
        self.push(parent, name.into(), Some(kind))
    }

    /// Binds a field to a data source path.
    pub fn bind(&mut self, id: FieldId, path: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.binding = Some(path.into());
        Ok(())
    }

    pub fn binding(&self, id: FieldId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.binding.as_deref())
    }

    pub fn set_label(&mut self, id: FieldId, label: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.label = label.into();
        CacheController::new(self).clear_subtree(id, &[CacheKind::Title]);
        Ok(())
    }

    pub fn label(&self, id: FieldId) -> Result<&str> {
        Ok(&self.node(id)?.label)
    }

    pub fn name(&self, id: FieldId) -> Result<&str> {
        Ok(&self.node(id)?.name)
    }

    fn child_named(&self, parent: FieldId, name: &str) -> Option<FieldId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].name == name)
    }

    /// Resolves a dotted path relative to the root, e.g. `"address.zip"`.
    pub fn find(&self, path: &str) -> Result<FieldId> {
        let mut current = self.root();
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = self
                .child_named(current, segment)
                .ok_or_else(|| BindError::UnknownPath(path.to_string()))?;
        }
        Ok(current)
    }

    /// Dotted path of a node, empty for the root.
    pub fn path(&self, id: FieldId) -> String {
        let mut segments: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .skip(1)
            .filter_map(|a| self.nodes.get(a.0).map(|n| n.name.as_str()))
            .collect();
        if id != self.root() {
            if let Some(node) = self.nodes.get(id.0) {
                segments.push(&node.name);
            }
        }
        segments.join(".")
    }

    /// Field kind of a value-carrying node. Groups have none.
    pub fn kind(&self, id: FieldId) -> Result<Arc<FieldKind>> {
        self.node(id)?
            .kind
            .clone()
            .ok_or(BindError::UnknownField(id))
    }

    /// Every node carrying a field kind, in insertion order.
    pub fn fields(&self) -> Vec<FieldId> {
        (0..self.nodes.len())
            .filter(|i| self.nodes[*i].kind.is_some())
            .map(FieldId)
            .collect()
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    pub fn set_visible(&mut self, id: FieldId, visible: bool) -> Result<()> {
        self.node_mut(id)?.visible = visible;
        CacheController::new(self).clear_subtree(id, &[CacheKind::Visibility]);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: FieldId, enabled: bool) -> Result<()> {
        self.node_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn set_read_only(&mut self, id: FieldId, read_only: bool) -> Result<()> {
        self.node_mut(id)?.read_only = read_only;
        Ok(())
    }

    /// Enabled itself and through every ancestor.
    pub fn is_enabled(&self, id: FieldId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.enabled)
            && self.ancestors(id).iter().all(|a| self.nodes[a.0].enabled)
    }

    /// Read-only itself or through any ancestor.
    pub fn is_read_only(&self, id: FieldId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.read_only)
            || self.ancestors(id).iter().any(|a| self.nodes[a.0].read_only)
    }

    /// Visible itself and through every ancestor. Cached per node.
    pub fn is_visible(&mut self, id: FieldId) -> bool {
        let Some(node) = self.nodes.get(id.0) else {
            return false;
        };
        if let Some(cached) = node.visibility_cache {
            return cached;
        }
        let visible = node.visible
            && self
                .ancestors(id)
                .iter()
                .all(|a| self.nodes[a.0].visible);
        self.nodes[id.0].visibility_cache = Some(visible);
        self.mark_initialized(id);
        visible
    }

    /// Labels from the top-level scope down, joined with " / ". Cached per node.
    pub fn title(&mut self, id: FieldId) -> Result<String> {
        if let Some(cached) = &self.node(id)?.title_cache {
            return Ok(cached.clone());
        }
        let mut labels: Vec<&str> = self
            .ancestors(id)
            .iter()
            .rev()
            .skip(1)
            .map(|a| self.nodes[a.0].label.as_str())
            .collect();
        if id != self.root() {
            labels.push(&self.nodes[id.0].label);
        }
        let title = labels.join(" / ");
        self.nodes[id.0].title_cache = Some(title.clone());
        self.mark_initialized(id);
        Ok(title)
    }

    pub fn state(&self, id: FieldId) -> Option<&AttributeState<Value>> {
        self.nodes.get(id.0).and_then(|n| n.state.as_ref())
    }

    /// The node's state if it was ever created. Never allocates.
    pub fn existing_state_mut(&mut self, id: FieldId) -> Option<&mut AttributeState<Value>> {
        self.nodes.get_mut(id.0).and_then(|n| n.state.as_mut())
    }

    /// The node's state, created on first use.
    pub fn state_mut(&mut self, id: FieldId) -> Result<&mut AttributeState<Value>> {
        self.node(id)?;
        if self.nodes[id.0].state.is_none() {
            self.nodes[id.0].state = Some(AttributeState::new());
            self.mark_initialized(id);
        }
        self.node_mut(id)?
            .state
            .as_mut()
            .ok_or(BindError::UnknownField(id))
    }

    /// Drops a node's state entirely. The node counts as uninitialized again
    /// unless one of its descendants is still initialized.
    pub fn discard_state(&mut self, id: FieldId) -> Result<()> {
        let children = {
            let node = self.node_mut(id)?;
            node.state = None;
            node.visibility_cache = None;
            node.title_cache = None;
            node.children.clone()
        };
        self.nodes[id.0].initialized = children.iter().any(|c| self.nodes[c.0].initialized);
        Ok(())
    }

    fn mark_initialized(&mut self, id: FieldId) {
        let mut current = Some(id);
        while let Some(n) = current {
            if self.nodes[n.0].initialized {
                break;
            }
            self.nodes[n.0].initialized = true;
            current = self.nodes[n.0].parent;
        }
    }

    /// Root-scope registry of lazily built named objects.
    pub fn names(&self) -> &NameRegistry {
        &self.names
    }
}

impl FieldTree for Form {
    fn root(&self) -> FieldId {
        FieldId(0)
    }

    fn parent(&self, id: FieldId) -> Option<FieldId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    fn children(&self, id: FieldId) -> &[FieldId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn is_initialized(&self, id: FieldId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.initialized)
    }
}

impl CacheTarget for Form {
    fn clear_node(&mut self, id: FieldId, kinds: &[CacheKind]) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let mut cleared = node.state.as_mut().is_some_and(|s| s.clear(kinds));
        for kind in kinds {
            match kind {
                CacheKind::Visibility => cleared |= node.visibility_cache.take().is_some(),
                CacheKind::Title => cleared |= node.title_cache.take().is_some(),
                CacheKind::Value | CacheKind::Options => {}
            }
        }
        cleared
    }

    fn never_auto_clear(&self, id: FieldId) -> bool {
        self.nodes
            .get(id.0)
            .and_then(|n| n.kind.as_ref())
            .is_some_and(|k| k.never_auto_clear)
    }
}

/// Read-only view handed to compute and option functions.
///
/// Values are read without touching caches: local value, then the computed
/// value, then the data source, then the kind's default.
pub struct Lookup<'a> {
    form: &'a Form,
    source: &'a dyn DataSource,
}

impl<'a> Lookup<'a> {
    pub fn new(form: &'a Form, source: &'a dyn DataSource) -> Self {
        Self { form, source }
    }

    pub fn form(&self) -> &Form {
        self.form
    }

    pub fn children(&self, id: FieldId) -> &[FieldId] {
        self.form.children(id)
    }

    pub fn value(&self, id: FieldId) -> Value {
        let Ok(kind) = self.form.kind(id) else {
            return Value::Null;
        };
        if let Some(Slot::Set(local)) = self.form.state(id).map(|s| s.local()) {
            return local.clone();
        }
        if let Some(value) = kind.compute(self, id) {
            return value;
        }
        if let Some(path) = self.form.binding(id) {
            match self.source.read(path) {
                Ok(Some(value)) => return value,
                Ok(None) => {}
                Err(e) => tracing::warn!(field = %id, path, error = %e, "Source read failed"),
            }
        }
        kind.default_value.clone()
    }

    /// Value of the field at a dotted path, `Null` when there is none.
    pub fn value_at(&self, path: &str) -> Value {
        self.form
            .find(path)
            .map(|id| self.value(id))
            .unwrap_or_default()
    }
}
