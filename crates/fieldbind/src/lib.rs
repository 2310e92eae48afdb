//! # Fieldbind Architecture
//!
//! Fieldbind is the **attribute value pipeline** of a data-binding layer: it sits between raw
//! user-entered text, a strongly typed domain value and a backing data source. Rendering,
//! transport and persistence belong to the layers around it.
//!
//! ## The Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Binder facade: set_value, get_value, validate, undo...   │
//! │  - Owns the form, the data source and the message sink      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Value Layer (container, convert/, validate/)               │
//! │  - ValueContainer carries text and/or typed value           │
//! │  - Converters parse and format under a ConversionContext    │
//! │  - Structural bounds, then bean-level rules                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  State Layer (state.rs, tree.rs, cache.rs)                  │
//! │  - Lazily created AttributeState per field                  │
//! │  - Cache invalidation over the field tree                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (command/)                                   │
//! │  - Every commit is a Command run through the decorators     │
//! │  - Bounded undo/redo History                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failures Are Messages
//!
//! A value that cannot be converted or fails validation is *not* an error for the caller:
//! - the rejected container is kept as the field's invalid value, so the user keeps editing
//!   what they typed
//! - one message per failure is posted to the [`messages::MessageSink`]
//! - the committed value stays untouched
//!
//! Only unexpected failures (a rule engine or data source breaking, a command that cannot be
//! applied) come back as [`error::BindError`], after decorators had the chance to claim them.
//!
//! ## Field Kinds
//!
//! Field behavior is configured, not subclassed. A [`field::FieldKind`] bundles value kind,
//! converter, validator, option provider and compute function. Kinds are built once through a
//! [`field::FieldRegistry`] and shared read-only by every field of that kind.
//!
//! ## Module Overview
//!
//! - [`api`]: The Binder facade, entry point for all operations
//! - [`value`]: `Value` and `ValueKind`
//! - [`container`]: `ValueContainer`
//! - [`convert`]: Converters and `ConversionContext`
//! - [`validate`]: Bounds, custom checks, bean rules
//! - [`field`]: Field kinds and registry
//! - [`state`]: Per-field `AttributeState`
//! - [`tree`]: Field tree and `Form`
//! - [`cache`]: Cache invalidation protocol
//! - [`command`]: Commands, decorators, undo/redo history
//! - [`source`]: Backing data sources
//! - [`messages`]: Message sink and localization
//! - [`context`]: Locale, timezone and pattern provider
//! - [`names`]: Named object resolution
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod cache;
pub mod command;
pub mod config;
pub mod container;
pub mod context;
pub mod convert;
pub mod error;
pub mod field;
pub mod messages;
pub mod names;
pub mod source;
pub mod state;
pub mod tree;
pub mod validate;
pub mod value;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use api::{Binder, SetOutcome, Validity};
pub use config::{BindConfig, RedoPolicy};
pub use container::ValueContainer;
pub use error::{BindError, Result};
pub use field::{FieldKind, FieldRegistry};
pub use tree::{FieldId, FieldTree, Form};
pub use value::{Value, ValueKind};
