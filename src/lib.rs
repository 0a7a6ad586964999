//! # spark-dom
//!
//! Manifest-driven reactive DOM runtime for Rust.
//!
//! ## Architecture
//!
//! A page is an in-memory [`Document`] arena whose elements carry `data-m-*`
//! directives. A [`Runtime`] owns the document together with an observed
//! JSON state graph; every successful state write runs one full binding
//! pass that brings the document back in line with the state:
//!
//! ```text
//! Manifest ─► Runtime::mount ─► state ─change─► binding pass ─► Document
//!                                  ▲                              │
//!                                  └── handlers / input binding ◄─┘ dispatch
//! ```
//!
//! There is no dependency tracking and no virtual DOM. Passes are
//! idempotent, so re-rendering unchanged state touches nothing.
//!
//! ## Modules
//!
//! - [`types`] - Node handles, live flags, route params, value coercion
//! - [`engine`] - Document arena, selector queries, HTML load and serialize
//! - [`state`] - Observable state, events, focus, timers, storage
//! - [`primitives`] - Expression evaluator, pipes, visibility, keyed lists
//! - [`pipeline`] - The runtime: mount, binding pass, routing, dispatch
//! - [`enhance`] - Declarative widgets (`data-m-enhance`) and toasts
//! - [`theme`] - Utility stylesheet and theme tokens
//! - [`i18n`] - Locale tables and `data-m-tx`
//! - [`validate`] - Schema and form validation
//! - [`fetch`] - HTTP with retry and linear backoff
//! - [`config`] - Runtime configuration
//! - [`error`] - Error types

pub mod config;
pub mod engine;
pub mod enhance;
pub mod error;
pub mod fetch;
pub mod i18n;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod theme;
pub mod types;
pub mod validate;

// Re-export commonly used items
pub use types::{NodeFlags, NodeId, RouteParams};

pub use config::RuntimeConfig;

pub use engine::{Document, SelectorList};

pub use enhance::{Action, Enhancement};

pub use error::{DomError, FetchError, ManifestError, StorageError};

pub use fetch::{fetch_with_retry, FetchRequest, HttpTransport, Payload, RetryPolicy, Transport};

pub use i18n::Translations;

pub use pipeline::{Locales, Manifest, RenderStats, Resolution, Runtime};

pub use primitives::{evaluate, reconcile, ReconcileStats, Scope};

pub use state::{
    Change, ChangeKind, ChangeListener, Event, FileStorage, Handler, Listener, MemoryStorage,
    Modifiers, ObservableState, Observed, StateScope, Storage, Task,
};

pub use theme::Theme;

pub use validate::{validate_form, validate_schema, FieldError, ValidationReport};
