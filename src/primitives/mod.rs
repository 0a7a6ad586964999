//! DOM Primitives - The building blocks of the binding pass.
//!
//! This module provides the pure pieces the binding pass is assembled from:
//! - [`expr`] - Path lookup and the condition language of `data-m-if` /
//!   `data-m-class`
//! - [`transforms`] - The `|upper|trim` pipe chain of `data-m-bind`
//! - [`control_flow`] - Visibility toggling and keyed list reconciliation
//!
//! # Architecture
//!
//! None of these own state. They read a value graph (and route parameters)
//! and write to a [`Document`](crate::engine::Document) they are handed:
//!
//! ```text
//! state ──lookup/evaluate──► bool / text ──show/set_text──► Document
//! state array ──reconcile──► keyed children
//! ```

pub mod control_flow;
pub mod expr;
pub mod transforms;

pub use control_flow::{keyed_children, reconcile, show, ReconcileStats};
pub use expr::{evaluate, Scope};
pub use transforms::{apply_transforms, split_bind};
