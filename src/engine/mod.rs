//! DOM Engine - Arena document, selectors and markup.
//!
//! The engine manages the core data structures:
//! - Registry: the [`Document`] arena, node allocation and tree mutation
//! - Node: one arena slot (kind, attributes, links, live properties)
//! - Selector: the query language used by `q`/`qa` and widget wiring
//! - Html: loading markup into the arena and serializing it back
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are indices into one arena:
//!
//! ```text
//! Index 0: Document (parent=None)
//! Index 1: <html>   (parent=0, children=[2, 3])
//! Index 2: <head>   (parent=1)
//! Index 3: <body>   (parent=1, children=[...])
//! ```
//!
//! Handles are `Copy`, released slots are reused, and the whole page can be
//! cloned or dropped as one value.

mod html;
mod node;
mod registry;
mod selector;

pub use node::*;
pub use registry::*;
pub use selector::SelectorList;
