//! Runtime Pipeline
//!
//! This module connects a manifest and a state graph to the document.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Manifest ─mount─► Runtime ─state change─► binding pass ─► Document
//!                      ▲                                      │
//!                      └──────────── dispatch(event) ◄────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. **mount** - Installs translations, theme and persisted state, wires
//!    directives and enhancements, then renders and resolves routes
//! 2. **binding** - One full pass over `data-m-if`, `data-m-class` and
//!    `data-m-bind` per state change
//! 3. **router** - Hash fragment to visible `data-m-route` sections and
//!    route parameters
//! 4. **dispatch** - Synthetic events through listeners, then default
//!    actions
//!
//! ## Key Design Principles
//!
//! - **One owner**: every piece of page state lives on [`Runtime`]
//! - **Synchronous**: a mutation has rendered by the time the call returns
//! - **Idempotent**: a pass over unchanged state rewrites nothing

pub mod binding;
pub mod dispatch;
pub mod manifest;
pub mod mount;
pub mod router;

pub use binding::RenderStats;
pub use manifest::{Locales, Manifest};
pub use mount::{parse_on, Runtime, OFFLINE_KEY, ON_ATTR};
pub use router::{fragment_from_hash, match_route, resolve, Resolution};
