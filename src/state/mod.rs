//! State Module - Runtime state management systems
//!
//! This module contains the state systems that power page interactivity:
//!
//! - **Observable** - Change-notifying wrapper over the JSON state graph
//! - **Events** - Synthetic events, per-node listeners, named handlers
//! - **Focus** - Active element, Tab order, focus traps, history
//! - **Timers** - Deferred widget work on a virtual clock
//! - **Storage** - Durable key/value backends for persistence

pub mod events;
pub mod focus;
pub mod observable;
pub mod storage;
pub mod timers;

pub use events::{Event, Handler, HandlerRegistry, Listener, ListenerRegistry, Modifiers};
pub use focus::FocusState;
pub use observable::{wrap, Change, ChangeKind, ChangeListener, ObservableState, Observed, StateScope};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageResult};
pub use timers::{Task, TimerId, Timers};
