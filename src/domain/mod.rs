//! Domain types for pending task coordination.
//!
//! [`TaskRecord`] is the single persisted entity: a task id, the data the
//! owning tab needs to finish the work, and the id of that owning tab.

pub mod record;

pub use record::*;
