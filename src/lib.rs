//! Cross-tab pending task coordination.
//!
//! Several tabs (or any independent execution contexts) that share one
//! origin-scoped key-value store use this crate to agree on which of them
//! finishes a long-running, side-effect-bearing operation, such as completing
//! an OAuth flow after the user verified their email in a second tab.
//!
//! # Overview
//!
//! A tab creates a named [`TaskRecord`] that it owns. Any tab may later
//! [`retrieve`](PendingTasks::retrieve) it: retrieval claims the record when
//! it is unowned or its owner is no longer live, and otherwise polls until
//! the owner finishes (the record disappears) or goes away.
//!
//! Coordination is best-effort. The store has no compare-and-swap, so two
//! tabs claiming an abandoned record at the same moment can both believe
//! they won; the later write decides the stored owner.
//!
//! # Module Organization
//!
//! - [`coordinator`] - [`PendingTasks`], the coordinator itself
//! - [`context`] - [`PendingTaskContext`], operations scoped to one task id
//! - [`domain`] - [`TaskRecord`] and data merge helpers
//! - [`store`] - [`StorageBackend`] port and the in-memory store
//! - [`registry`] - [`TabRegistry`] port, [`ReadyGate`] and the in-memory tab directory
//! - [`retry`] - Delay strategies for the contention loop
//! - [`config`] - [`CoordinatorConfig`]
//! - [`error`] - [`TaskError`] and [`StorageError`]
//! - [`constants`] - Namespace, defaults and well-known task ids
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use pending_tasks::registry::memory::TabDirectory;
//! use pending_tasks::store::memory::InMemoryStorage;
//! use pending_tasks::{PendingTasks, TaskData};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let storage = Arc::new(InMemoryStorage::new());
//! let directory = TabDirectory::new();
//! let tab = directory.register();
//! tab.mark_ready();
//!
//! let tasks = PendingTasks::new(storage, Arc::new(tab));
//! tasks.create("complete-oauth-flow", TaskData::new()).await.unwrap();
//!
//! let record = tasks.retrieve("complete-oauth-flow").await.unwrap().unwrap();
//! assert_eq!(record.owner.as_deref(), Some(tasks.tab_id()));
//! # });
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod registry;
pub mod retry;
pub mod store;

pub use config::CoordinatorConfig;
pub use constants::*;
pub use context::PendingTaskContext;
pub use coordinator::PendingTasks;
pub use domain::{TaskData, TaskRecord};
pub use error::{StorageError, TaskError};
pub use registry::{ReadyGate, TabRegistry};
pub use retry::{ExponentialBackoff, FixedDelay, RetryStrategy};
pub use store::StorageBackend;
