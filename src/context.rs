//! Operations scoped to a single task id.
//!
//! Flow code usually deals with one well-known task (for example
//! [`COMPLETE_OAUTH_FLOW_TASK`](crate::COMPLETE_OAUTH_FLOW_TASK)) across
//! several steps: create it when the flow starts, add key material before
//! polling for verification, finish it from whichever tab gets there first.
//! [`PendingTaskContext`] binds the id once so each step is a single call.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use pending_tasks::registry::memory::TabDirectory;
//! use pending_tasks::store::memory::InMemoryStorage;
//! use pending_tasks::{PendingTasks, TaskData, TaskError, COMPLETE_OAUTH_FLOW_TASK, KEY_FETCH_TOKEN};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let directory = TabDirectory::new();
//! let tab = directory.register();
//! tab.mark_ready();
//! let tasks = PendingTasks::new(Arc::new(InMemoryStorage::new()), Arc::new(tab));
//!
//! let flow = tasks.scoped(COMPLETE_OAUTH_FLOW_TASK);
//! flow.create(TaskData::new()).await.unwrap();
//! flow.set(KEY_FETCH_TOKEN, json!("kft")).await.unwrap();
//!
//! let token: Option<String> = flow.get_typed(KEY_FETCH_TOKEN).await.unwrap();
//! assert_eq!(token.as_deref(), Some("kft"));
//!
//! let done = flow.finish(|_record| async { Ok::<_, TaskError>(()) }).await.unwrap();
//! assert!(done.is_some());
//! # });
//! ```

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::coordinator::PendingTasks;
use crate::domain::{TaskData, TaskRecord};
use crate::error::TaskError;

/// A [`PendingTasks`] handle bound to one task id.
///
/// `Clone + Send + Sync`; cloning is cheap.
#[derive(Debug, Clone)]
pub struct PendingTaskContext {
    tasks: PendingTasks,
    task_id: String,
}

impl PendingTaskContext {
    /// Binds `tasks` to `task_id`.
    pub fn new(tasks: PendingTasks, task_id: String) -> Self {
        Self { tasks, task_id }
    }

    /// The task id this context is bound to.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The underlying coordinator.
    pub fn tasks(&self) -> &PendingTasks {
        &self.tasks
    }

    /// See [`PendingTasks::create`].
    pub async fn create(&self, data: TaskData) -> Result<(), TaskError> {
        self.tasks.create(&self.task_id, data).await
    }

    /// See [`PendingTasks::retrieve`].
    pub async fn retrieve(&self) -> Result<Option<TaskRecord>, TaskError> {
        self.tasks.retrieve(&self.task_id).await
    }

    /// See [`PendingTasks::retrieve_with_cancel`].
    pub async fn retrieve_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskRecord>, TaskError> {
        self.tasks.retrieve_with_cancel(&self.task_id, cancel).await
    }

    /// See [`PendingTasks::update`].
    pub async fn update(&self, partial: TaskData) -> Result<(), TaskError> {
        self.tasks.update(&self.task_id, partial).await
    }

    /// Merges a single key into the task's data.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task does not exist.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), TaskError> {
        let mut partial = TaskData::new();
        partial.insert(key.to_string(), value);
        self.update(partial).await
    }

    /// See [`PendingTasks::clear`].
    pub async fn clear(&self) -> Result<(), TaskError> {
        self.tasks.clear(&self.task_id).await
    }

    /// See [`PendingTasks::finish`].
    pub async fn finish<F, Fut, T, E>(&self, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(TaskRecord) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TaskError>,
    {
        self.tasks.finish(&self.task_id, f).await
    }

    /// Reads one data value, retrieving (and so possibly claiming or
    /// waiting for) the task first.
    ///
    /// Returns `Ok(None)` if the task or the key does not exist.
    pub async fn get_data(&self, key: &str) -> Result<Option<Value>, TaskError> {
        Ok(self
            .retrieve()
            .await?
            .and_then(|record| record.get(key).cloned()))
    }

    /// Like [`get_data`](Self::get_data), deserialized into `T`.
    ///
    /// A value that does not match `T` reads as `None`.
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TaskError> {
        Ok(self
            .retrieve()
            .await?
            .and_then(|record| record.get_typed(key)))
    }
}
