//! The pending task coordinator.
//!
//! [`PendingTasks`] stores [`TaskRecord`]s in a shared [`StorageBackend`]
//! and uses a [`TabRegistry`] to decide which tab finishes each task.
//!
//! # Ownership
//!
//! A record is owned by the tab that created it. [`retrieve`](PendingTasks::retrieve)
//! hands the record to the caller only once the caller's tab owns it:
//!
//! 1. No record: resolve `None`.
//! 2. Unowned, or owner not live: claim it (write our tab id as owner).
//! 3. Owned by us: resolve with the record.
//! 4. Owned by another live tab: wait per the [`RetryStrategy`], then go
//!    back to 1.
//!
//! Step 2's read and write are separate storage calls. Two tabs that read
//! an abandoned record at the same time can both claim it; the later write
//! wins in storage but both callers see themselves as owner. The store
//! offers no compare-and-swap, so this race is accepted rather than fixed.
//!
//! # Readiness
//!
//! Every operation waits for [`TabRegistry::ready`] before touching the
//! store, so liveness answers reflect a fully discovered tab list.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::CoordinatorConfig;
use crate::context::PendingTaskContext;
use crate::domain::{TaskData, TaskRecord};
use crate::error::TaskError;
use crate::registry::TabRegistry;
use crate::retry::RetryStrategy;
use crate::store::{make_key, StorageBackend};

/// Coordinates pending tasks between tabs sharing one store.
///
/// Cloning is cheap and yields a handle to the same store, registry and
/// settings, so a clone can be moved into a spawned task.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pending_tasks::registry::memory::TabDirectory;
/// use pending_tasks::store::memory::InMemoryStorage;
/// use pending_tasks::{PendingTasks, TaskData};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let storage = Arc::new(InMemoryStorage::new());
/// let directory = TabDirectory::new();
/// let tab = directory.register();
/// tab.mark_ready();
/// let tasks = PendingTasks::new(storage, Arc::new(tab));
///
/// tasks.create("t", TaskData::new()).await.unwrap();
///
/// let mut partial = TaskData::new();
/// partial.insert("keyFetchToken".to_string(), json!("kft"));
/// tasks.update("t", partial).await.unwrap();
///
/// let record = tasks.retrieve("t").await.unwrap().unwrap();
/// assert_eq!(record.get_str("keyFetchToken"), Some("kft"));
///
/// tasks.clear("t").await.unwrap();
/// assert!(tasks.retrieve("t").await.unwrap().is_none());
/// # });
/// ```
#[derive(Clone)]
pub struct PendingTasks {
    storage: Arc<dyn StorageBackend>,
    registry: Arc<dyn TabRegistry>,
    config: CoordinatorConfig,
    retry: Option<Arc<dyn RetryStrategy>>,
}

impl fmt::Debug for PendingTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTasks")
            .field("tab_id", &self.registry.tab_id())
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PendingTasks {
    /// Creates a coordinator with [`CoordinatorConfig::default`].
    pub fn new(storage: Arc<dyn StorageBackend>, registry: Arc<dyn TabRegistry>) -> Self {
        Self {
            storage,
            registry,
            config: CoordinatorConfig::default(),
            retry: None,
        }
    }

    /// Replaces the configuration after validating it.
    ///
    /// Unless [`with_retry_strategy`](Self::with_retry_strategy) is also
    /// used, the contention loop follows the config's poll interval and
    /// attempt cap.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if [`CoordinatorConfig::validate`]
    /// rejects `config`.
    pub fn with_config(mut self, config: CoordinatorConfig) -> Result<Self, TaskError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Uses `strategy` for the contention loop instead of the one derived
    /// from the config.
    pub fn with_retry_strategy(mut self, strategy: impl RetryStrategy + 'static) -> Self {
        self.retry = Some(Arc::new(strategy));
        self
    }

    /// Id of the tab this coordinator acts for.
    pub fn tab_id(&self) -> &str {
        self.registry.tab_id()
    }

    /// Current configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Returns a handle bound to task `id`.
    pub fn scoped(&self, id: impl Into<String>) -> PendingTaskContext {
        PendingTaskContext::new(self.clone(), id.into())
    }

    /// Stores a new record for `id`, owned by this tab.
    ///
    /// Any existing record with the same id is overwritten.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidTaskId`] for an empty id.
    /// - [`TaskError::Storage`] if the write fails.
    pub async fn create(&self, id: &str, data: TaskData) -> Result<(), TaskError> {
        let key = self.prepare(id).await?;
        let record = TaskRecord::new(id, data, self.tab_id());
        self.write_record(&key, &record)?;
        tracing::debug!(task_id = id, owner = self.tab_id(), "created pending task");
        Ok(())
    }

    /// Returns the record for `id` once this tab owns it, or `None` if
    /// there is no record.
    ///
    /// Waits (per the retry strategy) while another live tab owns the
    /// record. With the default strategy it never gives up: it resolves
    /// only when this tab claims the record or the record is cleared.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidTaskId`] for an empty id.
    /// - [`TaskError::RetriesExhausted`] if a bounded strategy gives up.
    /// - [`TaskError::Corrupt`] if the stored value is not a record.
    /// - [`TaskError::Storage`] on storage failure.
    pub async fn retrieve(&self, id: &str) -> Result<Option<TaskRecord>, TaskError> {
        self.retrieve_inner(id, None).await
    }

    /// Like [`retrieve`](Self::retrieve), but gives up with
    /// [`TaskError::Cancelled`] when `cancel` fires during a wait.
    ///
    /// The first read always happens, so a record that is free or already
    /// ours is returned even if `cancel` was triggered beforehand.
    pub async fn retrieve_with_cancel(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskRecord>, TaskError> {
        self.retrieve_inner(id, Some(cancel)).await
    }

    /// Shallow-merges `partial` into the data of the record for `id`.
    ///
    /// The owner is left as it is.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if there is no record for `id`.
    /// - [`TaskError::InvalidTaskId`], [`TaskError::Corrupt`],
    ///   [`TaskError::Storage`] as for other operations.
    pub async fn update(&self, id: &str, partial: TaskData) -> Result<(), TaskError> {
        let key = self.prepare(id).await?;
        let mut record = self.read_record(&key, id)?.ok_or_else(|| TaskError::NotFound {
            task_id: id.to_string(),
        })?;
        record.merge_data(partial);
        self.write_record(&key, &record)?;
        tracing::debug!(task_id = id, "updated pending task");
        Ok(())
    }

    /// Removes the record for `id`, whoever owns it. Clearing a missing
    /// record succeeds.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidTaskId`] for an empty id.
    /// - [`TaskError::Storage`] if the removal fails.
    pub async fn clear(&self, id: &str) -> Result<(), TaskError> {
        let key = self.prepare(id).await?;
        self.storage.remove(&key)?;
        tracing::debug!(task_id = id, "cleared pending task");
        Ok(())
    }

    /// Retrieves `id`, runs `f` on it, then clears it.
    ///
    /// Returns `Ok(None)` without calling `f` when there is no record
    /// (another tab already finished the task). The record is cleared
    /// whether `f` succeeds or fails. If `f` fails its error wins and a
    /// failed clear is only logged; if `f` succeeds a failed clear is
    /// returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use pending_tasks::registry::memory::TabDirectory;
    /// use pending_tasks::store::memory::InMemoryStorage;
    /// use pending_tasks::{PendingTasks, TaskData, TaskError};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let directory = TabDirectory::new();
    /// let tab = directory.register();
    /// tab.mark_ready();
    /// let tasks = PendingTasks::new(Arc::new(InMemoryStorage::new()), Arc::new(tab));
    ///
    /// tasks.create("t", TaskData::new()).await.unwrap();
    /// let sent = tasks
    ///     .finish("t", |record| async move { Ok::<_, TaskError>(record.id) })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(sent.as_deref(), Some("t"));
    ///
    /// // Already finished: the closure does not run again.
    /// let again = tasks
    ///     .finish("t", |_| async { Ok::<_, TaskError>("unreachable") })
    ///     .await
    ///     .unwrap();
    /// assert!(again.is_none());
    /// # });
    /// ```
    pub async fn finish<F, Fut, T, E>(&self, id: &str, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(TaskRecord) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TaskError>,
    {
        let Some(record) = self.retrieve(id).await? else {
            tracing::debug!(task_id = id, "pending task already finished elsewhere");
            return Ok(None);
        };

        let outcome = f(record).await;
        let cleared = self.clear(id).await;

        match (outcome, cleared) {
            (Ok(value), Ok(())) => {
                tracing::debug!(task_id = id, "finished pending task");
                Ok(Some(value))
            },
            (Ok(_), Err(clear_err)) => Err(clear_err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(clear_err)) => {
                tracing::warn!(
                    task_id = id,
                    error = %clear_err,
                    "failed to clear pending task after failed completion"
                );
                Err(err)
            },
        }
    }

    // ---- Internals ----

    async fn prepare(&self, id: &str) -> Result<String, TaskError> {
        if id.is_empty() {
            return Err(TaskError::InvalidTaskId);
        }
        self.registry.ready().await;
        Ok(make_key(&self.config.namespace, id))
    }

    fn read_record(&self, key: &str, id: &str) -> Result<Option<TaskRecord>, TaskError> {
        self.storage
            .get(key)?
            .map(|text| TaskRecord::from_json(id, &text))
            .transpose()
    }

    fn write_record(&self, key: &str, record: &TaskRecord) -> Result<(), TaskError> {
        let text = record.to_json()?;
        self.storage.set(key, &text)?;
        Ok(())
    }

    fn retry_strategy(&self) -> Arc<dyn RetryStrategy> {
        match &self.retry {
            Some(strategy) => strategy.clone(),
            None => Arc::new(self.config.retry_strategy()),
        }
    }

    async fn retrieve_inner(
        &self,
        id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<TaskRecord>, TaskError> {
        let key = self.prepare(id).await?;
        let strategy = self.retry_strategy();
        let me = self.tab_id();
        let mut attempt: u32 = 0;

        loop {
            let Some(mut record) = self.read_record(&key, id)? else {
                if attempt > 0 {
                    tracing::debug!(task_id = id, attempt, "pending task cleared while waiting");
                }
                return Ok(None);
            };

            let owner_live = record
                .owner
                .as_deref()
                .is_some_and(|owner| self.registry.is_live(owner));
            if !owner_live {
                match record.claim(me) {
                    Some(previous) if previous == me => tracing::debug!(
                        task_id = id,
                        owner = me,
                        "re-claiming own pending task after this tab went stale"
                    ),
                    Some(previous) => tracing::warn!(
                        task_id = id,
                        previous_owner = %previous,
                        owner = me,
                        "claiming pending task from tab that is no longer live"
                    ),
                    None => tracing::debug!(task_id = id, owner = me, "claiming unowned pending task"),
                }
                self.write_record(&key, &record)?;
            }

            if record.is_owned_by(me) {
                tracing::debug!(task_id = id, owner = me, attempt, "own pending task");
                return Ok(Some(record));
            }

            let Some(delay) = strategy.next_delay(attempt) else {
                return Err(TaskError::RetriesExhausted {
                    task_id: id.to_string(),
                    attempts: attempt,
                });
            };
            tracing::trace!(
                task_id = id,
                owner = record.owner.as_deref().unwrap_or_default(),
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "pending task owned by another live tab, waiting"
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {},
                        () = token.cancelled() => {
                            return Err(TaskError::Cancelled {
                                task_id: id.to_string(),
                            });
                        },
                    }
                },
                None => tokio::time::sleep(delay).await,
            }
            attempt = attempt.saturating_add(1);
        }
    }
}
