//! Error types for pending task operations.
//!
//! [`StorageError`] is what a [`StorageBackend`](crate::store::StorageBackend)
//! reports. [`TaskError`] is what the coordinator surfaces; storage failures
//! pass through it untouched via [`TaskError::Storage`].
//!
//! Ownership contention is never an error. A contended
//! [`retrieve`](crate::PendingTasks::retrieve) just resolves later.

/// Errors raised by a key-value storage backend.
///
/// # Examples
///
/// ```
/// use pending_tasks::StorageError;
///
/// let err = StorageError::QuotaExceeded {
///     key: "__fxa_pending_tasks.t".to_string(),
///     needed_bytes: 2048,
///     limit_bytes: 1024,
/// };
/// assert!(err.to_string().contains("2048"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing the value would exceed the store's size limit.
    #[error("storage quota exceeded writing {key}: needs {needed_bytes} bytes, limit is {limit_bytes}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Total bytes the store would hold after the write.
        needed_bytes: usize,
        /// Configured limit.
        limit_bytes: usize,
    },

    /// The store cannot be used at all (e.g. disabled by the user agent).
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
    },

    /// Any other backend-specific failure.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description.
        message: String,
        /// Underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Errors that can occur during pending task operations.
///
/// # Examples
///
/// ```
/// use pending_tasks::TaskError;
///
/// let err = TaskError::NotFound {
///     task_id: "complete-oauth-flow".to_string(),
/// };
/// assert_eq!(err.to_string(), "pending task not found: complete-oauth-flow");
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Task ids must be non-empty.
    #[error("task id must not be empty")]
    InvalidTaskId,

    /// An update targeted a task that does not exist.
    #[error("pending task not found: {task_id}")]
    NotFound {
        /// The missing task.
        task_id: String,
    },

    /// The stored value could not be decoded as a task record.
    #[error("stored pending task {task_id} is corrupt: {source}")]
    Corrupt {
        /// The task whose record is unreadable.
        task_id: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The record could not be encoded for storage.
    #[error("failed to serialize pending task {task_id}: {source}")]
    Serialization {
        /// The task being written.
        task_id: String,
        /// Encoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The caller cancelled a retrieve while it was waiting on another owner.
    #[error("retrieve of pending task {task_id} was cancelled")]
    Cancelled {
        /// The task being waited on.
        task_id: String,
    },

    /// The retry strategy gave up waiting for the current owner.
    #[error("gave up waiting for pending task {task_id} after {attempts} attempts")]
    RetriesExhausted {
        /// The task being waited on.
        task_id: String,
        /// Number of waits performed before giving up.
        attempts: u32,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid coordinator configuration.
    #[error("invalid configuration: {message}")]
    Config {
        /// What is wrong with it.
        message: String,
    },
}

impl TaskError {
    /// Returns `true` when trying the same operation again later could
    /// succeed without any change on the caller's side.
    ///
    /// # Examples
    ///
    /// ```
    /// use pending_tasks::{StorageError, TaskError};
    ///
    /// let err = TaskError::Storage(StorageError::Unavailable {
    ///     message: "disabled".to_string(),
    /// });
    /// assert!(err.is_retryable());
    /// assert!(!TaskError::InvalidTaskId.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled { .. }
                | Self::RetriesExhausted { .. }
                | Self::Storage(StorageError::Unavailable { .. })
        )
    }
}
