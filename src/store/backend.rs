//! Storage port and key helpers.
//!
//! [`StorageBackend`] is a dumb string-to-string store. Record encoding,
//! merging and ownership rules live in
//! [`PendingTasks`](crate::coordinator::PendingTasks), never here.
//!
//! # Key Structure
//!
//! Keys are `{namespace}.{task_id}`. Namespaces may not contain a `.`
//! (enforced by [`CoordinatorConfig::validate`](crate::CoordinatorConfig::validate)),
//! so the first separator always ends the namespace.

use crate::constants::KEY_SEPARATOR;
use crate::error::StorageError;

/// Synchronous key-value storage shared by every tab of an origin.
///
/// Implementations must be `Send + Sync` so a single store can back
/// several coordinators at once. All calls complete without suspending.
pub trait StorageBackend: Send + Sync {
    /// Returns the value stored under `key`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - [`StorageError::QuotaExceeded`] if the store is full.
    /// - [`StorageError::Unavailable`] or [`StorageError::Backend`] on other
    ///   failures.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Builds the storage key for a task.
///
/// # Examples
///
/// ```
/// use pending_tasks::store::make_key;
///
/// assert_eq!(
///     make_key("__fxa_pending_tasks", "complete-oauth-flow"),
///     "__fxa_pending_tasks.complete-oauth-flow"
/// );
/// ```
pub fn make_key(namespace: &str, task_id: &str) -> String {
    format!("{namespace}{KEY_SEPARATOR}{task_id}")
}

/// Extracts the task id from a storage key if it belongs to `namespace`.
///
/// # Examples
///
/// ```
/// use pending_tasks::store::parse_key;
///
/// assert_eq!(parse_key("ns", "ns.task.with.dots"), Some("task.with.dots"));
/// assert_eq!(parse_key("ns", "other.task"), None);
/// assert_eq!(parse_key("ns", "nstask"), None);
/// ```
pub fn parse_key<'a>(namespace: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(namespace)?.strip_prefix(KEY_SEPARATOR)
}
