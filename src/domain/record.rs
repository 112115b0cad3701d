//! Task record -- what a pending task looks like in the shared store.
//!
//! Records are encoded as JSON text: `{"id": ..., "data": {...}, "owner": ...}`.
//! `owner` is omitted when absent; a missing or `null` owner decodes as
//! unowned and a missing `data` decodes as an empty map.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;

/// Opaque payload carried by a task, keyed by name.
pub type TaskData = Map<String, Value>;

/// A pending task as stored in the shared store.
///
/// # Examples
///
/// ```
/// use pending_tasks::{TaskData, TaskRecord};
/// use serde_json::json;
///
/// let mut data = TaskData::new();
/// data.insert("a".to_string(), json!(1));
///
/// let mut record = TaskRecord::new("complete-oauth-flow", data, "tab-1");
/// assert!(record.is_owned_by("tab-1"));
///
/// let mut partial = TaskData::new();
/// partial.insert("b".to_string(), json!(2));
/// record.merge_data(partial);
/// assert_eq!(record.data.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task name, unique per logical operation.
    pub id: String,

    /// Payload the owning tab needs to finish the operation.
    #[serde(default)]
    pub data: TaskData,

    /// Tab currently responsible for finishing the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl TaskRecord {
    /// Creates a record owned by `owner`.
    pub fn new(id: impl Into<String>, data: TaskData, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data,
            owner: Some(owner.into()),
        }
    }

    /// Returns `true` if `tab_id` currently owns this record.
    pub fn is_owned_by(&self, tab_id: &str) -> bool {
        self.owner.as_deref() == Some(tab_id)
    }

    /// Makes `tab_id` the owner, returning the previous owner.
    pub fn claim(&mut self, tab_id: &str) -> Option<String> {
        self.owner.replace(tab_id.to_string())
    }

    /// Shallow-merges `partial` into [`data`](Self::data).
    ///
    /// Keys in `partial` overwrite existing keys; keys not mentioned in
    /// `partial` are kept. Nested objects are replaced, not merged.
    pub fn merge_data(&mut self, partial: TaskData) {
        for (key, value) in partial {
            self.data.insert(key, value);
        }
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the string stored under `key`, or `None` if it is missing or
    /// not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Deserializes the value stored under `key`.
    ///
    /// Returns `None` when the key is missing or the value does not match
    /// `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pending_tasks::{TaskData, TaskRecord};
    /// use serde_json::json;
    ///
    /// let mut data = TaskData::new();
    /// data.insert("attempts".to_string(), json!(3));
    /// let record = TaskRecord::new("t", data, "tab");
    ///
    /// assert_eq!(record.get_typed::<u32>("attempts"), Some(3));
    /// assert_eq!(record.get_typed::<String>("attempts"), None);
    /// ```
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Encodes the record as stored text.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, TaskError> {
        serde_json::to_string(self).map_err(|source| TaskError::Serialization {
            task_id: self.id.clone(),
            source,
        })
    }

    /// Decodes stored text for task `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Corrupt`] if the text is not a task record.
    pub fn from_json(task_id: &str, text: &str) -> Result<Self, TaskError> {
        serde_json::from_str(text).map_err(|source| TaskError::Corrupt {
            task_id: task_id.to_string(),
            source,
        })
    }
}
