//! In-memory storage backend.
//!
//! [`InMemoryStorage`] keeps values in a `DashMap<String, String>`. Share
//! one instance between several coordinators (via `Arc`) to model several
//! tabs of the same origin.
//!
//! Two switches exist to reproduce browser storage failures: a byte quota
//! ([`with_quota_bytes`](InMemoryStorage::with_quota_bytes)) and an
//! availability flag ([`set_available`](InMemoryStorage::set_available)).

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use crate::error::StorageError;
use crate::store::backend::StorageBackend;

/// Thread-safe in-memory key-value store.
///
/// # Examples
///
/// ```
/// use pending_tasks::store::memory::InMemoryStorage;
/// use pending_tasks::store::StorageBackend;
///
/// let storage = InMemoryStorage::new();
/// storage.set("k", "v").unwrap();
/// assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
/// storage.remove("k").unwrap();
/// assert!(storage.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryStorage {
    data: DashMap<String, String>,
    quota_bytes: Option<usize>,
    available: AtomicBool,
}

impl InMemoryStorage {
    /// Creates an empty, unlimited store.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            quota_bytes: None,
            available: AtomicBool::new(true),
        }
    }

    /// Limits the total size of keys plus values, in bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use pending_tasks::store::memory::InMemoryStorage;
    /// use pending_tasks::store::StorageBackend;
    /// use pending_tasks::StorageError;
    ///
    /// let storage = InMemoryStorage::new().with_quota_bytes(8);
    /// storage.set("k", "1234").unwrap();
    /// let err = storage.set("k2", "12345").unwrap_err();
    /// assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    /// ```
    pub fn with_quota_bytes(mut self, limit: usize) -> Self {
        self.quota_bytes = Some(limit);
        self
    }

    /// Enables or disables the store. While disabled every operation fails
    /// with [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads a value without the availability check.
    pub fn raw_get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    /// Total bytes currently held, counting keys and values.
    pub fn used_bytes(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                message: "storage is disabled".to_string(),
            })
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.raw_get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        if let Some(limit) = self.quota_bytes {
            let replaced = self
                .data
                .get(key)
                .map_or(0, |entry| key.len() + entry.value().len());
            let needed = self
                .used_bytes()
                .saturating_sub(replaced)
                .saturating_add(key.len() + value.len());
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed_bytes: needed,
                    limit_bytes: limit,
                });
            }
        }
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_previous_value() {
        let storage = InMemoryStorage::new();
        storage.set("k", "one").unwrap();
        storage.set("k", "two").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn get_missing_is_none() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.get("missing").unwrap(), None);
    }

    #[test]
    fn remove_missing_is_ok() {
        let storage = InMemoryStorage::new();
        storage.remove("missing").unwrap();
        storage.remove("missing").unwrap();
    }

    #[test]
    fn quota_counts_replacement_not_double() {
        // "k" + "1234" = 5 bytes; replacing it with "123456" needs 7.
        let storage = InMemoryStorage::new().with_quota_bytes(7);
        storage.set("k", "1234").unwrap();
        storage.set("k", "123456").unwrap();
        assert_eq!(storage.used_bytes(), 7);

        let err = storage.set("k", "1234567").unwrap_err();
        match err {
            StorageError::QuotaExceeded {
                needed_bytes,
                limit_bytes,
                ..
            } => {
                assert_eq!(needed_bytes, 8);
                assert_eq!(limit_bytes, 7);
            },
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
        // Failed write leaves the old value in place.
        assert_eq!(storage.raw_get("k").as_deref(), Some("123456"));
    }

    #[test]
    fn quota_check_survives_concurrent_removal() {
        let storage = InMemoryStorage::new().with_quota_bytes(1024);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..2_000 {
                    storage.set("shared", "0123456789").unwrap();
                }
            });
            scope.spawn(|| {
                for _ in 0..2_000 {
                    storage.remove("shared").unwrap();
                }
            });
        });
        assert!(storage.used_bytes() <= 1024);
    }

    #[test]
    fn disabled_storage_rejects_everything() {
        let storage = InMemoryStorage::new();
        storage.set("k", "v").unwrap();
        storage.set_available(false);

        assert!(matches!(
            storage.get("k"),
            Err(StorageError::Unavailable { .. })
        ));
        assert!(matches!(
            storage.set("k", "w"),
            Err(StorageError::Unavailable { .. })
        ));
        assert!(matches!(
            storage.remove("k"),
            Err(StorageError::Unavailable { .. })
        ));
        assert_eq!(storage.raw_get("k").as_deref(), Some("v"));

        storage.set_available(true);
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }
}
