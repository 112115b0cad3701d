//! In-process tab directory with heartbeats.
//!
//! [`TabDirectory`] is the shared list of known tabs, keyed by id, with the
//! time each tab last reported in. Each tab holds a [`LocalTab`] handle,
//! which is its [`TabRegistry`]: it knows its own id, owns a [`ReadyGate`]
//! and answers liveness questions from the shared directory.
//!
//! A tab counts as live while it is in the directory and its last
//! heartbeat is within the directory's timeout. A `LocalTab` registered
//! inside a Tokio runtime refreshes its own heartbeat in the background
//! until it is closed, so an open tab never expires. Closing (or dropping)
//! a `LocalTab` removes it immediately, so any task it owned becomes
//! claimable by the next reader.
//!
//! # Examples
//!
//! ```
//! use pending_tasks::registry::memory::TabDirectory;
//! use pending_tasks::TabRegistry;
//!
//! let directory = TabDirectory::new();
//! let first = directory.register();
//! let second = directory.register();
//!
//! assert!(first.is_live(second.id()));
//! second.close();
//! assert!(!first.is_live(second.id()));
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::constants::DEFAULT_TAB_TIMEOUT_MS;
use crate::registry::{ReadyGate, TabRegistry};

/// Heartbeats per timeout window for background refreshes.
const HEARTBEATS_PER_TIMEOUT: u32 = 4;

#[derive(Debug)]
struct DirectoryInner {
    tabs: DashMap<String, Instant>,
    timeout: Option<Duration>,
}

/// Shared list of known tabs. Clones refer to the same list.
#[derive(Debug, Clone)]
pub struct TabDirectory {
    inner: Arc<DirectoryInner>,
}

impl TabDirectory {
    /// Creates an empty directory with the default heartbeat timeout.
    pub fn new() -> Self {
        Self::with_timeout(Some(Duration::from_millis(DEFAULT_TAB_TIMEOUT_MS)))
    }

    /// Creates an empty directory. With `None`, tabs stay live until they
    /// are removed.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                tabs: DashMap::new(),
                timeout,
            }),
        }
    }

    /// How often a [`LocalTab`] refreshes itself, or `None` when tabs
    /// never expire.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.inner.timeout.map(|timeout| {
            (timeout / HEARTBEATS_PER_TIMEOUT).max(Duration::from_millis(1))
        })
    }

    /// Registers a new tab with a random id.
    pub fn register(&self) -> LocalTab {
        self.register_with_id(Uuid::new_v4().to_string())
    }

    /// Registers a tab under a caller-chosen id, e.g. one restored from
    /// session storage.
    ///
    /// Inside a Tokio runtime the tab's heartbeat is refreshed in the
    /// background until the tab is closed. Outside one, the caller has to
    /// call [`LocalTab::heartbeat`] often enough to stay live.
    pub fn register_with_id(&self, tab_id: impl Into<String>) -> LocalTab {
        let id = tab_id.into();
        self.heartbeat(&id);
        let heartbeat = self.spawn_heartbeat(&id);
        tracing::debug!(
            tab_id = %id,
            background_heartbeat = heartbeat.is_some(),
            "registered tab"
        );
        LocalTab {
            id,
            directory: self.clone(),
            gate: ReadyGate::new(),
            heartbeat,
        }
    }

    /// Records that `tab_id` is alive now, adding it if unknown.
    pub fn heartbeat(&self, tab_id: &str) {
        self.heartbeat_at(tab_id, Instant::now());
    }

    /// Records a heartbeat for `tab_id` at a specific time.
    pub fn heartbeat_at(&self, tab_id: &str, at: Instant) {
        self.inner.tabs.insert(tab_id.to_string(), at);
    }

    /// Forgets `tab_id`. Returns `true` if it was known.
    pub fn remove(&self, tab_id: &str) -> bool {
        let removed = self.inner.tabs.remove(tab_id).is_some();
        if removed {
            tracing::debug!(tab_id = tab_id, "removed tab");
        }
        removed
    }

    /// Returns `true` if `tab_id` is known and its heartbeat is fresh.
    pub fn is_live(&self, tab_id: &str) -> bool {
        self.inner
            .tabs
            .get(tab_id)
            .is_some_and(|seen| self.is_fresh(*seen.value()))
    }

    /// Ids of all live tabs, sorted.
    pub fn live_tabs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .tabs
            .iter()
            .filter(|entry| self.is_fresh(*entry.value()))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Removes tabs whose heartbeat has expired. Returns how many were
    /// removed.
    pub fn prune_stale(&self) -> usize {
        let before = self.inner.tabs.len();
        self.inner.tabs.retain(|_, seen| self.is_fresh(*seen));
        let pruned = before.saturating_sub(self.inner.tabs.len());
        if pruned > 0 {
            tracing::debug!(pruned, "pruned stale tabs");
        }
        pruned
    }

    fn is_fresh(&self, seen: Instant) -> bool {
        match self.inner.timeout {
            Some(timeout) => Instant::now().saturating_duration_since(seen) <= timeout,
            None => true,
        }
    }

    /// Refreshes `tab_id` only if it is still registered, so a heartbeat
    /// racing with `remove` cannot bring a closed tab back.
    fn refresh(&self, tab_id: &str) {
        if let Some(mut seen) = self.inner.tabs.get_mut(tab_id) {
            *seen = Instant::now();
        }
    }

    fn spawn_heartbeat(&self, tab_id: &str) -> Option<CancellationToken> {
        let period = self.heartbeat_interval()?;
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let stop = CancellationToken::new();
        let cancelled = stop.clone();
        let directory = self.clone();
        let id = tab_id.to_string();

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => directory.refresh(&id),
                }
            }
            tracing::trace!(tab_id = %id, "stopped tab heartbeat");
        });
        Some(stop)
    }
}

impl Default for TabDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// One tab's view of the [`TabDirectory`].
///
/// The tab's ready gate starts closed; call
/// [`mark_ready`](Self::mark_ready) once the host has finished discovering
/// the other tabs. Dropping the handle removes the tab from the directory
/// and stops its background heartbeat.
#[derive(Debug)]
pub struct LocalTab {
    id: String,
    directory: TabDirectory,
    gate: ReadyGate,
    heartbeat: Option<CancellationToken>,
}

impl LocalTab {
    /// This tab's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The directory this tab is registered in.
    pub fn directory(&self) -> &TabDirectory {
        &self.directory
    }

    /// Opens this tab's ready gate. Returns `false` if it was already open.
    pub fn mark_ready(&self) -> bool {
        self.gate.open()
    }

    /// Refreshes this tab's heartbeat.
    pub fn heartbeat(&self) {
        self.directory.heartbeat(&self.id);
    }

    /// Returns `true` while a background task keeps this tab's heartbeat
    /// fresh.
    pub fn has_background_heartbeat(&self) -> bool {
        self.heartbeat
            .as_ref()
            .is_some_and(|stop| !stop.is_cancelled())
    }

    /// Removes this tab from the directory and stops its heartbeat.
    /// Records it owns become claimable by other tabs.
    pub fn close(&self) {
        if let Some(stop) = &self.heartbeat {
            stop.cancel();
        }
        self.directory.remove(&self.id);
    }
}

impl Drop for LocalTab {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl TabRegistry for LocalTab {
    async fn ready(&self) {
        self.gate.wait().await;
    }

    fn tab_id(&self) -> &str {
        &self.id
    }

    fn is_live(&self, tab_id: &str) -> bool {
        self.directory.is_live(tab_id)
    }
}
