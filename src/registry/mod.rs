//! Tab registry port and the one-shot readiness gate.
//!
//! A [`TabRegistry`] tells the coordinator three things: when the registry
//! has finished its initial sync ([`ready`](TabRegistry::ready)), which tab
//! is "this" tab ([`tab_id`](TabRegistry::tab_id)), and whether some other
//! tab is still alive ([`is_live`](TabRegistry::is_live)).
//!
//! [`memory::TabDirectory`] provides an in-process implementation with
//! heartbeats, suitable for tests and for hosts that run several logical
//! tabs in one process.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

/// Cross-tab presence service consulted by the coordinator.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the coordinator holds them as
/// `Arc<dyn TabRegistry>` and may be cloned into spawned tasks.
#[async_trait]
pub trait TabRegistry: Send + Sync {
    /// Resolves once the registry has discovered the current set of live
    /// tabs. Fires once per registry lifetime; later calls return at once.
    async fn ready(&self);

    /// Stable id of the tab this registry handle belongs to.
    fn tab_id(&self) -> &str;

    /// Returns `true` if `tab_id` is in the currently-known live set.
    fn is_live(&self, tab_id: &str) -> bool;
}

/// One-shot latch: closed until [`open`](Self::open) is called, then open
/// forever.
///
/// Clones share the same latch.
///
/// # Examples
///
/// ```
/// use pending_tasks::ReadyGate;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let gate = ReadyGate::new();
/// assert!(!gate.is_open());
///
/// assert!(gate.open());
/// assert!(!gate.open()); // already open
/// gate.wait().await;
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ReadyGate {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadyGate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Opens the gate, waking every waiter. Returns `true` if this call
    /// opened it and `false` if it was already open.
    pub fn open(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Returns `true` once the gate has been opened.
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the gate is open.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}
