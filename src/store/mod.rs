//! Shared key-value storage used to hold pending task records.
//!
//! The store is the only channel between tabs. It is synchronous, scoped to
//! an origin and visible to every tab of that origin, and offers nothing
//! beyond get, set and remove. In particular there is no compare-and-swap,
//! which is why ownership claims are best-effort.
//!
//! # Backends
//!
//! - [`InMemoryStorage`](memory::InMemoryStorage) -- a `DashMap`-backed store
//!   that several coordinators can share through an `Arc`, one per tab.

pub mod backend;
pub mod memory;

pub use backend::{make_key, parse_key, StorageBackend};
pub use memory::InMemoryStorage;
