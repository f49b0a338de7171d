//! `StateStore` trait: the durable key/value mapping every other layer sits on.
//!
//! Three value kinds live under one key space: plain string values, sets of
//! strings and capped lists of strings. Callers use one kind per key.
//! Every method is atomic at single-key granularity; there are no cross-key
//! transactions.

use async_trait::async_trait;

use crate::error::StoreError;

/// Backend-agnostic key/value store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a string value, replacing whatever was there.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write `value` only if the current value equals `expected`.
    ///
    /// `expected = None` means "only if the key is absent". Returns whether
    /// the write happened.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError>;

    /// Delete a key of any kind. Returns whether anything was removed.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// List keys matching a glob pattern (`*`, `?`, `[..]`), sorted.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    // ── Sets ────────────────────────────────────────────────────────

    /// Add a member to a set. Returns whether it was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Number of members in a set (0 if absent).
    async fn set_card(&self, key: &str) -> Result<usize, StoreError>;

    /// All members of a set, sorted.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    // ── Lists ───────────────────────────────────────────────────────

    /// Push to the front of a list, then trim it to the newest `keep` items.
    async fn list_push(&self, key: &str, value: &str, keep: usize) -> Result<(), StoreError>;

    /// Up to `limit` items, newest first.
    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError>;
}
