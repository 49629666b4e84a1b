//! In-memory binding storage.
//!
//! Keyed by binding id with upsert semantics, the same contract an external
//! key-value or document store offers. Used for development and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use reactrole_types::{Binding, BindingId};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::traits::{BindingStore, LoadPolicy};

/// In-memory store implementation.
pub struct InMemoryBindingStore {
    /// Records with their first-insert sequence, to keep load order stable.
    records: DashMap<BindingId, (u64, Binding)>,
    sequence: AtomicU64,
    load_policy: LoadPolicy,
    writes: AtomicU64,
}

impl InMemoryBindingStore {
    pub fn new() -> Self {
        Self::with_policy(LoadPolicy::default())
    }

    pub fn with_policy(load_policy: LoadPolicy) -> Self {
        Self {
            records: DashMap::new(),
            sequence: AtomicU64::new(0),
            load_policy,
            writes: AtomicU64::new(0),
        }
    }

    /// Seed the store with existing records.
    pub fn with_bindings(bindings: impl IntoIterator<Item = Binding>) -> Self {
        let store = Self::new();
        for binding in bindings {
            store.insert(binding);
        }
        store
    }

    fn insert(&self, binding: Binding) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        match self.records.get_mut(&binding.id) {
            Some(mut entry) => entry.1 = binding,
            None => {
                self.records.insert(binding.id.clone(), (seq, binding));
            }
        }
    }

    /// Snapshot of a record regardless of load policy.
    pub fn snapshot(&self, id: &BindingId) -> Option<Binding> {
        self.records.get(id).map(|r| r.1.clone())
    }

    /// Number of write operations performed.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryBindingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BindingStore for InMemoryBindingStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Vec<Binding>> {
        let mut records: Vec<(u64, Binding)> = self
            .records
            .iter()
            .filter(|r| self.load_policy.admits(&r.1))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|(seq, _)| *seq);
        Ok(records.into_iter().map(|(_, b)| b).collect())
    }

    async fn upsert(&self, binding: &Binding) -> Result<()> {
        self.insert(binding.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove(&self, id: &BindingId) -> Result<bool> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(self.records.remove(id).is_some())
    }

    async fn get(&self, id: &BindingId) -> Result<Option<Binding>> {
        Ok(self
            .records
            .get(id)
            .map(|r| r.1.clone())
            .filter(|b| self.load_policy.admits(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactrole_types::{ChannelId, EmojiId, GuildId, MessageId, RoleId};

    fn binding(message: u64) -> Binding {
        Binding::new(
            GuildId::new(1),
            ChannelId::new(2),
            MessageId::new(message),
            EmojiId::new("👍"),
            vec![RoleId::new(10)],
        )
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryBindingStore::new();
        let mut b = binding(1);
        store.upsert(&b).await.unwrap();
        b.max = 5;
        store.upsert(&b).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].max, 5);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_load_keeps_insertion_order() {
        let store = InMemoryBindingStore::with_bindings(vec![binding(3), binding(1), binding(2)]);
        let order: Vec<u64> = store
            .load()
            .await
            .unwrap()
            .iter()
            .map(|b| b.message.get())
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_active_only_policy() {
        let store = InMemoryBindingStore::with_policy(LoadPolicy::ActiveOnly);
        let mut b = binding(1);
        b.disable();
        store.upsert(&b).await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
        assert!(store.get(&b.id).await.unwrap().is_none());
        assert!(store.snapshot(&b.id).is_some());
    }
}
