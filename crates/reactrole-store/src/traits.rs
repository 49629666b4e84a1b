//! Storage trait definition.
//!
//! Defines the read/write contract every binding backend honours.

use async_trait::async_trait;
use reactrole_types::{Binding, BindingId};

use crate::error::Result;

/// Whether disabled (soft-deleted) bindings are returned by [`BindingStore::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Return every record, including disabled ones.
    #[default]
    IncludeDisabled,
    /// Filter disabled records out on load.
    ActiveOnly,
}

impl LoadPolicy {
    pub(crate) fn admits(self, binding: &Binding) -> bool {
        match self {
            LoadPolicy::IncludeDisabled => true,
            LoadPolicy::ActiveOnly => binding.is_enabled(),
        }
    }
}

/// Trait for binding storage backends.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Load every persisted binding admitted by the backend's load policy.
    async fn load(&self) -> Result<Vec<Binding>>;

    /// Insert or replace a binding keyed by its id.
    async fn upsert(&self, binding: &Binding) -> Result<()>;

    /// Remove a binding. Returns whether it existed.
    async fn remove(&self, id: &BindingId) -> Result<bool>;

    /// Load a single binding by id.
    async fn get(&self, id: &BindingId) -> Result<Option<Binding>> {
        Ok(self.load().await?.into_iter().find(|b| &b.id == id))
    }
}
