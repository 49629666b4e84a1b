//! In-memory binding registry
//!
//! The registry is the authoritative copy of every binding while the engine
//! runs. The store only ever receives snapshots taken from here.

use dashmap::DashMap;
use reactrole_types::{Binding, BindingId, ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};

/// Concurrent binding registry with a per-message index
pub struct BindingRegistry {
    bindings: DashMap<BindingId, Binding>,
    by_message: DashMap<MessageId, Vec<BindingId>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
            by_message: DashMap::new(),
        }
    }

    /// Replace the registry content with loaded bindings.
    pub fn load(&self, bindings: impl IntoIterator<Item = Binding>) {
        self.bindings.clear();
        self.by_message.clear();
        for binding in bindings {
            self.insert(binding);
        }
    }

    /// Insert a binding, returning the one it replaced.
    pub fn insert(&self, binding: Binding) -> Option<Binding> {
        let id = binding.id.clone();
        let message = binding.message;
        let previous = self.bindings.insert(id.clone(), binding);
        if previous.is_none() {
            self.by_message.entry(message).or_default().push(id);
        }
        previous
    }

    pub fn remove(&self, id: &BindingId) -> Option<Binding> {
        let (_, binding) = self.bindings.remove(id)?;
        if let Some(mut ids) = self.by_message.get_mut(&binding.message) {
            ids.retain(|i| i != id);
        }
        self.by_message.remove_if(&binding.message, |_, ids| ids.is_empty());
        Some(binding)
    }

    pub fn get(&self, id: &BindingId) -> Option<Binding> {
        self.bindings.get(id).map(|b| b.clone())
    }

    /// Snapshot of an enabled binding; `None` when missing or disabled.
    pub fn get_enabled(&self, id: &BindingId) -> Option<Binding> {
        self.get(id).filter(Binding::is_enabled)
    }

    pub fn contains(&self, id: &BindingId) -> bool {
        self.bindings.contains_key(id)
    }

    /// Bindings on a message, in registration order.
    pub fn by_message(&self, message: MessageId) -> Vec<Binding> {
        let Some(ids) = self.by_message.get(&message) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.bindings.get(id).map(|b| b.clone()))
            .collect()
    }

    /// Enabled toggle bindings sharing a message.
    pub fn toggle_group(&self, message: MessageId) -> Vec<Binding> {
        self.by_message(message)
            .into_iter()
            .filter(|b| b.is_enabled() && b.is_toggle())
            .collect()
    }

    pub fn by_role(&self, guild: GuildId, role: RoleId) -> Vec<Binding> {
        self.filter(|b| b.guild == guild && b.roles.contains(&role))
    }

    pub fn by_channel(&self, channel: ChannelId) -> Vec<Binding> {
        self.filter(|b| b.channel == channel)
    }

    pub fn by_guild(&self, guild: GuildId) -> Vec<Binding> {
        self.filter(|b| b.guild == guild)
    }

    pub fn by_emoji(&self, guild: GuildId, emoji: &EmojiId) -> Vec<Binding> {
        self.filter(|b| b.guild == guild && &b.emoji == emoji)
    }

    /// All bindings, oldest first.
    pub fn list(&self) -> Vec<Binding> {
        self.filter(|_| true)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_enabled()).count()
    }

    /// Append a winner. Returns true if the record changed.
    pub fn add_winner(&self, id: &BindingId, user: UserId) -> bool {
        self.update(id, |b| b.add_winner(user)).unwrap_or(false)
    }

    /// Remove a winner. Returns true if the record changed.
    pub fn remove_winner(&self, id: &BindingId, user: UserId) -> bool {
        self.update(id, |b| b.remove_winner(user)).unwrap_or(false)
    }

    /// Soft-delete a binding. Returns true if the record changed.
    pub fn disable(&self, id: &BindingId) -> bool {
        self.update(id, Binding::disable).unwrap_or(false)
    }

    /// Mutate a binding in place. `None` when the binding does not exist.
    pub fn update<R>(&self, id: &BindingId, f: impl FnOnce(&mut Binding) -> R) -> Option<R> {
        self.bindings.get_mut(id).map(|mut b| f(&mut b))
    }

    fn filter(&self, predicate: impl Fn(&Binding) -> bool) -> Vec<Binding> {
        let mut result: Vec<Binding> = self
            .bindings
            .iter()
            .filter(|b| predicate(b.value()))
            .map(|b| b.value().clone())
            .collect();
        result.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        result
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
