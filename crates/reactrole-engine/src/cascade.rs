//! Binding retirement
//!
//! Bindings whose message, channel, guild, role or emoji disappears are taken
//! out of service. By default they stay in the store flagged `disabled`;
//! with hard delete enabled they are removed outright.

use std::sync::Arc;

use reactrole_types::{Binding, BindingId, DisableReason, ReactRoleEvent};
use tracing::info;

use crate::events::EventAggregator;
use crate::persist::Persister;
use crate::registry::BindingRegistry;

/// Disables bindings and records the change
pub struct CascadeHandler {
    registry: Arc<BindingRegistry>,
    persister: Persister,
    events: EventAggregator,
    hard_delete: bool,
}

impl CascadeHandler {
    pub fn new(
        registry: Arc<BindingRegistry>,
        persister: Persister,
        events: EventAggregator,
        hard_delete: bool,
    ) -> Self {
        Self {
            registry,
            persister,
            events,
            hard_delete,
        }
    }

    /// Retire one binding.
    ///
    /// Returns the binding as it stands afterwards, or `None` if it does not
    /// exist. Retiring an already disabled binding changes nothing.
    pub fn disable(&self, id: &BindingId, reason: DisableReason) -> Option<Binding> {
        let current = self.registry.get(id)?;

        if self.hard_delete {
            let mut removed = self.registry.remove(id)?;
            removed.disable();
            self.persister.schedule_removal(id);
            self.announce(id, reason);
            return Some(removed);
        }

        if self.registry.disable(id) {
            self.persister.schedule(id);
            self.announce(id, reason);
            return self.registry.get(id);
        }

        Some(current)
    }

    /// Retire every binding in `bindings`. Returns how many changed.
    pub fn disable_all(&self, bindings: &[Binding], reason: DisableReason) -> usize {
        bindings
            .iter()
            .filter(|b| b.is_enabled())
            .filter(|b| self.disable(&b.id, reason).is_some())
            .count()
    }

    fn announce(&self, id: &BindingId, reason: DisableReason) {
        info!(binding = %id, reason = %reason, hard_delete = self.hard_delete, "Binding disabled");
        self.events.emit(ReactRoleEvent::BindingDisabled {
            binding: id.clone(),
            reason,
        });
    }
}
