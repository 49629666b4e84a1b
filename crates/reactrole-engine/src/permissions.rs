//! Authorization filtering
//!
//! Before any mutation the engine drops roles it is not allowed to manage.
//! A `MissingAuthorization` event is emitted at most once per
//! (role, member) pair until the role becomes manageable again.

use std::sync::Arc;

use dashmap::DashSet;
use reactrole_types::{Action, Binding, ReactRoleEvent, RoleId, UserId};
use tracing::warn;

use crate::events::EventAggregator;
use crate::platform::{ChatPlatform, Member};

/// Filters a binding's roles down to the ones the bot may mutate
pub struct PermissionGuard {
    platform: Arc<dyn ChatPlatform>,
    events: EventAggregator,
    warned: DashSet<(RoleId, UserId)>,
}

impl PermissionGuard {
    pub fn new(platform: Arc<dyn ChatPlatform>, events: EventAggregator) -> Self {
        Self {
            platform,
            events,
            warned: DashSet::new(),
        }
    }

    /// Return the authorized subset of the binding's roles, in order.
    pub async fn filter_authorized(
        &self,
        action: Action,
        binding: &Binding,
        member: &Member,
    ) -> Vec<RoleId> {
        let mut authorized = Vec::with_capacity(binding.roles.len());
        let mut newly_warned = Vec::new();

        for role in &binding.roles {
            let allowed = match self.platform.is_role_authorized(binding.guild, *role).await {
                Ok(allowed) => allowed,
                Err(e) => {
                    warn!(binding = %binding.id, role = %role, error = %e, "Authorization check failed");
                    false
                }
            };

            if allowed {
                self.warned.remove(&(*role, member.user));
                authorized.push(*role);
            } else if self.warned.insert((*role, member.user)) {
                newly_warned.push(*role);
            }
        }

        if !newly_warned.is_empty() {
            warn!(
                binding = %binding.id,
                member = %member.user,
                action = %action,
                roles = newly_warned.len(),
                "Missing authorization for roles"
            );
            self.events.emit(ReactRoleEvent::MissingAuthorization {
                action,
                member: member.user,
                roles: newly_warned,
                binding: binding.id.clone(),
            });
        }

        authorized
    }

    pub fn has_warned(&self, role: RoleId, user: UserId) -> bool {
        self.warned.contains(&(role, user))
    }
}
