//! Role mutation policy shared by every reconciliation path
//!
//! Direct reactions, toggle settlement and boot reconciliation all grant and
//! revoke through [`RolePolicy`], so hooks, events and winner bookkeeping
//! behave the same no matter which path triggered the change.

use std::sync::Arc;

use reactrole_types::{Binding, ReactRoleEvent, RequirementKind, RoleId, UserId};
use tracing::{debug, info, warn};

use crate::events::EventAggregator;
use crate::hooks::RoleHooks;
use crate::member_lock::MemberLocks;
use crate::permissions::PermissionGuard;
use crate::persist::Persister;
use crate::platform::{ChatPlatform, Member};
use crate::registry::BindingRegistry;
use crate::requirements::RequirementEvaluator;

/// Result of the capacity and requirement gates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    AtCapacity,
    Ineligible(RequirementKind),
}

/// Grant/revoke primitives with hooks, events and winner bookkeeping
pub struct RolePolicy {
    platform: Arc<dyn ChatPlatform>,
    registry: Arc<BindingRegistry>,
    hooks: Arc<dyn RoleHooks>,
    events: EventAggregator,
    persister: Persister,
    guard: PermissionGuard,
    requirements: RequirementEvaluator,
    member_locks: MemberLocks,
}

impl RolePolicy {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        registry: Arc<BindingRegistry>,
        hooks: Arc<dyn RoleHooks>,
        events: EventAggregator,
        persister: Persister,
    ) -> Self {
        Self {
            guard: PermissionGuard::new(platform.clone(), events.clone()),
            requirements: RequirementEvaluator::new(platform.clone(), events.clone()),
            member_locks: MemberLocks::new(),
            platform,
            registry,
            hooks,
            events,
            persister,
        }
    }

    pub fn platform(&self) -> &Arc<dyn ChatPlatform> {
        &self.platform
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventAggregator {
        &self.events
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    pub fn guard(&self) -> &PermissionGuard {
        &self.guard
    }

    /// Serializes reconciliation and toggle settlement per member
    pub fn member_locks(&self) -> &MemberLocks {
        &self.member_locks
    }

    /// Capacity, then requirements. Rejections remove the member's reaction.
    ///
    /// Existing winners are never blocked by capacity.
    pub async fn admit(&self, binding: &Binding, member: &Member) -> Admission {
        if binding.is_at_capacity() && !binding.has_winner(member.user) {
            debug!(
                binding = %binding.id,
                member = %member.user,
                max = binding.max,
                "Binding at capacity"
            );
            self.remove_reaction(binding, member.user).await;
            return Admission::AtCapacity;
        }

        if let Some(kind) = self.requirements.evaluate(binding, member).await {
            return Admission::Ineligible(kind);
        }

        Admission::Admitted
    }

    /// Grant the roles the member does not hold yet. Returns how many were added.
    pub async fn grant(&self, binding: &Binding, member: &mut Member, roles: &[RoleId]) -> usize {
        let mut granted = 0;

        for role in roles {
            if member.has_role(*role) {
                continue;
            }
            if !self.hooks.pre_grant(binding, member, *role).await {
                debug!(binding = %binding.id, role = %role, hooks = self.hooks.name(), "Grant vetoed");
                continue;
            }
            match self.platform.add_role(binding.guild, member.user, *role).await {
                Ok(()) => {
                    member.roles.push(*role);
                    granted += 1;
                    info!(binding = %binding.id, member = %member.user, role = %role, "Role granted");
                    self.events.emit(ReactRoleEvent::RoleGranted {
                        guild: binding.guild,
                        member: member.user,
                        role: *role,
                        binding: binding.id.clone(),
                    });
                }
                Err(e) => {
                    warn!(binding = %binding.id, member = %member.user, role = %role, error = %e, "Failed to grant role");
                }
            }
        }

        if granted > 0 && self.registry.add_winner(&binding.id, member.user) {
            self.persister.schedule(&binding.id);
        }

        granted
    }

    /// Revoke the roles the member holds and drop them from the winners.
    /// Returns how many roles were removed.
    pub async fn revoke(&self, binding: &Binding, member: &mut Member, roles: &[RoleId]) -> usize {
        let mut revoked = 0;

        for role in roles {
            if !member.has_role(*role) {
                continue;
            }
            if !self.hooks.pre_revoke(binding, member, *role).await {
                debug!(binding = %binding.id, role = %role, hooks = self.hooks.name(), "Revoke vetoed");
                continue;
            }
            match self.platform.remove_role(binding.guild, member.user, *role).await {
                Ok(()) => {
                    member.roles.retain(|r| r != role);
                    revoked += 1;
                    info!(binding = %binding.id, member = %member.user, role = %role, "Role revoked");
                    self.events.emit(ReactRoleEvent::RoleRevoked {
                        guild: binding.guild,
                        member: member.user,
                        role: *role,
                        binding: binding.id.clone(),
                    });
                }
                Err(e) => {
                    warn!(binding = %binding.id, member = %member.user, role = %role, error = %e, "Failed to revoke role");
                }
            }
        }

        self.forget_winner(binding, member.user);
        revoked
    }

    /// Drop a user from the binding's winners, persisting if it changed.
    pub fn forget_winner(&self, binding: &Binding, user: UserId) -> bool {
        let changed = self.registry.remove_winner(&binding.id, user);
        if changed {
            self.persister.schedule(&binding.id);
        }
        changed
    }

    /// Remove a user's reaction for the binding. Failures are logged.
    pub async fn remove_reaction(&self, binding: &Binding, user: UserId) -> bool {
        match self
            .platform
            .remove_reaction(binding.channel, binding.message, user, &binding.emoji)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(binding = %binding.id, member = %user, error = %e, "Failed to remove reaction");
                false
            }
        }
    }
}
