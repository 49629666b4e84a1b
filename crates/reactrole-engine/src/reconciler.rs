//! Single reaction reconciliation
//!
//! Turns one (action, member, binding) request into role mutations:
//!
//! 1. Wait for any settlement of the same member to finish
//! 2. Skip disabled or unknown bindings
//! 3. Apply the REVERSED flip
//! 4. JUST_LOSE swallows grants, JUST_WIN swallows revokes
//! 5. Filter roles the bot may not manage
//! 6. Capacity, then requirements (grant only)
//! 7. Toggle grants are handed to the debouncer
//! 8. Grant or revoke

use std::sync::Arc;

use reactrole_types::{Action, BindingId, BindingKind, RequirementKind};
use tracing::{debug, instrument, warn};

use crate::debounce::{DebounceTask, ToggleDebouncer};
use crate::platform::Member;
use crate::policy::{Admission, RolePolicy};

/// What reconciling a request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Binding unknown or disabled
    Inactive,
    /// JUST_LOSE binding: the reaction was removed instead of granting
    ReactionRemoved,
    /// JUST_WIN binding: the roles were kept
    Kept,
    /// No role of the binding can be managed by the bot
    Unauthorized,
    AtCapacity,
    Ineligible(RequirementKind),
    /// Handed to the toggle debouncer
    Deferred,
    Granted { roles: usize },
    Revoked { roles: usize },
}

/// Reconciles individual reaction changes
pub struct Reconciler {
    policy: Arc<RolePolicy>,
    debouncer: Arc<ToggleDebouncer>,
}

impl Reconciler {
    pub fn new(policy: Arc<RolePolicy>, debouncer: Arc<ToggleDebouncer>) -> Self {
        Self { policy, debouncer }
    }

    /// Reconcile one reaction change for a member.
    #[instrument(skip(self, member), fields(binding = %binding_id, member = %member.user, action = %action))]
    pub async fn apply(&self, action: Action, mut member: Member, binding_id: &BindingId) -> Outcome {
        let policy = &self.policy;

        let (_serial, waited) = policy.member_locks().acquire(member.key()).await;
        if waited {
            // A settlement ran meanwhile; the event's member snapshot predates it
            match policy.platform().resolve_member(member.guild, member.user).await {
                Ok(Some(current)) => member = current,
                Ok(None) => debug!("Member left while waiting, using event snapshot"),
                Err(e) => warn!(error = %e, "Failed to refresh member, using event snapshot"),
            }
        }

        let Some(binding) = policy.registry().get_enabled(binding_id) else {
            debug!("Binding inactive, ignoring");
            return Outcome::Inactive;
        };

        let action = binding.kind.effective_action(action);

        if action == Action::Grant && binding.kind.contains(BindingKind::JUST_LOSE) {
            policy.remove_reaction(&binding, member.user).await;
            return Outcome::ReactionRemoved;
        }
        if action == Action::Revoke && binding.kind.contains(BindingKind::JUST_WIN) {
            return Outcome::Kept;
        }

        let roles = policy.guard().filter_authorized(action, &binding, &member).await;
        if roles.is_empty() {
            return Outcome::Unauthorized;
        }

        match action {
            Action::Grant => {
                match policy.admit(&binding, &member).await {
                    Admission::Admitted => {}
                    Admission::AtCapacity => return Outcome::AtCapacity,
                    Admission::Ineligible(kind) => return Outcome::Ineligible(kind),
                }

                if binding.is_toggle() {
                    self.debouncer
                        .schedule(DebounceTask::for_candidate(member.key(), &binding));
                    return Outcome::Deferred;
                }

                let roles = policy.grant(&binding, &mut member, &roles).await;
                Outcome::Granted { roles }
            }
            Action::Revoke => {
                let roles = policy.revoke(&binding, &mut member, &roles).await;
                Outcome::Revoked { roles }
            }
        }
    }
}
