//! Eligibility requirements
//!
//! Boost and verified-developer requirements are checked before a grant.
//! Boost is checked first, so a member missing both is reported for boost.

use std::sync::Arc;

use reactrole_types::{Binding, ReactRoleEvent, RequirementKind, Requirements};
use tracing::{debug, warn};

use crate::events::EventAggregator;
use crate::platform::{ChatPlatform, Member};

/// First requirement the member does not meet
pub fn first_missing(requirements: &Requirements, member: &Member) -> Option<RequirementKind> {
    if requirements.boost && !member.is_boosting {
        return Some(RequirementKind::Boost);
    }
    if requirements.verified_developer && !member.is_verified_developer {
        return Some(RequirementKind::VerifiedDeveloper);
    }
    None
}

/// Checks requirements and rejects ineligible claims
pub struct RequirementEvaluator {
    platform: Arc<dyn ChatPlatform>,
    events: EventAggregator,
}

impl RequirementEvaluator {
    pub fn new(platform: Arc<dyn ChatPlatform>, events: EventAggregator) -> Self {
        Self { platform, events }
    }

    /// Check a member against a binding's requirements.
    ///
    /// On failure emits `MissingRequirement` and removes the member's
    /// reaction, then returns the failed requirement.
    pub async fn evaluate(&self, binding: &Binding, member: &Member) -> Option<RequirementKind> {
        let kind = first_missing(&binding.requirements, member)?;

        debug!(
            binding = %binding.id,
            member = %member.user,
            requirement = %kind,
            "Member does not meet requirement"
        );
        self.events.emit(ReactRoleEvent::MissingRequirement {
            kind,
            member: member.user,
            binding: binding.id.clone(),
        });

        if let Err(e) = self
            .platform
            .remove_reaction(binding.channel, binding.message, member.user, &binding.emoji)
            .await
        {
            warn!(binding = %binding.id, member = %member.user, error = %e, "Failed to remove reaction");
        }

        Some(kind)
    }
}
