//! Domain events emitted by the engine
//!
//! Events provide a unified stream of grant/revoke activity and binding
//! lifecycle changes for consumers (audit logs, notification senders).

use crate::binding::{Action, RequirementKind};
use crate::ids::{BindingId, GuildId, MessageId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Envelope wrapping all domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event severity
    pub severity: EventSeverity,

    /// The actual event
    pub event: ReactRoleEvent,
}

impl EventEnvelope {
    /// Wrap an event using its default severity
    pub fn new(event: ReactRoleEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            severity: event.severity(),
            event,
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
}

/// Why a binding was taken out of service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableReason {
    Manual,
    MessageDeleted,
    ChannelDeleted,
    GuildDeleted,
    RoleDeleted,
    EmojiDeleted,
    ReactionsCleared,
    /// Guild, channel or message could not be resolved during boot
    MissingOnBoot,
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisableReason::Manual => "manual",
            DisableReason::MessageDeleted => "message_deleted",
            DisableReason::ChannelDeleted => "channel_deleted",
            DisableReason::GuildDeleted => "guild_deleted",
            DisableReason::RoleDeleted => "role_deleted",
            DisableReason::EmojiDeleted => "emoji_deleted",
            DisableReason::ReactionsCleared => "reactions_cleared",
            DisableReason::MissingOnBoot => "missing_on_boot",
        };
        f.write_str(s)
    }
}

/// Domain events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReactRoleEvent {
    /// Boot reconciliation finished and the engine went quiet
    Ready { bindings: usize },

    /// A new binding was registered
    BindingRegistered { binding: BindingId },

    /// A binding was disabled (soft delete) or removed (hard delete)
    BindingDisabled {
        binding: BindingId,
        reason: DisableReason,
    },

    /// A role was added to a member
    RoleGranted {
        guild: GuildId,
        member: UserId,
        role: RoleId,
        binding: BindingId,
    },

    /// A role was removed from a member
    RoleRevoked {
        guild: GuildId,
        member: UserId,
        role: RoleId,
        binding: BindingId,
    },

    /// All reactions were cleared from a message carrying bindings
    AllReactionsCleared {
        message: MessageId,
        roles: Vec<RoleId>,
        members: Vec<UserId>,
        count: usize,
    },

    /// A member tried to claim a binding without meeting its requirements
    MissingRequirement {
        kind: RequirementKind,
        member: UserId,
        binding: BindingId,
    },

    /// The bot lacks authorization to mutate some roles of a binding
    MissingAuthorization {
        action: Action,
        member: UserId,
        roles: Vec<RoleId>,
        binding: BindingId,
    },
}

impl ReactRoleEvent {
    pub fn severity(&self) -> EventSeverity {
        match self {
            ReactRoleEvent::MissingAuthorization { .. } | ReactRoleEvent::BindingDisabled { .. } => {
                EventSeverity::Warning
            }
            _ => EventSeverity::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_severity() {
        let envelope = EventEnvelope::new(ReactRoleEvent::MissingAuthorization {
            action: Action::Grant,
            member: UserId::new(1),
            roles: vec![RoleId::new(2)],
            binding: BindingId::from_raw("3-x"),
        });
        assert_eq!(envelope.severity, EventSeverity::Warning);

        let envelope = EventEnvelope::new(ReactRoleEvent::Ready { bindings: 0 });
        assert_eq!(envelope.severity, EventSeverity::Info);
    }
}
