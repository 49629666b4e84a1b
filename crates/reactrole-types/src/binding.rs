//! Reaction-to-role binding
//!
//! A [`Binding`] maps one emoji reaction on one message to one or more roles.
//! The record is the unit of persistence; everything the engine learns about
//! who currently holds the roles is tracked in its `winners` list.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BindingError, Result};
use crate::ids::{BindingId, ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};

bitflags! {
    /// Behaviour modifiers of a binding. A binding with no flags set is NORMAL:
    /// reacting grants, un-reacting revokes.
    ///
    /// | Flag | Effect |
    /// |------|--------|
    /// | [`TOGGLE`](Self::TOGGLE) | roles on the same message are mutually exclusive |
    /// | [`JUST_WIN`](Self::JUST_WIN) | un-reacting keeps the role |
    /// | [`JUST_LOSE`](Self::JUST_LOSE) | reacting never grants; the reaction is removed |
    /// | [`REVERSED`](Self::REVERSED) | reacting revokes, un-reacting grants |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BindingKind: u8 {
        const TOGGLE    = 0b0000_0001;
        const JUST_WIN  = 0b0000_0010;
        const JUST_LOSE = 0b0000_0100;
        const REVERSED  = 0b0000_1000;
    }
}

impl BindingKind {
    pub const NORMAL: Self = Self::empty();

    /// The action actually performed for a requested action.
    pub fn effective_action(self, requested: Action) -> Action {
        if self.contains(Self::REVERSED) {
            requested.flipped()
        } else {
            requested
        }
    }
}

impl Default for BindingKind {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Grant or revoke the roles of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Grant,
    Revoke,
}

impl Action {
    pub fn flipped(self) -> Self {
        match self {
            Action::Grant => Action::Revoke,
            Action::Revoke => Action::Grant,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Grant => write!(f, "grant"),
            Action::Revoke => write!(f, "revoke"),
        }
    }
}

/// Eligibility requirements a member must meet before being granted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    /// Member must currently be boosting the guild
    #[serde(default)]
    pub boost: bool,

    /// Member must hold the verified developer badge
    #[serde(default)]
    pub verified_developer: bool,
}

impl Requirements {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.boost && !self.verified_developer
    }
}

/// Requirement that a member failed to meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Boost,
    VerifiedDeveloper,
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementKind::Boost => write!(f, "boost"),
            RequirementKind::VerifiedDeveloper => write!(f, "verified_developer"),
        }
    }
}

/// Lifecycle of a binding. Persisted as the `disabled` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    #[default]
    Active,
    Disabled,
}

mod lifecycle_flag {
    use super::LifecycleState;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(state: &LifecycleState, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(matches!(state, LifecycleState::Disabled))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<LifecycleState, D::Error> {
        Ok(if bool::deserialize(d)? {
            LifecycleState::Disabled
        } else {
            LifecycleState::Active
        })
    }
}

/// One configured reaction→role rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Composite `(message, emoji)` key
    pub id: BindingId,

    pub message: MessageId,

    pub channel: ChannelId,

    #[serde(rename = "group")]
    pub guild: GuildId,

    pub emoji: EmojiId,

    /// Roles granted by this binding, in configuration order
    pub roles: Vec<RoleId>,

    /// Maximum number of winners; 0 means unbounded
    #[serde(default)]
    pub max: u32,

    #[serde(default)]
    pub kind: BindingKind,

    #[serde(default)]
    pub requirements: Requirements,

    #[serde(rename = "disabled", with = "lifecycle_flag", default)]
    pub state: LifecycleState,

    /// Members holding the roles through this binding, in grant order
    #[serde(default)]
    pub winners: Vec<UserId>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Binding {
    /// Create an active NORMAL binding with no capacity limit
    pub fn new(
        guild: GuildId,
        channel: ChannelId,
        message: MessageId,
        emoji: EmojiId,
        roles: Vec<RoleId>,
    ) -> Self {
        Self {
            id: BindingId::new(message, &emoji),
            message,
            channel,
            guild,
            emoji,
            roles,
            max: 0,
            kind: BindingKind::NORMAL,
            requirements: Requirements::none(),
            state: LifecycleState::Active,
            winners: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_kind(mut self, kind: BindingKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_max(mut self, max: u32) -> Self {
        self.max = max;
        self
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.state == LifecycleState::Active
    }

    pub fn is_toggle(&self) -> bool {
        self.kind.contains(BindingKind::TOGGLE)
    }

    /// Whether no further winner may be added
    pub fn is_at_capacity(&self) -> bool {
        self.max > 0 && self.winners.len() >= self.max as usize
    }

    pub fn has_winner(&self, user: UserId) -> bool {
        self.winners.contains(&user)
    }

    /// Append a winner. Returns false if already present.
    pub fn add_winner(&mut self, user: UserId) -> bool {
        if self.has_winner(user) {
            return false;
        }
        self.winners.push(user);
        true
    }

    /// Remove a winner. Returns false if absent.
    pub fn remove_winner(&mut self, user: UserId) -> bool {
        let before = self.winners.len();
        self.winners.retain(|w| *w != user);
        self.winners.len() != before
    }

    /// Soft-delete. Returns false if already disabled.
    pub fn disable(&mut self) -> bool {
        if self.state == LifecycleState::Disabled {
            return false;
        }
        self.state = LifecycleState::Disabled;
        true
    }

    /// Check the record's structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.roles.is_empty() {
            return Err(BindingError::NoRoles(self.id.clone()));
        }

        let expected = BindingId::new(self.message, &self.emoji);
        if self.id != expected {
            return Err(BindingError::IdMismatch {
                id: self.id.clone(),
                expected,
            });
        }

        let mut seen = std::collections::HashSet::with_capacity(self.winners.len());
        for winner in &self.winners {
            if !seen.insert(*winner) {
                return Err(BindingError::DuplicateWinner {
                    id: self.id.clone(),
                    user: *winner,
                });
            }
        }

        if self.max > 0 && self.winners.len() > self.max as usize {
            return Err(BindingError::CapacityExceeded {
                id: self.id.clone(),
                winners: self.winners.len(),
                max: self.max,
            });
        }

        Ok(())
    }
}
