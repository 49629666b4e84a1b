//! Binding registration and manual disable

use std::sync::Arc;

use reactrole_types::{
    Binding, BindingId, BindingKind, ChannelId, DisableReason, EmojiId, MessageId, ReactRoleEvent,
    Requirements, RoleId,
};
use tracing::{info, instrument, warn};

use crate::cascade::CascadeHandler;
use crate::error::{EngineError, Result};
use crate::policy::RolePolicy;

/// Request to bind an emoji on a message to roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSpec {
    pub channel: ChannelId,
    pub message: MessageId,
    /// Unicode emoji or custom emoji reference, resolved by the platform
    pub emoji: String,
    pub roles: Vec<RoleId>,
    pub kind: BindingKind,
    pub max: u32,
    pub requirements: Requirements,
}

impl BindingSpec {
    pub fn new(
        channel: ChannelId,
        message: MessageId,
        emoji: impl Into<String>,
        roles: Vec<RoleId>,
    ) -> Self {
        Self {
            channel,
            message,
            emoji: emoji.into(),
            roles,
            kind: BindingKind::NORMAL,
            max: 0,
            requirements: Requirements::none(),
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
}

/// Identifies a binding to disable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSelector {
    Id(BindingId),
    MessageEmoji { message: MessageId, emoji: EmojiId },
}

impl BindingSelector {
    pub fn id(&self) -> BindingId {
        match self {
            BindingSelector::Id(id) => id.clone(),
            BindingSelector::MessageEmoji { message, emoji } => BindingId::new(*message, emoji),
        }
    }
}

impl From<BindingId> for BindingSelector {
    fn from(id: BindingId) -> Self {
        BindingSelector::Id(id)
    }
}

impl From<&Binding> for BindingSelector {
    fn from(binding: &Binding) -> Self {
        BindingSelector::Id(binding.id.clone())
    }
}

/// Creates and disables bindings on request
pub struct Registrar {
    policy: Arc<RolePolicy>,
    cascade: Arc<CascadeHandler>,
}

impl Registrar {
    pub fn new(policy: Arc<RolePolicy>, cascade: Arc<CascadeHandler>) -> Self {
        Self { policy, cascade }
    }

    /// Validate and register a binding, replacing any on the same
    /// (message, emoji).
    #[instrument(skip(self, spec), fields(message = %spec.message, emoji = %spec.emoji))]
    pub async fn register(&self, spec: BindingSpec) -> Result<Binding> {
        let platform = self.policy.platform();

        let message = match platform.fetch_message(spec.channel, spec.message).await {
            Ok(message) => message,
            Err(e) if e.is_not_found() => {
                return Err(EngineError::InvalidMessage(format!(
                    "{} not found in {}",
                    spec.message, spec.channel
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let guild = message.guild.ok_or_else(|| {
            EngineError::InvalidMessage(format!("{} is not in a guild", spec.message))
        })?;

        let mut roles = Vec::with_capacity(spec.roles.len());
        for role in spec.roles {
            if roles.contains(&role) {
                continue;
            }
            if platform.role_exists(guild, role).await? {
                roles.push(role);
            } else {
                warn!(role = %role, "Dropping unknown role from binding");
            }
        }
        if roles.is_empty() {
            return Err(EngineError::InvalidRole(format!(
                "no existing role in {}",
                guild
            )));
        }

        let emoji = platform
            .resolve_emoji(guild, &spec.emoji)
            .await?
            .ok_or_else(|| EngineError::InvalidEmoji(spec.emoji.clone()))?;

        let binding = Binding::new(guild, message.channel, message.id, emoji, roles)
            .with_kind(spec.kind)
            .with_max(spec.max)
            .with_requirements(spec.requirements);

        platform
            .add_reaction(binding.channel, binding.message, &binding.emoji)
            .await?;

        if self.policy.registry().insert(binding.clone()).is_some() {
            info!(binding = %binding.id, "Replacing existing binding");
        }
        self.policy.persister().schedule(&binding.id);
        self.policy.events().emit(ReactRoleEvent::BindingRegistered {
            binding: binding.id.clone(),
        });
        info!(binding = %binding.id, roles = binding.roles.len(), kind = ?binding.kind, "Binding registered");

        Ok(binding)
    }

    /// Disable a binding on request.
    pub fn disable(&self, selector: impl Into<BindingSelector>) -> Result<Binding> {
        let id = selector.into().id();
        self.cascade
            .disable(&id, DisableReason::Manual)
            .ok_or(EngineError::NotFound(id))
    }
}
