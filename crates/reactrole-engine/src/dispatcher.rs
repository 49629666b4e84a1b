//! Platform event dispatch
//!
//! Routes gateway events to reconciliation or binding retirement.

use std::collections::BTreeSet;
use std::sync::Arc;

use reactrole_types::{
    Action, Binding, BindingId, ChannelId, DisableReason, EmojiId, GuildId, MessageId,
    ReactRoleEvent, RoleId, UserId,
};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::cascade::CascadeHandler;
use crate::policy::RolePolicy;
use crate::reconciler::{Outcome, Reconciler};

/// A single reaction change as delivered by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    /// `None` for reactions in direct messages
    pub guild: Option<GuildId>,
    pub channel: ChannelId,
    pub message: MessageId,
    pub user: UserId,
    pub emoji: EmojiId,
    pub user_is_bot: bool,
}

/// Gateway events the engine consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
    ReactionsCleared {
        channel: ChannelId,
        message: MessageId,
    },
    MessageDeleted {
        channel: ChannelId,
        message: MessageId,
    },
    ChannelDeleted {
        channel: ChannelId,
    },
    GuildDeleted {
        guild: GuildId,
    },
    RoleDeleted {
        guild: GuildId,
        role: RoleId,
    },
    EmojiDeleted {
        guild: GuildId,
        emoji: EmojiId,
    },
}

/// Why an event was not acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnReaction,
    BotAccount,
    NotInGuild,
    NoBinding,
    MemberUnavailable,
}

/// What dispatching an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Reconciled(Outcome),
    /// Bindings retired by a deletion or a reaction wipe
    Disabled { count: usize },
}

/// Routes platform events into the engine
pub struct Dispatcher {
    policy: Arc<RolePolicy>,
    reconciler: Arc<Reconciler>,
    cascade: Arc<CascadeHandler>,
}

impl Dispatcher {
    pub fn new(
        policy: Arc<RolePolicy>,
        reconciler: Arc<Reconciler>,
        cascade: Arc<CascadeHandler>,
    ) -> Self {
        Self {
            policy,
            reconciler,
            cascade,
        }
    }

    /// Consume events until the channel closes.
    ///
    /// Events are handled in arrival order so that an add followed by a
    /// remove from the same member is never reordered.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<PlatformEvent>) {
        info!("Dispatcher started");
        while let Some(event) = rx.recv().await {
            self.dispatch(event).await;
        }
        info!("Dispatcher stopped");
    }

    pub async fn dispatch(&self, event: PlatformEvent) -> DispatchOutcome {
        match event {
            PlatformEvent::ReactionAdded(reaction) => self.on_reaction(Action::Grant, reaction).await,
            PlatformEvent::ReactionRemoved(reaction) => {
                self.on_reaction(Action::Revoke, reaction).await
            }
            PlatformEvent::ReactionsCleared { message, .. } => self.on_reactions_cleared(message),
            PlatformEvent::MessageDeleted { message, .. } => self.retire(
                self.policy.registry().by_message(message),
                DisableReason::MessageDeleted,
            ),
            PlatformEvent::ChannelDeleted { channel } => self.retire(
                self.policy.registry().by_channel(channel),
                DisableReason::ChannelDeleted,
            ),
            PlatformEvent::GuildDeleted { guild } => self.retire(
                self.policy.registry().by_guild(guild),
                DisableReason::GuildDeleted,
            ),
            PlatformEvent::RoleDeleted { guild, role } => self.retire(
                self.policy.registry().by_role(guild, role),
                DisableReason::RoleDeleted,
            ),
            PlatformEvent::EmojiDeleted { guild, emoji } => self.retire(
                self.policy.registry().by_emoji(guild, &emoji),
                DisableReason::EmojiDeleted,
            ),
        }
    }

    #[instrument(skip(self, reaction), fields(message = %reaction.message, user = %reaction.user, action = %action))]
    async fn on_reaction(&self, action: Action, reaction: ReactionEvent) -> DispatchOutcome {
        let platform = self.policy.platform();

        if reaction.user == platform.bot_user() {
            return DispatchOutcome::Ignored(IgnoreReason::OwnReaction);
        }
        if reaction.user_is_bot {
            return DispatchOutcome::Ignored(IgnoreReason::BotAccount);
        }
        let Some(guild) = reaction.guild else {
            return DispatchOutcome::Ignored(IgnoreReason::NotInGuild);
        };

        let id = BindingId::new(reaction.message, &reaction.emoji);
        if self.policy.registry().get_enabled(&id).is_none() {
            return DispatchOutcome::Ignored(IgnoreReason::NoBinding);
        }

        let member = match platform.resolve_member(guild, reaction.user).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                debug!("Reacting user is not a guild member");
                return DispatchOutcome::Ignored(IgnoreReason::MemberUnavailable);
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve member");
                return DispatchOutcome::Ignored(IgnoreReason::MemberUnavailable);
            }
        };
        if member.is_bot {
            return DispatchOutcome::Ignored(IgnoreReason::BotAccount);
        }

        DispatchOutcome::Reconciled(self.reconciler.apply(action, member, &id).await)
    }

    fn on_reactions_cleared(&self, message: MessageId) -> DispatchOutcome {
        let bindings: Vec<Binding> = self
            .policy
            .registry()
            .by_message(message)
            .into_iter()
            .filter(Binding::is_enabled)
            .collect();
        if bindings.is_empty() {
            return DispatchOutcome::Ignored(IgnoreReason::NoBinding);
        }

        let roles: BTreeSet<RoleId> = bindings.iter().flat_map(|b| b.roles.iter().copied()).collect();
        let members: BTreeSet<UserId> = bindings
            .iter()
            .flat_map(|b| b.winners.iter().copied())
            .collect();

        info!(message = %message, bindings = bindings.len(), "All reactions cleared");
        self.policy.events().emit(ReactRoleEvent::AllReactionsCleared {
            message,
            roles: roles.into_iter().collect(),
            members: members.into_iter().collect(),
            count: bindings.len(),
        });

        self.retire(bindings, DisableReason::ReactionsCleared)
    }

    fn retire(&self, bindings: Vec<Binding>, reason: DisableReason) -> DispatchOutcome {
        if bindings.is_empty() {
            return DispatchOutcome::Ignored(IgnoreReason::NoBinding);
        }
        let count = self.cascade.disable_all(&bindings, reason);
        DispatchOutcome::Disabled { count }
    }
}
