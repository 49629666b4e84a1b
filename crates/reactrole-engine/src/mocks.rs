use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reactrole_types::{ChannelId, EmojiId, GuildId, MemberKey, MessageId, RoleId, UserId};

use crate::dispatcher::{PlatformEvent, ReactionEvent};
use crate::platform::{ChatPlatform, Member, MessageInfo, PlatformError, PlatformResult, Reactor};

/// A mutating call the engine made against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    AddRole {
        guild: GuildId,
        user: UserId,
        role: RoleId,
    },
    RemoveRole {
        guild: GuildId,
        user: UserId,
        role: RoleId,
    },
    AddReaction {
        message: MessageId,
        emoji: EmojiId,
    },
    RemoveReaction {
        message: MessageId,
        user: UserId,
        emoji: EmojiId,
    },
}

#[derive(Default)]
struct World {
    guilds: HashSet<GuildId>,
    unavailable: HashSet<GuildId>,
    channels: HashMap<ChannelId, Option<GuildId>>,
    messages: HashMap<MessageId, MessageInfo>,
    roles: HashMap<GuildId, HashSet<RoleId>>,
    unauthorized: HashSet<RoleId>,
    members: HashMap<MemberKey, Member>,
    emojis: HashMap<GuildId, HashMap<String, EmojiId>>,
    reactions: HashMap<(MessageId, EmojiId), Vec<Reactor>>,
    calls: Vec<PlatformCall>,
    emitted: VecDeque<PlatformEvent>,
    role_latency: Duration,
}

impl World {
    fn check_guild(&self, guild: GuildId) -> PlatformResult<()> {
        if self.unavailable.contains(&guild) {
            return Err(PlatformError::Unavailable(guild.to_string()));
        }
        if !self.guilds.contains(&guild) {
            return Err(PlatformError::NotFound(guild.to_string()));
        }
        Ok(())
    }

    fn message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<MessageInfo> {
        let info = self
            .messages
            .get(&message)
            .filter(|m| m.channel == channel)
            .copied()
            .ok_or_else(|| PlatformError::NotFound(message.to_string()))?;
        if let Some(guild) = info.guild {
            self.check_guild(guild)?;
        }
        Ok(info)
    }
}

/// In-memory chat platform for testing.
///
/// Holds guilds, channels, messages, members and reactions. Reactions made
/// through [`MockPlatform::react`] return the gateway event a real connector
/// would deliver; reactions the engine removes queue a `ReactionRemoved`
/// event, retrievable with [`MockPlatform::drain_events`].
pub struct MockPlatform {
    bot: UserId,
    world: Mutex<World>,
}

impl MockPlatform {
    pub fn new(bot: UserId) -> Self {
        Self {
            bot,
            world: Mutex::new(World::default()),
        }
    }

    pub fn add_guild(&self, guild: GuildId) {
        self.world.lock().guilds.insert(guild);
    }

    pub fn add_channel(&self, guild: GuildId, channel: ChannelId) {
        let mut world = self.world.lock();
        world.guilds.insert(guild);
        world.channels.insert(channel, Some(guild));
    }

    pub fn add_message(&self, channel: ChannelId, message: MessageId) {
        let mut world = self.world.lock();
        let guild = world.channels.get(&channel).copied().flatten();
        world.messages.insert(
            message,
            MessageInfo {
                id: message,
                channel,
                guild,
            },
        );
    }

    /// Add a message in a direct-message channel.
    pub fn add_direct_message(&self, channel: ChannelId, message: MessageId) {
        let mut world = self.world.lock();
        world.channels.insert(channel, None);
        world.messages.insert(
            message,
            MessageInfo {
                id: message,
                channel,
                guild: None,
            },
        );
    }

    pub fn create_role(&self, guild: GuildId, role: RoleId) {
        self.world.lock().roles.entry(guild).or_default().insert(role);
    }

    /// Place `role` above the bot so it can no longer be mutated.
    pub fn deny_role(&self, role: RoleId) {
        self.world.lock().unauthorized.insert(role);
    }

    pub fn allow_role(&self, role: RoleId) {
        self.world.lock().unauthorized.remove(&role);
    }

    pub fn register_emoji(&self, guild: GuildId, name: &str, id: &str) {
        self.world
            .lock()
            .emojis
            .entry(guild)
            .or_default()
            .insert(name.to_string(), EmojiId::new(id));
    }

    pub fn add_member(&self, member: Member) {
        self.world.lock().members.insert(member.key(), member);
    }

    pub fn remove_member(&self, guild: GuildId, user: UserId) {
        self.world.lock().members.remove(&MemberKey::new(guild, user));
    }

    /// Make every call touching `guild` fail with `Unavailable`.
    pub fn set_unavailable(&self, guild: GuildId) {
        self.world.lock().unavailable.insert(guild);
    }

    /// Delay every role add and removal by `latency`.
    pub fn set_role_latency(&self, latency: Duration) {
        self.world.lock().role_latency = latency;
    }

    async fn role_delay(&self) {
        let latency = self.world.lock().role_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Record a reaction and return the event a gateway would deliver.
    pub fn react(&self, message: MessageId, emoji: &EmojiId, user: UserId) -> PlatformEvent {
        let mut world = self.world.lock();
        let info = world.messages.get(&message).copied();
        let is_bot = self.is_bot(&world, info.and_then(|m| m.guild), user);
        let reactors = world
            .reactions
            .entry((message, emoji.clone()))
            .or_default();
        if !reactors.iter().any(|r| r.user == user) {
            reactors.push(Reactor { user, is_bot });
        }
        PlatformEvent::ReactionAdded(Self::reaction_event(info, message, emoji, user, is_bot))
    }

    /// Withdraw a reaction and return the event a gateway would deliver.
    pub fn unreact(&self, message: MessageId, emoji: &EmojiId, user: UserId) -> PlatformEvent {
        let mut world = self.world.lock();
        let info = world.messages.get(&message).copied();
        let is_bot = self.is_bot(&world, info.and_then(|m| m.guild), user);
        if let Some(reactors) = world.reactions.get_mut(&(message, emoji.clone())) {
            reactors.retain(|r| r.user != user);
        }
        PlatformEvent::ReactionRemoved(Self::reaction_event(info, message, emoji, user, is_bot))
    }

    /// Clear all reactions from a message.
    pub fn clear_reactions(&self, message: MessageId) -> PlatformEvent {
        let mut world = self.world.lock();
        world.reactions.retain(|(m, _), _| *m != message);
        let channel = world
            .messages
            .get(&message)
            .map(|m| m.channel)
            .unwrap_or_else(|| ChannelId::new(0));
        PlatformEvent::ReactionsCleared { channel, message }
    }

    pub fn delete_message(&self, message: MessageId) -> PlatformEvent {
        let mut world = self.world.lock();
        let channel = world
            .messages
            .remove(&message)
            .map(|m| m.channel)
            .unwrap_or_else(|| ChannelId::new(0));
        world.reactions.retain(|(m, _), _| *m != message);
        PlatformEvent::MessageDeleted { channel, message }
    }

    pub fn delete_channel(&self, channel: ChannelId) -> PlatformEvent {
        let mut world = self.world.lock();
        world.channels.remove(&channel);
        world.messages.retain(|_, m| m.channel != channel);
        PlatformEvent::ChannelDeleted { channel }
    }

    pub fn delete_role(&self, guild: GuildId, role: RoleId) -> PlatformEvent {
        let mut world = self.world.lock();
        if let Some(roles) = world.roles.get_mut(&guild) {
            roles.remove(&role);
        }
        for member in world.members.values_mut() {
            member.roles.retain(|r| *r != role);
        }
        PlatformEvent::RoleDeleted { guild, role }
    }

    pub fn reactors(&self, message: MessageId, emoji: &EmojiId) -> Vec<UserId> {
        self.world
            .lock()
            .reactions
            .get(&(message, emoji.clone()))
            .map(|r| r.iter().map(|r| r.user).collect())
            .unwrap_or_default()
    }

    pub fn member_roles(&self, guild: GuildId, user: UserId) -> Vec<RoleId> {
        self.world
            .lock()
            .members
            .get(&MemberKey::new(guild, user))
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.world.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.world.lock().calls.clear();
    }

    /// Take the events queued by reactions the engine removed.
    pub fn drain_events(&self) -> Vec<PlatformEvent> {
        self.world.lock().emitted.drain(..).collect()
    }

    fn is_bot(&self, world: &World, guild: Option<GuildId>, user: UserId) -> bool {
        user == self.bot
            || guild
                .and_then(|g| world.members.get(&MemberKey::new(g, user)))
                .map(|m| m.is_bot)
                .unwrap_or(false)
    }

    fn reaction_event(
        info: Option<MessageInfo>,
        message: MessageId,
        emoji: &EmojiId,
        user: UserId,
        user_is_bot: bool,
    ) -> ReactionEvent {
        ReactionEvent {
            guild: info.and_then(|m| m.guild),
            channel: info.map(|m| m.channel).unwrap_or_else(|| ChannelId::new(0)),
            message,
            user,
            emoji: emoji.clone(),
            user_is_bot,
        }
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    fn bot_user(&self) -> UserId {
        self.bot
    }

    async fn guild_available(&self, guild: GuildId) -> PlatformResult<bool> {
        let world = self.world.lock();
        if world.unavailable.contains(&guild) {
            return Err(PlatformError::Unavailable(guild.to_string()));
        }
        Ok(world.guilds.contains(&guild))
    }

    async fn channel_available(&self, channel: ChannelId) -> PlatformResult<bool> {
        Ok(self.world.lock().channels.contains_key(&channel))
    }

    async fn resolve_member(&self, guild: GuildId, user: UserId) -> PlatformResult<Option<Member>> {
        let world = self.world.lock();
        world.check_guild(guild)?;
        Ok(world.members.get(&MemberKey::new(guild, user)).cloned())
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<MessageInfo> {
        self.world.lock().message(channel, message)
    }

    async fn fetch_reactors(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &EmojiId,
    ) -> PlatformResult<Vec<Reactor>> {
        let world = self.world.lock();
        world.message(channel, message)?;
        Ok(world
            .reactions
            .get(&(message, emoji.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        self.role_delay().await;
        let mut world = self.world.lock();
        world.check_guild(guild)?;
        if world.unauthorized.contains(&role) {
            return Err(PlatformError::Forbidden(role.to_string()));
        }
        if !world.roles.get(&guild).is_some_and(|r| r.contains(&role)) {
            return Err(PlatformError::NotFound(role.to_string()));
        }
        let member = world
            .members
            .get_mut(&MemberKey::new(guild, user))
            .ok_or_else(|| PlatformError::NotFound(user.to_string()))?;
        if !member.roles.contains(&role) {
            member.roles.push(role);
        }
        world.calls.push(PlatformCall::AddRole { guild, user, role });
        Ok(())
    }

    async fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()> {
        self.role_delay().await;
        let mut world = self.world.lock();
        world.check_guild(guild)?;
        if world.unauthorized.contains(&role) {
            return Err(PlatformError::Forbidden(role.to_string()));
        }
        let member = world
            .members
            .get_mut(&MemberKey::new(guild, user))
            .ok_or_else(|| PlatformError::NotFound(user.to_string()))?;
        member.roles.retain(|r| *r != role);
        world.calls.push(PlatformCall::RemoveRole { guild, user, role });
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &EmojiId,
    ) -> PlatformResult<()> {
        let mut world = self.world.lock();
        world.message(channel, message)?;
        let reactors = world
            .reactions
            .entry((message, emoji.clone()))
            .or_default();
        if !reactors.iter().any(|r| r.user == self.bot) {
            reactors.push(Reactor {
                user: self.bot,
                is_bot: true,
            });
        }
        world.calls.push(PlatformCall::AddReaction {
            message,
            emoji: emoji.clone(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &EmojiId,
    ) -> PlatformResult<()> {
        let mut world = self.world.lock();
        let info = world.message(channel, message)?;
        let removed = match world.reactions.get_mut(&(message, emoji.clone())) {
            Some(reactors) => {
                let before = reactors.len();
                reactors.retain(|r| r.user != user);
                reactors.len() != before
            }
            None => false,
        };
        world.calls.push(PlatformCall::RemoveReaction {
            message,
            user,
            emoji: emoji.clone(),
        });
        if removed {
            let is_bot = self.is_bot(&world, info.guild, user);
            world.emitted.push_back(PlatformEvent::ReactionRemoved(Self::reaction_event(
                Some(info),
                message,
                emoji,
                user,
                is_bot,
            )));
        }
        Ok(())
    }

    async fn is_role_authorized(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool> {
        let world = self.world.lock();
        world.check_guild(guild)?;
        Ok(!world.unauthorized.contains(&role))
    }

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool> {
        let world = self.world.lock();
        world.check_guild(guild)?;
        Ok(world.roles.get(&guild).is_some_and(|r| r.contains(&role)))
    }

    async fn resolve_emoji(&self, guild: GuildId, emoji: &str) -> PlatformResult<Option<EmojiId>> {
        let world = self.world.lock();
        world.check_guild(guild)?;
        if let Some(custom) = world.emojis.get(&guild) {
            if let Some(id) = custom.get(emoji) {
                return Ok(Some(id.clone()));
            }
            if let Some(id) = custom.values().find(|id| id.as_str() == emoji) {
                return Ok(Some(id.clone()));
            }
        }
        // Unicode emoji are their own identifier
        if !emoji.is_empty() && !emoji.is_ascii() {
            return Ok(Some(EmojiId::new(emoji)));
        }
        Ok(None)
    }
}
