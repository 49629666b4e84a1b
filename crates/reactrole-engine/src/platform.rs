//! Chat platform boundary.
//!
//! The engine never talks to a gateway or REST client directly. Everything it
//! needs from the platform goes through [`ChatPlatform`], which a concrete
//! connector implements.

use async_trait::async_trait;
use reactrole_types::{ChannelId, EmojiId, GuildId, MemberKey, MessageId, RoleId, UserId};
use thiserror::Error;

/// Errors surfaced by a platform connector
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// Entity does not exist (or no longer exists)
    #[error("not found: {0}")]
    NotFound(String),

    /// The bot may not perform this call
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Transient failure; the entity may still exist
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Snapshot of a guild member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub guild: GuildId,
    pub user: UserId,
    pub roles: Vec<RoleId>,
    /// Currently boosting the guild
    pub is_boosting: bool,
    /// Holds the verified-developer badge
    pub is_verified_developer: bool,
    pub is_bot: bool,
}

impl Member {
    pub fn new(guild: GuildId, user: UserId) -> Self {
        Self {
            guild,
            user,
            roles: Vec::new(),
            is_boosting: false,
            is_verified_developer: false,
            is_bot: false,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn boosting(mut self) -> Self {
        self.is_boosting = true;
        self
    }

    pub fn verified_developer(mut self) -> Self {
        self.is_verified_developer = true;
        self
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    pub fn key(&self) -> MemberKey {
        MemberKey::new(self.guild, self.user)
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Location of a fetched message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    pub id: MessageId,
    pub channel: ChannelId,
    /// `None` for direct messages
    pub guild: Option<GuildId>,
}

/// One user currently reacting with an emoji
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reactor {
    pub user: UserId,
    pub is_bot: bool,
}

/// Operations the engine needs from the chat platform
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own user id
    fn bot_user(&self) -> UserId;

    async fn guild_available(&self, guild: GuildId) -> PlatformResult<bool>;

    async fn channel_available(&self, channel: ChannelId) -> PlatformResult<bool>;

    /// Resolve a member; `Ok(None)` when the user is not in the guild
    async fn resolve_member(&self, guild: GuildId, user: UserId) -> PlatformResult<Option<Member>>;

    /// Fetch a message; `NotFound` when it was deleted
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<MessageInfo>;

    /// Everyone currently reacting with `emoji` on the message
    async fn fetch_reactors(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &EmojiId,
    ) -> PlatformResult<Vec<Reactor>>;

    /// Whether `user` currently reacts with `emoji` on the message
    async fn has_reacted(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &EmojiId,
        user: UserId,
    ) -> PlatformResult<bool> {
        Ok(self
            .fetch_reactors(channel, message, emoji)
            .await?
            .iter()
            .any(|r| r.user == user))
    }

    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()>;

    async fn remove_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()>;

    /// React on the message as the bot
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &EmojiId,
    ) -> PlatformResult<()>;

    /// Remove one user's reaction. Removing an absent reaction succeeds.
    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &EmojiId,
    ) -> PlatformResult<()>;

    /// Whether the bot's permissions and role position allow mutating `role`
    async fn is_role_authorized(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool>;

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool>;

    /// Resolve a unicode emoji or a custom emoji reference to a stable id
    async fn resolve_emoji(&self, guild: GuildId, emoji: &str) -> PlatformResult<Option<EmojiId>>;
}
