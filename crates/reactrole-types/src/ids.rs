//! Strongly-typed identifiers for platform entities
//!
//! Platform ids are 64-bit snowflakes wrapped in newtype structs for type
//! safety. Emoji ids are strings because unicode emoji have no numeric id.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

snowflake_id!(
    /// Identifier of a guild (the group scope roles live in)
    GuildId,
    "guild"
);
snowflake_id!(
    /// Identifier of a channel
    ChannelId,
    "channel"
);
snowflake_id!(
    /// Identifier of a message
    MessageId,
    "message"
);
snowflake_id!(
    /// Identifier of a role
    RoleId,
    "role"
);
snowflake_id!(
    /// Identifier of a user account
    UserId,
    "user"
);

/// Stable emoji identifier: the custom emoji id, or the unicode sequence itself
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmojiId(String);

impl EmojiId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmojiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite binding identifier: `<message>-<emoji>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BindingId(String);

impl BindingId {
    /// Derive the id from its message and emoji
    pub fn new(message: MessageId, emoji: &EmojiId) -> Self {
        Self(format!("{}-{}", message.get(), emoji.as_str()))
    }

    /// Wrap a raw id string, e.g. one read back from a store
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding:{}", self.0)
    }
}

/// A member is a user scoped to one guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub guild: GuildId,
    pub user: UserId,
}

impl MemberKey {
    pub fn new(guild: GuildId, user: UserId) -> Self {
        Self { guild, user }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild, self.user)
    }
}
