//! reactrole Types - Core types for reaction-to-role bindings
//!
//! ## Key Concepts
//!
//! - **Binding**: one emoji reaction on one message mapped to one or more roles
//! - **BindingKind**: composable behaviour flags (toggle, just-win, just-lose, reversed)
//! - **Winners**: members currently holding a binding's roles, in grant order
//! - **Events**: unified stream of grants, revocations and lifecycle changes

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod binding;
pub mod error;
pub mod events;
pub mod ids;

pub use binding::{Action, Binding, BindingKind, LifecycleState, RequirementKind, Requirements};
pub use error::{BindingError, Result};
pub use events::{DisableReason, EventEnvelope, EventSeverity, ReactRoleEvent};
pub use ids::{BindingId, ChannelId, EmojiId, GuildId, MemberKey, MessageId, RoleId, UserId};
