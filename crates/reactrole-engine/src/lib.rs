//! reactrole Engine - keeps reaction roles in sync with reactions
//!
//! The engine consumes platform events and maintains one invariant per
//! binding: a member holds the binding's roles exactly when the binding's
//! rules say they should, given their current reaction.
//!
//! ## Components
//!
//! - **Dispatcher**: routes gateway events to reconciliation or retirement
//! - **Reconciler**: applies one reaction change (kind flags, gates, grant/revoke)
//! - **ToggleDebouncer**: settles toggle groups after a burst of reactions
//! - **BootReconciler**: repairs drift accumulated while offline
//! - **Persister**: write-behind copy of the registry into a [`BindingStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! let engine = ReactRoleEngine::builder()
//!     .with_platform(platform)
//!     .with_store(Arc::new(JsonFileStore::open("bindings.json").await?))
//!     .build()?;
//!
//! let report = engine.start().await?;
//! engine.spawn_dispatcher(gateway_rx);
//! ```
//!
//! [`BindingStore`]: reactrole_store::BindingStore

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod boot;
pub mod builder;
pub mod cascade;
pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod hooks;
pub mod member_lock;
pub mod mocks;
pub mod permissions;
pub mod persist;
pub mod platform;
pub mod policy;
pub mod readiness;
pub mod reconciler;
pub mod registration;
pub mod registry;
pub mod requirements;

pub use boot::{BootReconciler, BootReport};
pub use builder::ReactRoleEngineBuilder;
pub use cascade::CascadeHandler;
pub use config::EngineConfig;
pub use debounce::{DebounceState, DebounceTask, ToggleDebouncer};
pub use dispatcher::{DispatchOutcome, Dispatcher, IgnoreReason, PlatformEvent, ReactionEvent};
pub use engine::ReactRoleEngine;
pub use error::{EngineError, Result};
pub use events::EventAggregator;
pub use hooks::{AllowAllHooks, RoleHooks};
pub use member_lock::{MemberGuard, MemberLocks};
pub use mocks::{MockPlatform, PlatformCall};
pub use platform::{ChatPlatform, Member, MessageInfo, PlatformError, PlatformResult, Reactor};
pub use policy::{Admission, RolePolicy};
pub use readiness::ReadinessGate;
pub use reconciler::{Outcome, Reconciler};
pub use registration::{BindingSelector, BindingSpec, Registrar};
pub use registry::BindingRegistry;
