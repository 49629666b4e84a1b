//! Builder for ReactRoleEngine
//!
//! Wires the platform connector, binding store and optional hooks into a
//! running engine.

use std::sync::Arc;

use reactrole_store::BindingStore;

use crate::config::EngineConfig;
use crate::engine::ReactRoleEngine;
use crate::error::{EngineError, Result};
use crate::hooks::{AllowAllHooks, RoleHooks};
use crate::platform::ChatPlatform;

/// Builder for constructing a ReactRoleEngine with all dependencies
#[derive(Default)]
pub struct ReactRoleEngineBuilder {
    platform: Option<Arc<dyn ChatPlatform>>,
    store: Option<Arc<dyn BindingStore>>,
    hooks: Option<Arc<dyn RoleHooks>>,
    config: Option<EngineConfig>,
}

impl ReactRoleEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the platform connector
    pub fn with_platform(mut self, platform: Arc<dyn ChatPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the binding store
    pub fn with_store(mut self, store: Arc<dyn BindingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set pre-mutation hooks (defaults to allowing everything)
    pub fn with_hooks(mut self, hooks: Arc<dyn RoleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the engine. Spawns background tasks, so it must run inside a
    /// Tokio runtime.
    pub fn build(self) -> Result<ReactRoleEngine> {
        let platform = self
            .platform
            .ok_or_else(|| EngineError::Config("platform required".into()))?;
        let store = self
            .store
            .ok_or_else(|| EngineError::Config("store required".into()))?;
        let hooks = self.hooks.unwrap_or_else(|| Arc::new(AllowAllHooks));
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(ReactRoleEngine::new(config, platform, store, hooks))
    }
}
