//! Configuration for the reconciliation engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay used to coalesce rapid toggle reactions from one member
    #[serde(default = "default_debounce_window")]
    pub debounce_window_ms: u64,

    /// Attempts a debounced settlement makes while the member is busy
    #[serde(default = "default_debounce_attempts")]
    pub debounce_max_attempts: u32,

    /// Quiet period after the last boot reconciliation before `Ready` fires
    #[serde(default = "default_ready_quiet_period")]
    pub ready_quiet_period_ms: u64,

    /// Remove bindings from the store instead of flagging them disabled
    #[serde(default)]
    pub hard_delete: bool,

    /// Capacity of the domain event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: default_debounce_window(),
            debounce_max_attempts: default_debounce_attempts(),
            ready_quiet_period_ms: default_ready_quiet_period(),
            hard_delete: false,
            event_channel_capacity: default_event_capacity(),
        }
    }
}

impl EngineConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn ready_quiet_period(&self) -> Duration {
        Duration::from_millis(self.ready_quiet_period_ms)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.debounce_max_attempts == 0 {
            return Err(EngineError::Config(
                "debounce_max_attempts must be at least 1".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(EngineError::Config(
                "event_channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// Default value helpers
fn default_debounce_window() -> u64 {
    1500
}

fn default_debounce_attempts() -> u32 {
    3
}

fn default_ready_quiet_period() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    1024
}
