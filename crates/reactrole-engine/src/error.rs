//! Error types for the engine

use reactrole_types::BindingId;
use thiserror::Error;

use crate::platform::PlatformError;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Registration target is not a guild message, or does not exist
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// None of the requested roles exist in the guild
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Emoji could not be resolved to a stable identifier
    #[error("Invalid emoji: {0}")]
    InvalidEmoji(String),

    /// No binding matches the selector
    #[error("Binding not found: {0}")]
    NotFound(BindingId),

    /// Platform call failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Store call failed
    #[error("Store error: {0}")]
    Store(#[from] reactrole_store::StoreError),

    /// Invalid configuration or missing builder dependency
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
