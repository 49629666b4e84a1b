//! Binding invariant errors

use crate::ids::{BindingId, UserId};
use thiserror::Error;

/// Structural invariant violations of a [`crate::Binding`] record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("binding {0} has no roles")]
    NoRoles(BindingId),

    #[error("binding id {id} does not match its message/emoji (expected {expected})")]
    IdMismatch { id: BindingId, expected: BindingId },

    #[error("binding {id} lists winner {user} more than once")]
    DuplicateWinner { id: BindingId, user: UserId },

    #[error("binding {id} has {winners} winners but max is {max}")]
    CapacityExceeded {
        id: BindingId,
        winners: usize,
        max: u32,
    },
}

/// Result type for binding validation
pub type Result<T> = std::result::Result<T, BindingError>;
