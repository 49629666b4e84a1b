//! reactrole Store - Persistence for reaction-to-role bindings
//!
//! The engine treats persistence as a write-behind copy of its in-memory
//! registry. Backends implement [`BindingStore`]:
//!
//! - **JsonFileStore**: one JSON array, rewritten in full on every change
//! - **InMemoryBindingStore**: keyed upserts, for development and testing
//!
//! Each backend decides through its [`LoadPolicy`] whether soft-deleted
//! bindings come back on load.

#![deny(unsafe_code)]

pub mod error;
pub mod json;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use json::JsonFileStore;
pub use memory::InMemoryBindingStore;
pub use traits::{BindingStore, LoadPolicy};
