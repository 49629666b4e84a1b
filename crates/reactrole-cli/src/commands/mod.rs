//! CLI command implementations

pub mod bindings;
