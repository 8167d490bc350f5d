//! CLI command implementations.

pub mod keys;
pub mod simulate;
