//! CLI command implementations.

pub mod common;
pub mod pick;
pub mod render;
