//! Domain layer: commands and store rules.

pub mod commands;
pub mod store;
