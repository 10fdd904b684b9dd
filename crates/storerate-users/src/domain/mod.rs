//! Domain layer: commands and profile rules.

pub mod commands;
pub mod user;
