//! Domain layer: commands and rating rules.

pub mod commands;
pub mod rating;
