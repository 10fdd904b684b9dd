//! Route modules organized by bounded context.

pub mod health;
pub mod ratings;
pub mod stores;
pub mod users;

use serde::Serialize;

/// Confirmation body for deletions.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// What happened.
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}
