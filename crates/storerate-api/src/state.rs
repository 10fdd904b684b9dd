//! Shared application state.

use std::sync::Arc;

use storerate_core::clock::Clock;
use storerate_core::identity::{CredentialHasher, IdentityProvider};
use storerate_core::repository::EntityStore;
use storerate_core::retry::RetryPolicy;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Users, stores and ratings.
    pub entities: Arc<dyn EntityStore>,
    /// Resolves bearer tokens to principals.
    pub identity: Arc<dyn IdentityProvider>,
    /// Hashes passwords of newly created users.
    pub credentials: Arc<dyn CredentialHasher>,
    /// Source of timestamps for new records.
    pub clock: Arc<dyn Clock>,
    /// Local retry of idempotent storage steps.
    pub retry: RetryPolicy,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        entities: Arc<dyn EntityStore>,
        identity: Arc<dyn IdentityProvider>,
        credentials: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            entities,
            identity,
            credentials,
            clock,
            retry,
        }
    }
}
