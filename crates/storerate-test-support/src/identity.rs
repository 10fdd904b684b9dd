//! Test identity provider — a fixed token table — and a readable hasher.

use std::collections::HashMap;

use async_trait::async_trait;
use storerate_core::error::DomainError;
use storerate_core::identity::{CredentialHasher, IdentityProvider, Principal};

/// An identity provider backed by an in-memory map from token to principal.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Principal>,
}

impl StaticIdentityProvider {
    /// Creates a provider that knows no tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for `principal`.
    #[must_use]
    pub fn with_token(mut self, token: &str, principal: Principal) -> Self {
        self.tokens.insert(token.to_owned(), principal);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Principal, DomainError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| DomainError::Unauthenticated("token failed".to_owned()))
    }
}

/// A hasher whose output is the password with a `plain:` prefix, so tests
/// can see what was stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCredentialHasher;

impl CredentialHasher for PlainCredentialHasher {
    fn hash_password(&self, password: &str) -> Result<String, DomainError> {
        Ok(format!("plain:{password}"))
    }
}
