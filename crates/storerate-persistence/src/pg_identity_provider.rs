//! Opaque bearer tokens backed by the `access_tokens` table.
//!
//! A token is 32 random bytes, hex encoded, handed to the client once. Only
//! its SHA-256 digest is stored. Authentication re-reads the user's role on
//! every call so a promotion takes effect on the next request. Login checks
//! the Argon2 hash in `users.password_hash` before issuing a token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use storerate_core::clock::Clock;
use storerate_core::error::DomainError;
use storerate_core::identity::{IdentityProvider, Principal};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::credentials::verify_password;
use crate::error::storage_error;
use crate::rows::parse_role;

const TOKEN_BYTES: usize = 32;

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The secret to hand to the client. Never stored.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

pub(crate) fn token_digest(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthenticated("invalid email or password".to_owned())
}

fn rejected() -> DomainError {
    DomainError::Unauthenticated("token failed".to_owned())
}

/// PostgreSQL-backed identity provider.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgIdentityProvider {
    /// Creates a new `PgIdentityProvider`. Expiry is judged against `clock`.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Issues a token for `user_id`, valid for `ttl`. Called by the login
    /// flow once credentials are verified.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the user does not exist, or
    /// `DomainError::Unavailable` if storage fails.
    pub async fn issue_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<IssuedToken, DomainError> {
        let secret: [u8; TOKEN_BYTES] = rand::random();
        let token = hex::encode(secret);
        let expires_at = self.clock.now() + ttl;

        let result = sqlx::query(
            "INSERT INTO access_tokens (token_hash, user_id, expires_at) \
             SELECT $1, id, $3 FROM users WHERE id = $2",
        )
        .bind(token_digest(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::user_not_found(user_id));
        }

        debug!(%user_id, %expires_at, "access token issued");
        Ok(IssuedToken { token, expires_at })
    }

    /// Checks an email and password and issues a token valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unauthenticated` if the email is unknown, the
    /// user has no password, or the password does not match, and
    /// `DomainError::Unavailable` if storage fails.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ttl: Duration,
    ) -> Result<IssuedToken, DomainError> {
        let row: Option<(Uuid, Option<String>)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        let Some((user_id, Some(stored_hash))) = row else {
            warn!("login for unknown email or user without password");
            return Err(invalid_credentials());
        };
        if !verify_password(password, &stored_hash) {
            warn!(%user_id, "login with wrong password");
            return Err(invalid_credentials());
        }
        self.issue_token(user_id, ttl).await
    }

    /// Revokes a token. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unavailable` if storage fails.
    pub async fn revoke_token(&self, token: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE token_hash = $1")
            .bind(token_digest(token))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Principal, DomainError> {
        let row: Option<(Uuid, DateTime<Utc>, String)> = sqlx::query_as(
            "SELECT t.user_id, t.expires_at, u.role \
             FROM access_tokens t JOIN users u ON u.id = t.user_id \
             WHERE t.token_hash = $1",
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        let Some((user_id, expires_at, role)) = row else {
            warn!("unknown access token presented");
            return Err(rejected());
        };
        if expires_at <= self.clock.now() {
            warn!(%user_id, %expires_at, "expired access token presented");
            return Err(rejected());
        }
        Ok(Principal::new(user_id, parse_role(&role)?))
    }
}
