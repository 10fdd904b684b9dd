//! PostgreSQL-backed persistence for the store rating service.
//!
//! Implements `EntityStore`/`EntityTransaction` over `sqlx` and an
//! `IdentityProvider` over opaque bearer tokens, with Argon2 password
//! hashing for the login flow. The schema lives in the workspace
//! `migrations/` directory.

mod error;
mod rows;

pub mod credentials;
pub mod pg_entity_store;
pub mod pg_identity_provider;

pub use credentials::Argon2CredentialHasher;
pub use pg_entity_store::PgEntityStore;
pub use pg_identity_provider::{IssuedToken, PgIdentityProvider};

/// Migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
