//! Domain error types.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The kinds of entity a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A user account.
    User,
    /// A rated store.
    Store,
    /// A single user's rating of a store.
    Rating,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Store => "store",
            Self::Rating => "rating",
        })
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Which kind of entity was missing.
        entity: Entity,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller is authenticated but may not act on this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller presented no token or an invalid one.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// Storage I/O failed or timed out.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    /// Shorthand for a missing user.
    #[must_use]
    pub fn user_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: Entity::User,
            id,
        }
    }

    /// Shorthand for a missing store.
    #[must_use]
    pub fn store_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: Entity::Store,
            id,
        }
    }

    /// Shorthand for a missing rating.
    #[must_use]
    pub fn rating_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: Entity::Rating,
            id,
        }
    }

    /// Whether a local retry may succeed. Only storage failures qualify;
    /// every other kind is deterministic.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity_and_id() {
        let id = Uuid::nil();
        let err = DomainError::store_not_found(id);
        assert_eq!(
            err.to_string(),
            "store not found: 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(DomainError::Unavailable("pool timed out".into()).is_retryable());
        assert!(!DomainError::Conflict("duplicate".into()).is_retryable());
        assert!(!DomainError::InvalidInput("bad".into()).is_retryable());
        assert!(!DomainError::Forbidden("no".into()).is_retryable());
        assert!(!DomainError::rating_not_found(Uuid::nil()).is_retryable());
    }
}
