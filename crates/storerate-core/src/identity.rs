//! Authenticated identity and the access-control predicates applied to it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::model::Role;

/// The identity attached to a request after token validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// The authenticated user.
    pub user_id: Uuid,
    /// The user's role at authentication time.
    pub role: Role,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether this principal is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Requires the principal's role to be one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` otherwise.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), DomainError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "user role {} is not authorized to access this resource",
                self.role
            )))
        }
    }

    /// Requires the principal to be an administrator.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` otherwise.
    pub fn require_admin(&self) -> Result<(), DomainError> {
        self.require_role(&[Role::Admin])
    }

    /// Requires the principal to be `owner_id` or an administrator.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` otherwise.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> Result<(), DomainError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Forbidden("not authorized".to_owned()))
        }
    }
}

/// Validates bearer tokens issued by the identity component.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves `token` to the principal it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unauthenticated` for unknown or expired tokens and
    /// `DomainError::Unavailable` if the backing store cannot be reached.
    async fn authenticate(&self, token: &str) -> Result<Principal, DomainError>;
}

/// One-way hashing of login passwords. The hash is stored with the user and
/// only ever read back by the identity component.
pub trait CredentialHasher: Send + Sync {
    /// Hashes `password` with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unavailable` if hashing fails.
    fn hash_password(&self, password: &str) -> Result<String, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_role_accepts_listed_role() {
        let principal = Principal::new(Uuid::new_v4(), Role::StoreOwner);
        assert!(
            principal
                .require_role(&[Role::Admin, Role::StoreOwner])
                .is_ok()
        );
    }

    #[test]
    fn test_require_admin_rejects_user() {
        let principal = Principal::new(Uuid::new_v4(), Role::User);
        match principal.require_admin() {
            Err(DomainError::Forbidden(msg)) => assert!(msg.contains("user role user")),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn test_owner_or_admin() {
        let owner_id = Uuid::new_v4();
        let owner = Principal::new(owner_id, Role::StoreOwner);
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        let stranger = Principal::new(Uuid::new_v4(), Role::User);

        assert!(owner.require_owner_or_admin(owner_id).is_ok());
        assert!(admin.require_owner_or_admin(owner_id).is_ok());
        assert!(matches!(
            stranger.require_owner_or_admin(owner_id),
            Err(DomainError::Forbidden(_))
        ));
    }
}
