//! Account creation and profile edit rules.

use chrono::{DateTime, Utc};
use storerate_core::error::DomainError;
use storerate_core::model::{Role, User};
use storerate_core::validation;
use uuid::Uuid;

/// Validates the submitted fields and builds a new user. The role defaults
/// to `user`.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` naming the first invalid field.
pub fn new_user(
    name: &str,
    email: &str,
    address: &str,
    role: Option<Role>,
    now: DateTime<Utc>,
) -> Result<User, DomainError> {
    Ok(User {
        id: Uuid::new_v4(),
        name: validation::user_name(name)?,
        email: validation::email(email)?,
        address: validation::address(address)?,
        role: role.unwrap_or(Role::User),
        created_at: now,
    })
}

/// Applies optional edits to `current`, validating only the fields that
/// change. The id and registration time never change.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` naming the first invalid field.
pub fn revise_profile(
    current: &User,
    name: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
    role: Option<Role>,
) -> Result<User, DomainError> {
    Ok(User {
        name: name.map_or_else(|| Ok(current.name.clone()), validation::user_name)?,
        email: email.map_or_else(|| Ok(current.email.clone()), validation::email)?,
        address: address.map_or_else(|| Ok(current.address.clone()), validation::address)?,
        role: role.unwrap_or(current.role),
        ..current.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Dana Whitfield".to_owned(),
            email: "dana@mail.com".to_owned(),
            address: "4 Elm Road".to_owned(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_revise_profile_applies_only_given_fields() {
        let user = sample();

        let revised =
            revise_profile(&user, Some(" Dana W. "), None, None, Some(Role::StoreOwner)).unwrap();

        assert_eq!(revised.id, user.id);
        assert_eq!(revised.name, "Dana W.");
        assert_eq!(revised.email, user.email);
        assert_eq!(revised.address, user.address);
        assert_eq!(revised.role, Role::StoreOwner);
        assert_eq!(revised.created_at, user.created_at);
    }

    #[test]
    fn test_revise_profile_rejects_short_name_and_bad_email() {
        let user = sample();

        assert!(revise_profile(&user, Some("Al"), None, None, None).is_err());
        assert!(revise_profile(&user, None, Some("nope"), None, None).is_err());
    }

    #[test]
    fn test_new_user_defaults_role_and_trims_fields() {
        let now = Utc::now();

        let user = new_user(" Dana Whitfield ", "dana@mail.com", " 4 Elm Road ", None, now).unwrap();

        assert_eq!(user.name, "Dana Whitfield");
        assert_eq!(user.address, "4 Elm Road");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.created_at, now);
    }

    #[test]
    fn test_new_user_rejects_bad_email() {
        let result = new_user("Dana Whitfield", "dana-at-mail", "4 Elm Road", None, Utc::now());

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }
}
