//! Field validation shared by the user and store contexts.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DomainError;

/// Longest accepted address, in characters.
pub const MAX_ADDRESS_CHARS: usize = 400;
/// Shortest accepted user name, in characters.
pub const MIN_USER_NAME_CHARS: usize = 3;
/// Longest accepted user name, in characters.
pub const MAX_USER_NAME_CHARS: usize = 60;
/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;
/// Longest accepted password, in characters.
pub const MAX_PASSWORD_CHARS: usize = 16;

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is a literal; compilation cannot fail.
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("email pattern compiles")
});

/// Trims and checks a user's display name.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` unless the name has 3–60 characters.
pub fn user_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < MIN_USER_NAME_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "name must be at least {MIN_USER_NAME_CHARS} characters"
        )));
    }
    if len > MAX_USER_NAME_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "name cannot exceed {MAX_USER_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Trims and checks a store name.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` if the name is blank.
pub fn store_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput(
            "please provide store name".to_owned(),
        ));
    }
    Ok(name.to_owned())
}

/// Trims and checks an email address.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` if the address is malformed.
pub fn email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim();
    if EMAIL.is_match(email) {
        Ok(email.to_owned())
    } else {
        Err(DomainError::InvalidInput(
            "please provide a valid email".to_owned(),
        ))
    }
}

/// Checks a postal address.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` if the address is blank or longer
/// than 400 characters.
pub fn address(raw: &str) -> Result<String, DomainError> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(DomainError::InvalidInput(
            "please provide an address".to_owned(),
        ));
    }
    if address.chars().count() > MAX_ADDRESS_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "address cannot exceed {MAX_ADDRESS_CHARS} characters"
        )));
    }
    Ok(address.to_owned())
}

/// Checks a new login password. The password is not trimmed.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` unless the password has 8–16
/// characters, an uppercase letter and a special character.
pub fn password(raw: &str) -> Result<&str, DomainError> {
    let len = raw.chars().count();
    let problem = if len < MIN_PASSWORD_CHARS {
        format!("password must be at least {MIN_PASSWORD_CHARS} characters")
    } else if len > MAX_PASSWORD_CHARS {
        format!("password cannot exceed {MAX_PASSWORD_CHARS} characters")
    } else if !raw.chars().any(char::is_uppercase) {
        "password must contain at least one uppercase letter".to_owned()
    } else if !raw.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        "password must contain at least one special character".to_owned()
    } else {
        return Ok(raw);
    };
    Err(DomainError::InvalidInput(problem))
}
