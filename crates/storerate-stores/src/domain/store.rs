//! Rules for opening and editing a store.

use chrono::{DateTime, Utc};
use storerate_core::aggregate::StoreAggregate;
use storerate_core::error::DomainError;
use storerate_core::model::{Role, Store, StoreDetails};
use storerate_core::validation;
use uuid::Uuid;

/// Validates the submitted fields and builds a new store with an empty
/// aggregate.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` naming the first invalid field.
pub fn new_store(
    name: &str,
    email: &str,
    address: &str,
    owner_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Store, DomainError> {
    let aggregate = StoreAggregate::empty();
    Ok(Store {
        id: Uuid::new_v4(),
        name: validation::store_name(name)?,
        email: validation::email(email)?,
        address: validation::address(address)?,
        owner_id,
        average_rating: aggregate.average_rating(),
        total_ratings: aggregate.total_ratings(),
        created_at: now,
    })
}

/// Merges optional edits over a store's current details, validating only
/// the fields that change.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` naming the first invalid field.
pub fn revise_details(
    current: &Store,
    name: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
) -> Result<StoreDetails, DomainError> {
    Ok(StoreDetails {
        name: name.map_or_else(|| Ok(current.name.clone()), validation::store_name)?,
        email: email.map_or_else(|| Ok(current.email.clone()), validation::email)?,
        address: address.map_or_else(|| Ok(current.address.clone()), validation::address)?,
    })
}

/// The role a user holds once they own a store. Plain users are promoted;
/// administrators keep their role.
#[must_use]
pub fn owner_role(current: Role) -> Role {
    match current {
        Role::User | Role::StoreOwner => Role::StoreOwner,
        Role::Admin => Role::Admin,
    }
}
