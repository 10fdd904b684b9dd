//! Commands for the Store Lifecycle context.

use storerate_core::identity::Principal;
use uuid::Uuid;

/// Command to open a store for an existing user.
#[derive(Debug, Clone)]
pub struct CreateStore {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be an administrator.
    pub requester: Principal,
    /// Raw store name.
    pub name: String,
    /// Raw contact email.
    pub email: String,
    /// Raw postal address.
    pub address: String,
    /// The user who will own the store.
    pub owner_id: Uuid,
}

/// Command to edit a store's details. Omitted fields keep their value.
#[derive(Debug, Clone)]
pub struct UpdateStore {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be an administrator.
    pub requester: Principal,
    /// The store to edit.
    pub store_id: Uuid,
    /// New name, if changing.
    pub name: Option<String>,
    /// New email, if changing.
    pub email: Option<String>,
    /// New address, if changing.
    pub address: Option<String>,
}

/// Command to delete a store together with its ratings.
#[derive(Debug, Clone)]
pub struct DeleteStore {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be an administrator.
    pub requester: Principal,
    /// The store to delete.
    pub store_id: Uuid,
}
