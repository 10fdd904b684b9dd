//! Commands for the User Administration context.

use storerate_core::identity::Principal;
use storerate_core::model::Role;
use uuid::Uuid;

/// Command to create a user account with a login password.
#[derive(Clone)]
pub struct CreateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be an administrator.
    pub requester: Principal,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Login password, in clear. Hashed before storage.
    pub password: String,
    /// Postal address.
    pub address: String,
    /// Role; `user` when omitted.
    pub role: Option<Role>,
}

impl std::fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUser")
            .field("correlation_id", &self.correlation_id)
            .field("requester", &self.requester)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("address", &self.address)
            .field("role", &self.role)
            .finish()
    }
}

/// Command to edit a user's profile or role. Omitted fields keep their value.
#[derive(Debug, Clone)]
pub struct UpdateUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be an administrator.
    pub requester: Principal,
    /// The user to edit.
    pub user_id: Uuid,
    /// New name, if changing.
    pub name: Option<String>,
    /// New email, if changing.
    pub email: Option<String>,
    /// New address, if changing.
    pub address: Option<String>,
    /// New role, if changing.
    pub role: Option<Role>,
}

/// Command to delete a user with everything that depends on them.
#[derive(Debug, Clone)]
pub struct DeleteUser {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be an administrator.
    pub requester: Principal,
    /// The user to delete.
    pub user_id: Uuid,
}
