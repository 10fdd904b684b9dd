//! Query handlers for the User Administration context.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storerate_core::error::DomainError;
use storerate_core::identity::Principal;
use storerate_core::model::{Role, User, UserFilter};
use storerate_core::repository::EntityStore;
use uuid::Uuid;

/// Read-only view of a user account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    /// The user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Postal address.
    pub address: String,
    /// Access role.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Average rating of the store this user owns, for store owners.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_rating: Option<f64>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
            role: user.role,
            created_at: user.created_at,
            store_rating: None,
        }
    }
}

/// Collection sizes for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Number of users.
    pub total_users: i64,
    /// Number of stores.
    pub total_stores: i64,
    /// Number of ratings.
    pub total_ratings: i64,
}

/// Lists users matching `filter`, oldest first.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless `requester` is an administrator.
pub async fn list_users(
    filter: &UserFilter,
    requester: &Principal,
    entities: &dyn EntityStore,
) -> Result<Vec<UserView>, DomainError> {
    requester.require_admin()?;
    let users = entities.find_users(filter).await?;
    Ok(users.iter().map(UserView::from).collect())
}

/// Loads one user. For a store owner, includes their store's average rating.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless `requester` is an administrator,
/// or `DomainError::NotFound` if the user does not exist.
pub async fn get_user(
    user_id: Uuid,
    requester: &Principal,
    entities: &dyn EntityStore,
) -> Result<UserView, DomainError> {
    requester.require_admin()?;
    let user = entities
        .get_user(user_id)
        .await?
        .ok_or_else(|| DomainError::user_not_found(user_id))?;

    let mut view = UserView::from(&user);
    if user.role == Role::StoreOwner {
        view.store_rating = entities
            .find_store_by_owner(user_id)
            .await?
            .map(|store| store.average_rating);
    }
    Ok(view)
}

/// Counts users, stores and ratings.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless `requester` is an administrator.
pub async fn dashboard_stats(
    requester: &Principal,
    entities: &dyn EntityStore,
) -> Result<DashboardStats, DomainError> {
    requester.require_admin()?;
    let counts = entities.counts().await?;
    Ok(DashboardStats {
        total_users: counts.users,
        total_stores: counts.stores,
        total_ratings: counts.ratings,
    })
}
