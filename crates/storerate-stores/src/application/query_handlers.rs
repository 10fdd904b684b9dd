//! Query handlers for the Store Lifecycle context.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storerate_core::error::{DomainError, Entity};
use storerate_core::identity::Principal;
use storerate_core::model::{Store, StoreFilter, StoreWithOwner, UserSummary};
use storerate_core::repository::EntityStore;
use uuid::Uuid;

/// The owning user as shown on a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerView {
    /// The user identifier.
    pub id: Uuid,
    /// The user name.
    pub name: String,
    /// The user email.
    pub email: String,
}

impl From<&UserSummary> for OwnerView {
    fn from(owner: &UserSummary) -> Self {
        Self {
            id: owner.id,
            name: owner.name.clone(),
            email: owner.email.clone(),
        }
    }
}

/// Read-only view of a store and its cached aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    /// The store identifier.
    pub id: Uuid,
    /// The store name.
    pub name: String,
    /// The contact email.
    pub email: String,
    /// The postal address.
    pub address: String,
    /// The owning user's id.
    pub owner_id: Uuid,
    /// The owner, when joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,
    /// Mean of current ratings, one decimal.
    pub average_rating: f64,
    /// Number of current ratings.
    pub total_ratings: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Store> for StoreView {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            email: store.email.clone(),
            address: store.address.clone(),
            owner_id: store.owner_id,
            owner: None,
            average_rating: store.average_rating,
            total_ratings: store.total_ratings,
            created_at: store.created_at,
        }
    }
}

impl From<&StoreWithOwner> for StoreView {
    fn from(row: &StoreWithOwner) -> Self {
        Self {
            owner: Some(OwnerView::from(&row.owner)),
            ..Self::from(&row.store)
        }
    }
}

/// Lists stores matching `filter`, oldest first. Public.
///
/// # Errors
///
/// Returns the storage error if the read fails.
pub async fn list_stores(
    filter: &StoreFilter,
    entities: &dyn EntityStore,
) -> Result<Vec<StoreView>, DomainError> {
    let rows = entities.find_stores(filter).await?;
    Ok(rows.iter().map(StoreView::from).collect())
}

/// Loads one store with its owner. Public.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the store does not exist.
pub async fn get_store(
    store_id: Uuid,
    entities: &dyn EntityStore,
) -> Result<StoreView, DomainError> {
    entities
        .get_store(store_id)
        .await?
        .map(|row| StoreView::from(&row))
        .ok_or_else(|| DomainError::store_not_found(store_id))
}

/// Loads the store owned by `owner_id`. Only that owner and administrators
/// may look it up.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` if `requester` is neither, or
/// `DomainError::NotFound` if the user owns no store.
pub async fn get_store_by_owner(
    owner_id: Uuid,
    requester: &Principal,
    entities: &dyn EntityStore,
) -> Result<StoreView, DomainError> {
    requester.require_owner_or_admin(owner_id)?;
    entities
        .find_store_by_owner(owner_id)
        .await?
        .map(|store| StoreView::from(&store))
        .ok_or(DomainError::NotFound {
            entity: Entity::Store,
            id: owner_id,
        })
}

#[cfg(test)]
mod tests {
    use storerate_core::model::Role;
    use storerate_test_support::InMemoryEntityStore;

    use super::*;

    #[tokio::test]
    async fn test_list_stores_filters_case_insensitively() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        repo.seed_store(owner.id, "Corner Bakery", "bakery@shop.com").await;
        repo.seed_store(owner.id, "Hardware Hub", "hub@shop.com").await;

        // Act
        let all = list_stores(&StoreFilter::default(), &repo).await.unwrap();
        let bakeries = list_stores(
            &StoreFilter {
                name: Some("BAKERY".to_owned()),
                address: None,
            },
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(all.len(), 2);
        assert_eq!(bakeries.len(), 1);
        assert_eq!(bakeries[0].name, "Corner Bakery");
        assert_eq!(
            bakeries[0].owner.as_ref().map(|o| o.email.as_str()),
            Some("owner@mail.com")
        );
    }

    #[tokio::test]
    async fn test_get_store_not_found() {
        let repo = InMemoryEntityStore::new();
        let store_id = Uuid::new_v4();

        let result = get_store(store_id, &repo).await;

        match result {
            Err(DomainError::NotFound { entity, id }) => {
                assert_eq!(entity, Entity::Store);
                assert_eq!(id, store_id);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_store_by_owner_access() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let stranger = repo.seed_user("Stranger", "stranger@mail.com", Role::User).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);

        // Act
        let as_owner = get_store_by_owner(owner.id, &Principal::new(owner.id, owner.role), &repo)
            .await
            .unwrap();
        let as_admin = get_store_by_owner(owner.id, &admin, &repo).await.unwrap();
        let as_stranger =
            get_store_by_owner(owner.id, &Principal::new(stranger.id, stranger.role), &repo).await;
        let none_owned = get_store_by_owner(stranger.id, &admin, &repo).await;

        // Assert
        assert_eq!(as_owner.id, shop.id);
        assert_eq!(as_admin.id, shop.id);
        assert!(matches!(as_stranger, Err(DomainError::Forbidden(_))));
        assert!(matches!(none_owned, Err(DomainError::NotFound { .. })));
    }

    #[test]
    fn test_store_view_serializes_camel_case() {
        let store = Store {
            id: Uuid::nil(),
            name: "Shop".to_owned(),
            email: "shop@shop.com".to_owned(),
            address: "2 Market Square".to_owned(),
            owner_id: Uuid::nil(),
            average_rating: 3.5,
            total_ratings: 2,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(StoreView::from(&store)).unwrap();

        assert_eq!(json["averageRating"], 3.5);
        assert_eq!(json["totalRatings"], 2);
        assert!(json.get("ownerId").is_some());
        assert!(json.get("owner").is_none());
    }
}
