//! Query handlers for the Rating Aggregation context.
//!
//! Read-only views over the entity store. Nothing here writes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storerate_core::error::{DomainError, Entity};
use storerate_core::identity::Principal;
use storerate_core::model::{Rating, RatingWithStore, RatingWithUser, StoreSummary, UserSummary};
use storerate_core::repository::EntityStore;
use uuid::Uuid;

/// Read-only view of a rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    /// The rating identifier.
    pub id: Uuid,
    /// The author.
    pub user_id: Uuid,
    /// The rated store.
    pub store_id: Uuid,
    /// The rating, 1 to 5.
    pub rating: u8,
    /// When the rating was first submitted.
    pub created_at: DateTime<Utc>,
    /// When the value last changed.
    pub updated_at: DateTime<Utc>,
}

impl From<&Rating> for RatingView {
    fn from(rating: &Rating) -> Self {
        Self {
            id: rating.id,
            user_id: rating.user_id,
            store_id: rating.store_id,
            rating: rating.value.get(),
            created_at: rating.created_at,
            updated_at: rating.updated_at,
        }
    }
}

/// Store details shown next to a user's own rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedStoreView {
    /// The store identifier.
    pub id: Uuid,
    /// The store name.
    pub name: String,
    /// The store address.
    pub address: String,
    /// The store's current average rating.
    pub average_rating: f64,
}

impl From<&StoreSummary> for RatedStoreView {
    fn from(store: &StoreSummary) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            address: store.address.clone(),
            average_rating: store.average_rating,
        }
    }
}

/// A rating with the store it rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRatingView {
    /// The rating.
    #[serde(flatten)]
    pub rating: RatingView,
    /// The rated store.
    pub store: RatedStoreView,
}

impl From<&RatingWithStore> for UserRatingView {
    fn from(row: &RatingWithStore) -> Self {
        Self {
            rating: RatingView::from(&row.rating),
            store: RatedStoreView::from(&row.store),
        }
    }
}

/// Author details shown next to a store's rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaterView {
    /// The user identifier.
    pub id: Uuid,
    /// The user name.
    pub name: String,
    /// The user email.
    pub email: String,
}

impl From<&UserSummary> for RaterView {
    fn from(user: &UserSummary) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A rating with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRatingView {
    /// The rating.
    #[serde(flatten)]
    pub rating: RatingView,
    /// The author.
    pub user: RaterView,
}

impl From<&RatingWithUser> for StoreRatingView {
    fn from(row: &RatingWithUser) -> Self {
        Self {
            rating: RatingView::from(&row.rating),
            user: RaterView::from(&row.user),
        }
    }
}

/// Returns the rating `user_id` gave `store_id`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the user has not rated the store.
pub async fn get_user_rating_for_store(
    user_id: Uuid,
    store_id: Uuid,
    store: &dyn EntityStore,
) -> Result<RatingView, DomainError> {
    store
        .find_rating(user_id, store_id)
        .await?
        .map(|rating| RatingView::from(&rating))
        .ok_or(DomainError::NotFound {
            entity: Entity::Rating,
            id: store_id,
        })
}

/// Lists every rating `user_id` has written, oldest first.
///
/// # Errors
///
/// Returns the storage error if the read fails.
pub async fn list_user_ratings(
    user_id: Uuid,
    store: &dyn EntityStore,
) -> Result<Vec<UserRatingView>, DomainError> {
    let rows = store.ratings_by_user(user_id).await?;
    Ok(rows.iter().map(UserRatingView::from).collect())
}

/// Lists every rating of a store with its author. Only the store's owner and
/// administrators may read them.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the store does not exist, or
/// `DomainError::Forbidden` if `requester` may not read its ratings.
pub async fn list_store_ratings(
    store_id: Uuid,
    requester: &Principal,
    store: &dyn EntityStore,
) -> Result<Vec<StoreRatingView>, DomainError> {
    let found = store
        .get_store(store_id)
        .await?
        .ok_or_else(|| DomainError::store_not_found(store_id))?;
    requester.require_owner_or_admin(found.store.owner_id)?;

    let rows = store.ratings_by_store(store_id).await?;
    Ok(rows.iter().map(StoreRatingView::from).collect())
}

#[cfg(test)]
mod tests {
    use storerate_core::error::DomainError;
    use storerate_core::identity::Principal;
    use storerate_core::model::Role;
    use storerate_core::retry::RetryPolicy;
    use storerate_test_support::{FailingEntityStore, FixedClock, InMemoryEntityStore};
    use uuid::Uuid;

    use super::*;
    use crate::application::command_handlers::handle_submit_rating;
    use crate::domain::commands::SubmitRating;

    async fn rate(repo: &InMemoryEntityStore, user_id: Uuid, store_id: Uuid, value: i64) {
        handle_submit_rating(
            &SubmitRating {
                correlation_id: Uuid::new_v4(),
                user_id,
                store_id,
                value,
            },
            &FixedClock::default_instant(),
            repo,
            &RetryPolicy::none(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_user_rating_for_store_returns_view() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@shop.com", Role::StoreOwner).await;
        let alice = repo.seed_user("Alice", "alice@mail.com", Role::User).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        rate(&repo, alice.id, shop.id, 4).await;

        // Act
        let view = get_user_rating_for_store(alice.id, shop.id, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.user_id, alice.id);
        assert_eq!(view.store_id, shop.id);
        assert_eq!(view.rating, 4);
    }

    #[tokio::test]
    async fn test_get_user_rating_for_store_not_rated() {
        let repo = InMemoryEntityStore::new();
        let store_id = Uuid::new_v4();

        let result = get_user_rating_for_store(Uuid::new_v4(), store_id, &repo).await;

        match result {
            Err(DomainError::NotFound { entity, id }) => {
                assert_eq!(entity, Entity::Rating);
                assert_eq!(id, store_id);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_user_ratings_joins_store_summary() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@shop.com", Role::StoreOwner).await;
        let alice = repo.seed_user("Alice", "alice@mail.com", Role::User).await;
        let bob = repo.seed_user("Bob", "bob@mail.com", Role::User).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        rate(&repo, alice.id, shop.id, 5).await;
        rate(&repo, bob.id, shop.id, 2).await;

        // Act
        let views = list_user_ratings(alice.id, &repo).await.unwrap();

        // Assert
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].rating.rating, 5);
        assert_eq!(views[0].store.name, "Shop");
        assert!((views[0].store.average_rating - 3.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_list_store_ratings_visible_to_owner_and_admin_only() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@shop.com", Role::StoreOwner).await;
        let admin = repo.seed_user("Admin", "admin@mail.com", Role::Admin).await;
        let alice = repo.seed_user("Alice", "alice@mail.com", Role::User).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        rate(&repo, alice.id, shop.id, 3).await;

        // Act
        let as_owner = list_store_ratings(shop.id, &Principal::new(owner.id, owner.role), &repo)
            .await
            .unwrap();
        let as_admin = list_store_ratings(shop.id, &Principal::new(admin.id, admin.role), &repo)
            .await
            .unwrap();
        let as_rater =
            list_store_ratings(shop.id, &Principal::new(alice.id, alice.role), &repo).await;

        // Assert
        assert_eq!(as_owner.len(), 1);
        assert_eq!(as_owner[0].user.email, "alice@mail.com");
        assert_eq!(as_owner, as_admin);
        assert!(matches!(as_rater, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_store_ratings_unknown_store_is_not_found_before_forbidden() {
        let repo = InMemoryEntityStore::new();
        let requester = Principal::new(Uuid::new_v4(), Role::User);

        let result = list_store_ratings(Uuid::new_v4(), &requester, &repo).await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_user_ratings_surfaces_storage_failure() {
        let result = list_user_ratings(Uuid::new_v4(), &FailingEntityStore).await;

        assert!(matches!(result, Err(DomainError::Unavailable(_))));
    }

    #[test]
    fn test_user_rating_view_serializes_camel_case_flat() {
        let now = FixedClock::default_instant().0;
        let view = UserRatingView {
            rating: RatingView {
                id: Uuid::nil(),
                user_id: Uuid::nil(),
                store_id: Uuid::nil(),
                rating: 4,
                created_at: now,
                updated_at: now,
            },
            store: RatedStoreView {
                id: Uuid::nil(),
                name: "Shop".to_owned(),
                address: "2 Market Square".to_owned(),
                average_rating: 4.0,
            },
        };

        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["rating"], 4);
        assert!(json.get("storeId").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["store"]["averageRating"], 4.0);
    }
}
