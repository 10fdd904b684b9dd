//! Command handlers for the Store Lifecycle context.

use storerate_core::clock::Clock;
use storerate_core::error::DomainError;
use storerate_core::model::{StoreWithOwner, User, UserSummary};
use storerate_core::repository::EntityStore;
use tracing::info;
use uuid::Uuid;

use crate::domain::commands::{CreateStore, DeleteStore, UpdateStore};
use crate::domain::store;

/// Result of a store deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDeleteResult {
    /// The deleted store.
    pub store_id: Uuid,
    /// How many ratings were removed with it.
    pub ratings_removed: u64,
}

fn summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

/// Handles the `CreateStore` command. The owner is promoted to
/// `store_owner` in the same transaction.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the caller is an administrator,
/// `DomainError::InvalidInput` for a bad field, `DomainError::NotFound` if
/// the owner does not exist, or `DomainError::Conflict` if the email is
/// already used by another store.
pub async fn handle_create_store(
    command: &CreateStore,
    clock: &dyn Clock,
    entities: &dyn EntityStore,
) -> Result<StoreWithOwner, DomainError> {
    command.requester.require_admin()?;
    let new = store::new_store(
        &command.name,
        &command.email,
        &command.address,
        command.owner_id,
        clock.now(),
    )?;

    let mut tx = entities.begin().await?;
    let mut owner = tx
        .get_user(command.owner_id)
        .await?
        .ok_or_else(|| DomainError::user_not_found(command.owner_id))?;
    tx.insert_store(&new).await?;

    let role = store::owner_role(owner.role);
    if role != owner.role {
        owner.role = role;
        tx.update_user(&owner).await?;
    }
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        store_id = %new.id,
        owner_id = %owner.id,
        "store created"
    );

    Ok(StoreWithOwner {
        owner: summary(&owner),
        store: new,
    })
}

/// Handles the `UpdateStore` command. Only name, email and address can
/// change; the cached aggregate is never touched.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the caller is an administrator,
/// `DomainError::NotFound` if the store does not exist,
/// `DomainError::InvalidInput` for a bad field, or `DomainError::Conflict`
/// if the new email is used by another store.
pub async fn handle_update_store(
    command: &UpdateStore,
    entities: &dyn EntityStore,
) -> Result<StoreWithOwner, DomainError> {
    command.requester.require_admin()?;

    let mut tx = entities.begin().await?;
    let mut current = tx
        .lock_store(command.store_id)
        .await?
        .ok_or_else(|| DomainError::store_not_found(command.store_id))?;
    let details = store::revise_details(
        &current,
        command.name.as_deref(),
        command.email.as_deref(),
        command.address.as_deref(),
    )?;
    tx.update_store_details(command.store_id, &details).await?;
    let owner = tx
        .get_user(current.owner_id)
        .await?
        .ok_or_else(|| DomainError::user_not_found(current.owner_id))?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        store_id = %command.store_id,
        "store updated"
    );

    current.name = details.name;
    current.email = details.email;
    current.address = details.address;
    Ok(StoreWithOwner {
        store: current,
        owner: summary(&owner),
    })
}

/// Handles the `DeleteStore` command: removes every rating of the store and
/// then the store, in one transaction.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the caller is an administrator,
/// or `DomainError::NotFound` if the store does not exist.
pub async fn handle_delete_store(
    command: &DeleteStore,
    entities: &dyn EntityStore,
) -> Result<StoreDeleteResult, DomainError> {
    command.requester.require_admin()?;

    let mut tx = entities.begin().await?;
    if tx.lock_store(command.store_id).await?.is_none() {
        return Err(DomainError::store_not_found(command.store_id));
    }
    let ratings_removed = tx.delete_ratings_for_store(command.store_id).await?;
    tx.delete_store(command.store_id).await?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        store_id = %command.store_id,
        ratings_removed,
        "store deleted"
    );

    Ok(StoreDeleteResult {
        store_id: command.store_id,
        ratings_removed,
    })
}

#[cfg(test)]
mod tests {
    use storerate_core::identity::Principal;
    use storerate_core::model::Role;
    use storerate_core::retry::RetryPolicy;
    use storerate_ratings::application::command_handlers::handle_submit_rating;
    use storerate_ratings::application::query_handlers::get_user_rating_for_store;
    use storerate_ratings::domain::commands::SubmitRating;
    use storerate_test_support::{FixedClock, InMemoryEntityStore};

    use super::*;

    fn admin() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Admin)
    }

    fn create(owner_id: Uuid, email: &str) -> CreateStore {
        CreateStore {
            correlation_id: Uuid::new_v4(),
            requester: admin(),
            name: "Corner Bakery".to_owned(),
            email: email.to_owned(),
            address: "12 Main Street".to_owned(),
            owner_id,
        }
    }

    #[tokio::test]
    async fn test_handle_create_store_promotes_owner() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let user = repo.seed_user("Future Owner", "owner@mail.com", Role::User).await;
        let clock = FixedClock::default_instant();

        // Act
        let created = handle_create_store(&create(user.id, "bakery@shop.com"), &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(created.store.owner_id, user.id);
        assert_eq!(created.store.created_at, clock.0);
        assert_eq!(created.store.total_ratings, 0);
        assert_eq!(created.owner.email, "owner@mail.com");
        let owner = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(owner.role, Role::StoreOwner);
        assert!(repo.get_store(created.store.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_handle_create_store_keeps_admin_role() {
        let repo = InMemoryEntityStore::new();
        let boss = repo.seed_user("Boss", "boss@mail.com", Role::Admin).await;

        handle_create_store(
            &create(boss.id, "boss@shop.com"),
            &FixedClock::default_instant(),
            &repo,
        )
        .await
        .unwrap();

        assert_eq!(repo.get_user(boss.id).await.unwrap().unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn test_handle_create_store_duplicate_email_conflicts() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let first = repo.seed_user("First Owner", "first@mail.com", Role::User).await;
        let second = repo.seed_user("Second Owner", "second@mail.com", Role::User).await;
        let clock = FixedClock::default_instant();
        handle_create_store(&create(first.id, "same@shop.com"), &clock, &repo)
            .await
            .unwrap();

        // Act
        let result = handle_create_store(&create(second.id, "same@shop.com"), &clock, &repo).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Conflict(_))));
        assert_eq!(
            repo.get_user(second.id).await.unwrap().unwrap().role,
            Role::User
        );
    }

    #[tokio::test]
    async fn test_handle_create_store_unknown_owner() {
        let repo = InMemoryEntityStore::new();
        let ghost = Uuid::new_v4();

        let result = handle_create_store(
            &create(ghost, "ghost@shop.com"),
            &FixedClock::default_instant(),
            &repo,
        )
        .await;

        match result {
            Err(DomainError::NotFound { id, .. }) => assert_eq!(id, ghost),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_create_store_requires_admin() {
        let repo = InMemoryEntityStore::new();
        let user = repo.seed_user("Regular", "regular@mail.com", Role::User).await;
        let mut command = create(user.id, "mine@shop.com");
        command.requester = Principal::new(user.id, Role::User);

        let result = handle_create_store(&command, &FixedClock::default_instant(), &repo).await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_handle_update_store_changes_details_not_aggregate() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let rater = repo.seed_user("Rater", "rater@mail.com", Role::User).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        handle_submit_rating(
            &SubmitRating {
                correlation_id: Uuid::new_v4(),
                user_id: rater.id,
                store_id: shop.id,
                value: 4,
            },
            &FixedClock::default_instant(),
            &repo,
            &RetryPolicy::none(),
        )
        .await
        .unwrap();

        // Act
        let updated = handle_update_store(
            &UpdateStore {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                store_id: shop.id,
                name: Some("Renamed Shop".to_owned()),
                email: None,
                address: None,
            },
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(updated.store.name, "Renamed Shop");
        assert_eq!(updated.store.email, "shop@shop.com");
        assert_eq!(updated.store.total_ratings, 1);
        let stored = repo.store(shop.id).await.unwrap();
        assert_eq!(stored.name, "Renamed Shop");
        assert!((stored.average_rating - 4.0).abs() < f64::EPSILON);
        assert_eq!(stored.total_ratings, 1);
    }

    #[tokio::test]
    async fn test_handle_update_store_email_taken() {
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        repo.seed_store(owner.id, "Other", "other@shop.com").await;

        let result = handle_update_store(
            &UpdateStore {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                store_id: shop.id,
                name: None,
                email: Some("other@shop.com".to_owned()),
                address: None,
            },
            &repo,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Conflict(_))));
        assert_eq!(repo.store(shop.id).await.unwrap().email, "shop@shop.com");
    }

    #[tokio::test]
    async fn test_handle_delete_store_cascades_ratings() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;
        let other = repo.seed_store(owner.id, "Other", "other@shop.com").await;
        let mut raters = Vec::new();
        for (i, value) in [5, 3, 1].into_iter().enumerate() {
            let rater = repo
                .seed_user(&format!("Rater {i}"), &format!("rater{i}@mail.com"), Role::User)
                .await;
            for store_id in [shop.id, other.id] {
                handle_submit_rating(
                    &SubmitRating {
                        correlation_id: Uuid::new_v4(),
                        user_id: rater.id,
                        store_id,
                        value,
                    },
                    &FixedClock::default_instant(),
                    &repo,
                    &RetryPolicy::none(),
                )
                .await
                .unwrap();
            }
            raters.push(rater);
        }

        // Act
        let result = handle_delete_store(
            &DeleteStore {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                store_id: shop.id,
            },
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.ratings_removed, 3);
        assert!(repo.get_store(shop.id).await.unwrap().is_none());
        for rater in &raters {
            let lookup = get_user_rating_for_store(rater.id, shop.id, &repo).await;
            assert!(matches!(lookup, Err(DomainError::NotFound { .. })));
        }
        assert_eq!(repo.all_ratings().await.len(), 3);
        assert_eq!(repo.store(other.id).await.unwrap().total_ratings, 3);
    }

    #[tokio::test]
    async fn test_handle_delete_store_missing_and_forbidden() {
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let shop = repo.seed_store(owner.id, "Shop", "shop@shop.com").await;

        let missing = handle_delete_store(
            &DeleteStore {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                store_id: Uuid::new_v4(),
            },
            &repo,
        )
        .await;
        let forbidden = handle_delete_store(
            &DeleteStore {
                correlation_id: Uuid::new_v4(),
                requester: Principal::new(owner.id, Role::StoreOwner),
                store_id: shop.id,
            },
            &repo,
        )
        .await;

        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
        assert!(matches!(forbidden, Err(DomainError::Forbidden(_))));
        assert!(repo.get_store(shop.id).await.unwrap().is_some());
    }
}
