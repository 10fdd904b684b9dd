//! Command handlers for the User Administration context.

use storerate_core::clock::Clock;
use storerate_core::error::DomainError;
use storerate_core::identity::CredentialHasher;
use storerate_core::model::User;
use storerate_core::repository::EntityStore;
use storerate_core::validation;
use storerate_ratings::application::command_handlers::{
    lock_existing_store, recompute_store_aggregate_in,
};
use tracing::info;
use uuid::Uuid;

use crate::domain::commands::{CreateUser, DeleteUser, UpdateUser};
use crate::domain::user;

/// Result of a user deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeleteResult {
    /// The deleted user.
    pub user_id: Uuid,
    /// Stores the user owned, deleted with their ratings.
    pub stores_removed: Vec<Uuid>,
    /// Surviving stores whose aggregate was recomputed.
    pub stores_recomputed: Vec<Uuid>,
}

/// Handles the `CreateUser` command. The password is checked, hashed with
/// `credentials` and stored with the user; it is never returned.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the caller is an administrator,
/// `DomainError::InvalidInput` for a bad field or weak password, or
/// `DomainError::Conflict` if the email belongs to another user.
pub async fn handle_create_user(
    command: &CreateUser,
    clock: &dyn Clock,
    credentials: &dyn CredentialHasher,
    entities: &dyn EntityStore,
) -> Result<User, DomainError> {
    command.requester.require_admin()?;
    let new = user::new_user(
        &command.name,
        &command.email,
        &command.address,
        command.role,
        clock.now(),
    )?;
    let password_hash = credentials.hash_password(validation::password(&command.password)?)?;

    let mut tx = entities.begin().await?;
    tx.insert_user(&new, &password_hash).await?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        user_id = %new.id,
        role = %new.role,
        "user created"
    );

    Ok(new)
}

/// Handles the `UpdateUser` command.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the caller is an administrator,
/// `DomainError::NotFound` if the user does not exist,
/// `DomainError::InvalidInput` for a bad field, or `DomainError::Conflict`
/// if the email belongs to another user.
pub async fn handle_update_user(
    command: &UpdateUser,
    entities: &dyn EntityStore,
) -> Result<User, DomainError> {
    command.requester.require_admin()?;

    let mut tx = entities.begin().await?;
    let current = tx
        .get_user(command.user_id)
        .await?
        .ok_or_else(|| DomainError::user_not_found(command.user_id))?;
    let revised = user::revise_profile(
        &current,
        command.name.as_deref(),
        command.email.as_deref(),
        command.address.as_deref(),
        command.role,
    )?;
    tx.update_user(&revised).await?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        user_id = %command.user_id,
        role = %revised.role,
        "user updated"
    );

    Ok(revised)
}

/// Handles the `DeleteUser` command. In one transaction: locks and deletes
/// the user's stores and their ratings, deletes the ratings the user wrote,
/// recomputes every surviving store that lost one, and deletes the user.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` unless the caller is an administrator,
/// or `DomainError::NotFound` if the user does not exist.
pub async fn handle_delete_user(
    command: &DeleteUser,
    entities: &dyn EntityStore,
) -> Result<UserDeleteResult, DomainError> {
    command.requester.require_admin()?;

    let mut tx = entities.begin().await?;
    if tx.get_user(command.user_id).await?.is_none() {
        return Err(DomainError::user_not_found(command.user_id));
    }

    let stores_removed = tx.stores_owned_by(command.user_id).await?;
    for &store_id in &stores_removed {
        lock_existing_store(tx.as_mut(), store_id).await?;
        tx.delete_ratings_for_store(store_id).await?;
        tx.delete_store(store_id).await?;
    }

    let affected = tx.delete_ratings_by_user(command.user_id).await?;
    let mut stores_recomputed = Vec::with_capacity(affected.len());
    for store_id in affected {
        if stores_removed.contains(&store_id) {
            continue;
        }
        lock_existing_store(tx.as_mut(), store_id).await?;
        recompute_store_aggregate_in(tx.as_mut(), store_id).await?;
        stores_recomputed.push(store_id);
    }

    tx.delete_user(command.user_id).await?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        user_id = %command.user_id,
        stores_removed = stores_removed.len(),
        stores_recomputed = stores_recomputed.len(),
        "user deleted"
    );

    Ok(UserDeleteResult {
        user_id: command.user_id,
        stores_removed,
        stores_recomputed,
    })
}

#[cfg(test)]
mod tests {
    use storerate_core::identity::Principal;
    use storerate_core::model::Role;
    use storerate_core::retry::RetryPolicy;
    use storerate_ratings::application::command_handlers::handle_submit_rating;
    use storerate_ratings::domain::commands::SubmitRating;
    use storerate_test_support::{FixedClock, InMemoryEntityStore, PlainCredentialHasher};

    use super::*;

    fn admin() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Admin)
    }

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

    fn create(email: &str) -> CreateUser {
        CreateUser {
            correlation_id: Uuid::new_v4(),
            requester: admin(),
            name: "Grace Hopper".to_owned(),
            email: email.to_owned(),
            password: "Secret#123".to_owned(),
            address: "7 Naval Yard".to_owned(),
            role: None,
        }
    }

    fn update(user_id: Uuid) -> UpdateUser {
        UpdateUser {
            correlation_id: Uuid::new_v4(),
            requester: admin(),
            user_id,
            name: None,
            email: None,
            address: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_handle_create_user_stores_hashed_password() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let clock = FixedClock::default_instant();

        // Act
        let created = handle_create_user(
            &create("grace@mail.com"),
            &clock,
            &PlainCredentialHasher,
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(created.role, Role::User);
        assert_eq!(created.created_at, clock.0);
        assert_eq!(repo.get_user(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(
            repo.password_hash(created.id).await.as_deref(),
            Some("plain:Secret#123")
        );
    }

    #[tokio::test]
    async fn test_handle_create_user_duplicate_email_conflicts() {
        let repo = InMemoryEntityStore::new();
        repo.seed_user("Grace", "grace@mail.com", Role::User).await;

        let result = handle_create_user(
            &create("grace@mail.com"),
            &FixedClock::default_instant(),
            &PlainCredentialHasher,
            &repo,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Conflict(_))));
        assert_eq!(repo.counts().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn test_handle_create_user_rejects_weak_password_and_non_admin() {
        let repo = InMemoryEntityStore::new();
        let clock = FixedClock::default_instant();

        let weak = handle_create_user(
            &CreateUser {
                password: "password".to_owned(),
                ..create("weak@mail.com")
            },
            &clock,
            &PlainCredentialHasher,
            &repo,
        )
        .await;
        let forbidden = handle_create_user(
            &CreateUser {
                requester: Principal::new(Uuid::new_v4(), Role::StoreOwner),
                ..create("owner@mail.com")
            },
            &clock,
            &PlainCredentialHasher,
            &repo,
        )
        .await;

        assert!(matches!(weak, Err(DomainError::InvalidInput(_))));
        assert!(matches!(forbidden, Err(DomainError::Forbidden(_))));
        assert_eq!(repo.counts().await.unwrap().users, 0);
    }

    #[tokio::test]
    async fn test_handle_update_user_changes_role_and_address() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let dana = repo.seed_user("Dana", "dana@mail.com", Role::User).await;

        // Act
        let updated = handle_update_user(
            &UpdateUser {
                address: Some("9 Harbour View".to_owned()),
                role: Some(Role::StoreOwner),
                ..update(dana.id)
            },
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(updated.role, Role::StoreOwner);
        assert_eq!(updated.address, "9 Harbour View");
        let stored = repo.get_user(dana.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_handle_update_user_duplicate_email_conflicts() {
        let repo = InMemoryEntityStore::new();
        let dana = repo.seed_user("Dana", "dana@mail.com", Role::User).await;
        repo.seed_user("Eli", "eli@mail.com", Role::User).await;

        let result = handle_update_user(
            &UpdateUser {
                email: Some("eli@mail.com".to_owned()),
                ..update(dana.id)
            },
            &repo,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_handle_update_user_requires_admin_and_existing_user() {
        let repo = InMemoryEntityStore::new();
        let dana = repo.seed_user("Dana", "dana@mail.com", Role::User).await;

        let forbidden = handle_update_user(
            &UpdateUser {
                requester: Principal::new(dana.id, Role::User),
                role: Some(Role::Admin),
                ..update(dana.id)
            },
            &repo,
        )
        .await;
        let missing = handle_update_user(&update(Uuid::new_v4()), &repo).await;

        assert!(matches!(forbidden, Err(DomainError::Forbidden(_))));
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
        assert_eq!(repo.get_user(dana.id).await.unwrap().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_handle_delete_user_cascades_and_recomputes() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let other_owner = repo.seed_user("Other", "other@mail.com", Role::StoreOwner).await;
        let alice = repo.seed_user("Alice", "alice@mail.com", Role::User).await;
        let bob = repo.seed_user("Bob", "bob@mail.com", Role::User).await;
        let owned = repo.seed_store(owner.id, "Owned", "owned@shop.com").await;
        let rated = repo.seed_store(other_owner.id, "Rated", "rated@shop.com").await;
        rate(&repo, alice.id, owned.id, 5).await;
        rate(&repo, owner.id, rated.id, 1).await;
        rate(&repo, bob.id, rated.id, 4).await;

        // Act
        let result = handle_delete_user(
            &DeleteUser {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                user_id: owner.id,
            },
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.stores_removed, vec![owned.id]);
        assert_eq!(result.stores_recomputed, vec![rated.id]);
        assert!(repo.get_user(owner.id).await.unwrap().is_none());
        assert!(repo.get_store(owned.id).await.unwrap().is_none());
        let ratings = repo.all_ratings().await;
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].user_id, bob.id);
        let survivor = repo.store(rated.id).await.unwrap();
        assert_eq!(survivor.total_ratings, 1);
        assert!((survivor.average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_handle_delete_user_locks_each_owned_store_before_cascade() {
        // Arrange
        let repo = InMemoryEntityStore::new();
        let owner = repo.seed_user("Owner", "owner@mail.com", Role::StoreOwner).await;
        let first = repo.seed_store(owner.id, "First", "first@shop.com").await;
        let second = repo.seed_store(owner.id, "Second", "second@shop.com").await;

        // Act
        handle_delete_user(
            &DeleteUser {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                user_id: owner.id,
            },
            &repo,
        )
        .await
        .unwrap();

        // Assert
        let mut locked = repo.store_locks().await;
        locked.sort();
        let mut owned = vec![first.id, second.id];
        owned.sort();
        assert_eq!(locked, owned);
        assert_eq!(repo.counts().await.unwrap().stores, 0);
    }

    #[tokio::test]
    async fn test_handle_delete_user_missing_user() {
        let repo = InMemoryEntityStore::new();
        let ghost = Uuid::new_v4();

        let result = handle_delete_user(
            &DeleteUser {
                correlation_id: Uuid::new_v4(),
                requester: admin(),
                user_id: ghost,
            },
            &repo,
        )
        .await;

        match result {
            Err(DomainError::NotFound { id, .. }) => assert_eq!(id, ghost),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
