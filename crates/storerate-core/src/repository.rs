//! Entity store abstraction.
//!
//! Reads go through [`EntityStore`]. Every mutation goes through an
//! [`EntityTransaction`] obtained from [`EntityStore::begin`]: its writes
//! become visible together on [`EntityTransaction::commit`] and are
//! discarded if the transaction is dropped uncommitted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::aggregate::StoreAggregate;
use crate::error::DomainError;
use crate::model::{
    EntityCounts, Rating, RatingValue, RatingWithStore, RatingWithUser, Store, StoreDetails,
    StoreFilter, StoreWithOwner, User, UserFilter,
};

/// Read access to users, stores and ratings, and the entry point for writes.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Loads a user by id.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError>;

    /// Lists users matching `filter`, oldest first.
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError>;

    /// Loads a store and its owner by id.
    async fn get_store(&self, id: Uuid) -> Result<Option<StoreWithOwner>, DomainError>;

    /// Lists stores matching `filter` with their owners, oldest first.
    async fn find_stores(&self, filter: &StoreFilter) -> Result<Vec<StoreWithOwner>, DomainError>;

    /// Loads the store owned by `owner_id`, if any.
    async fn find_store_by_owner(&self, owner_id: Uuid) -> Result<Option<Store>, DomainError>;

    /// Ids of every store, oldest first.
    async fn store_ids(&self) -> Result<Vec<Uuid>, DomainError>;

    /// Loads a rating by id.
    async fn get_rating(&self, id: Uuid) -> Result<Option<Rating>, DomainError>;

    /// Loads the rating `user_id` gave `store_id`, if any.
    async fn find_rating(&self, user_id: Uuid, store_id: Uuid)
    -> Result<Option<Rating>, DomainError>;

    /// Every rating authored by `user_id`, joined with the rated store.
    async fn ratings_by_user(&self, user_id: Uuid) -> Result<Vec<RatingWithStore>, DomainError>;

    /// Every rating of `store_id`, joined with its author.
    async fn ratings_by_store(&self, store_id: Uuid) -> Result<Vec<RatingWithUser>, DomainError>;

    /// Collection sizes.
    async fn counts(&self) -> Result<EntityCounts, DomainError>;

    /// Opens a transaction for a unit of writes.
    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, DomainError>;
}

/// A unit of writes that commits atomically.
#[async_trait]
pub trait EntityTransaction: Send {
    /// Loads a user inside the transaction.
    async fn get_user(&mut self, id: Uuid) -> Result<Option<User>, DomainError>;

    /// Inserts a user with the hash of their login password.
    ///
    /// Returns `DomainError::Conflict` if the email is already taken.
    async fn insert_user(&mut self, user: &User, password_hash: &str) -> Result<(), DomainError>;

    /// Overwrites a user's profile fields and role.
    ///
    /// Returns `DomainError::Conflict` if the email belongs to another user.
    async fn update_user(&mut self, user: &User) -> Result<(), DomainError>;

    /// Deletes a user. Returns whether a row was removed.
    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DomainError>;

    /// Loads a store and locks it against concurrent aggregate writers until
    /// the transaction ends.
    async fn lock_store(&mut self, id: Uuid) -> Result<Option<Store>, DomainError>;

    /// Inserts a store with an empty aggregate.
    ///
    /// Returns `DomainError::Conflict` if the email is already taken.
    async fn insert_store(&mut self, store: &Store) -> Result<(), DomainError>;

    /// Overwrites a store's editable details.
    ///
    /// Returns `DomainError::Conflict` if the email belongs to another store.
    async fn update_store_details(
        &mut self,
        id: Uuid,
        details: &StoreDetails,
    ) -> Result<(), DomainError>;

    /// Writes a store's derived aggregate.
    async fn write_store_aggregate(
        &mut self,
        id: Uuid,
        aggregate: StoreAggregate,
    ) -> Result<(), DomainError>;

    /// Deletes a store. Returns whether a row was removed.
    async fn delete_store(&mut self, id: Uuid) -> Result<bool, DomainError>;

    /// Ids of the stores owned by `owner_id`.
    async fn stores_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Uuid>, DomainError>;

    /// Loads a rating inside the transaction.
    async fn get_rating(&mut self, id: Uuid) -> Result<Option<Rating>, DomainError>;

    /// Loads the rating for a (user, store) pair inside the transaction.
    async fn find_rating(
        &mut self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError>;

    /// Inserts a rating.
    ///
    /// Returns `DomainError::Conflict` if the (user, store) pair already has one.
    async fn insert_rating(&mut self, rating: &Rating) -> Result<(), DomainError>;

    /// Overwrites a rating's value and `updated_at`.
    async fn update_rating_value(
        &mut self,
        id: Uuid,
        value: RatingValue,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Deletes a rating. Returns whether a row was removed.
    async fn delete_rating(&mut self, id: Uuid) -> Result<bool, DomainError>;

    /// The values of every current rating of `store_id`.
    async fn rating_values_for_store(
        &mut self,
        store_id: Uuid,
    ) -> Result<Vec<RatingValue>, DomainError>;

    /// Deletes every rating of `store_id`. Returns the number removed.
    async fn delete_ratings_for_store(&mut self, store_id: Uuid) -> Result<u64, DomainError>;

    /// Deletes every rating by `user_id`. Returns the distinct ids of the
    /// stores that lost a rating.
    async fn delete_ratings_by_user(&mut self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError>;

    /// Makes every write in this transaction visible.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
