//! Failure-injecting `EntityStore` implementations for tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storerate_core::aggregate::StoreAggregate;
use storerate_core::error::DomainError;
use storerate_core::model::{
    EntityCounts, Rating, RatingValue, RatingWithStore, RatingWithUser, Store, StoreDetails,
    StoreFilter, StoreWithOwner, User, UserFilter,
};
use storerate_core::repository::{EntityStore, EntityTransaction};
use uuid::Uuid;

fn unavailable() -> DomainError {
    DomainError::Unavailable("connection refused".into())
}

/// An entity store whose every call fails with `DomainError::Unavailable`.
/// Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingEntityStore;

#[async_trait]
impl EntityStore for FailingEntityStore {
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, DomainError> {
        Err(unavailable())
    }

    async fn find_users(&self, _filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        Err(unavailable())
    }

    async fn get_store(&self, _id: Uuid) -> Result<Option<StoreWithOwner>, DomainError> {
        Err(unavailable())
    }

    async fn find_stores(&self, _filter: &StoreFilter) -> Result<Vec<StoreWithOwner>, DomainError> {
        Err(unavailable())
    }

    async fn find_store_by_owner(&self, _owner_id: Uuid) -> Result<Option<Store>, DomainError> {
        Err(unavailable())
    }

    async fn store_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        Err(unavailable())
    }

    async fn get_rating(&self, _id: Uuid) -> Result<Option<Rating>, DomainError> {
        Err(unavailable())
    }

    async fn find_rating(
        &self,
        _user_id: Uuid,
        _store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        Err(unavailable())
    }

    async fn ratings_by_user(&self, _user_id: Uuid) -> Result<Vec<RatingWithStore>, DomainError> {
        Err(unavailable())
    }

    async fn ratings_by_store(&self, _store_id: Uuid) -> Result<Vec<RatingWithUser>, DomainError> {
        Err(unavailable())
    }

    async fn counts(&self) -> Result<EntityCounts, DomainError> {
        Err(unavailable())
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, DomainError> {
        Err(unavailable())
    }
}

/// Wraps another store and fails the first `failures` calls to `begin` with
/// `DomainError::Unavailable`. Reads are passed through untouched.
#[derive(Debug)]
pub struct FlakyEntityStore<S> {
    inner: S,
    remaining_failures: AtomicU32,
    begin_calls: AtomicU32,
}

impl<S> FlakyEntityStore<S> {
    /// Wraps `inner`, failing its first `failures` transactions.
    #[must_use]
    pub fn new(inner: S, failures: u32) -> Self {
        Self {
            inner,
            remaining_failures: AtomicU32::new(failures),
            begin_calls: AtomicU32::new(0),
        }
    }

    /// How many times `begin` has been called, failed or not.
    pub fn begin_calls(&self) -> u32 {
        self.begin_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: EntityStore> EntityStore for FlakyEntityStore<S> {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        self.inner.get_user(id).await
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        self.inner.find_users(filter).await
    }

    async fn get_store(&self, id: Uuid) -> Result<Option<StoreWithOwner>, DomainError> {
        self.inner.get_store(id).await
    }

    async fn find_stores(&self, filter: &StoreFilter) -> Result<Vec<StoreWithOwner>, DomainError> {
        self.inner.find_stores(filter).await
    }

    async fn find_store_by_owner(&self, owner_id: Uuid) -> Result<Option<Store>, DomainError> {
        self.inner.find_store_by_owner(owner_id).await
    }

    async fn store_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        self.inner.store_ids().await
    }

    async fn get_rating(&self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        self.inner.get_rating(id).await
    }

    async fn find_rating(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        self.inner.find_rating(user_id, store_id).await
    }

    async fn ratings_by_user(&self, user_id: Uuid) -> Result<Vec<RatingWithStore>, DomainError> {
        self.inner.ratings_by_user(user_id).await
    }

    async fn ratings_by_store(&self, store_id: Uuid) -> Result<Vec<RatingWithUser>, DomainError> {
        self.inner.ratings_by_store(store_id).await
    }

    async fn counts(&self) -> Result<EntityCounts, DomainError> {
        self.inner.counts().await
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, DomainError> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DomainError::Unavailable("timed out".into()));
        }
        self.inner.begin().await
    }
}

/// Wraps another store so that, in its first `stale` transactions,
/// `find_rating` reports no rating. This reproduces a concurrent writer
/// inserting the same (user, store) pair between lookup and insert.
#[derive(Debug)]
pub struct StaleReadEntityStore<S> {
    inner: S,
    remaining_stale: AtomicU32,
    begin_calls: AtomicU32,
}

impl<S> StaleReadEntityStore<S> {
    /// Wraps `inner`, hiding existing ratings from its first `stale`
    /// transactions.
    #[must_use]
    pub fn new(inner: S, stale: u32) -> Self {
        Self {
            inner,
            remaining_stale: AtomicU32::new(stale),
            begin_calls: AtomicU32::new(0),
        }
    }

    /// How many transactions have been opened.
    pub fn begin_calls(&self) -> u32 {
        self.begin_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: EntityStore> EntityStore for StaleReadEntityStore<S> {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        self.inner.get_user(id).await
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        self.inner.find_users(filter).await
    }

    async fn get_store(&self, id: Uuid) -> Result<Option<StoreWithOwner>, DomainError> {
        self.inner.get_store(id).await
    }

    async fn find_stores(&self, filter: &StoreFilter) -> Result<Vec<StoreWithOwner>, DomainError> {
        self.inner.find_stores(filter).await
    }

    async fn find_store_by_owner(&self, owner_id: Uuid) -> Result<Option<Store>, DomainError> {
        self.inner.find_store_by_owner(owner_id).await
    }

    async fn store_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        self.inner.store_ids().await
    }

    async fn get_rating(&self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        self.inner.get_rating(id).await
    }

    async fn find_rating(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        self.inner.find_rating(user_id, store_id).await
    }

    async fn ratings_by_user(&self, user_id: Uuid) -> Result<Vec<RatingWithStore>, DomainError> {
        self.inner.ratings_by_user(user_id).await
    }

    async fn ratings_by_store(&self, store_id: Uuid) -> Result<Vec<RatingWithUser>, DomainError> {
        self.inner.ratings_by_store(store_id).await
    }

    async fn counts(&self) -> Result<EntityCounts, DomainError> {
        self.inner.counts().await
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, DomainError> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        let stale = self
            .remaining_stale
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let inner = self.inner.begin().await?;
        Ok(Box::new(StaleReadTransaction { inner, stale }))
    }
}

struct StaleReadTransaction {
    inner: Box<dyn EntityTransaction>,
    stale: bool,
}

#[async_trait]
impl EntityTransaction for StaleReadTransaction {
    async fn get_user(&mut self, id: Uuid) -> Result<Option<User>, DomainError> {
        self.inner.get_user(id).await
    }

    async fn insert_user(&mut self, user: &User, password_hash: &str) -> Result<(), DomainError> {
        self.inner.insert_user(user, password_hash).await
    }

    async fn update_user(&mut self, user: &User) -> Result<(), DomainError> {
        self.inner.update_user(user).await
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DomainError> {
        self.inner.delete_user(id).await
    }

    async fn lock_store(&mut self, id: Uuid) -> Result<Option<Store>, DomainError> {
        self.inner.lock_store(id).await
    }

    async fn insert_store(&mut self, store: &Store) -> Result<(), DomainError> {
        self.inner.insert_store(store).await
    }

    async fn update_store_details(
        &mut self,
        id: Uuid,
        details: &StoreDetails,
    ) -> Result<(), DomainError> {
        self.inner.update_store_details(id, details).await
    }

    async fn write_store_aggregate(
        &mut self,
        id: Uuid,
        aggregate: StoreAggregate,
    ) -> Result<(), DomainError> {
        self.inner.write_store_aggregate(id, aggregate).await
    }

    async fn delete_store(&mut self, id: Uuid) -> Result<bool, DomainError> {
        self.inner.delete_store(id).await
    }

    async fn stores_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        self.inner.stores_owned_by(owner_id).await
    }

    async fn get_rating(&mut self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        self.inner.get_rating(id).await
    }

    async fn find_rating(
        &mut self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        if self.stale {
            return Ok(None);
        }
        self.inner.find_rating(user_id, store_id).await
    }

    async fn insert_rating(&mut self, rating: &Rating) -> Result<(), DomainError> {
        self.inner.insert_rating(rating).await
    }

    async fn update_rating_value(
        &mut self,
        id: Uuid,
        value: RatingValue,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.inner.update_rating_value(id, value, updated_at).await
    }

    async fn delete_rating(&mut self, id: Uuid) -> Result<bool, DomainError> {
        self.inner.delete_rating(id).await
    }

    async fn rating_values_for_store(
        &mut self,
        store_id: Uuid,
    ) -> Result<Vec<RatingValue>, DomainError> {
        self.inner.rating_values_for_store(store_id).await
    }

    async fn delete_ratings_for_store(&mut self, store_id: Uuid) -> Result<u64, DomainError> {
        self.inner.delete_ratings_for_store(store_id).await
    }

    async fn delete_ratings_by_user(&mut self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        self.inner.delete_ratings_by_user(user_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.commit().await
    }
}
