//! In-memory `EntityStore` with transactional semantics.
//!
//! A transaction holds the store-wide lock from `begin` until it is
//! committed or dropped, and works on a private copy of the tables, so
//! transactions are serializable and an uncommitted transaction leaves no
//! trace. Unique constraints mirror the PostgreSQL schema.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storerate_core::aggregate::StoreAggregate;
use storerate_core::error::DomainError;
use storerate_core::model::{
    EntityCounts, Rating, RatingValue, RatingWithStore, RatingWithUser, Role, Store, StoreDetails,
    StoreFilter, StoreSummary, StoreWithOwner, User, UserFilter, UserSummary,
};
use storerate_core::repository::{EntityStore, EntityTransaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    password_hashes: HashMap<Uuid, String>,
    stores: HashMap<Uuid, Store>,
    ratings: HashMap<Uuid, Rating>,
}

impl Tables {
    fn user_summary(&self, id: Uuid) -> Option<UserSummary> {
        self.users.get(&id).map(|u| UserSummary {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        })
    }

    fn store_summary(&self, id: Uuid) -> Option<StoreSummary> {
        self.stores.get(&id).map(|s| StoreSummary {
            id: s.id,
            name: s.name.clone(),
            address: s.address.clone(),
            average_rating: s.average_rating,
        })
    }

    fn with_owner(&self, store: &Store) -> Option<StoreWithOwner> {
        self.user_summary(store.owner_id).map(|owner| StoreWithOwner {
            store: store.clone(),
            owner,
        })
    }

    fn sorted_users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        users
    }

    fn sorted_stores(&self) -> Vec<&Store> {
        let mut stores: Vec<&Store> = self.stores.values().collect();
        stores.sort_by_key(|s| (s.created_at, s.id));
        stores
    }

    fn sorted_ratings(&self) -> Vec<&Rating> {
        let mut ratings: Vec<&Rating> = self.ratings.values().collect();
        ratings.sort_by_key(|r| (r.created_at, r.id));
        ratings
    }
}

/// An `EntityStore` that keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<Mutex<Tables>>,
    store_locks: Arc<Mutex<Vec<Uuid>>>,
}

impl InMemoryEntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user directly, bypassing the domain.
    pub async fn seed_user(&self, name: &str, email: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            email: email.to_owned(),
            address: "1 Test Street".to_owned(),
            role,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    /// Inserts a store with an empty aggregate directly, bypassing the domain.
    pub async fn seed_store(&self, owner_id: Uuid, name: &str, email: &str) -> Store {
        let store = Store {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            email: email.to_owned(),
            address: "2 Market Square".to_owned(),
            owner_id,
            average_rating: 0.0,
            total_ratings: 0,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .await
            .stores
            .insert(store.id, store.clone());
        store
    }

    /// Overwrites a store's cached aggregate with arbitrary numbers, to
    /// simulate drift that a repair must fix.
    pub async fn corrupt_aggregate(&self, store_id: Uuid, average_rating: f64, total_ratings: i64) {
        if let Some(store) = self.tables.lock().await.stores.get_mut(&store_id) {
            store.average_rating = average_rating;
            store.total_ratings = total_ratings;
        }
    }

    /// Every rating currently stored, in creation order.
    pub async fn all_ratings(&self) -> Vec<Rating> {
        self.tables
            .lock()
            .await
            .sorted_ratings()
            .into_iter()
            .cloned()
            .collect()
    }

    /// The stored password hash of a user.
    pub async fn password_hash(&self, user_id: Uuid) -> Option<String> {
        self.tables.lock().await.password_hashes.get(&user_id).cloned()
    }

    /// Every store id passed to `lock_store`, in call order, including
    /// calls from transactions that were later dropped.
    pub async fn store_locks(&self) -> Vec<Uuid> {
        self.store_locks.lock().await.clone()
    }

    /// Loads a store without its owner join.
    pub async fn store(&self, id: Uuid) -> Option<Store> {
        self.tables.lock().await.stores.get(&id).cloned()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sorted_users()
            .into_iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn get_store(&self, id: Uuid) -> Result<Option<StoreWithOwner>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.stores.get(&id).and_then(|s| tables.with_owner(s)))
    }

    async fn find_stores(&self, filter: &StoreFilter) -> Result<Vec<StoreWithOwner>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sorted_stores()
            .into_iter()
            .filter(|s| filter.matches(s))
            .filter_map(|s| tables.with_owner(s))
            .collect())
    }

    async fn find_store_by_owner(&self, owner_id: Uuid) -> Result<Option<Store>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sorted_stores()
            .into_iter()
            .find(|s| s.owner_id == owner_id)
            .cloned())
    }

    async fn store_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables.sorted_stores().into_iter().map(|s| s.id).collect())
    }

    async fn get_rating(&self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        Ok(self.tables.lock().await.ratings.get(&id).cloned())
    }

    async fn find_rating(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ratings
            .values()
            .find(|r| r.user_id == user_id && r.store_id == store_id)
            .cloned())
    }

    async fn ratings_by_user(&self, user_id: Uuid) -> Result<Vec<RatingWithStore>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sorted_ratings()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                tables.store_summary(r.store_id).map(|store| RatingWithStore {
                    rating: r.clone(),
                    store,
                })
            })
            .collect())
    }

    async fn ratings_by_store(&self, store_id: Uuid) -> Result<Vec<RatingWithUser>, DomainError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sorted_ratings()
            .into_iter()
            .filter(|r| r.store_id == store_id)
            .filter_map(|r| {
                tables.user_summary(r.user_id).map(|user| RatingWithUser {
                    rating: r.clone(),
                    user,
                })
            })
            .collect())
    }

    async fn counts(&self) -> Result<EntityCounts, DomainError> {
        let tables = self.tables.lock().await;
        let len = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(EntityCounts {
            users: len(tables.users.len()),
            stores: len(tables.stores.len()),
            ratings: len(tables.ratings.len()),
        })
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, DomainError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            store_locks: Arc::clone(&self.store_locks),
        }))
    }
}

/// A transaction over [`InMemoryEntityStore`].
#[derive(Debug)]
struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    store_locks: Arc<Mutex<Vec<Uuid>>>,
}

#[async_trait]
impl EntityTransaction for InMemoryTransaction {
    async fn get_user(&mut self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn insert_user(&mut self, user: &User, password_hash: &str) -> Result<(), DomainError> {
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict("user already exists".to_owned()));
        }
        self.working.users.insert(user.id, user.clone());
        self.working
            .password_hashes
            .insert(user.id, password_hash.to_owned());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), DomainError> {
        if self
            .working
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(DomainError::Conflict("user already exists".to_owned()));
        }
        match self.working.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(DomainError::user_not_found(user.id)),
        }
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DomainError> {
        self.working.password_hashes.remove(&id);
        Ok(self.working.users.remove(&id).is_some())
    }

    async fn lock_store(&mut self, id: Uuid) -> Result<Option<Store>, DomainError> {
        self.store_locks.lock().await.push(id);
        Ok(self.working.stores.get(&id).cloned())
    }

    async fn insert_store(&mut self, store: &Store) -> Result<(), DomainError> {
        if self.working.stores.values().any(|s| s.email == store.email) {
            return Err(DomainError::Conflict(
                "store with this email already exists".to_owned(),
            ));
        }
        let mut store = store.clone();
        let empty = StoreAggregate::empty();
        store.average_rating = empty.average_rating();
        store.total_ratings = empty.total_ratings();
        self.working.stores.insert(store.id, store);
        Ok(())
    }

    async fn update_store_details(
        &mut self,
        id: Uuid,
        details: &StoreDetails,
    ) -> Result<(), DomainError> {
        if self
            .working
            .stores
            .values()
            .any(|s| s.id != id && s.email == details.email)
        {
            return Err(DomainError::Conflict(
                "store with this email already exists".to_owned(),
            ));
        }
        let store = self
            .working
            .stores
            .get_mut(&id)
            .ok_or_else(|| DomainError::store_not_found(id))?;
        store.name.clone_from(&details.name);
        store.email.clone_from(&details.email);
        store.address.clone_from(&details.address);
        Ok(())
    }

    async fn write_store_aggregate(
        &mut self,
        id: Uuid,
        aggregate: StoreAggregate,
    ) -> Result<(), DomainError> {
        let store = self
            .working
            .stores
            .get_mut(&id)
            .ok_or_else(|| DomainError::store_not_found(id))?;
        store.average_rating = aggregate.average_rating();
        store.total_ratings = aggregate.total_ratings();
        Ok(())
    }

    async fn delete_store(&mut self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.working.stores.remove(&id).is_some())
    }

    async fn stores_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        Ok(self
            .working
            .sorted_stores()
            .into_iter()
            .filter(|s| s.owner_id == owner_id)
            .map(|s| s.id)
            .collect())
    }

    async fn get_rating(&mut self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        Ok(self.working.ratings.get(&id).cloned())
    }

    async fn find_rating(
        &mut self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        Ok(self
            .working
            .ratings
            .values()
            .find(|r| r.user_id == user_id && r.store_id == store_id)
            .cloned())
    }

    async fn insert_rating(&mut self, rating: &Rating) -> Result<(), DomainError> {
        if self
            .working
            .ratings
            .values()
            .any(|r| r.user_id == rating.user_id && r.store_id == rating.store_id)
        {
            return Err(DomainError::Conflict(
                "user has already rated this store".to_owned(),
            ));
        }
        self.working.ratings.insert(rating.id, rating.clone());
        Ok(())
    }

    async fn update_rating_value(
        &mut self,
        id: Uuid,
        value: RatingValue,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let rating = self
            .working
            .ratings
            .get_mut(&id)
            .ok_or_else(|| DomainError::rating_not_found(id))?;
        rating.value = value;
        rating.updated_at = updated_at;
        Ok(())
    }

    async fn delete_rating(&mut self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.working.ratings.remove(&id).is_some())
    }

    async fn rating_values_for_store(
        &mut self,
        store_id: Uuid,
    ) -> Result<Vec<RatingValue>, DomainError> {
        Ok(self
            .working
            .ratings
            .values()
            .filter(|r| r.store_id == store_id)
            .map(|r| r.value)
            .collect())
    }

    async fn delete_ratings_for_store(&mut self, store_id: Uuid) -> Result<u64, DomainError> {
        let before = self.working.ratings.len();
        self.working.ratings.retain(|_, r| r.store_id != store_id);
        Ok((before - self.working.ratings.len()) as u64)
    }

    async fn delete_ratings_by_user(&mut self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        let mut affected = BTreeSet::new();
        self.working.ratings.retain(|_, r| {
            if r.user_id == user_id {
                affected.insert(r.store_id);
                false
            } else {
                true
            }
        });
        Ok(affected.into_iter().collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let Self {
            mut guard,
            working,
            ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
