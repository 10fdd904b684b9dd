//! `PostgreSQL` implementation of the `EntityStore` and `EntityTransaction`
//! traits.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use storerate_core::aggregate::StoreAggregate;
use storerate_core::error::DomainError;
use storerate_core::model::{
    EntityCounts, Rating, RatingValue, RatingWithStore, RatingWithUser, Role, Store,
    StoreDetails, StoreFilter, StoreWithOwner, User, UserFilter,
};
use storerate_core::repository::{EntityStore, EntityTransaction};
use uuid::Uuid;

use crate::error::storage_error;
use crate::rows::{
    RatingRow, RatingWithStoreRow, RatingWithUserRow, StoreRow, StoreWithOwnerRow, UserRow,
    rating_value,
};

/// Turns an optional substring filter into an `ILIKE` pattern, escaping the
/// pattern metacharacters in the user's text.
pub(crate) fn like_pattern(needle: Option<&str>) -> Option<String> {
    needle.map(|n| {
        let mut pattern = String::with_capacity(n.len() + 2);
        pattern.push('%');
        for c in n.chars() {
            if matches!(c, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    })
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DomainError>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// PostgreSQL-backed entity store.
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    /// Creates a new `PgEntityStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, address, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DomainError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, email, address, role, created_at FROM users \
             WHERE ($1::text IS NULL OR name ILIKE $1) \
               AND ($2::text IS NULL OR email ILIKE $2) \
               AND ($3::text IS NULL OR address ILIKE $3) \
               AND ($4::text IS NULL OR role = $4) \
             ORDER BY created_at, id",
        )
        .bind(like_pattern(filter.name.as_deref()))
        .bind(like_pattern(filter.email.as_deref()))
        .bind(like_pattern(filter.address.as_deref()))
        .bind(filter.role.map(Role::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        convert_all(rows)
    }

    async fn get_store(&self, id: Uuid) -> Result<Option<StoreWithOwner>, DomainError> {
        let row: Option<StoreWithOwnerRow> = sqlx::query_as(
            "SELECT s.id, s.name, s.email, s.address, s.owner_id, s.average_rating, \
                    s.total_ratings, s.created_at, u.name AS owner_name, u.email AS owner_email \
             FROM stores s JOIN users u ON u.id = s.owner_id \
             WHERE s.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(StoreWithOwner::from))
    }

    async fn find_stores(&self, filter: &StoreFilter) -> Result<Vec<StoreWithOwner>, DomainError> {
        let rows: Vec<StoreWithOwnerRow> = sqlx::query_as(
            "SELECT s.id, s.name, s.email, s.address, s.owner_id, s.average_rating, \
                    s.total_ratings, s.created_at, u.name AS owner_name, u.email AS owner_email \
             FROM stores s JOIN users u ON u.id = s.owner_id \
             WHERE ($1::text IS NULL OR s.name ILIKE $1) \
               AND ($2::text IS NULL OR s.address ILIKE $2) \
             ORDER BY s.created_at, s.id",
        )
        .bind(like_pattern(filter.name.as_deref()))
        .bind(like_pattern(filter.address.as_deref()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(rows.into_iter().map(StoreWithOwner::from).collect())
    }

    async fn find_store_by_owner(&self, owner_id: Uuid) -> Result<Option<Store>, DomainError> {
        let row: Option<StoreRow> = sqlx::query_as(
            "SELECT id, name, email, address, owner_id, average_rating, total_ratings, created_at \
             FROM stores WHERE owner_id = $1 ORDER BY created_at, id LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(Store::from))
    }

    async fn store_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar("SELECT id FROM stores ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn get_rating(&self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        let row: Option<RatingRow> = sqlx::query_as(
            "SELECT id, user_id, store_id, value, created_at, updated_at \
             FROM ratings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(Rating::try_from).transpose()
    }

    async fn find_rating(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        let row: Option<RatingRow> = sqlx::query_as(
            "SELECT id, user_id, store_id, value, created_at, updated_at \
             FROM ratings WHERE user_id = $1 AND store_id = $2",
        )
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(Rating::try_from).transpose()
    }

    async fn ratings_by_user(&self, user_id: Uuid) -> Result<Vec<RatingWithStore>, DomainError> {
        let rows: Vec<RatingWithStoreRow> = sqlx::query_as(
            "SELECT r.id, r.user_id, r.store_id, r.value, r.created_at, r.updated_at, \
                    s.name AS store_name, s.address AS store_address, \
                    s.average_rating AS store_average_rating \
             FROM ratings r JOIN stores s ON s.id = r.store_id \
             WHERE r.user_id = $1 \
             ORDER BY r.created_at, r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        convert_all(rows)
    }

    async fn ratings_by_store(&self, store_id: Uuid) -> Result<Vec<RatingWithUser>, DomainError> {
        let rows: Vec<RatingWithUserRow> = sqlx::query_as(
            "SELECT r.id, r.user_id, r.store_id, r.value, r.created_at, r.updated_at, \
                    u.name AS user_name, u.email AS user_email \
             FROM ratings r JOIN users u ON u.id = r.user_id \
             WHERE r.store_id = $1 \
             ORDER BY r.created_at, r.id",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        convert_all(rows)
    }

    async fn counts(&self) -> Result<EntityCounts, DomainError> {
        let (users, stores, ratings): (i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users), \
                    (SELECT COUNT(*) FROM stores), \
                    (SELECT COUNT(*) FROM ratings)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(EntityCounts {
            users,
            stores,
            ratings,
        })
    }

    async fn begin(&self) -> Result<Box<dyn EntityTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(storage_error)?;
        Ok(Box::new(PgEntityTransaction { tx }))
    }
}

/// A database transaction. Rolled back when dropped uncommitted.
pub struct PgEntityTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EntityTransaction for PgEntityTransaction {
    async fn get_user(&mut self, id: Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, address, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn insert_user(&mut self, user: &User, password_hash: &str) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, address, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.address)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, email = $3, address = $4, role = $5 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.address)
        .bind(user.role.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::user_not_found(user.id));
        }
        Ok(())
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn lock_store(&mut self, id: Uuid) -> Result<Option<Store>, DomainError> {
        let row: Option<StoreRow> = sqlx::query_as(
            "SELECT id, name, email, address, owner_id, average_rating, total_ratings, created_at \
             FROM stores WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        Ok(row.map(Store::from))
    }

    async fn insert_store(&mut self, store: &Store) -> Result<(), DomainError> {
        let empty = StoreAggregate::empty();
        sqlx::query(
            "INSERT INTO stores \
                 (id, name, email, address, owner_id, average_rating, total_ratings, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(store.id)
        .bind(&store.name)
        .bind(&store.email)
        .bind(&store.address)
        .bind(store.owner_id)
        .bind(empty.average_rating())
        .bind(empty.total_ratings())
        .bind(store.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn update_store_details(
        &mut self,
        id: Uuid,
        details: &StoreDetails,
    ) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE stores SET name = $2, email = $3, address = $4 WHERE id = $1")
                .bind(id)
                .bind(&details.name)
                .bind(&details.email)
                .bind(&details.address)
                .execute(&mut *self.tx)
                .await
                .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::store_not_found(id));
        }
        Ok(())
    }

    async fn write_store_aggregate(
        &mut self,
        id: Uuid,
        aggregate: StoreAggregate,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE stores SET average_rating = $2, total_ratings = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(aggregate.average_rating())
        .bind(aggregate.total_ratings())
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::store_not_found(id));
        }
        Ok(())
    }

    async fn delete_store(&mut self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn stores_owned_by(&mut self, owner_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar("SELECT id FROM stores WHERE owner_id = $1 ORDER BY created_at, id")
            .bind(owner_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage_error)
    }

    async fn get_rating(&mut self, id: Uuid) -> Result<Option<Rating>, DomainError> {
        let row: Option<RatingRow> = sqlx::query_as(
            "SELECT id, user_id, store_id, value, created_at, updated_at \
             FROM ratings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        row.map(Rating::try_from).transpose()
    }

    async fn find_rating(
        &mut self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Option<Rating>, DomainError> {
        let row: Option<RatingRow> = sqlx::query_as(
            "SELECT id, user_id, store_id, value, created_at, updated_at \
             FROM ratings WHERE user_id = $1 AND store_id = $2",
        )
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        row.map(Rating::try_from).transpose()
    }

    async fn insert_rating(&mut self, rating: &Rating) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO ratings (id, user_id, store_id, value, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(rating.id)
        .bind(rating.user_id)
        .bind(rating.store_id)
        .bind(i16::from(rating.value.get()))
        .bind(rating.created_at)
        .bind(rating.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn update_rating_value(
        &mut self,
        id: Uuid,
        value: RatingValue,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE ratings SET value = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(i16::from(value.get()))
            .bind(updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::rating_not_found(id));
        }
        Ok(())
    }

    async fn delete_rating(&mut self, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn rating_values_for_store(
        &mut self,
        store_id: Uuid,
    ) -> Result<Vec<RatingValue>, DomainError> {
        let raw: Vec<i16> = sqlx::query_scalar("SELECT value FROM ratings WHERE store_id = $1")
            .bind(store_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        raw.into_iter().map(rating_value).collect()
    }

    async fn delete_ratings_for_store(&mut self, store_id: Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM ratings WHERE store_id = $1")
            .bind(store_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_ratings_by_user(&mut self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        let store_ids: Vec<Uuid> =
            sqlx::query_scalar("DELETE FROM ratings WHERE user_id = $1 RETURNING store_id")
                .bind(user_id)
                .fetch_all(&mut *self.tx)
                .await
                .map_err(storage_error)?;
        let distinct: BTreeSet<Uuid> = store_ids.into_iter().collect();
        Ok(distinct.into_iter().collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(storage_error)
    }
}
