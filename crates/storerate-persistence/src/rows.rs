//! Row types read back from `PostgreSQL` and their conversion into the
//! domain model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use storerate_core::error::DomainError;
use storerate_core::model::{
    Rating, RatingValue, RatingWithStore, RatingWithUser, Role, Store, StoreSummary,
    StoreWithOwner, User, UserSummary,
};
use uuid::Uuid;

use crate::error::corrupt_row;

pub(crate) fn parse_role(raw: &str) -> Result<Role, DomainError> {
    raw.parse::<Role>()
        .map_err(|_| corrupt_row(&format!("unknown role {raw:?}")))
}

pub(crate) fn rating_value(raw: i16) -> Result<RatingValue, DomainError> {
    RatingValue::new(i64::from(raw)).map_err(|_| corrupt_row(&format!("rating value {raw}")))
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    address: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: parse_role(&row.role)?,
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StoreRow {
    id: Uuid,
    name: String,
    email: String,
    address: String,
    owner_id: Uuid,
    average_rating: f64,
    total_ratings: i64,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            owner_id: row.owner_id,
            average_rating: row.average_rating,
            total_ratings: row.total_ratings,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StoreWithOwnerRow {
    #[sqlx(flatten)]
    store: StoreRow,
    owner_name: String,
    owner_email: String,
}

impl From<StoreWithOwnerRow> for StoreWithOwner {
    fn from(row: StoreWithOwnerRow) -> Self {
        let owner = UserSummary {
            id: row.store.owner_id,
            name: row.owner_name,
            email: row.owner_email,
        };
        Self {
            store: row.store.into(),
            owner,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RatingRow {
    id: Uuid,
    user_id: Uuid,
    store_id: Uuid,
    value: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for Rating {
    type Error = DomainError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            value: rating_value(row.value)?,
            id: row.id,
            user_id: row.user_id,
            store_id: row.store_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RatingWithStoreRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    store_name: String,
    store_address: String,
    store_average_rating: f64,
}

impl TryFrom<RatingWithStoreRow> for RatingWithStore {
    type Error = DomainError;

    fn try_from(row: RatingWithStoreRow) -> Result<Self, Self::Error> {
        let store = StoreSummary {
            id: row.rating.store_id,
            name: row.store_name,
            address: row.store_address,
            average_rating: row.store_average_rating,
        };
        Ok(Self {
            rating: row.rating.try_into()?,
            store,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RatingWithUserRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    user_name: String,
    user_email: String,
}

impl TryFrom<RatingWithUserRow> for RatingWithUser {
    type Error = DomainError;

    fn try_from(row: RatingWithUserRow) -> Result<Self, Self::Error> {
        let user = UserSummary {
            id: row.rating.user_id,
            name: row.user_name,
            email: row.user_email,
        };
        Ok(Self {
            rating: row.rating.try_into()?,
            user,
        })
    }
}
