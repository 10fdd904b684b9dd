//! Entity records shared by every bounded context.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Access role carried by every user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages users and stores.
    Admin,
    /// Browses and rates stores.
    User,
    /// Owns a store and may read its ratings.
    StoreOwner,
}

impl Role {
    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::StoreOwner => "store_owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "store_owner" => Ok(Self::StoreOwner),
            other => Err(DomainError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// A rating value, always an integer in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RatingValue(u8);

impl RatingValue {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Validates and wraps a raw rating.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` if `raw` is outside `[1, 5]`.
    pub fn new(raw: i64) -> Result<Self, DomainError> {
        u8::try_from(raw)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or_else(|| {
                DomainError::InvalidInput("rating must be an integer between 1 and 5".to_owned())
            })
    }

    /// Validates a JSON number, rejecting fractions as well as out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` if `number` is not an integer in `[1, 5]`.
    pub fn from_json(number: &serde_json::Number) -> Result<Self, DomainError> {
        number.as_i64().map_or_else(
            || {
                Err(DomainError::InvalidInput(
                    "rating must be an integer between 1 and 5".to_owned(),
                ))
            },
            Self::new,
        )
    }

    /// The raw value.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

/// A user account as seen by this service. The password hash stays with the
/// identity component and is never loaded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Primary key.
    pub id: Uuid,
    /// Display name, 3–60 characters.
    pub name: String,
    /// Unique login email.
    pub email: String,
    /// Postal address, at most 400 characters.
    pub address: String,
    /// Access role.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

/// A rated store with its cached aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique contact email.
    pub email: String,
    /// Postal address, at most 400 characters.
    pub address: String,
    /// The owning user.
    pub owner_id: Uuid,
    /// Mean of current ratings, one decimal; derived.
    pub average_rating: f64,
    /// Count of current ratings; derived.
    pub total_ratings: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One user's rating of one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    /// Primary key.
    pub id: Uuid,
    /// The rating author. Never reassigned.
    pub user_id: Uuid,
    /// The rated store. Never reassigned.
    pub store_id: Uuid,
    /// The rating itself.
    pub value: RatingValue,
    /// When the rating was first submitted.
    pub created_at: DateTime<Utc>,
    /// When the value last changed.
    pub updated_at: DateTime<Utc>,
}

/// Owner or author details joined onto store and rating listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    /// User id.
    pub id: Uuid,
    /// User name.
    pub name: String,
    /// User email.
    pub email: String,
}

/// Store details joined onto a user's rating listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    /// Store id.
    pub id: Uuid,
    /// Store name.
    pub name: String,
    /// Store address.
    pub address: String,
    /// Cached average rating.
    pub average_rating: f64,
}

/// A store together with its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreWithOwner {
    /// The store record.
    pub store: Store,
    /// The owning user.
    pub owner: UserSummary,
}

/// A rating together with the store it rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingWithStore {
    /// The rating record.
    pub rating: Rating,
    /// The rated store.
    pub store: StoreSummary,
}

/// A rating together with its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingWithUser {
    /// The rating record.
    pub rating: Rating,
    /// The author.
    pub user: UserSummary,
}

/// Editable store fields. Deliberately excludes the derived aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDetails {
    /// Display name.
    pub name: String,
    /// Unique contact email.
    pub email: String,
    /// Postal address.
    pub address: String,
}

/// Case-insensitive substring filters over stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    /// Matches within the store name.
    pub name: Option<String>,
    /// Matches within the store address.
    pub address: Option<String>,
}

/// Case-insensitive substring filters over users, plus an exact role match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Matches within the user name.
    pub name: Option<String>,
    /// Matches within the email.
    pub email: Option<String>,
    /// Matches within the address.
    pub address: Option<String>,
    /// Exact role.
    pub role: Option<Role>,
}

/// Case-insensitive substring match used by in-memory filtering.
#[must_use]
pub fn matches_filter(haystack: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
}

impl StoreFilter {
    /// Whether `store` passes every populated filter.
    #[must_use]
    pub fn matches(&self, store: &Store) -> bool {
        matches_filter(&store.name, self.name.as_deref())
            && matches_filter(&store.address, self.address.as_deref())
    }
}

impl UserFilter {
    /// Whether `user` passes every populated filter.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        matches_filter(&user.name, self.name.as_deref())
            && matches_filter(&user.email, self.email.as_deref())
            && matches_filter(&user.address, self.address.as_deref())
            && self.role.is_none_or(|r| r == user.role)
    }
}

/// Collection sizes shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityCounts {
    /// Number of users.
    pub users: i64,
    /// Number of stores.
    pub stores: i64,
    /// Number of ratings.
    pub ratings: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_value_accepts_bounds() {
        assert_eq!(RatingValue::new(1).unwrap().get(), 1);
        assert_eq!(RatingValue::new(5).unwrap().get(), 5);
    }

    #[test]
    fn test_rating_value_rejects_out_of_range() {
        for raw in [0, 6, -1, 256, i64::MAX] {
            match RatingValue::new(raw) {
                Err(DomainError::InvalidInput(msg)) => assert!(msg.contains("between 1 and 5")),
                other => panic!("expected InvalidInput for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_rating_value_rejects_fractional_json() {
        let number = serde_json::Number::from_f64(3.5).unwrap();
        assert!(matches!(
            RatingValue::from_json(&number),
            Err(DomainError::InvalidInput(_))
        ));

        let number = serde_json::Number::from(4);
        assert_eq!(RatingValue::from_json(&number).unwrap().get(), 4);
    }

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [Role::Admin, Role::User, Role::StoreOwner] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Role::StoreOwner).unwrap(),
            serde_json::json!("store_owner")
        );
    }

    #[test]
    fn test_store_filter_is_case_insensitive_substring() {
        let store = Store {
            id: Uuid::new_v4(),
            name: "Corner Bakery".to_owned(),
            email: "bakery@example.com".to_owned(),
            address: "12 Main Street".to_owned(),
            owner_id: Uuid::new_v4(),
            average_rating: 0.0,
            total_ratings: 0,
            created_at: Utc::now(),
        };

        let filter = StoreFilter {
            name: Some("bAKe".to_owned()),
            address: None,
        };
        assert!(filter.matches(&store));

        let filter = StoreFilter {
            name: None,
            address: Some("elm".to_owned()),
        };
        assert!(!filter.matches(&store));
    }

    #[test]
    fn test_user_filter_matches_role_exactly() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Dana Whitfield".to_owned(),
            email: "dana@example.com".to_owned(),
            address: "4 Elm Road".to_owned(),
            role: Role::StoreOwner,
            created_at: Utc::now(),
        };

        let owners = UserFilter {
            role: Some(Role::StoreOwner),
            ..UserFilter::default()
        };
        let admins = UserFilter {
            role: Some(Role::Admin),
            ..UserFilter::default()
        };
        assert!(owners.matches(&user));
        assert!(!admins.matches(&user));
    }
}
