//! Rules for creating and revising a rating.

use chrono::{DateTime, Utc};
use storerate_core::error::DomainError;
use storerate_core::model::{Rating, RatingValue};
use uuid::Uuid;

/// Builds a first-time rating; `created_at` and `updated_at` coincide.
#[must_use]
pub fn new_rating(user_id: Uuid, store_id: Uuid, value: RatingValue, now: DateTime<Utc>) -> Rating {
    Rating {
        id: Uuid::new_v4(),
        user_id,
        store_id,
        value,
        created_at: now,
        updated_at: now,
    }
}

/// Returns `rating` with a new value. The author, store and creation time
/// never change.
#[must_use]
pub fn revise(rating: Rating, value: RatingValue, now: DateTime<Utc>) -> Rating {
    Rating {
        value,
        updated_at: now,
        ..rating
    }
}

/// Only the author may change or withdraw a rating.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` if `requester_id` did not write `rating`.
pub fn ensure_author(rating: &Rating, requester_id: Uuid, action: &str) -> Result<(), DomainError> {
    if rating.user_id == requester_id {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "not authorized to {action} this rating"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_rating_stamps_both_timestamps() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let rating = new_rating(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RatingValue::new(4).unwrap(),
            now,
        );
        assert_eq!(rating.created_at, now);
        assert_eq!(rating.updated_at, now);
    }

    #[test]
    fn test_revise_keeps_identity_and_creation_time() {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 16, 9, 30, 0).unwrap();
        let original = new_rating(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RatingValue::new(2).unwrap(),
            created,
        );

        let revised = revise(original.clone(), RatingValue::new(5).unwrap(), later);

        assert_eq!(revised.id, original.id);
        assert_eq!(revised.user_id, original.user_id);
        assert_eq!(revised.store_id, original.store_id);
        assert_eq!(revised.created_at, created);
        assert_eq!(revised.updated_at, later);
        assert_eq!(revised.value.get(), 5);
    }

    #[test]
    fn test_ensure_author_rejects_other_user() {
        let rating = new_rating(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RatingValue::new(3).unwrap(),
            Utc::now(),
        );
        assert!(ensure_author(&rating, rating.user_id, "update").is_ok());
        match ensure_author(&rating, Uuid::new_v4(), "delete") {
            Err(DomainError::Forbidden(msg)) => {
                assert_eq!(msg, "not authorized to delete this rating");
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }
}
