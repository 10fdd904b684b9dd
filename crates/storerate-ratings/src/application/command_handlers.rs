//! Command handlers for the Rating Aggregation context.
//!
//! Each handler runs one transaction: check, write the rating, recompute
//! the store aggregate from every current rating, commit. The aggregate is
//! written only by [`recompute_store_aggregate_in`].

use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use storerate_core::aggregate::StoreAggregate;
use storerate_core::clock::Clock;
use storerate_core::error::DomainError;
use storerate_core::model::{Rating, RatingValue, Store};
use storerate_core::repository::{EntityStore, EntityTransaction};
use storerate_core::retry::RetryPolicy;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::commands::{DeleteRating, RecomputeStoreAggregate, SubmitRating, UpdateRating};
use crate::domain::rating;

/// How many times `submit` may lose an insert race before giving up. The
/// second attempt normally takes the update path.
const UPSERT_ATTEMPTS: usize = 3;

/// Re-runs after a lost insert race are immediate; the winner has committed.
fn lost_race_backoff() -> ConstantBuilder {
    ConstantBuilder::default()
        .with_delay(Duration::ZERO)
        .with_max_times(UPSERT_ATTEMPTS - 1)
}

/// Result of a rating write.
#[derive(Debug, Clone)]
pub struct RatingWriteResult {
    /// The rating as stored after the write.
    pub rating: Rating,
    /// Whether the write created the rating rather than overwriting one.
    pub created: bool,
    /// The store's aggregate after the write.
    pub aggregate: StoreAggregate,
}

/// Result of a rating deletion.
#[derive(Debug, Clone)]
pub struct RatingDeleteResult {
    /// The store the rating belonged to.
    pub store_id: Uuid,
    /// The store's aggregate after the deletion.
    pub aggregate: StoreAggregate,
}

/// Loads and locks a store, failing if it does not exist.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the store is absent.
pub async fn lock_existing_store(
    tx: &mut dyn EntityTransaction,
    store_id: Uuid,
) -> Result<Store, DomainError> {
    tx.lock_store(store_id)
        .await?
        .ok_or_else(|| DomainError::store_not_found(store_id))
}

/// Recomputes a store's aggregate from every rating visible to `tx` and
/// writes it. Idempotent: the result depends only on the current ratings.
///
/// Callers should hold the store lock (see [`lock_existing_store`]).
///
/// # Errors
///
/// Returns `DomainError` if reading ratings or writing the store fails.
pub async fn recompute_store_aggregate_in(
    tx: &mut dyn EntityTransaction,
    store_id: Uuid,
) -> Result<StoreAggregate, DomainError> {
    let values = tx.rating_values_for_store(store_id).await?;
    let aggregate = StoreAggregate::from_values(&values);
    tx.write_store_aggregate(store_id, aggregate).await?;
    debug!(
        %store_id,
        average_rating = aggregate.average_rating(),
        total_ratings = aggregate.total_ratings(),
        "store aggregate recomputed"
    );
    Ok(aggregate)
}

async fn submit_once(
    command: &SubmitRating,
    value: RatingValue,
    clock: &dyn Clock,
    store: &dyn EntityStore,
) -> Result<RatingWriteResult, DomainError> {
    let mut tx = store.begin().await?;
    lock_existing_store(tx.as_mut(), command.store_id).await?;

    let now = clock.now();
    let (stored, created) = match tx.find_rating(command.user_id, command.store_id).await? {
        Some(existing) => {
            tx.update_rating_value(existing.id, value, now).await?;
            (rating::revise(existing, value, now), false)
        }
        None => {
            let new = rating::new_rating(command.user_id, command.store_id, value, now);
            tx.insert_rating(&new).await?;
            (new, true)
        }
    };

    let aggregate = recompute_store_aggregate_in(tx.as_mut(), command.store_id).await?;
    tx.commit().await?;

    Ok(RatingWriteResult {
        rating: stored,
        created,
        aggregate,
    })
}

/// Handles the `SubmitRating` command: inserts the caller's rating of a
/// store, or overwrites it if one exists, and recomputes the aggregate.
///
/// A concurrent submit for the same (user, store) pair that wins the insert
/// surfaces here as `Conflict`; the attempt is discarded and re-run, and the
/// re-run updates the winner's row. Storage failures are retried under
/// `retry`.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` if the value is outside `[1, 5]`,
/// `DomainError::NotFound` if the store does not exist, or the storage error.
pub async fn handle_submit_rating(
    command: &SubmitRating,
    clock: &dyn Clock,
    store: &dyn EntityStore,
    retry: &RetryPolicy,
) -> Result<RatingWriteResult, DomainError> {
    let value = RatingValue::new(command.value)?;

    let written = (move || {
        retry.run("submit_rating", move || {
            submit_once(command, value, clock, store)
        })
    })
    .retry(lost_race_backoff())
    .when(|err: &DomainError| matches!(err, DomainError::Conflict(_)))
    .notify(|err: &DomainError, _: Duration| {
        warn!(
            correlation_id = %command.correlation_id,
            error = %err,
            "lost rating insert race; retrying as update"
        );
    })
    .await?;

    info!(
        correlation_id = %command.correlation_id,
        rating_id = %written.rating.id,
        created = written.created,
        "rating submitted"
    );
    Ok(written)
}

/// Handles the `UpdateRating` command: changes the value of the caller's own
/// rating and recomputes the aggregate.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` for an out-of-range value,
/// `DomainError::NotFound` if the rating does not exist,
/// `DomainError::Forbidden` if the caller is not its author, or the storage
/// error.
pub async fn handle_update_rating(
    command: &UpdateRating,
    clock: &dyn Clock,
    store: &dyn EntityStore,
) -> Result<RatingWriteResult, DomainError> {
    let value = RatingValue::new(command.value)?;

    let mut tx = store.begin().await?;
    let existing = tx
        .get_rating(command.rating_id)
        .await?
        .ok_or_else(|| DomainError::rating_not_found(command.rating_id))?;
    rating::ensure_author(&existing, command.requester_id, "update")?;

    let store_id = existing.store_id;
    lock_existing_store(tx.as_mut(), store_id).await?;

    let now = clock.now();
    tx.update_rating_value(existing.id, value, now).await?;
    let updated = rating::revise(existing, value, now);

    let aggregate = recompute_store_aggregate_in(tx.as_mut(), store_id).await?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        rating_id = %command.rating_id,
        "rating updated"
    );

    Ok(RatingWriteResult {
        rating: updated,
        created: false,
        aggregate,
    })
}

/// Handles the `DeleteRating` command: removes the caller's own rating and
/// recomputes the aggregate. A store left without ratings reads `0.0`/`0`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the rating does not exist,
/// `DomainError::Forbidden` if the caller is not its author, or the storage
/// error.
pub async fn handle_delete_rating(
    command: &DeleteRating,
    store: &dyn EntityStore,
) -> Result<RatingDeleteResult, DomainError> {
    let mut tx = store.begin().await?;
    let existing = tx
        .get_rating(command.rating_id)
        .await?
        .ok_or_else(|| DomainError::rating_not_found(command.rating_id))?;
    rating::ensure_author(&existing, command.requester_id, "delete")?;

    let store_id = existing.store_id;
    lock_existing_store(tx.as_mut(), store_id).await?;

    if !tx.delete_rating(existing.id).await? {
        return Err(DomainError::rating_not_found(command.rating_id));
    }
    let aggregate = recompute_store_aggregate_in(tx.as_mut(), store_id).await?;
    tx.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        rating_id = %command.rating_id,
        "rating deleted"
    );

    Ok(RatingDeleteResult {
        store_id,
        aggregate,
    })
}

async fn recompute_once(
    store_id: Uuid,
    store: &dyn EntityStore,
) -> Result<StoreAggregate, DomainError> {
    let mut tx = store.begin().await?;
    lock_existing_store(tx.as_mut(), store_id).await?;
    let aggregate = recompute_store_aggregate_in(tx.as_mut(), store_id).await?;
    tx.commit().await?;
    Ok(aggregate)
}

/// Handles the `RecomputeStoreAggregate` command: rebuilds one store's
/// aggregate on demand. Safe to call any number of times, concurrently.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the store does not exist, or the
/// storage error once retries are exhausted.
pub async fn handle_recompute_store_aggregate(
    command: &RecomputeStoreAggregate,
    store: &dyn EntityStore,
    retry: &RetryPolicy,
) -> Result<StoreAggregate, DomainError> {
    let aggregate = retry
        .run("recompute_store_aggregate", || {
            recompute_once(command.store_id, store)
        })
        .await?;

    info!(
        correlation_id = %command.correlation_id,
        store_id = %command.store_id,
        "store aggregate repaired"
    );

    Ok(aggregate)
}

/// Repair sweep: recomputes the aggregate of every store. Stores deleted
/// while the sweep runs are skipped. Returns how many were recomputed.
///
/// # Errors
///
/// Returns the first storage error that survives retries.
pub async fn handle_recompute_all_aggregates(
    correlation_id: Uuid,
    store: &dyn EntityStore,
    retry: &RetryPolicy,
) -> Result<usize, DomainError> {
    let store_ids = store.store_ids().await?;
    let mut recomputed = 0;
    for store_id in store_ids {
        match retry
            .run("recompute_store_aggregate", || recompute_once(store_id, store))
            .await
        {
            Ok(_) => recomputed += 1,
            Err(DomainError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    info!(%correlation_id, recomputed, "aggregate sweep finished");
    Ok(recomputed)
}
