//! Commands for the Rating Aggregation context.

use uuid::Uuid;

/// Command to rate a store, replacing the caller's earlier rating if any.
#[derive(Debug, Clone)]
pub struct SubmitRating {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The authenticated author.
    pub user_id: Uuid,
    /// The store being rated.
    pub store_id: Uuid,
    /// The raw rating, validated by the handler.
    pub value: i64,
}

/// Command to change the value of an existing rating.
#[derive(Debug, Clone)]
pub struct UpdateRating {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The rating to change.
    pub rating_id: Uuid,
    /// The authenticated caller; must be the rating's author.
    pub requester_id: Uuid,
    /// The raw new rating, validated by the handler.
    pub value: i64,
}

/// Command to withdraw a rating.
#[derive(Debug, Clone)]
pub struct DeleteRating {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The rating to delete.
    pub rating_id: Uuid,
    /// The authenticated caller; must be the rating's author.
    pub requester_id: Uuid,
}

/// Command to rebuild a store's cached aggregate from its ratings.
#[derive(Debug, Clone)]
pub struct RecomputeStoreAggregate {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The store to repair.
    pub store_id: Uuid,
}
