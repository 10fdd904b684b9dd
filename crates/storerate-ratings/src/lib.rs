//! Store rating service — Rating Aggregation bounded context.
//!
//! Owns the two rating invariants: at most one rating per (user, store)
//! pair, and a store's cached `average_rating`/`total_ratings` always equal
//! the mean and count of its current ratings. Every rating mutation
//! recomputes the aggregate from scratch inside the same transaction.

pub mod application;
pub mod domain;
