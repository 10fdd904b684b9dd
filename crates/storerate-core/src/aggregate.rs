//! The derived per-store rating aggregate.
//!
//! A `StoreAggregate` can only be produced from a set of rating values, so
//! the two cached fields on a store can never be written with numbers that
//! were not derived from its ratings.

use crate::model::RatingValue;

/// Average and count of a store's current ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreAggregate {
    /// Average multiplied by ten, already rounded.
    average_tenths: u16,
    total: i64,
}

impl StoreAggregate {
    /// The aggregate of a store with no ratings: `0.0` over `0`.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            average_tenths: 0,
            total: 0,
        }
    }

    /// Computes the aggregate of `values` from scratch.
    ///
    /// The mean is rounded half-to-even at one decimal. All arithmetic is
    /// done on integers, so the result depends only on the multiset of
    /// values and never drifts.
    #[must_use]
    pub fn from_values(values: &[RatingValue]) -> Self {
        if values.is_empty() {
            return Self::empty();
        }
        let count = values.len() as u64;
        let sum: u64 = values.iter().map(|v| u64::from(v.get())).sum();

        let scaled = sum * 10;
        let quotient = scaled / count;
        let remainder = scaled % count;
        let rounded = match (remainder * 2).cmp(&count) {
            std::cmp::Ordering::Less => quotient,
            std::cmp::Ordering::Greater => quotient + 1,
            std::cmp::Ordering::Equal => quotient + (quotient % 2),
        };

        Self {
            // Bounded by 50 since every value is at most 5.
            average_tenths: u16::try_from(rounded).unwrap_or(u16::MAX),
            total: i64::try_from(count).unwrap_or(i64::MAX),
        }
    }

    /// The rounded mean, `0.0` when there are no ratings.
    #[must_use]
    pub fn average_rating(self) -> f64 {
        f64::from(self.average_tenths) / 10.0
    }

    /// The number of ratings.
    #[must_use]
    pub fn total_ratings(self) -> i64 {
        self.total
    }
}
