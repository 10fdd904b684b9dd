//! Shared test doubles and utilities for the store rating service.

mod clock;
mod identity;
mod memory;
mod repository;

pub use clock::FixedClock;
pub use identity::{PlainCredentialHasher, StaticIdentityProvider};
pub use memory::InMemoryEntityStore;
pub use repository::{FailingEntityStore, FlakyEntityStore, StaleReadEntityStore};
