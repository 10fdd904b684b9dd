//! Store rating service — User Administration bounded context.
//!
//! Administrators create, list, inspect, edit and delete user accounts.
//! Deleting a user removes the stores they own and every rating they wrote,
//! and recomputes the aggregate of each surviving store that lost a rating.

pub mod application;
pub mod domain;
