//! Store rating service — Store Lifecycle bounded context.
//!
//! Creates, edits, lists and deletes stores. Deleting a store removes its
//! ratings in the same transaction. Nothing here writes a store's cached
//! aggregate except through the empty aggregate a new store starts with.

pub mod application;
pub mod domain;
