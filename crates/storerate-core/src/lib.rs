//! Storerate Core — shared domain model and persistence seams.
//!
//! This crate defines the entity records, the error taxonomy, the
//! identity contract and the transactional storage traits that every
//! other crate depends on. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod identity;
pub mod model;
pub mod repository;
pub mod retry;
pub mod validation;
