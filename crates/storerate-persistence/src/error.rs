//! Translation of `sqlx` failures into the domain taxonomy.

use storerate_core::error::DomainError;
use tracing::{error, warn};

const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("uq_users_email") => "user already exists".to_owned(),
        Some("uq_stores_email") => "store with this email already exists".to_owned(),
        Some("uq_ratings_user_store") => "user has already rated this store".to_owned(),
        Some(other) => format!("duplicate value violates {other}"),
        None => "duplicate value".to_owned(),
    }
}

/// Maps a `sqlx` error to a `DomainError`.
///
/// Unique violations become `Conflict`. Everything else is a storage
/// failure and becomes `Unavailable`; connection-level failures and aborted
/// transactions are expected under load and logged at `warn`, anything else
/// at `error`.
pub(crate) fn storage_error(err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => DomainError::Conflict(conflict_message(db.constraint())),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                warn!(error = %err, "transaction aborted by a concurrent writer");
                DomainError::Unavailable("transaction aborted by a concurrent writer".to_owned())
            }
            _ => {
                error!(error = %err, "unexpected database error");
                DomainError::Unavailable("unexpected database error".to_owned())
            }
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::WorkerCrashed => {
            warn!(error = %err, "database connection failure");
            DomainError::Unavailable(err.to_string())
        }
        _ => {
            error!(error = %err, "unexpected storage error");
            DomainError::Unavailable("unexpected storage error".to_owned())
        }
    }
}

/// A row that violates a domain invariant the schema could not express.
pub(crate) fn corrupt_row(what: &str) -> DomainError {
    error!(detail = what, "corrupt row");
    DomainError::Unavailable(format!("corrupt row: {what}"))
}
