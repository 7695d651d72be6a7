//! Database error conversion helpers.

use sea_orm::DbErr;
use tracing::error;

use crate::domain::error::DomainError;

/// Convert a `SeaORM` error into a `DomainError`.
///
/// Unique-constraint violations keep the backend's message so callers can tell
/// which column collided; everything else is a storage failure.
pub fn db_err(e: DbErr) -> DomainError {
    if let Some(constraint) = ledger_db::unique_violation(&e) {
        return DomainError::UniqueViolation { constraint };
    }
    error!(error = %e, "Database operation failed");
    DomainError::database(e.to_string())
}
