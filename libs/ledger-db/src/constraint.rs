//! Uniqueness-constraint classification.

use sea_orm::{DbErr, SqlErr};

/// Return the driver message if `err` is a uniqueness-constraint violation.
///
/// The message names the violated index or column on every supported backend
/// (`UNIQUE constraint failed: users.referral_code` on `SQLite`, the index name on
/// `PostgreSQL` and `MySQL`), which lets callers tell a token collision apart from a
/// duplicate identity.
#[must_use]
pub fn unique_violation(err: &DbErr) -> Option<String> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => Some(message),
        _ => None,
    }
}

/// Whether `err` is a uniqueness-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    unique_violation(err).is_some()
}
