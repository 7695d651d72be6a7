//! Errors surfaced by [`DbConn::in_transaction`](crate::DbConn::in_transaction).
//!
//! Domain errors raised inside a transaction callback travel back to the caller
//! untouched; only failures of the transaction machinery itself become [`InfraError`].

use sea_orm::DbErr;
use thiserror::Error;

/// Begin, commit or rollback failed. Carries the driver message only.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InfraError {
    message: String,
}

impl InfraError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DbErr> for InfraError {
    fn from(err: DbErr) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum TxError<E: std::fmt::Debug + std::fmt::Display> {
    /// Returned by the callback; the transaction was rolled back.
    #[error("{0}")]
    Domain(E),
    #[error("infrastructure error: {0}")]
    Infra(#[from] InfraError),
}

impl<E: std::fmt::Debug + std::fmt::Display> TxError<E> {
    /// Collapse into the domain error type, mapping infrastructure failures with
    /// `map_infra`.
    pub fn into_domain<F>(self, map_infra: F) -> E
    where
        F: FnOnce(InfraError) -> E,
    {
        match self {
            Self::Domain(e) => e,
            Self::Infra(infra) => map_infra(infra),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_domain_keeps_domain_errors() {
        let err: TxError<String> = TxError::Domain("insufficient".to_owned());
        assert_eq!(err.into_domain(|e| e.message().to_owned()), "insufficient");
    }

    #[test]
    fn into_domain_maps_infra_errors() {
        let err: TxError<String> = InfraError::new("commit failed").into();
        assert_eq!(
            err.into_domain(|e| format!("storage: {}", e.message())),
            "storage: commit failed"
        );
    }

    #[test]
    fn driver_errors_become_infra_errors() {
        let infra = InfraError::from(DbErr::Custom("pool timed out".to_owned()));
        assert!(infra.message().contains("pool timed out"));
        let err: TxError<String> = infra.into();
        assert!(err.to_string().starts_with("infrastructure error:"));
    }
}
