//! Database handle for the referral ledger.
//!
//! This crate owns the process-wide store handle and the small set of helpers every
//! repository relies on:
//! - [`DbHandle`] - pooled `SeaORM` connection built from a DSN and typed [`ConnectOpts`]
//! - [`DbConn`] - cheaply cloneable handle passed to services, with typed transactions
//! - [`TxError`] / [`InfraError`] - keep domain errors apart from infrastructure failures
//! - [`unique_violation`] - classify uniqueness-constraint failures for retrying allocators
//!
//! # Example
//! ```rust,no_run
//! use ledger_db::{ConnectOpts, DbHandle};
//!
//! # async fn example() -> Result<(), ledger_db::DbError> {
//! let handle = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//! let conn = handle.db_conn();
//! # let _ = conn;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbBackend};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use sea_orm::ConnectionTrait as DbConnTrait;

mod conn;
mod constraint;
mod tx_error;

pub use conn::DbConn;
pub use constraint::{is_unique_violation, unique_violation};
pub use tx_error::{InfraError, TxError};

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

impl DbEngine {
    /// Detect the engine from the DSN scheme.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` for unsupported schemes.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let scheme = dsn.split(':').next().unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(DbError::UnknownDsn(redact_credentials_in_dsn(Some(dsn)))),
        }
    }
}

impl From<DbBackend> for DbEngine {
    fn from(backend: DbBackend) -> Self {
        match backend {
            DbBackend::Postgres => Self::Postgres,
            DbBackend::MySql => Self::MySql,
            DbBackend::Sqlite => Self::Sqlite,
        }
    }
}

/// Connection pool options.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOpts {
    /// Maximum number of pooled connections.
    pub max_conns: u32,
    /// Minimum number of idle connections kept open.
    pub min_conns: u32,
    /// How long to wait for a free connection before failing.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
    /// Forward every SQL statement to the `sqlx` logger.
    pub sqlx_logging: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: 10,
            min_conns: 0,
            acquire_timeout: Duration::from_secs(30),
            sqlx_logging: false,
        }
    }
}

/// Main handle.
#[derive(Clone, Debug)]
pub struct DbHandle {
    engine: DbEngine,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Connect and build a handle.
    ///
    /// In-memory `SQLite` databases are private to a single connection, so the pool is
    /// pinned to exactly one connection for them.
    ///
    /// # Errors
    /// Returns an error if the DSN is unsupported, the options are inconsistent, or the
    /// connection cannot be established.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = DbEngine::from_dsn(dsn)?;

        if opts.max_conns == 0 {
            return Err(DbError::InvalidConfig("max_conns must be at least 1".to_owned()));
        }
        if opts.min_conns > opts.max_conns {
            return Err(DbError::InvalidConfig(format!(
                "min_conns ({}) exceeds max_conns ({})",
                opts.min_conns, opts.max_conns
            )));
        }

        // The database lives only as long as its single connection.
        let (max_conns, min_conns) = if engine == DbEngine::Sqlite && is_memory_dsn(dsn) {
            (1, 1)
        } else {
            (opts.max_conns, opts.min_conns)
        };

        let mut sea_opts = ConnectOptions::new(dsn.to_owned());
        sea_opts
            .max_connections(max_conns)
            .min_connections(min_conns)
            .acquire_timeout(opts.acquire_timeout)
            .sqlx_logging(opts.sqlx_logging);

        let redacted = redact_credentials_in_dsn(Some(dsn));
        tracing::debug!(dsn = %redacted, max_conns, "Connecting to database");

        let sea = Database::connect(sea_opts).await?;

        tracing::info!(dsn = %redacted, engine = ?engine, "Database connection established");

        Ok(Self {
            engine,
            dsn: dsn.to_owned(),
            sea,
        })
    }

    /// Wrap an already established `SeaORM` connection.
    #[must_use]
    pub fn from_connection(sea: DatabaseConnection) -> Self {
        let engine = sea.get_database_backend().into();
        Self {
            engine,
            dsn: String::new(),
            sea,
        }
    }

    /// Get the backend.
    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Get the DSN with credentials redacted.
    #[must_use]
    pub fn dsn(&self) -> String {
        redact_credentials_in_dsn(Some(&self.dsn))
    }

    /// Raw `SeaORM` connection, for migrations.
    #[must_use]
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    /// Handle passed to repositories and services.
    #[must_use]
    pub fn db_conn(&self) -> DbConn {
        DbConn::new(self.sea.clone())
    }

    /// Close the pool.
    ///
    /// # Errors
    /// Returns an error if the driver fails to close the pool cleanly.
    pub async fn close(self) -> Result<()> {
        self.sea.close().await?;
        Ok(())
    }
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Redact the password in a DSN so it can be logged or printed.
#[must_use]
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => {
            if let Ok(mut parsed) = url::Url::parse(dsn) {
                if parsed.password().is_some() {
                    _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            } else {
                "***".to_owned()
            }
        }
        Some(dsn) => dsn.to_owned(),
        None => "none".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_is_detected_from_scheme() {
        assert_eq!(DbEngine::from_dsn("sqlite::memory:").ok(), Some(DbEngine::Sqlite));
        assert_eq!(
            DbEngine::from_dsn("postgres://u:p@localhost/db").ok(),
            Some(DbEngine::Postgres)
        );
        assert_eq!(
            DbEngine::from_dsn("postgresql://localhost/db").ok(),
            Some(DbEngine::Postgres)
        );
        assert_eq!(DbEngine::from_dsn("mysql://localhost/db").ok(), Some(DbEngine::MySql));
        assert!(matches!(
            DbEngine::from_dsn("redis://localhost"),
            Err(DbError::UnknownDsn(_))
        ));
    }

    #[test]
    fn password_is_redacted() {
        let redacted = redact_credentials_in_dsn(Some("postgres://app:secret@db:5432/ledger"));
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("app"));
        assert!(redacted.contains("***"));
    }

    #[test]
    fn dsn_without_credentials_is_unchanged() {
        assert_eq!(
            redact_credentials_in_dsn(Some("sqlite://ledger.db")),
            "sqlite://ledger.db"
        );
        assert_eq!(redact_credentials_in_dsn(None), "none");
    }

    #[test]
    fn memory_dsn_detection() {
        assert!(is_memory_dsn("sqlite::memory:"));
        assert!(is_memory_dsn("sqlite://file:ledger?mode=memory&cache=shared"));
        assert!(!is_memory_dsn("sqlite://ledger.db"));
    }
}
