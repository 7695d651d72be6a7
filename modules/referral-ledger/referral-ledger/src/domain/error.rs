use ledger_db::InfraError;
use referral_ledger_sdk::{AdminRole, LedgerError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Platform identity {telegram_id} is already registered")]
    DuplicateIdentity { telegram_id: i64 },

    #[error("Unknown referral code '{code}'")]
    UnknownReferralCode { code: String },

    #[error("Could not allocate a unique code after {attempts} attempts")]
    CodeAllocationExhausted { attempts: u32 },

    #[error("Referral link not found: {id}")]
    LinkNotFound { id: Uuid },

    #[error("Invite code '{code}' is inactive or unknown")]
    LinkInactiveOrUnknown { code: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("Insufficient unpaid balance: requested {requested}, available {available}")]
    InsufficientUnpaidBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Settings namespace '{namespace}' not found")]
    SettingsNotFound { namespace: String },

    #[error("Admin {admin_id} lacks role {required}")]
    Unauthorized { admin_id: Uuid, required: AdminRole },

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Referral account not found: {id}")]
    AccountNotFound { id: Uuid },

    #[error("Admin not found: {id}")]
    AdminNotFound { id: Uuid },

    #[error("Referrer is already set for user {user_id}")]
    ReferrerAlreadySet { user_id: Uuid },

    #[error("Referral would create a cycle for user {user_id}")]
    ReferralCycle { user_id: Uuid },

    /// A versioned write lost the race; the caller re-reads and retries.
    #[error("Stale write on {resource}")]
    StaleWrite { resource: String },

    #[error("Concurrent modification of {resource}")]
    ConcurrentModification { resource: String },

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn user_not_found(id: Uuid) -> Self {
        Self::UserNotFound { id }
    }

    pub fn account_not_found(id: Uuid) -> Self {
        Self::AccountNotFound { id }
    }

    pub fn admin_not_found(id: Uuid) -> Self {
        Self::AdminNotFound { id }
    }

    pub fn settings_not_found(namespace: impl Into<String>) -> Self {
        Self::SettingsNotFound {
            namespace: namespace.into(),
        }
    }

    pub fn stale_write(resource: impl Into<String>) -> Self {
        Self::StaleWrite {
            resource: resource.into(),
        }
    }

    pub fn concurrent_modification(resource: impl Into<String>) -> Self {
        Self::ConcurrentModification {
            resource: resource.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Map a transaction begin/commit failure.
    #[allow(clippy::needless_pass_by_value)]
    pub fn storage_infra(e: InfraError) -> Self {
        Self::database(e.message())
    }

    /// True when this is a unique violation on a constraint naming `column`.
    #[must_use]
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint.contains(column))
    }
}

/// Convert domain errors to SDK errors for public API consumption.
impl From<DomainError> for LedgerError {
    fn from(domain_error: DomainError) -> Self {
        match domain_error {
            DomainError::DuplicateIdentity { telegram_id } => {
                LedgerError::duplicate_identity(telegram_id)
            }
            DomainError::UnknownReferralCode { code } => LedgerError::unknown_referral_code(code),
            DomainError::CodeAllocationExhausted { attempts } => {
                LedgerError::CodeAllocationExhausted { attempts }
            }
            DomainError::LinkNotFound { id } => LedgerError::LinkNotFound { id },
            DomainError::LinkInactiveOrUnknown { code } => {
                LedgerError::link_inactive_or_unknown(code)
            }
            DomainError::InvalidAmount { amount } => LedgerError::InvalidAmount { amount },
            DomainError::InsufficientUnpaidBalance {
                requested,
                available,
            } => LedgerError::InsufficientUnpaidBalance {
                requested,
                available,
            },
            DomainError::SettingsNotFound { namespace } => LedgerError::not_found(namespace),
            DomainError::Unauthorized { .. } => LedgerError::Unauthorized,
            DomainError::UserNotFound { id } => LedgerError::UserNotFound { id },
            DomainError::AccountNotFound { id } => LedgerError::AccountNotFound { id },
            DomainError::AdminNotFound { id } => LedgerError::AdminNotFound { id },
            DomainError::ReferrerAlreadySet { user_id } => {
                LedgerError::ReferrerAlreadySet { user_id }
            }
            DomainError::ReferralCycle { user_id } => LedgerError::ReferralCycle { user_id },
            DomainError::StaleWrite { resource }
            | DomainError::ConcurrentModification { resource } => {
                LedgerError::concurrent_modification(resource)
            }
            DomainError::Validation { field, message } => {
                LedgerError::validation(format!("{field}: {message}"))
            }
            DomainError::UniqueViolation { constraint } => {
                error!(constraint = %constraint, "Unhandled unique constraint violation");
                LedgerError::storage_unavailable()
            }
            DomainError::Database { message } => {
                error!(error = %message, "Storage failure");
                LedgerError::storage_unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_matches_on_column_name() {
        let sqlite = DomainError::UniqueViolation {
            constraint: "UNIQUE constraint failed: users.referral_code".to_owned(),
        };
        let pg = DomainError::UniqueViolation {
            constraint: "duplicate key value violates unique constraint \"ux_users_telegram_id\""
                .to_owned(),
        };
        assert!(sqlite.is_unique_violation_on("referral_code"));
        assert!(!sqlite.is_unique_violation_on("telegram_id"));
        assert!(pg.is_unique_violation_on("telegram_id"));
        assert!(!DomainError::database("boom").is_unique_violation_on("telegram_id"));
    }

    #[test]
    fn storage_failures_are_opaque_to_consumers() {
        let err: LedgerError = DomainError::database("connection reset by peer").into();
        assert_eq!(err, LedgerError::StorageUnavailable);
    }

    #[test]
    fn authorization_details_are_not_leaked() {
        let err: LedgerError = DomainError::Unauthorized {
            admin_id: Uuid::nil(),
            required: AdminRole::SuperAdmin,
        }
        .into();
        assert_eq!(err, LedgerError::Unauthorized);
    }

    #[test]
    fn exhausted_retries_surface_as_concurrent_modification() {
        let err: LedgerError = DomainError::stale_write("reward_wallet_balances").into();
        assert_eq!(
            err,
            LedgerError::concurrent_modification("reward_wallet_balances")
        );
    }
}
