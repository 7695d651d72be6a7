//! Public error types for the referral-ledger module.
//!
//! These errors are safe to expose to other modules and consumers. Any error is a
//! hard failure of the requested operation: no partial mutation is ever applied.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::TelegramId;

/// Errors that can be returned by the `ReferralLedgerClient`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A record with this platform identity is already registered.
    #[error("Platform identity {telegram_id} is already registered")]
    DuplicateIdentity { telegram_id: TelegramId },

    #[error("Unknown referral code '{code}'")]
    UnknownReferralCode { code: String },

    /// Every attempt to allocate a unique token collided.
    #[error("Could not allocate a unique code after {attempts} attempts")]
    CodeAllocationExhausted { attempts: u32 },

    #[error("Referral link not found: {id}")]
    LinkNotFound { id: Uuid },

    #[error("Invite code '{code}' is inactive or unknown")]
    LinkInactiveOrUnknown { code: String },

    #[error("Invalid amount {amount}: must be greater than zero")]
    InvalidAmount { amount: Decimal },

    #[error("Insufficient unpaid balance: requested {requested}, available {available}")]
    InsufficientUnpaidBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Settings namespace not found.
    #[error("Settings namespace '{namespace}' not found")]
    NotFound { namespace: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Referral account not found: {id}")]
    AccountNotFound { id: Uuid },

    #[error("Admin not found: {id}")]
    AdminNotFound { id: Uuid },

    #[error("Referrer is already set for user {user_id}")]
    ReferrerAlreadySet { user_id: Uuid },

    /// Attributing the referral would make a user refer themself, directly or transitively.
    #[error("Referral would create a cycle for user {user_id}")]
    ReferralCycle { user_id: Uuid },

    /// Too many concurrent writers raced on the same record.
    #[error("Concurrent modification of {resource}")]
    ConcurrentModification { resource: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The store failed; callers decide on retry and backoff.
    #[error("Storage unavailable")]
    StorageUnavailable,
}

impl LedgerError {
    #[must_use]
    pub fn duplicate_identity(telegram_id: TelegramId) -> Self {
        Self::DuplicateIdentity { telegram_id }
    }

    pub fn unknown_referral_code(code: impl Into<String>) -> Self {
        Self::UnknownReferralCode { code: code.into() }
    }

    pub fn link_inactive_or_unknown(code: impl Into<String>) -> Self {
        Self::LinkInactiveOrUnknown { code: code.into() }
    }

    pub fn not_found(namespace: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: namespace.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn concurrent_modification(resource: impl Into<String>) -> Self {
        Self::ConcurrentModification {
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn storage_unavailable() -> Self {
        Self::StorageUnavailable
    }
}
