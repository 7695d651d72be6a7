//! Referral Ledger SDK
//!
//! This crate provides the public contract of the `referral-ledger` module:
//! - [`ReferralLedgerClient`] trait
//! - Model types for users, referral accounts and links, reward balances, admins,
//!   and audited settings
//! - Error type ([`LedgerError`])
//!
//! ## Usage
//!
//! ```ignore
//! use referral_ledger_sdk::{NewUser, ReferralLedgerClient, UserProfile};
//!
//! let user = client
//!     .create_user(NewUser::new(42, UserProfile::default()))
//!     .await?;
//! client.credit(user.id, amount, Some("swap-fee".to_owned())).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod errors;
pub mod models;

pub use api::ReferralLedgerClient;
pub use errors::LedgerError;
pub use models::{
    AdminId, AdminRole, AdminUser, LedgerEntry, LedgerEntryKind, LinkPolicy, NewUser,
    ReferralAccount, ReferralAccountId, ReferralLink, ReferralLinkId, ReferralSource,
    RewardBalance, SettingAudit, SettingsEntry, TelegramId, User, UserId, UserProfile,
};
