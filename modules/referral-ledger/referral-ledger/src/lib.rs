//! Referral ledger module.
//!
//! Persistence and business rules for a referral and rewards program:
//! platform identities with self-service referral codes, referral accounts with
//! invite links, a paid/unpaid reward ledger, and audited admin settings gated by
//! operator roles.
//!
//! ## Usage
//!
//! ```ignore
//! use referral_ledger::ReferralLedgerModule;
//! use referral_ledger_sdk::ReferralLedgerClient;
//!
//! let module = ReferralLedgerModule::init(db, config).await?;
//! let client = module.client();
//! let user = client.create_user(NewUser::new(42, UserProfile::default())).await?;
//! ```
//!
//! Consumers depend on [`referral_ledger_sdk::ReferralLedgerClient`]; everything in
//! this crate other than [`ReferralLedgerModule`] and [`ReferralLedgerConfig`] is
//! an implementation detail.

#![forbid(unsafe_code)]

// === PUBLIC API (from SDK) ===
pub use referral_ledger_sdk::{LedgerError, ReferralLedgerClient};

// === MODULE DEFINITION ===
pub mod config;
pub mod module;

pub use config::ReferralLedgerConfig;
pub use module::ReferralLedgerModule;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
#[doc(hidden)]
pub mod local_client;
