#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for referral-ledger integration tests

use std::sync::Arc;

use ledger_db::{ConnectOpts, DbHandle};
use referral_ledger::ReferralLedgerClient;
use referral_ledger::ReferralLedgerConfig;
use referral_ledger::ReferralLedgerModule;
use referral_ledger::domain::codes::TokenGenerator;
use referral_ledger_sdk::{AdminRole, AdminUser, NewUser, User, UserProfile};

/// Fresh in-memory database with the schema applied.
pub async fn inmem_db() -> DbHandle {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("Failed to connect to in-memory database");
    ReferralLedgerModule::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn create_client() -> Arc<dyn ReferralLedgerClient> {
    create_client_with_config(ReferralLedgerConfig::default()).await
}

pub async fn create_client_with_config(config: ReferralLedgerConfig) -> Arc<dyn ReferralLedgerClient> {
    let db = inmem_db().await;
    ReferralLedgerModule::init(&db, &config)
        .expect("Failed to init module")
        .client()
}

pub async fn create_client_with_tokens(
    config: ReferralLedgerConfig,
    tokens: Arc<dyn TokenGenerator>,
) -> Arc<dyn ReferralLedgerClient> {
    let db = inmem_db().await;
    ReferralLedgerModule::init_with_tokens(&db, &config, tokens)
        .expect("Failed to init module")
        .client()
}

pub fn profile(username: &str) -> UserProfile {
    UserProfile {
        username: Some(username.to_owned()),
        first_name: Some(username.to_uppercase()),
        last_name: None,
    }
}

pub async fn seed_user(client: &Arc<dyn ReferralLedgerClient>, telegram_id: i64) -> User {
    client
        .create_user(NewUser::new(telegram_id, profile(&format!("user{telegram_id}"))))
        .await
        .expect("Failed to seed user")
}

/// Bootstrap a super admin through the unauthenticated path.
pub async fn seed_super_admin(client: &Arc<dyn ReferralLedgerClient>) -> AdminUser {
    client
        .create_admin(None, 900_001, AdminRole::SuperAdmin)
        .await
        .expect("Failed to bootstrap super admin")
}

pub async fn seed_admin(
    client: &Arc<dyn ReferralLedgerClient>,
    telegram_id: i64,
    role: AdminRole,
) -> AdminUser {
    client
        .create_admin(None, telegram_id, role)
        .await
        .expect("Failed to seed admin")
}
