#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Optimistic-concurrency retries on reward balances and settings, driven by
//! repositories that lose a configurable number of compare-and-swap races.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger::domain::codes::RandomTokens;
use referral_ledger::domain::error::DomainError;
use referral_ledger::domain::repos::{
    RewardsRepository, SettingsRepository, VersionedBalance, VersionedSettings,
};
use referral_ledger::domain::service::{AppServices, ServiceConfig};
use referral_ledger::infra::storage::{
    OrmAdminsRepository, OrmReferralsRepository, OrmRewardsRepository, OrmSettingsRepository,
    OrmUsersRepository,
};
use referral_ledger_sdk::{
    LedgerEntry, NewUser, RewardBalance, SettingAudit, SettingsEntry, UserId,
};
use rust_decimal::Decimal;
use serde_json::json;

/// Reports a lost race for the first `losses` balance updates.
struct RacingRewardsRepository {
    inner: OrmRewardsRepository,
    losses: AtomicU32,
}

impl RacingRewardsRepository {
    fn new(losses: u32) -> Self {
        Self {
            inner: OrmRewardsRepository::new(),
            losses: AtomicU32::new(losses),
        }
    }
}

#[async_trait]
impl RewardsRepository for RacingRewardsRepository {
    async fn get_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<VersionedBalance>, DomainError> {
        self.inner.get_balance(conn, user_id).await
    }

    async fn insert_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        row: &VersionedBalance,
    ) -> Result<(), DomainError> {
        self.inner.insert_balance(conn, row).await
    }

    async fn update_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        expected_version: i64,
        balance: &RewardBalance,
    ) -> Result<bool, DomainError> {
        let lost = self
            .losses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Ok(false);
        }
        self.inner.update_balance(conn, expected_version, balance).await
    }

    async fn append_entry<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        entry: &LedgerEntry,
    ) -> Result<(), DomainError> {
        self.inner.append_entry(conn, entry).await
    }

    async fn list_entries<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        self.inner.list_entries(conn, user_id, limit).await
    }
}

type RacingServices = AppServices<
    OrmUsersRepository,
    OrmReferralsRepository,
    RacingRewardsRepository,
    OrmSettingsRepository,
    OrmAdminsRepository,
>;

async fn setup(losses: u32, max_write_retries: u32) -> RacingServices {
    let db = common::inmem_db().await;
    AppServices::with_tokens(
        (
            OrmUsersRepository::new(),
            OrmReferralsRepository::new(),
            RacingRewardsRepository::new(losses),
            OrmSettingsRepository::new(),
            OrmAdminsRepository::new(),
        ),
        db.db_conn(),
        ServiceConfig {
            max_write_retries,
            ..ServiceConfig::default()
        },
        Arc::new(RandomTokens),
    )
}

async fn seed(services: &RacingServices) -> UserId {
    services
        .identity
        .create_user(NewUser::new(1, common::profile("racer")))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_lost_races_are_retried() {
    let services = setup(3, 8).await;
    let user_id = seed(&services).await;
    services.rewards.credit(user_id, Decimal::ONE, None).await.unwrap();

    let balance = services
        .rewards
        .credit(user_id, Decimal::TWO, None)
        .await
        .unwrap();

    assert_eq!(balance.total_unpaid, Decimal::from(3));
    let entries = services.rewards.list_ledger_entries(user_id, None).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_persistent_contention_surfaces_concurrent_modification() {
    let services = setup(u32::MAX, 4).await;
    let user_id = seed(&services).await;
    services.rewards.credit(user_id, Decimal::ONE, None).await.unwrap();

    let err = services
        .rewards
        .settle(user_id, Decimal::ONE, None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::ConcurrentModification {
            resource: "reward_wallet_balances".to_owned()
        }
    );
    let balance = services.rewards.get_balance(user_id).await.unwrap();
    assert_eq!(balance.total_unpaid, Decimal::ONE);
    assert_eq!(balance.total_paid, Decimal::ZERO);
    assert_eq!(
        services.rewards.list_ledger_entries(user_id, None).await.unwrap().len(),
        1
    );
}

/// Settings repository whose races are armed by the test through shared flags.
struct RacingSettingsRepository {
    inner: OrmSettingsRepository,
    /// Number of upcoming swaps reported as lost.
    losses: Arc<AtomicU32>,
    /// Next lookup misses a namespace another writer already created.
    hide_next_read: Arc<AtomicBool>,
}

#[async_trait]
impl SettingsRepository for RacingSettingsRepository {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        namespace: &str,
    ) -> Result<Option<VersionedSettings>, DomainError> {
        if self.hide_next_read.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get(conn, namespace).await
    }

    async fn insert<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        entry: &SettingsEntry,
    ) -> Result<(), DomainError> {
        self.inner.insert(conn, entry).await
    }

    async fn compare_and_swap<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        expected_version: i64,
        entry: &SettingsEntry,
    ) -> Result<bool, DomainError> {
        let lost = self
            .losses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Ok(false);
        }
        self.inner.compare_and_swap(conn, expected_version, entry).await
    }

    async fn append_audit<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        audit: &SettingAudit,
    ) -> Result<(), DomainError> {
        self.inner.append_audit(conn, audit).await
    }

    async fn list_audit<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        namespace: Option<&str>,
        limit: u64,
    ) -> Result<Vec<SettingAudit>, DomainError> {
        self.inner.list_audit(conn, namespace, limit).await
    }

    async fn list_namespaces<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
    ) -> Result<Vec<String>, DomainError> {
        self.inner.list_namespaces(conn).await
    }
}

type RacingSettingsServices = AppServices<
    OrmUsersRepository,
    OrmReferralsRepository,
    OrmRewardsRepository,
    RacingSettingsRepository,
    OrmAdminsRepository,
>;

struct SettingsRace {
    services: RacingSettingsServices,
    losses: Arc<AtomicU32>,
    hide_next_read: Arc<AtomicBool>,
}

/// Settings services with `fees = {"rate": 1}` already written and one audit row.
async fn setup_settings(max_write_retries: u32) -> SettingsRace {
    let db = common::inmem_db().await;
    let losses = Arc::new(AtomicU32::new(0));
    let hide_next_read = Arc::new(AtomicBool::new(false));
    let services = AppServices::with_tokens(
        (
            OrmUsersRepository::new(),
            OrmReferralsRepository::new(),
            OrmRewardsRepository::new(),
            RacingSettingsRepository {
                inner: OrmSettingsRepository::new(),
                losses: Arc::clone(&losses),
                hide_next_read: Arc::clone(&hide_next_read),
            },
            OrmAdminsRepository::new(),
        ),
        db.db_conn(),
        ServiceConfig {
            max_write_retries,
            ..ServiceConfig::default()
        },
        Arc::new(RandomTokens),
    );
    services
        .settings
        .put_settings("fees", json!({ "rate": 1 }), None)
        .await
        .unwrap();
    SettingsRace {
        services,
        losses,
        hide_next_read,
    }
}

#[tokio::test]
async fn test_lost_settings_swaps_are_retried_and_audited_once() {
    let race = setup_settings(8).await;
    race.losses.store(2, Ordering::SeqCst);

    race.services
        .settings
        .put_settings("fees", json!({ "rate": 2 }), None)
        .await
        .unwrap();

    let settings = &race.services.settings;
    assert_eq!(settings.get_settings("fees").await.unwrap(), json!({ "rate": 2 }));
    let audit = settings.list_audit(Some("fees"), None).await.unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].old_value, Some(json!({ "rate": 1 })));
    assert_eq!(audit[0].new_value, Some(json!({ "rate": 2 })));
}

#[tokio::test]
async fn test_namespace_creation_race_retries_as_update() {
    let race = setup_settings(8).await;
    race.hide_next_read.store(true, Ordering::SeqCst);

    race.services
        .settings
        .put_settings("fees", json!({ "rate": 3 }), None)
        .await
        .unwrap();

    let settings = &race.services.settings;
    assert_eq!(settings.get_settings("fees").await.unwrap(), json!({ "rate": 3 }));
    let audit = settings.list_audit(Some("fees"), None).await.unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].old_value, Some(json!({ "rate": 1 })));
    assert_eq!(audit[1].old_value, None);
}

#[tokio::test]
async fn test_persistent_settings_contention_changes_nothing() {
    let race = setup_settings(4).await;
    race.losses.store(u32::MAX, Ordering::SeqCst);

    let err = race
        .services
        .settings
        .put_settings("fees", json!({ "rate": 9 }), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::ConcurrentModification {
            resource: "admin_settings:fees".to_owned()
        }
    );
    let settings = &race.services.settings;
    assert_eq!(settings.get_settings("fees").await.unwrap(), json!({ "rate": 1 }));
    assert_eq!(settings.list_audit(Some("fees"), None).await.unwrap().len(), 1);
}
