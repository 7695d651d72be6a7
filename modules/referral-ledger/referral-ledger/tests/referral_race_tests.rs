#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Referral graph operations interleaved with concurrent writers, driven by a
//! repository that injects the competing write at a chosen point.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger::domain::codes::RandomTokens;
use referral_ledger::domain::error::DomainError;
use referral_ledger::domain::repos::ReferralsRepository;
use referral_ledger::domain::service::{AppServices, ServiceConfig};
use referral_ledger::infra::storage::{
    OrmAdminsRepository, OrmReferralsRepository, OrmRewardsRepository, OrmSettingsRepository,
    OrmUsersRepository,
};
use referral_ledger_sdk::{
    LinkPolicy, NewUser, ReferralAccount, ReferralAccountId, ReferralLink, ReferralLinkId,
    UserId,
};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Copy)]
enum Interleave {
    /// Another caller reassigns the wallet while a link is being issued.
    WalletChangeDuringIssue(Uuid),
    /// Another caller creates the account between the lookup and the insert.
    AccountCreatedAfterLookup,
    /// The link row disappears before it is deactivated.
    LinkRemovedBeforeUpdate,
}

struct InterleavingReferralsRepository {
    inner: OrmReferralsRepository,
    mode: Interleave,
    fired: AtomicBool,
}

impl InterleavingReferralsRepository {
    fn new(mode: Interleave) -> Self {
        Self {
            inner: OrmReferralsRepository::new(),
            mode,
            fired: AtomicBool::new(false),
        }
    }

    fn fire_once(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferralsRepository for InterleavingReferralsRepository {
    async fn get_account<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        self.inner.get_account(conn, id).await
    }

    async fn find_account_by_user<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        if matches!(self.mode, Interleave::AccountCreatedAfterLookup) && self.fire_once() {
            let now = OffsetDateTime::now_utc();
            self.inner
                .create_account(
                    conn,
                    ReferralAccount {
                        id: Uuid::now_v7(),
                        user_id,
                        referral_code: "WINNER01".to_owned(),
                        rewards_wallet_id: None,
                        last_link_update_at: None,
                        created_at: now,
                        updated_at: now,
                    },
                )
                .await?;
            return Ok(None);
        }
        self.inner.find_account_by_user(conn, user_id).await
    }

    async fn create_account<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account: ReferralAccount,
    ) -> Result<ReferralAccount, DomainError> {
        self.inner.create_account(conn, account).await
    }

    async fn set_rewards_wallet<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
        wallet_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<bool, DomainError> {
        self.inner.set_rewards_wallet(conn, id, wallet_id, now).await
    }

    async fn touch_link_update<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
        now: OffsetDateTime,
    ) -> Result<bool, DomainError> {
        self.inner.touch_link_update(conn, id, now).await
    }

    async fn get_link<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralLinkId,
    ) -> Result<Option<ReferralLink>, DomainError> {
        self.inner.get_link(conn, id).await
    }

    async fn find_link_by_code<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        invite_code: &str,
    ) -> Result<Option<ReferralLink>, DomainError> {
        self.inner.find_link_by_code(conn, invite_code).await
    }

    async fn create_link<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        link: ReferralLink,
    ) -> Result<ReferralLink, DomainError> {
        if let Interleave::WalletChangeDuringIssue(wallet) = self.mode {
            self.inner
                .set_rewards_wallet(
                    conn,
                    link.referral_account_id,
                    Some(wallet),
                    OffsetDateTime::now_utc(),
                )
                .await?;
        }
        self.inner.create_link(conn, link).await
    }

    async fn set_link_active<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralLinkId,
        active: bool,
    ) -> Result<bool, DomainError> {
        if matches!(self.mode, Interleave::LinkRemovedBeforeUpdate) {
            return Ok(false);
        }
        self.inner.set_link_active(conn, id, active).await
    }

    async fn deactivate_account_links<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account_id: ReferralAccountId,
    ) -> Result<u64, DomainError> {
        self.inner.deactivate_account_links(conn, account_id).await
    }

    async fn list_links<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account_id: ReferralAccountId,
    ) -> Result<Vec<ReferralLink>, DomainError> {
        self.inner.list_links(conn, account_id).await
    }
}

type InterleavedServices = AppServices<
    OrmUsersRepository,
    InterleavingReferralsRepository,
    OrmRewardsRepository,
    OrmSettingsRepository,
    OrmAdminsRepository,
>;

async fn setup(mode: Interleave) -> InterleavedServices {
    let db = common::inmem_db().await;
    AppServices::with_tokens(
        (
            OrmUsersRepository::new(),
            InterleavingReferralsRepository::new(mode),
            OrmRewardsRepository::new(),
            OrmSettingsRepository::new(),
            OrmAdminsRepository::new(),
        ),
        db.db_conn(),
        ServiceConfig::default(),
        Arc::new(RandomTokens),
    )
}

async fn seed(services: &InterleavedServices) -> UserId {
    services
        .identity
        .create_user(NewUser::new(7, common::profile("owner")))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_issue_link_keeps_concurrent_wallet_change() {
    let wallet = Uuid::from_u128(0xABCD);
    let services = setup(Interleave::WalletChangeDuringIssue(wallet)).await;
    let user_id = seed(&services).await;
    let account = services.referrals.ensure_referral_account(user_id).await.unwrap();
    assert_eq!(account.rewards_wallet_id, None);

    services
        .referrals
        .issue_link(account.id, Some(LinkPolicy::Exclusive))
        .await
        .unwrap();

    let reloaded = services.referrals.get_referral_account(account.id).await.unwrap();
    assert_eq!(reloaded.rewards_wallet_id, Some(wallet));
    assert!(reloaded.last_link_update_at.is_some());
}

#[tokio::test]
async fn test_lost_account_creation_race_returns_winner() {
    let services = setup(Interleave::AccountCreatedAfterLookup).await;
    let user_id = seed(&services).await;

    let account = services.referrals.ensure_referral_account(user_id).await.unwrap();

    assert_eq!(account.referral_code, "WINNER01");
    let again = services.referrals.ensure_referral_account(user_id).await.unwrap();
    assert_eq!(again.id, account.id);
    let by_user = services
        .referrals
        .find_referral_account_by_user(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_user.id, account.id);
}

#[tokio::test]
async fn test_deactivating_a_vanished_link_is_not_found() {
    let services = setup(Interleave::LinkRemovedBeforeUpdate).await;
    let user_id = seed(&services).await;
    let account = services.referrals.ensure_referral_account(user_id).await.unwrap();
    let link = services.referrals.issue_link(account.id, None).await.unwrap();

    let err = services.referrals.deactivate_link(link.id).await.unwrap_err();

    assert_eq!(err, DomainError::LinkNotFound { id: link.id });
}
