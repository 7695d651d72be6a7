use std::sync::Arc;

use ledger_db::DbConn;
use referral_ledger_sdk::{
    LinkPolicy, ReferralAccount, ReferralAccountId, ReferralLink, ReferralLinkId, UserId,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::ServiceConfig;
use crate::domain::codes::{TokenGenerator, allocate_unique};
use crate::domain::error::DomainError;
use crate::domain::repos::{ReferralsRepository, UsersRepository};

/// Referral accounts and the invite links they own.
pub struct ReferralsService<R: ReferralsRepository, U: UsersRepository> {
    db: DbConn,
    repo: Arc<R>,
    users_repo: Arc<U>,
    tokens: Arc<dyn TokenGenerator>,
    config: Arc<ServiceConfig>,
}

impl<R, U> ReferralsService<R, U>
where
    R: ReferralsRepository + 'static,
    U: UsersRepository + 'static,
{
    pub fn new(
        db: DbConn,
        repo: Arc<R>,
        users_repo: Arc<U>,
        tokens: Arc<dyn TokenGenerator>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            db,
            repo,
            users_repo,
            tokens,
            config,
        }
    }

    /// Return the user's account, creating it with a fresh referral code if needed.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn ensure_referral_account(
        &self,
        user_id: UserId,
    ) -> Result<ReferralAccount, DomainError> {
        let conn = self.db.conn();
        if let Some(existing) = self.repo.find_account_by_user(conn, user_id).await? {
            return Ok(existing);
        }

        if self.users_repo.get(conn, user_id).await?.is_none() {
            return Err(DomainError::user_not_found(user_id));
        }

        let created = allocate_unique(
            self.tokens.as_ref(),
            self.config.code_length,
            self.config.max_code_allocation_attempts,
            "referral_code",
            |code| {
                let now = OffsetDateTime::now_utc();
                self.repo.create_account(
                    conn,
                    ReferralAccount {
                        id: Uuid::now_v7(),
                        user_id,
                        referral_code: code,
                        rewards_wallet_id: None,
                        last_link_update_at: None,
                        created_at: now,
                        updated_at: now,
                    },
                )
            },
        )
        .await;

        match created {
            Ok(account) => {
                info!(account_id = %account.id, "Referral account created");
                Ok(account)
            }
            // A concurrent caller created it first; return theirs.
            Err(e) if e.is_unique_violation_on("user_id") => {
                debug!("Lost account creation race, re-reading");
                self.repo
                    .find_account_by_user(conn, user_id)
                    .await?
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn get_referral_account(
        &self,
        id: ReferralAccountId,
    ) -> Result<ReferralAccount, DomainError> {
        self.repo
            .get_account(self.db.conn(), id)
            .await?
            .ok_or_else(|| DomainError::account_not_found(id))
    }

    pub async fn find_referral_account_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        self.repo.find_account_by_user(self.db.conn(), user_id).await
    }

    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn set_rewards_wallet(
        &self,
        id: ReferralAccountId,
        wallet_id: Option<Uuid>,
    ) -> Result<ReferralAccount, DomainError> {
        let conn = self.db.conn();
        let now = OffsetDateTime::now_utc();
        if !self.repo.set_rewards_wallet(conn, id, wallet_id, now).await? {
            return Err(DomainError::account_not_found(id));
        }
        info!(wallet_id = ?wallet_id, "Rewards wallet reassigned");
        self.get_referral_account(id).await
    }

    /// Issue a new active invite link.
    ///
    /// Under [`LinkPolicy::Exclusive`] every other active link of the account is
    /// deactivated in the same transaction.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn issue_link(
        &self,
        account_id: ReferralAccountId,
        policy: Option<LinkPolicy>,
    ) -> Result<ReferralLink, DomainError> {
        let policy = policy.unwrap_or(self.config.default_link_policy);
        // Fail fast before allocating a code.
        self.get_referral_account(account_id).await?;

        let link = allocate_unique(
            self.tokens.as_ref(),
            self.config.invite_code_length,
            self.config.max_code_allocation_attempts,
            "invite_code",
            |invite_code| {
                let repo = Arc::clone(&self.repo);
                self.db
                    .in_transaction_mapped(DomainError::storage_infra, move |tx| {
                        Box::pin(async move {
                            let now = OffsetDateTime::now_utc();
                            if policy == LinkPolicy::Exclusive {
                                let n = repo.deactivate_account_links(tx, account_id).await?;
                                debug!(deactivated = n, "Deactivated previous links");
                            }
                            let link = repo
                                .create_link(
                                    tx,
                                    ReferralLink {
                                        id: Uuid::now_v7(),
                                        referral_account_id: account_id,
                                        invite_code,
                                        is_active: true,
                                        created_at: now,
                                    },
                                )
                                .await?;

                            if !repo.touch_link_update(tx, account_id, now).await? {
                                return Err(DomainError::account_not_found(account_id));
                            }
                            Ok(link)
                        })
                    })
            },
        )
        .await?;

        info!(link_id = %link.id, policy = policy.as_str(), "Referral link issued");
        Ok(link)
    }

    /// Idempotent: deactivating an inactive link returns it unchanged.
    #[instrument(skip(self), fields(link_id = %id))]
    pub async fn deactivate_link(&self, id: ReferralLinkId) -> Result<ReferralLink, DomainError> {
        let conn = self.db.conn();
        let mut link = self
            .repo
            .get_link(conn, id)
            .await?
            .ok_or(DomainError::LinkNotFound { id })?;

        if link.is_active {
            if !self.repo.set_link_active(conn, id, false).await? {
                return Err(DomainError::LinkNotFound { id });
            }
            link.is_active = false;
            info!("Referral link deactivated");
        }
        Ok(link)
    }

    /// Resolve an invite code to the owning account. Inactive links never resolve.
    #[instrument(skip(self))]
    pub async fn resolve_link(&self, invite_code: &str) -> Result<ReferralAccount, DomainError> {
        let conn = self.db.conn();
        let unresolved = || DomainError::LinkInactiveOrUnknown {
            code: invite_code.to_owned(),
        };

        let link = self
            .repo
            .find_link_by_code(conn, invite_code)
            .await?
            .filter(|link| link.is_active)
            .ok_or_else(unresolved)?;

        self.repo
            .get_account(conn, link.referral_account_id)
            .await?
            .ok_or_else(unresolved)
    }

    pub async fn list_links(
        &self,
        account_id: ReferralAccountId,
    ) -> Result<Vec<ReferralLink>, DomainError> {
        let conn = self.db.conn();
        if self.repo.get_account(conn, account_id).await?.is_none() {
            return Err(DomainError::account_not_found(account_id));
        }
        self.repo.list_links(conn, account_id).await
    }
}
