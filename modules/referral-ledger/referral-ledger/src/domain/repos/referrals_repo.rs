use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{
    ReferralAccount, ReferralAccountId, ReferralLink, ReferralLinkId, UserId,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Repository trait for referral accounts and their invite links.
#[async_trait]
pub trait ReferralsRepository: Send + Sync {
    async fn get_account<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
    ) -> Result<Option<ReferralAccount>, DomainError>;

    async fn find_account_by_user<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<ReferralAccount>, DomainError>;

    /// Insert an account. Conflicts on `user_id` or `referral_code` surface as
    /// `DomainError::UniqueViolation`.
    async fn create_account<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account: ReferralAccount,
    ) -> Result<ReferralAccount, DomainError>;

    /// Reassign the payout wallet. Returns `false` when the account is gone.
    async fn set_rewards_wallet<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
        wallet_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<bool, DomainError>;

    /// Stamp `last_link_update_at`. Returns `false` when the account is gone.
    async fn touch_link_update<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
        now: OffsetDateTime,
    ) -> Result<bool, DomainError>;

    async fn get_link<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralLinkId,
    ) -> Result<Option<ReferralLink>, DomainError>;

    async fn find_link_by_code<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        invite_code: &str,
    ) -> Result<Option<ReferralLink>, DomainError>;

    async fn create_link<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        link: ReferralLink,
    ) -> Result<ReferralLink, DomainError>;

    /// Returns `false` when the link is gone.
    async fn set_link_active<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralLinkId,
        active: bool,
    ) -> Result<bool, DomainError>;

    /// Deactivate every active link of an account. Returns the number deactivated.
    async fn deactivate_account_links<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account_id: ReferralAccountId,
    ) -> Result<u64, DomainError>;

    /// Links of an account, oldest first.
    async fn list_links<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account_id: ReferralAccountId,
    ) -> Result<Vec<ReferralLink>, DomainError>;
}
