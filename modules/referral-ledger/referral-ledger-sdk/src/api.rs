//! `ReferralLedgerClient` trait definition.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::errors::LedgerError;
use crate::models::{
    AdminId, AdminRole, AdminUser, LedgerEntry, LinkPolicy, NewUser, ReferralAccount,
    ReferralAccountId, ReferralLink, ReferralLinkId, ReferralSource, RewardBalance, SettingAudit,
    TelegramId, User, UserId, UserProfile,
};

/// Public API of the referral-ledger module.
///
/// Bot handlers create users and attribute referrals, reward-producing logic calls
/// [`credit`](Self::credit), payout logic calls [`settle`](Self::settle), and the
/// dashboard reads balances and edits audited settings.
#[async_trait]
pub trait ReferralLedgerClient: Send + Sync {
    // === Identity ===

    /// Register a platform user, optionally attributed to a referrer.
    async fn create_user(&self, new_user: NewUser) -> Result<User, LedgerError>;

    async fn get_user(&self, id: UserId) -> Result<User, LedgerError>;

    async fn find_user_by_telegram_id(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, LedgerError>;

    /// Look up the owner of a user referral code.
    async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>, LedgerError>;

    /// Replace the display fields of a user.
    async fn update_profile(&self, id: UserId, profile: UserProfile)
    -> Result<User, LedgerError>;

    /// Attribute an existing user to a referrer, once.
    async fn claim_referrer(
        &self,
        id: UserId,
        source: ReferralSource,
    ) -> Result<User, LedgerError>;

    /// Direct referees of a user, oldest first.
    async fn list_referrals(&self, id: UserId) -> Result<Vec<User>, LedgerError>;

    // === Referral graph ===

    /// Idempotent: returns the existing account or creates one.
    async fn ensure_referral_account(&self, user_id: UserId)
    -> Result<ReferralAccount, LedgerError>;

    async fn get_referral_account(
        &self,
        id: ReferralAccountId,
    ) -> Result<ReferralAccount, LedgerError>;

    async fn find_referral_account_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ReferralAccount>, LedgerError>;

    async fn set_rewards_wallet(
        &self,
        id: ReferralAccountId,
        wallet_id: Option<uuid::Uuid>,
    ) -> Result<ReferralAccount, LedgerError>;

    /// Issue a new active link; `None` uses the configured default policy.
    async fn issue_link(
        &self,
        account_id: ReferralAccountId,
        policy: Option<LinkPolicy>,
    ) -> Result<ReferralLink, LedgerError>;

    async fn deactivate_link(&self, id: ReferralLinkId) -> Result<ReferralLink, LedgerError>;

    /// Succeeds only for active links.
    async fn resolve_link(&self, invite_code: &str) -> Result<ReferralAccount, LedgerError>;

    async fn list_links(
        &self,
        account_id: ReferralAccountId,
    ) -> Result<Vec<ReferralLink>, LedgerError>;

    // === Reward ledger ===

    async fn get_balance(&self, user_id: UserId) -> Result<RewardBalance, LedgerError>;

    async fn credit(
        &self,
        user_id: UserId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<RewardBalance, LedgerError>;

    /// Move `amount` from unpaid to paid.
    async fn settle(
        &self,
        user_id: UserId,
        amount: Decimal,
        acting_admin: Option<AdminId>,
    ) -> Result<RewardBalance, LedgerError>;

    /// Remove `amount` from the unpaid bucket. Requires `super_admin`.
    async fn reverse(
        &self,
        acting_admin: AdminId,
        user_id: UserId,
        amount: Decimal,
        reason: String,
    ) -> Result<RewardBalance, LedgerError>;

    /// Journal rows, newest first.
    async fn list_ledger_entries(
        &self,
        user_id: UserId,
        limit: Option<u64>,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    // === Settings ===

    async fn get_settings(&self, namespace: &str) -> Result<Value, LedgerError>;

    /// Replace a namespace wholesale and append one audit record.
    async fn put_settings(
        &self,
        namespace: &str,
        value: Value,
        acting_admin: Option<AdminId>,
    ) -> Result<(), LedgerError>;

    /// Audit records, newest first, optionally restricted to a namespace.
    async fn list_audit(
        &self,
        namespace: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<SettingAudit>, LedgerError>;

    async fn list_namespaces(&self) -> Result<Vec<String>, LedgerError>;

    // === Admins ===

    async fn authorize(&self, admin_id: AdminId, required: AdminRole)
    -> Result<bool, LedgerError>;

    async fn get_admin(&self, id: AdminId) -> Result<AdminUser, LedgerError>;

    /// `None` acting admin is the bootstrap path.
    async fn create_admin(
        &self,
        acting_admin: Option<AdminId>,
        telegram_id: TelegramId,
        role: AdminRole,
    ) -> Result<AdminUser, LedgerError>;

    async fn set_admin_role(
        &self,
        acting_admin: AdminId,
        target: AdminId,
        role: AdminRole,
    ) -> Result<AdminUser, LedgerError>;
}
