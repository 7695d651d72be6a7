//! In-process implementation of [`ReferralLedgerClient`].

use std::sync::Arc;

use async_trait::async_trait;
use referral_ledger_sdk::{
    AdminId, AdminRole, AdminUser, LedgerEntry, LedgerError, LinkPolicy, NewUser,
    ReferralAccount, ReferralAccountId, ReferralLedgerClient, ReferralLink, ReferralLinkId,
    ReferralSource, RewardBalance, SettingAudit, TelegramId, User, UserId, UserProfile,
};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::module::ConcreteAppServices;

/// Local client that delegates to the domain services and converts their errors
/// into [`LedgerError`].
pub struct LocalReferralLedgerClient {
    services: Arc<ConcreteAppServices>,
}

impl LocalReferralLedgerClient {
    #[must_use]
    pub fn new(services: Arc<ConcreteAppServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ReferralLedgerClient for LocalReferralLedgerClient {
    async fn create_user(&self, new_user: NewUser) -> Result<User, LedgerError> {
        self.services
            .identity
            .create_user(new_user)
            .await
            .map_err(Into::into)
    }

    async fn get_user(&self, id: UserId) -> Result<User, LedgerError> {
        self.services.identity.get_user(id).await.map_err(Into::into)
    }

    async fn find_user_by_telegram_id(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, LedgerError> {
        self.services
            .identity
            .find_user_by_telegram_id(telegram_id)
            .await
            .map_err(Into::into)
    }

    async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>, LedgerError> {
        self.services
            .identity
            .find_user_by_referral_code(code)
            .await
            .map_err(Into::into)
    }

    async fn update_profile(&self, id: UserId, profile: UserProfile) -> Result<User, LedgerError> {
        self.services
            .identity
            .update_profile(id, profile)
            .await
            .map_err(Into::into)
    }

    async fn claim_referrer(
        &self,
        id: UserId,
        source: ReferralSource,
    ) -> Result<User, LedgerError> {
        self.services
            .identity
            .claim_referrer(id, source)
            .await
            .map_err(Into::into)
    }

    async fn list_referrals(&self, id: UserId) -> Result<Vec<User>, LedgerError> {
        self.services
            .identity
            .list_referrals(id)
            .await
            .map_err(Into::into)
    }

    async fn ensure_referral_account(
        &self,
        user_id: UserId,
    ) -> Result<ReferralAccount, LedgerError> {
        self.services
            .referrals
            .ensure_referral_account(user_id)
            .await
            .map_err(Into::into)
    }

    async fn get_referral_account(
        &self,
        id: ReferralAccountId,
    ) -> Result<ReferralAccount, LedgerError> {
        self.services
            .referrals
            .get_referral_account(id)
            .await
            .map_err(Into::into)
    }

    async fn find_referral_account_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<ReferralAccount>, LedgerError> {
        self.services
            .referrals
            .find_referral_account_by_user(user_id)
            .await
            .map_err(Into::into)
    }

    async fn set_rewards_wallet(
        &self,
        id: ReferralAccountId,
        wallet_id: Option<Uuid>,
    ) -> Result<ReferralAccount, LedgerError> {
        self.services
            .referrals
            .set_rewards_wallet(id, wallet_id)
            .await
            .map_err(Into::into)
    }

    async fn issue_link(
        &self,
        account_id: ReferralAccountId,
        policy: Option<LinkPolicy>,
    ) -> Result<ReferralLink, LedgerError> {
        self.services
            .referrals
            .issue_link(account_id, policy)
            .await
            .map_err(Into::into)
    }

    async fn deactivate_link(&self, id: ReferralLinkId) -> Result<ReferralLink, LedgerError> {
        self.services
            .referrals
            .deactivate_link(id)
            .await
            .map_err(Into::into)
    }

    async fn resolve_link(&self, invite_code: &str) -> Result<ReferralAccount, LedgerError> {
        self.services
            .referrals
            .resolve_link(invite_code)
            .await
            .map_err(Into::into)
    }

    async fn list_links(
        &self,
        account_id: ReferralAccountId,
    ) -> Result<Vec<ReferralLink>, LedgerError> {
        self.services
            .referrals
            .list_links(account_id)
            .await
            .map_err(Into::into)
    }

    async fn get_balance(&self, user_id: UserId) -> Result<RewardBalance, LedgerError> {
        self.services
            .rewards
            .get_balance(user_id)
            .await
            .map_err(Into::into)
    }

    async fn credit(
        &self,
        user_id: UserId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<RewardBalance, LedgerError> {
        self.services
            .rewards
            .credit(user_id, amount, note)
            .await
            .map_err(Into::into)
    }

    async fn settle(
        &self,
        user_id: UserId,
        amount: Decimal,
        acting_admin: Option<AdminId>,
    ) -> Result<RewardBalance, LedgerError> {
        self.services
            .rewards
            .settle(user_id, amount, acting_admin)
            .await
            .map_err(Into::into)
    }

    async fn reverse(
        &self,
        acting_admin: AdminId,
        user_id: UserId,
        amount: Decimal,
        reason: String,
    ) -> Result<RewardBalance, LedgerError> {
        self.services
            .rewards
            .reverse(acting_admin, user_id, amount, reason)
            .await
            .map_err(Into::into)
    }

    async fn list_ledger_entries(
        &self,
        user_id: UserId,
        limit: Option<u64>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.services
            .rewards
            .list_ledger_entries(user_id, limit)
            .await
            .map_err(Into::into)
    }

    async fn get_settings(&self, namespace: &str) -> Result<Value, LedgerError> {
        self.services
            .settings
            .get_settings(namespace)
            .await
            .map_err(Into::into)
    }

    async fn put_settings(
        &self,
        namespace: &str,
        value: Value,
        acting_admin: Option<AdminId>,
    ) -> Result<(), LedgerError> {
        self.services
            .settings
            .put_settings(namespace, value, acting_admin)
            .await
            .map_err(Into::into)
    }

    async fn list_audit(
        &self,
        namespace: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<SettingAudit>, LedgerError> {
        self.services
            .settings
            .list_audit(namespace, limit)
            .await
            .map_err(Into::into)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, LedgerError> {
        self.services
            .settings
            .list_namespaces()
            .await
            .map_err(Into::into)
    }

    async fn authorize(&self, admin_id: AdminId, required: AdminRole) -> Result<bool, LedgerError> {
        self.services
            .roles
            .authorize(admin_id, required)
            .await
            .map_err(Into::into)
    }

    async fn get_admin(&self, id: AdminId) -> Result<AdminUser, LedgerError> {
        self.services.admins.get_admin(id).await.map_err(Into::into)
    }

    async fn create_admin(
        &self,
        acting_admin: Option<AdminId>,
        telegram_id: TelegramId,
        role: AdminRole,
    ) -> Result<AdminUser, LedgerError> {
        self.services
            .admins
            .create_admin(acting_admin, telegram_id, role)
            .await
            .map_err(Into::into)
    }

    async fn set_admin_role(
        &self,
        acting_admin: AdminId,
        target: AdminId,
        role: AdminRole,
    ) -> Result<AdminUser, LedgerError> {
        self.services
            .admins
            .set_admin_role(acting_admin, target, role)
            .await
            .map_err(Into::into)
    }
}
