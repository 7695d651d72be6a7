//! Domain service layer - business logic and rules.
//!
//! Per-resource submodules:
//! - `identity` - platform users, referral codes and referrer attribution
//! - `referrals` - referral accounts and invite links
//! - `rewards` - paid/unpaid balances and their journal
//! - `settings` - namespaced settings with an append-only audit trail
//! - `roles` - role checks and operator account management
//!
//! Every multi-row mutation runs inside one store transaction. Single-record
//! read-modify-write cycles use a version column and are retried on conflict.

use std::future::Future;
use std::sync::Arc;

use ledger_db::DbConn;
use referral_ledger_sdk::LinkPolicy;
use tracing::debug;

use crate::domain::codes::{RandomTokens, TokenGenerator};
use crate::domain::error::DomainError;
use crate::domain::repos::{
    AdminsRepository, ReferralsRepository, RewardsRepository, SettingsRepository,
    UsersRepository,
};

mod identity;
mod referrals;
mod rewards;
mod roles;
mod settings;

pub use identity::IdentityService;
pub use referrals::ReferralsService;
pub use rewards::RewardsService;
pub use roles::{ADMIN_ROLES_NAMESPACE, AdminsService, RoleGate};
pub use settings::SettingsService;

/// Configuration for the domain services
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub code_length: usize,
    pub invite_code_length: usize,
    pub max_code_allocation_attempts: u32,
    pub max_write_retries: u32,
    pub max_referral_depth: u32,
    pub default_link_policy: LinkPolicy,
    pub default_audit_page_size: u64,
    pub max_audit_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        crate::config::ReferralLedgerConfig::default().service_config()
    }
}

impl ServiceConfig {
    /// Clamp a caller-supplied page size into `[1, max_audit_page_size]`.
    #[must_use]
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_audit_page_size)
            .clamp(1, self.max_audit_page_size)
    }
}

/// Re-run `op` while it reports `DomainError::StaleWrite`.
///
/// # Errors
///
/// `DomainError::ConcurrentModification` once `max_attempts` stale writes happened,
/// otherwise whatever `op` returns.
pub(crate) async fn with_write_retries<T, F, Fut>(
    max_attempts: u32,
    resource: &str,
    mut op: F,
) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    for attempt in 1..=max_attempts {
        match op().await {
            Err(DomainError::StaleWrite { .. }) => {
                debug!(attempt, resource, "Stale write, retrying");
            }
            other => return other,
        }
    }
    Err(DomainError::concurrent_modification(resource))
}

// DI Container - aggregates all domain services
pub struct AppServices<UR, RR, WR, SR, AR>
where
    UR: UsersRepository + 'static,
    RR: ReferralsRepository + 'static,
    WR: RewardsRepository + 'static,
    SR: SettingsRepository + 'static,
    AR: AdminsRepository + 'static,
{
    pub identity: Arc<IdentityService<UR, RR>>,
    pub referrals: Arc<ReferralsService<RR, UR>>,
    pub rewards: Arc<RewardsService<WR, UR, AR>>,
    pub settings: Arc<SettingsService<SR, AR>>,
    pub roles: Arc<RoleGate<AR>>,
    pub admins: Arc<AdminsService<AR, SR>>,
}

impl<UR, RR, WR, SR, AR> AppServices<UR, RR, WR, SR, AR>
where
    UR: UsersRepository + 'static,
    RR: ReferralsRepository + 'static,
    WR: RewardsRepository + 'static,
    SR: SettingsRepository + 'static,
    AR: AdminsRepository + 'static,
{
    pub fn new(
        repos: (UR, RR, WR, SR, AR),
        db: DbConn,
        config: ServiceConfig,
    ) -> Self {
        Self::with_tokens(repos, db, config, Arc::new(RandomTokens))
    }

    /// Same as [`new`](Self::new) with an explicit token source.
    pub fn with_tokens(
        (users_repo, referrals_repo, rewards_repo, settings_repo, admins_repo): (UR, RR, WR, SR, AR),
        db: DbConn,
        config: ServiceConfig,
        tokens: Arc<dyn TokenGenerator>,
    ) -> Self {
        let config = Arc::new(config);
        let users_repo = Arc::new(users_repo);
        let referrals_repo = Arc::new(referrals_repo);
        let settings_repo = Arc::new(settings_repo);
        let admins_repo = Arc::new(admins_repo);

        let roles = Arc::new(RoleGate::new(db.clone(), Arc::clone(&admins_repo)));

        let referrals = Arc::new(ReferralsService::new(
            db.clone(),
            Arc::clone(&referrals_repo),
            Arc::clone(&users_repo),
            Arc::clone(&tokens),
            Arc::clone(&config),
        ));

        let identity = Arc::new(IdentityService::new(
            db.clone(),
            Arc::clone(&users_repo),
            Arc::clone(&referrals),
            Arc::clone(&tokens),
            Arc::clone(&config),
        ));

        let rewards = Arc::new(RewardsService::new(
            db.clone(),
            Arc::new(rewards_repo),
            Arc::clone(&users_repo),
            Arc::clone(&roles),
            Arc::clone(&config),
        ));

        let settings = Arc::new(SettingsService::new(
            db.clone(),
            Arc::clone(&settings_repo),
            Arc::clone(&roles),
            Arc::clone(&config),
        ));

        let admins = Arc::new(AdminsService::new(
            db,
            admins_repo,
            settings_repo,
            Arc::clone(&roles),
        ));

        Self {
            identity,
            referrals,
            rewards,
            settings,
            roles,
            admins,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.page_size(None), 50);
        assert_eq!(cfg.page_size(Some(0)), 1);
        assert_eq!(cfg.page_size(Some(10_000)), 500);
        assert_eq!(cfg.page_size(Some(20)), 20);
    }

    #[tokio::test]
    async fn stale_writes_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_write_retries(8, "row", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DomainError::stale_write("row"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
    }

    #[tokio::test]
    async fn persistent_conflicts_become_concurrent_modification() {
        let result: Result<(), _> =
            with_write_retries(3, "row", || async { Err(DomainError::stale_write("row")) }).await;
        assert_eq!(result, Err(DomainError::concurrent_modification("row")));
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_write_retries(5, "row", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DomainError::user_not_found(uuid::Uuid::nil())) }
        })
        .await;
        assert!(matches!(result, Err(DomainError::UserNotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
