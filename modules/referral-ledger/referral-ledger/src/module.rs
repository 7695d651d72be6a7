//! Composition root: wires repositories and services and exposes the client.

use std::sync::Arc;

use anyhow::Context;
use ledger_db::DbHandle;
use referral_ledger_sdk::ReferralLedgerClient;
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::ReferralLedgerConfig;
use crate::domain::codes::TokenGenerator;
use crate::domain::service::AppServices;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::{
    OrmAdminsRepository, OrmReferralsRepository, OrmRewardsRepository, OrmSettingsRepository,
    OrmUsersRepository,
};
use crate::local_client::LocalReferralLedgerClient;

/// Type alias for the concrete `AppServices` type used with ORM repositories.
pub type ConcreteAppServices = AppServices<
    OrmUsersRepository,
    OrmReferralsRepository,
    OrmRewardsRepository,
    OrmSettingsRepository,
    OrmAdminsRepository,
>;

/// Referral ledger module: owns the services and hands out the public client.
pub struct ReferralLedgerModule {
    services: Arc<ConcreteAppServices>,
}

impl ReferralLedgerModule {
    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Fails when the store rejects a migration.
    pub async fn migrate(db: &DbHandle) -> anyhow::Result<()> {
        info!(engine = ?db.engine(), "Running referral ledger migrations");
        Migrator::up(&db.sea(), None)
            .await
            .context("referral ledger migrations failed")
    }

    /// Build the module on top of an already migrated store.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid.
    pub fn init(db: &DbHandle, config: &ReferralLedgerConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid referral_ledger configuration")?;

        let services = AppServices::new(Self::repos(), db.db_conn(), config.service_config());
        info!("Referral ledger module initialized");
        Ok(Self {
            services: Arc::new(services),
        })
    }

    /// [`init`](Self::init) with an explicit token source.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid.
    pub fn init_with_tokens(
        db: &DbHandle,
        config: &ReferralLedgerConfig,
        tokens: Arc<dyn TokenGenerator>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid referral_ledger configuration")?;

        let services =
            AppServices::with_tokens(Self::repos(), db.db_conn(), config.service_config(), tokens);
        Ok(Self {
            services: Arc::new(services),
        })
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn ReferralLedgerClient> {
        Arc::new(LocalReferralLedgerClient::new(Arc::clone(&self.services)))
    }

    #[must_use]
    pub fn services(&self) -> &Arc<ConcreteAppServices> {
        &self.services
    }

    fn repos() -> (
        OrmUsersRepository,
        OrmReferralsRepository,
        OrmRewardsRepository,
        OrmSettingsRepository,
        OrmAdminsRepository,
    ) {
        (
            OrmUsersRepository::new(),
            OrmReferralsRepository::new(),
            OrmRewardsRepository::new(),
            OrmSettingsRepository::new(),
            OrmAdminsRepository::new(),
        )
    }
}
