use std::sync::Arc;

use ledger_db::DbConn;
use referral_ledger_sdk::{AdminId, AdminRole, SettingAudit, SettingsEntry};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{ADMIN_ROLES_NAMESPACE, RoleGate, ServiceConfig, with_write_retries};
use crate::domain::error::DomainError;
use crate::domain::repos::{AdminsRepository, SettingsRepository};
use crate::domain::validation::validate_namespace;

/// Namespaced settings store. Every successful write appends exactly one audit
/// record in the same transaction.
pub struct SettingsService<S: SettingsRepository, A: AdminsRepository> {
    db: DbConn,
    repo: Arc<S>,
    gate: Arc<RoleGate<A>>,
    config: Arc<ServiceConfig>,
}

impl<S, A> SettingsService<S, A>
where
    S: SettingsRepository + 'static,
    A: AdminsRepository + 'static,
{
    pub fn new(
        db: DbConn,
        repo: Arc<S>,
        gate: Arc<RoleGate<A>>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            db,
            repo,
            gate,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_settings(&self, namespace: &str) -> Result<Value, DomainError> {
        validate_namespace(namespace)?;
        self.repo
            .get(self.db.conn(), namespace)
            .await?
            .map(|stored| stored.entry.settings)
            .ok_or_else(|| DomainError::settings_not_found(namespace))
    }

    /// Replace a namespace wholesale, creating it on first write.
    ///
    /// When `acting` is present the admin must hold at least the `admin` role.
    /// The role-change audit namespace is not writable here.
    #[instrument(skip(self, value))]
    pub async fn put_settings(
        &self,
        namespace: &str,
        value: Value,
        acting: Option<AdminId>,
    ) -> Result<(), DomainError> {
        validate_namespace(namespace)?;
        if namespace == ADMIN_ROLES_NAMESPACE {
            return Err(DomainError::validation(
                "namespace",
                format!("'{ADMIN_ROLES_NAMESPACE}' is reserved for role changes"),
            ));
        }
        if let Some(actor) = acting {
            self.gate.require(actor, AdminRole::Admin).await?;
        }

        let resource = format!("admin_settings:{namespace}");
        with_write_retries(self.config.max_write_retries, &resource, || {
            let repo = Arc::clone(&self.repo);
            let namespace = namespace.to_owned();
            let value = value.clone();
            self.db
                .in_transaction_mapped(DomainError::storage_infra, move |tx| {
                    Box::pin(async move {
                        let now = OffsetDateTime::now_utc();
                        let current = repo.get(tx, &namespace).await?;

                        let old_value = match current {
                            None => {
                                let entry = SettingsEntry {
                                    namespace: namespace.clone(),
                                    settings: value.clone(),
                                    created_at: now,
                                    updated_at: now,
                                };
                                repo.insert(tx, &entry).await.map_err(|e| match e {
                                    DomainError::UniqueViolation { .. } => {
                                        DomainError::stale_write("admin_settings")
                                    }
                                    other => other,
                                })?;
                                None
                            }
                            Some(stored) => {
                                let entry = SettingsEntry {
                                    settings: value.clone(),
                                    updated_at: now,
                                    ..stored.entry.clone()
                                };
                                if !repo.compare_and_swap(tx, stored.version, &entry).await? {
                                    return Err(DomainError::stale_write("admin_settings"));
                                }
                                Some(stored.entry.settings)
                            }
                        };

                        repo.append_audit(
                            tx,
                            &SettingAudit {
                                id: Uuid::now_v7(),
                                admin_id: acting,
                                namespace,
                                old_value,
                                new_value: Some(value),
                                updated_at: now,
                            },
                        )
                        .await
                    })
                })
        })
        .await?;

        info!(admin_id = ?acting, "Settings updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_audit(
        &self,
        namespace: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<SettingAudit>, DomainError> {
        if let Some(ns) = namespace {
            validate_namespace(ns)?;
        }
        let limit = self.config.page_size(limit);
        let records = self
            .repo
            .list_audit(self.db.conn(), namespace, limit)
            .await?;
        debug!("Listed {} audit records", records.len());
        Ok(records)
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>, DomainError> {
        self.repo.list_namespaces(self.db.conn()).await
    }
}
