use std::sync::Arc;

use ledger_db::DbConn;
use referral_ledger_sdk::{AdminId, AdminRole, AdminUser, SettingAudit, TelegramId};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::{AdminsRepository, SettingsRepository};

/// Audit namespace that records operator role grants and changes.
pub const ADMIN_ROLES_NAMESPACE: &str = "admin_roles";

/// Role checks shared by every privileged operation.
pub struct RoleGate<A: AdminsRepository> {
    db: DbConn,
    repo: Arc<A>,
}

impl<A: AdminsRepository> RoleGate<A> {
    pub fn new(db: DbConn, repo: Arc<A>) -> Self {
        Self { db, repo }
    }

    /// `true` iff the admin exists and its role satisfies `required`.
    #[instrument(skip(self), fields(admin_id = %admin_id, required = %required))]
    pub async fn authorize(
        &self,
        admin_id: AdminId,
        required: AdminRole,
    ) -> Result<bool, DomainError> {
        let admin = self.repo.get(self.db.conn(), admin_id).await?;
        Ok(admin.is_some_and(|a| a.role.satisfies(required)))
    }

    /// Load the acting admin, failing with `Unauthorized` unless it satisfies `required`.
    pub async fn require(
        &self,
        admin_id: AdminId,
        required: AdminRole,
    ) -> Result<AdminUser, DomainError> {
        match self.repo.get(self.db.conn(), admin_id).await? {
            Some(admin) if admin.role.satisfies(required) => Ok(admin),
            Some(admin) => {
                warn!(admin_id = %admin_id, role = %admin.role, required = %required, "Role check failed");
                Err(DomainError::Unauthorized { admin_id, required })
            }
            None => {
                warn!(admin_id = %admin_id, required = %required, "Unknown admin");
                Err(DomainError::Unauthorized { admin_id, required })
            }
        }
    }
}

/// Operator account management. Every grant and role change is audited.
pub struct AdminsService<A: AdminsRepository, S: SettingsRepository> {
    db: DbConn,
    repo: Arc<A>,
    audit_repo: Arc<S>,
    gate: Arc<RoleGate<A>>,
}

impl<A, S> AdminsService<A, S>
where
    A: AdminsRepository + 'static,
    S: SettingsRepository + 'static,
{
    pub fn new(db: DbConn, repo: Arc<A>, audit_repo: Arc<S>, gate: Arc<RoleGate<A>>) -> Self {
        Self {
            db,
            repo,
            audit_repo,
            gate,
        }
    }

    #[instrument(skip(self), fields(admin_id = %id))]
    pub async fn get_admin(&self, id: AdminId) -> Result<AdminUser, DomainError> {
        self.repo
            .get(self.db.conn(), id)
            .await?
            .ok_or_else(|| DomainError::admin_not_found(id))
    }

    /// Create an operator account.
    ///
    /// Without an acting admin this is the bootstrap path used by the admin CLI;
    /// otherwise the actor must be a `super_admin`.
    #[instrument(skip(self), fields(role = %role))]
    pub async fn create_admin(
        &self,
        acting: Option<AdminId>,
        telegram_id: TelegramId,
        role: AdminRole,
    ) -> Result<AdminUser, DomainError> {
        if let Some(actor) = acting {
            self.gate.require(actor, AdminRole::SuperAdmin).await?;
        }

        if self
            .repo
            .find_by_telegram_id(self.db.conn(), telegram_id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateIdentity { telegram_id });
        }

        let now = OffsetDateTime::now_utc();
        let admin = AdminUser {
            id: Uuid::now_v7(),
            telegram_id,
            role,
            created_at: now,
        };
        let audit = SettingAudit {
            id: Uuid::now_v7(),
            admin_id: acting,
            namespace: ADMIN_ROLES_NAMESPACE.to_owned(),
            old_value: None,
            new_value: Some(role_snapshot(telegram_id, role)),
            updated_at: now,
        };

        let repo = Arc::clone(&self.repo);
        let audit_repo = Arc::clone(&self.audit_repo);
        let created = admin.clone();
        self.db
            .in_transaction_mapped(DomainError::storage_infra, move |tx| {
                Box::pin(async move {
                    repo.create(tx, &created).await.map_err(|e| {
                        if e.is_unique_violation_on("telegram_id") {
                            DomainError::DuplicateIdentity { telegram_id }
                        } else {
                            e
                        }
                    })?;
                    audit_repo.append_audit(tx, &audit).await
                })
            })
            .await?;

        info!(admin_id = %admin.id, "Admin created");
        Ok(admin)
    }

    /// Change an operator's role. Only a `super_admin` may do this, and never to
    /// demote themself.
    #[instrument(skip(self), fields(acting = %acting, target = %target, role = %role))]
    pub async fn set_admin_role(
        &self,
        acting: AdminId,
        target: AdminId,
        role: AdminRole,
    ) -> Result<AdminUser, DomainError> {
        self.gate.require(acting, AdminRole::SuperAdmin).await?;
        if acting == target && role != AdminRole::SuperAdmin {
            return Err(DomainError::validation(
                "role",
                "a super_admin cannot demote themself",
            ));
        }

        let repo = Arc::clone(&self.repo);
        let audit_repo = Arc::clone(&self.audit_repo);
        let updated = self
            .db
            .in_transaction_mapped(DomainError::storage_infra, move |tx| {
                Box::pin(async move {
                    let current = repo
                        .get(tx, target)
                        .await?
                        .ok_or_else(|| DomainError::admin_not_found(target))?;
                    if current.role == role {
                        return Ok(current);
                    }

                    if !repo.set_role(tx, target, role).await? {
                        return Err(DomainError::admin_not_found(target));
                    }
                    audit_repo
                        .append_audit(
                            tx,
                            &SettingAudit {
                                id: Uuid::now_v7(),
                                admin_id: Some(acting),
                                namespace: ADMIN_ROLES_NAMESPACE.to_owned(),
                                old_value: Some(role_snapshot(current.telegram_id, current.role)),
                                new_value: Some(role_snapshot(current.telegram_id, role)),
                                updated_at: OffsetDateTime::now_utc(),
                            },
                        )
                        .await?;

                    Ok(AdminUser { role, ..current })
                })
            })
            .await?;

        info!("Admin role updated");
        Ok(updated)
    }
}

fn role_snapshot(telegram_id: TelegramId, role: AdminRole) -> serde_json::Value {
    json!({ "telegram_id": telegram_id, "role": role.as_str() })
}
