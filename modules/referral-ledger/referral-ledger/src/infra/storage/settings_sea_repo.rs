use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{SettingAudit, SettingsEntry};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::error::DomainError;
use crate::domain::repos::{SettingsRepository, VersionedSettings};
use crate::infra::storage::db::db_err;
use crate::infra::storage::entity::admin_setting_audit::{
    ActiveModel as AuditAM, Column as AuditColumn, Entity as AuditEntity,
};
use crate::infra::storage::entity::admin_settings::{
    ActiveModel as SettingsAM, Column as SettingsColumn, Entity as SettingsEntity,
};
use crate::infra::storage::mapper::{audit_from_model, json_to_text, settings_from_model};

/// ORM-based implementation of the `SettingsRepository` trait.
#[derive(Clone, Default)]
pub struct OrmSettingsRepository;

impl OrmSettingsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SettingsRepository for OrmSettingsRepository {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        namespace: &str,
    ) -> Result<Option<VersionedSettings>, DomainError> {
        SettingsEntity::find_by_id(namespace.to_owned())
            .one(conn)
            .await
            .map_err(db_err)?
            .map(settings_from_model)
            .transpose()
    }

    async fn insert<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        entry: &SettingsEntry,
    ) -> Result<(), DomainError> {
        let m = SettingsAM {
            namespace: Set(entry.namespace.clone()),
            settings: Set(json_to_text(&entry.settings)),
            version: Set(1),
            created_at: Set(entry.created_at),
            updated_at: Set(entry.updated_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(())
    }

    async fn compare_and_swap<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        expected_version: i64,
        entry: &SettingsEntry,
    ) -> Result<bool, DomainError> {
        let result = SettingsEntity::update_many()
            .col_expr(
                SettingsColumn::Settings,
                Expr::value(json_to_text(&entry.settings)),
            )
            .col_expr(SettingsColumn::Version, Expr::value(expected_version + 1))
            .col_expr(SettingsColumn::UpdatedAt, Expr::value(entry.updated_at))
            .filter(SettingsColumn::Namespace.eq(entry.namespace.as_str()))
            .filter(SettingsColumn::Version.eq(expected_version))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn append_audit<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        audit: &SettingAudit,
    ) -> Result<(), DomainError> {
        let m = AuditAM {
            id: Set(audit.id),
            admin_id: Set(audit.admin_id),
            namespace: Set(audit.namespace.clone()),
            old_value: Set(audit.old_value.as_ref().map(json_to_text)),
            new_value: Set(audit.new_value.as_ref().map(json_to_text)),
            updated_at: Set(audit.updated_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_audit<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        namespace: Option<&str>,
        limit: u64,
    ) -> Result<Vec<SettingAudit>, DomainError> {
        let mut query = AuditEntity::find();
        if let Some(ns) = namespace {
            query = query.filter(AuditColumn::Namespace.eq(ns));
        }

        query
            .order_by_desc(AuditColumn::UpdatedAt)
            .order_by_desc(AuditColumn::Id)
            .limit(limit)
            .all(conn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(audit_from_model)
            .collect()
    }

    async fn list_namespaces<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
    ) -> Result<Vec<String>, DomainError> {
        SettingsEntity::find()
            .select_only()
            .column(SettingsColumn::Namespace)
            .order_by_asc(SettingsColumn::Namespace)
            .into_tuple::<String>()
            .all(conn)
            .await
            .map_err(db_err)
    }
}
