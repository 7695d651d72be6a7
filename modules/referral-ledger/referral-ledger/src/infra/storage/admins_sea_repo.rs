use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{AdminId, AdminRole, AdminUser};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::domain::error::DomainError;
use crate::domain::repos::AdminsRepository;
use crate::infra::storage::db::db_err;
use crate::infra::storage::entity::admin_user::{
    ActiveModel as AdminAM, Column, Entity as AdminEntity,
};
use crate::infra::storage::mapper::admin_from_model;

/// ORM-based implementation of the `AdminsRepository` trait.
#[derive(Clone, Default)]
pub struct OrmAdminsRepository;

impl OrmAdminsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdminsRepository for OrmAdminsRepository {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: AdminId,
    ) -> Result<Option<AdminUser>, DomainError> {
        AdminEntity::find_by_id(id)
            .one(conn)
            .await
            .map_err(db_err)?
            .map(admin_from_model)
            .transpose()
    }

    async fn find_by_telegram_id<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        telegram_id: i64,
    ) -> Result<Option<AdminUser>, DomainError> {
        AdminEntity::find()
            .filter(Column::TelegramId.eq(telegram_id))
            .one(conn)
            .await
            .map_err(db_err)?
            .map(admin_from_model)
            .transpose()
    }

    async fn create<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        admin: &AdminUser,
    ) -> Result<(), DomainError> {
        let m = AdminAM {
            id: Set(admin.id),
            telegram_id: Set(admin.telegram_id),
            role: Set(admin.role.as_str().to_owned()),
            created_at: Set(admin.created_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(())
    }

    async fn set_role<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: AdminId,
        role: AdminRole,
    ) -> Result<bool, DomainError> {
        let result = AdminEntity::update_many()
            .col_expr(Column::Role, Expr::value(role.as_str()))
            .filter(Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
