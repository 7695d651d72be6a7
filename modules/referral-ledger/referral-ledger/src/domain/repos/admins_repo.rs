use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{AdminId, AdminRole, AdminUser};

use crate::domain::error::DomainError;

/// Repository trait for operator accounts.
#[async_trait]
pub trait AdminsRepository: Send + Sync {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: AdminId,
    ) -> Result<Option<AdminUser>, DomainError>;

    async fn find_by_telegram_id<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        telegram_id: i64,
    ) -> Result<Option<AdminUser>, DomainError>;

    async fn create<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        admin: &AdminUser,
    ) -> Result<(), DomainError>;

    async fn set_role<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: AdminId,
        role: AdminRole,
    ) -> Result<bool, DomainError>;
}
