use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{LedgerEntry, RewardBalance, UserId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::domain::error::DomainError;
use crate::domain::repos::{RewardsRepository, VersionedBalance};
use crate::infra::storage::db::db_err;
use crate::infra::storage::entity::reward_balance::{
    ActiveModel as BalanceAM, Column as BalanceColumn, Entity as BalanceEntity,
};
use crate::infra::storage::entity::reward_ledger_entry::{
    ActiveModel as EntryAM, Column as EntryColumn, Entity as EntryEntity,
};
use crate::infra::storage::mapper::{balance_from_model, decimal_to_text, entry_from_model};

/// ORM-based implementation of the `RewardsRepository` trait.
#[derive(Clone, Default)]
pub struct OrmRewardsRepository;

impl OrmRewardsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RewardsRepository for OrmRewardsRepository {
    async fn get_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<VersionedBalance>, DomainError> {
        BalanceEntity::find_by_id(user_id)
            .one(conn)
            .await
            .map_err(db_err)?
            .map(balance_from_model)
            .transpose()
    }

    async fn insert_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        row: &VersionedBalance,
    ) -> Result<(), DomainError> {
        let m = BalanceAM {
            user_id: Set(row.balance.user_id),
            total_paid: Set(decimal_to_text(row.balance.total_paid)),
            total_unpaid: Set(decimal_to_text(row.balance.total_unpaid)),
            version: Set(row.version),
            updated_at: Set(row
                .balance
                .updated_at
                .unwrap_or_else(OffsetDateTime::now_utc)),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        expected_version: i64,
        balance: &RewardBalance,
    ) -> Result<bool, DomainError> {
        let updated_at = balance.updated_at.unwrap_or_else(OffsetDateTime::now_utc);
        let result = BalanceEntity::update_many()
            .col_expr(
                BalanceColumn::TotalPaid,
                Expr::value(decimal_to_text(balance.total_paid)),
            )
            .col_expr(
                BalanceColumn::TotalUnpaid,
                Expr::value(decimal_to_text(balance.total_unpaid)),
            )
            .col_expr(BalanceColumn::Version, Expr::value(expected_version + 1))
            .col_expr(BalanceColumn::UpdatedAt, Expr::value(updated_at))
            .filter(BalanceColumn::UserId.eq(balance.user_id))
            .filter(BalanceColumn::Version.eq(expected_version))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn append_entry<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        entry: &LedgerEntry,
    ) -> Result<(), DomainError> {
        let m = EntryAM {
            id: Set(entry.id),
            user_id: Set(entry.user_id),
            kind: Set(entry.kind.as_str().to_owned()),
            amount: Set(decimal_to_text(entry.amount)),
            admin_id: Set(entry.admin_id),
            note: Set(entry.note.clone()),
            created_at: Set(entry.created_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(())
    }

    async fn list_entries<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        EntryEntity::find()
            .filter(EntryColumn::UserId.eq(user_id))
            .order_by_desc(EntryColumn::CreatedAt)
            .order_by_desc(EntryColumn::Id)
            .limit(limit)
            .all(conn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(entry_from_model)
            .collect()
    }
}
