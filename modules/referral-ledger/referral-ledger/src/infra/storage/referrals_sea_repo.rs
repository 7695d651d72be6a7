use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{
    ReferralAccount, ReferralAccountId, ReferralLink, ReferralLinkId, UserId,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repos::ReferralsRepository;
use crate::infra::storage::db::db_err;
use crate::infra::storage::entity::referral_account::{
    ActiveModel as AccountAM, Column as AccountColumn, Entity as AccountEntity,
};
use crate::infra::storage::entity::referral_link::{
    ActiveModel as LinkAM, Column as LinkColumn, Entity as LinkEntity,
};

/// ORM-based implementation of the `ReferralsRepository` trait.
#[derive(Clone, Default)]
pub struct OrmReferralsRepository;

impl OrmReferralsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReferralsRepository for OrmReferralsRepository {
    async fn get_account<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let found = AccountEntity::find_by_id(id)
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_account_by_user<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<ReferralAccount>, DomainError> {
        let found = AccountEntity::find()
            .filter(AccountColumn::UserId.eq(user_id))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn create_account<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account: ReferralAccount,
    ) -> Result<ReferralAccount, DomainError> {
        let m = AccountAM {
            id: Set(account.id),
            user_id: Set(account.user_id),
            referral_code: Set(account.referral_code.clone()),
            rewards_wallet_id: Set(account.rewards_wallet_id),
            last_link_update_at: Set(account.last_link_update_at),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(account)
    }

    async fn set_rewards_wallet<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
        wallet_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<bool, DomainError> {
        let result = AccountEntity::update_many()
            .col_expr(AccountColumn::RewardsWalletId, Expr::value(wallet_id))
            .col_expr(AccountColumn::UpdatedAt, Expr::value(now))
            .filter(AccountColumn::Id.eq(id))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn touch_link_update<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralAccountId,
        now: OffsetDateTime,
    ) -> Result<bool, DomainError> {
        let result = AccountEntity::update_many()
            .col_expr(AccountColumn::LastLinkUpdateAt, Expr::value(now))
            .col_expr(AccountColumn::UpdatedAt, Expr::value(now))
            .filter(AccountColumn::Id.eq(id))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn get_link<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralLinkId,
    ) -> Result<Option<ReferralLink>, DomainError> {
        let found = LinkEntity::find_by_id(id)
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_link_by_code<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        invite_code: &str,
    ) -> Result<Option<ReferralLink>, DomainError> {
        let found = LinkEntity::find()
            .filter(LinkColumn::InviteCode.eq(invite_code))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn create_link<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        link: ReferralLink,
    ) -> Result<ReferralLink, DomainError> {
        let m = LinkAM {
            id: Set(link.id),
            referral_account_id: Set(link.referral_account_id),
            invite_code: Set(link.invite_code.clone()),
            is_active: Set(link.is_active),
            created_at: Set(link.created_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(link)
    }

    async fn set_link_active<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: ReferralLinkId,
        active: bool,
    ) -> Result<bool, DomainError> {
        let result = LinkEntity::update_many()
            .col_expr(LinkColumn::IsActive, Expr::value(active))
            .filter(LinkColumn::Id.eq(id))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn deactivate_account_links<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account_id: ReferralAccountId,
    ) -> Result<u64, DomainError> {
        let result = LinkEntity::update_many()
            .col_expr(LinkColumn::IsActive, Expr::value(false))
            .filter(LinkColumn::ReferralAccountId.eq(account_id))
            .filter(LinkColumn::IsActive.eq(true))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn list_links<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        account_id: ReferralAccountId,
    ) -> Result<Vec<ReferralLink>, DomainError> {
        let rows = LinkEntity::find()
            .filter(LinkColumn::ReferralAccountId.eq(account_id))
            .order_by_asc(LinkColumn::CreatedAt)
            .order_by_asc(LinkColumn::Id)
            .all(conn)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
