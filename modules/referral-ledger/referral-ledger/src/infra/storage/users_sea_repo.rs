use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{User, UserId, UserProfile};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::domain::error::DomainError;
use crate::domain::repos::UsersRepository;
use crate::infra::storage::db::db_err;
use crate::infra::storage::entity::user::{ActiveModel as UserAM, Column, Entity as UserEntity};

/// ORM-based implementation of the `UsersRepository` trait.
#[derive(Clone, Default)]
pub struct OrmUsersRepository;

impl OrmUsersRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UsersRepository for OrmUsersRepository {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: UserId,
    ) -> Result<Option<User>, DomainError> {
        let found = UserEntity::find_by_id(id)
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_by_telegram_id<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        telegram_id: i64,
    ) -> Result<Option<User>, DomainError> {
        let found = UserEntity::find()
            .filter(Column::TelegramId.eq(telegram_id))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn find_by_referral_code<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<Option<User>, DomainError> {
        let found = UserEntity::find()
            .filter(Column::ReferralCode.eq(code))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn create<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user: User,
    ) -> Result<User, DomainError> {
        let m = UserAM {
            id: Set(user.id),
            telegram_id: Set(user.telegram_id),
            username: Set(user.username.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            referral_code: Set(user.referral_code.clone()),
            referred_by: Set(user.referred_by),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        };

        let _ = m.insert(conn).await.map_err(db_err)?;
        Ok(user)
    }

    async fn update_profile<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: UserId,
        profile: UserProfile,
        updated_at: OffsetDateTime,
    ) -> Result<bool, DomainError> {
        let result = UserEntity::update_many()
            .col_expr(Column::Username, Expr::value(profile.username))
            .col_expr(Column::FirstName, Expr::value(profile.first_name))
            .col_expr(Column::LastName, Expr::value(profile.last_name))
            .col_expr(Column::UpdatedAt, Expr::value(updated_at))
            .filter(Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn set_referrer_if_unset<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: UserId,
        referrer: UserId,
        updated_at: OffsetDateTime,
    ) -> Result<bool, DomainError> {
        let result = UserEntity::update_many()
            .col_expr(Column::ReferredBy, Expr::value(Some(referrer)))
            .col_expr(Column::UpdatedAt, Expr::value(updated_at))
            .filter(Column::Id.eq(id))
            .filter(Column::ReferredBy.is_null())
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn list_referred_by<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        referrer: UserId,
    ) -> Result<Vec<User>, DomainError> {
        let rows = UserEntity::find()
            .filter(Column::ReferredBy.eq(referrer))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(conn)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
