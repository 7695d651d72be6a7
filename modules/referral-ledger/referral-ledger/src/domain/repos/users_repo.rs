use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{User, UserId, UserProfile};
use time::OffsetDateTime;

use crate::domain::error::DomainError;

/// Repository trait for platform user persistence.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: UserId,
    ) -> Result<Option<User>, DomainError>;

    async fn find_by_telegram_id<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        telegram_id: i64,
    ) -> Result<Option<User>, DomainError>;

    async fn find_by_referral_code<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        code: &str,
    ) -> Result<Option<User>, DomainError>;

    /// Insert a new user. Conflicts surface as `DomainError::UniqueViolation`.
    async fn create<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user: User,
    ) -> Result<User, DomainError>;

    /// Returns `false` when no such user exists.
    async fn update_profile<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: UserId,
        profile: UserProfile,
        updated_at: OffsetDateTime,
    ) -> Result<bool, DomainError>;

    /// Set `referred_by` only while it is still unset. Returns whether a row changed.
    async fn set_referrer_if_unset<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        id: UserId,
        referrer: UserId,
        updated_at: OffsetDateTime,
    ) -> Result<bool, DomainError>;

    /// Direct referees, oldest first.
    async fn list_referred_by<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        referrer: UserId,
    ) -> Result<Vec<User>, DomainError>;
}
