use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{LedgerEntry, RewardBalance, UserId};

use crate::domain::error::DomainError;

/// Stored balance row together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBalance {
    pub balance: RewardBalance,
    pub version: i64,
}

/// Repository trait for reward balances and their journal.
#[async_trait]
pub trait RewardsRepository: Send + Sync {
    async fn get_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<VersionedBalance>, DomainError>;

    /// Insert the first balance row of a user at `version`.
    async fn insert_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        row: &VersionedBalance,
    ) -> Result<(), DomainError>;

    /// Compare-and-swap on `version`: writes `balance` with `expected_version + 1`.
    /// Returns `false` when another writer got there first.
    async fn update_balance<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        expected_version: i64,
        balance: &RewardBalance,
    ) -> Result<bool, DomainError>;

    async fn append_entry<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        entry: &LedgerEntry,
    ) -> Result<(), DomainError>;

    /// Newest first.
    async fn list_entries<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<LedgerEntry>, DomainError>;
}
