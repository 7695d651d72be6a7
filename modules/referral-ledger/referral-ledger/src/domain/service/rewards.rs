use std::sync::Arc;

use ledger_db::DbConn;
use referral_ledger_sdk::{
    AdminId, AdminRole, LedgerEntry, LedgerEntryKind, RewardBalance, UserId,
};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{RoleGate, ServiceConfig, with_write_retries};
use crate::domain::error::DomainError;
use crate::domain::repos::{
    AdminsRepository, RewardsRepository, UsersRepository, VersionedBalance,
};
use crate::domain::validation::validate_amount;

const RESOURCE: &str = "reward_wallet_balances";

/// One balance mutation: the journal row and the bucket arithmetic it implies.
#[derive(Debug, Clone)]
struct Movement {
    kind: LedgerEntryKind,
    amount: Decimal,
    admin_id: Option<AdminId>,
    note: Option<String>,
}

impl Movement {
    /// Apply to `current`, or fail when the unpaid bucket cannot cover the amount.
    fn apply(&self, current: &RewardBalance, now: OffsetDateTime) -> Result<RewardBalance, DomainError> {
        let overflow = || DomainError::validation("amount", "balance overflow");
        let (paid, unpaid) = match self.kind {
            LedgerEntryKind::Credit => (
                current.total_paid,
                current
                    .total_unpaid
                    .checked_add(self.amount)
                    .ok_or_else(overflow)?,
            ),
            LedgerEntryKind::Settle | LedgerEntryKind::Reverse => {
                if current.total_unpaid < self.amount {
                    return Err(DomainError::InsufficientUnpaidBalance {
                        requested: self.amount,
                        available: current.total_unpaid,
                    });
                }
                let unpaid = current.total_unpaid - self.amount;
                let paid = if self.kind == LedgerEntryKind::Settle {
                    current
                        .total_paid
                        .checked_add(self.amount)
                        .ok_or_else(overflow)?
                } else {
                    current.total_paid
                };
                (paid, unpaid)
            }
        };

        Ok(RewardBalance {
            user_id: current.user_id,
            total_paid: paid,
            total_unpaid: unpaid,
            updated_at: Some(now),
        })
    }
}

/// Paid/unpaid reward balances. Every mutation writes its journal row in the
/// same transaction as the balance update.
pub struct RewardsService<W: RewardsRepository, U: UsersRepository, A: AdminsRepository> {
    db: DbConn,
    repo: Arc<W>,
    users_repo: Arc<U>,
    gate: Arc<RoleGate<A>>,
    config: Arc<ServiceConfig>,
}

impl<W, U, A> RewardsService<W, U, A>
where
    W: RewardsRepository + 'static,
    U: UsersRepository + 'static,
    A: AdminsRepository + 'static,
{
    pub fn new(
        db: DbConn,
        repo: Arc<W>,
        users_repo: Arc<U>,
        gate: Arc<RoleGate<A>>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            db,
            repo,
            users_repo,
            gate,
            config,
        }
    }

    /// Zero balance for users that were never credited.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_balance(&self, user_id: UserId) -> Result<RewardBalance, DomainError> {
        self.ensure_user(user_id).await?;
        Ok(self
            .repo
            .get_balance(self.db.conn(), user_id)
            .await?
            .map_or_else(|| RewardBalance::empty(user_id), |row| row.balance))
    }

    /// Accrue `amount` into the unpaid bucket.
    #[instrument(skip(self, note), fields(user_id = %user_id, amount = %amount))]
    pub async fn credit(
        &self,
        user_id: UserId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<RewardBalance, DomainError> {
        validate_amount(amount)?;
        self.ensure_user(user_id).await?;

        let balance = self
            .apply(
                user_id,
                Movement {
                    kind: LedgerEntryKind::Credit,
                    amount,
                    admin_id: None,
                    note,
                },
            )
            .await?;
        info!(unpaid = %balance.total_unpaid, "Reward credited");
        Ok(balance)
    }

    /// Move `amount` from unpaid to paid. An acting admin needs the `admin` role.
    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount))]
    pub async fn settle(
        &self,
        user_id: UserId,
        amount: Decimal,
        acting: Option<AdminId>,
    ) -> Result<RewardBalance, DomainError> {
        validate_amount(amount)?;
        if let Some(actor) = acting {
            self.gate.require(actor, AdminRole::Admin).await?;
        }
        self.ensure_user(user_id).await?;

        let balance = self
            .apply(
                user_id,
                Movement {
                    kind: LedgerEntryKind::Settle,
                    amount,
                    admin_id: acting,
                    note: None,
                },
            )
            .await?;
        info!(paid = %balance.total_paid, unpaid = %balance.total_unpaid, "Reward settled");
        Ok(balance)
    }

    /// Claw back `amount` from the unpaid bucket without paying it. `super_admin` only.
    #[instrument(skip(self, reason), fields(user_id = %user_id, amount = %amount))]
    pub async fn reverse(
        &self,
        acting: AdminId,
        user_id: UserId,
        amount: Decimal,
        reason: String,
    ) -> Result<RewardBalance, DomainError> {
        validate_amount(amount)?;
        if reason.trim().is_empty() {
            return Err(DomainError::validation("reason", "must not be empty"));
        }
        self.gate.require(acting, AdminRole::SuperAdmin).await?;
        self.ensure_user(user_id).await?;

        let balance = self
            .apply(
                user_id,
                Movement {
                    kind: LedgerEntryKind::Reverse,
                    amount,
                    admin_id: Some(acting),
                    note: Some(reason),
                },
            )
            .await?;
        info!(admin_id = %acting, unpaid = %balance.total_unpaid, "Reward reversed");
        Ok(balance)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_ledger_entries(
        &self,
        user_id: UserId,
        limit: Option<u64>,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        self.ensure_user(user_id).await?;
        let limit = self.config.page_size(limit);
        self.repo.list_entries(self.db.conn(), user_id, limit).await
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.users_repo.get(self.db.conn(), user_id).await?.is_none() {
            return Err(DomainError::user_not_found(user_id));
        }
        Ok(())
    }

    /// Optimistic read-modify-write of one balance row plus its journal entry.
    async fn apply(&self, user_id: UserId, movement: Movement) -> Result<RewardBalance, DomainError> {
        with_write_retries(self.config.max_write_retries, RESOURCE, || {
            let repo = Arc::clone(&self.repo);
            let movement = movement.clone();
            self.db
                .in_transaction_mapped(DomainError::storage_infra, move |tx| {
                    Box::pin(async move {
                        let now = OffsetDateTime::now_utc();
                        let current = repo.get_balance(tx, user_id).await?;
                        let base = current
                            .as_ref()
                            .map_or_else(|| RewardBalance::empty(user_id), |row| row.balance.clone());
                        let next = movement.apply(&base, now)?;

                        match current {
                            None => {
                                let row = VersionedBalance {
                                    balance: next.clone(),
                                    version: 1,
                                };
                                // The key is the only unique constraint on the table.
                                repo.insert_balance(tx, &row).await.map_err(|e| match e {
                                    DomainError::UniqueViolation { .. } => {
                                        DomainError::stale_write(RESOURCE)
                                    }
                                    other => other,
                                })?;
                            }
                            Some(row) => {
                                if !repo.update_balance(tx, row.version, &next).await? {
                                    return Err(DomainError::stale_write(RESOURCE));
                                }
                            }
                        }

                        repo.append_entry(
                            tx,
                            &LedgerEntry {
                                id: Uuid::now_v7(),
                                user_id,
                                kind: movement.kind,
                                amount: movement.amount,
                                admin_id: movement.admin_id,
                                note: movement.note,
                                created_at: now,
                            },
                        )
                        .await?;

                        Ok(next)
                    })
                })
        })
        .await
    }
}
