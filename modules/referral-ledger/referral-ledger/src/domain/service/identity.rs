use std::sync::Arc;

use ledger_db::DbConn;
use referral_ledger_sdk::{NewUser, ReferralSource, TelegramId, User, UserId, UserProfile};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{ReferralsService, ServiceConfig};
use crate::domain::codes::{TokenGenerator, allocate_unique};
use crate::domain::error::DomainError;
use crate::domain::repos::{ReferralsRepository, UsersRepository};
use crate::domain::validation::validate_profile;

/// Platform identities and the referrer relation between them.
pub struct IdentityService<U: UsersRepository, R: ReferralsRepository> {
    db: DbConn,
    repo: Arc<U>,
    referrals: Arc<ReferralsService<R, U>>,
    tokens: Arc<dyn TokenGenerator>,
    config: Arc<ServiceConfig>,
}

impl<U, R> IdentityService<U, R>
where
    U: UsersRepository + 'static,
    R: ReferralsRepository + 'static,
{
    pub fn new(
        db: DbConn,
        repo: Arc<U>,
        referrals: Arc<ReferralsService<R, U>>,
        tokens: Arc<dyn TokenGenerator>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            db,
            repo,
            referrals,
            tokens,
            config,
        }
    }

    /// Register a platform user with a freshly allocated referral code.
    ///
    /// A referrer that resolves to the new identity itself is ignored.
    #[instrument(skip(self, new_user), fields(telegram_id = new_user.telegram_id))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        let conn = self.db.conn();
        let telegram_id = new_user.telegram_id;
        validate_profile(&new_user.profile)?;

        if self.repo.find_by_telegram_id(conn, telegram_id).await?.is_some() {
            return Err(DomainError::DuplicateIdentity { telegram_id });
        }

        let referred_by = match new_user.referrer {
            Some(source) => {
                let referrer = self.resolve_referrer(&source).await?;
                if referrer.telegram_id == telegram_id {
                    warn!("Ignoring self-referral on signup");
                    None
                } else {
                    Some(referrer.id)
                }
            }
            None => None,
        };

        let profile = new_user.profile;
        let user = allocate_unique(
            self.tokens.as_ref(),
            self.config.code_length,
            self.config.max_code_allocation_attempts,
            "referral_code",
            |referral_code| {
                let now = OffsetDateTime::now_utc();
                self.repo.create(
                    conn,
                    User {
                        id: Uuid::now_v7(),
                        telegram_id,
                        username: profile.username.clone(),
                        first_name: profile.first_name.clone(),
                        last_name: profile.last_name.clone(),
                        referral_code,
                        referred_by,
                        created_at: now,
                        updated_at: now,
                    },
                )
            },
        )
        .await
        .map_err(|e| {
            if e.is_unique_violation_on("telegram_id") {
                DomainError::DuplicateIdentity { telegram_id }
            } else {
                e
            }
        })?;

        info!(user_id = %user.id, referred_by = ?user.referred_by, "User created");
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        self.repo
            .get(self.db.conn(), id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    pub async fn find_user_by_telegram_id(
        &self,
        telegram_id: TelegramId,
    ) -> Result<Option<User>, DomainError> {
        self.repo.find_by_telegram_id(self.db.conn(), telegram_id).await
    }

    pub async fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>, DomainError> {
        self.repo.find_by_referral_code(self.db.conn(), code).await
    }

    #[instrument(skip(self, profile), fields(user_id = %id))]
    pub async fn update_profile(
        &self,
        id: UserId,
        profile: UserProfile,
    ) -> Result<User, DomainError> {
        validate_profile(&profile)?;
        let conn = self.db.conn();
        let now = OffsetDateTime::now_utc();
        if !self.repo.update_profile(conn, id, profile, now).await? {
            return Err(DomainError::user_not_found(id));
        }
        self.get_user(id).await
    }

    /// Attribute an existing user to a referrer.
    ///
    /// The referrer is set once; the chain above the referrer must not lead back
    /// to the user.
    #[instrument(skip(self, source), fields(user_id = %id))]
    pub async fn claim_referrer(
        &self,
        id: UserId,
        source: ReferralSource,
    ) -> Result<User, DomainError> {
        let user = self.get_user(id).await?;
        if user.referred_by.is_some() {
            return Err(DomainError::ReferrerAlreadySet { user_id: id });
        }

        let referrer = self.resolve_referrer(&source).await?;
        if referrer.id == id {
            return Err(DomainError::ReferralCycle { user_id: id });
        }

        let repo = Arc::clone(&self.repo);
        let max_depth = self.config.max_referral_depth;
        let referrer_id = referrer.id;
        self.db
            .in_transaction_mapped(DomainError::storage_infra, move |tx| {
                Box::pin(async move {
                    // Walk up from the referrer; reaching the user would close a loop.
                    let mut cursor = referrer.referred_by;
                    let mut depth = 0_u32;
                    while let Some(ancestor) = cursor {
                        if ancestor == id {
                            return Err(DomainError::ReferralCycle { user_id: id });
                        }
                        depth += 1;
                        if depth > max_depth {
                            return Err(DomainError::validation(
                                "referrer",
                                format!("referral chain deeper than {max_depth}"),
                            ));
                        }
                        cursor = repo.get(tx, ancestor).await?.and_then(|u| u.referred_by);
                    }

                    let now = OffsetDateTime::now_utc();
                    if !repo.set_referrer_if_unset(tx, id, referrer_id, now).await? {
                        return Err(DomainError::ReferrerAlreadySet { user_id: id });
                    }
                    Ok(())
                })
            })
            .await?;

        info!(referrer_id = %referrer_id, "Referrer attributed");
        self.get_user(id).await
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn list_referrals(&self, id: UserId) -> Result<Vec<User>, DomainError> {
        let conn = self.db.conn();
        if self.repo.get(conn, id).await?.is_none() {
            return Err(DomainError::user_not_found(id));
        }
        let referees = self.repo.list_referred_by(conn, id).await?;
        debug!("Found {} referees", referees.len());
        Ok(referees)
    }

    /// Resolve a referral source to the referring user.
    async fn resolve_referrer(&self, source: &ReferralSource) -> Result<User, DomainError> {
        match source {
            ReferralSource::ReferralCode(code) => self
                .repo
                .find_by_referral_code(self.db.conn(), code)
                .await?
                .ok_or_else(|| DomainError::UnknownReferralCode { code: code.clone() }),
            ReferralSource::InviteLink(invite_code) => {
                let account = self.referrals.resolve_link(invite_code).await?;
                self.get_user(account.user_id).await
            }
        }
    }
}
