//! Public models for the referral-ledger module.
//!
//! These are transport-agnostic data structures that define the contract
//! between the module and its consumers (bot handlers, payout jobs, the dashboard).

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

pub type UserId = Uuid;
pub type ReferralAccountId = Uuid;
pub type ReferralLinkId = Uuid;
pub type AdminId = Uuid;
/// Telegram user id: the platform identity of users and operators.
pub type TelegramId = i64;

/// Optional display fields of a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Where a new signup says it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralSource {
    /// A user's own referral code.
    ReferralCode(String),
    /// An invite code issued by a referral account.
    InviteLink(String),
}

/// Data for registering a platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub telegram_id: TelegramId,
    pub profile: UserProfile,
    pub referrer: Option<ReferralSource>,
}

impl NewUser {
    #[must_use]
    pub fn new(telegram_id: TelegramId, profile: UserProfile) -> Self {
        Self {
            telegram_id,
            profile,
            referrer: None,
        }
    }

    #[must_use]
    pub fn referred_by(mut self, source: ReferralSource) -> Self {
        self.referrer = Some(source);
        self
    }
}

/// Canonical per-platform-user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub telegram_id: TelegramId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// A user's referral account (zero or one per user).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralAccount {
    pub id: ReferralAccountId,
    pub user_id: UserId,
    pub referral_code: String,
    pub rewards_wallet_id: Option<Uuid>,
    pub last_link_update_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Invite code scoped to a referral account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralLink {
    pub id: ReferralLinkId,
    pub referral_account_id: ReferralAccountId,
    pub invite_code: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

/// How issuing a link treats the account's other active links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPolicy {
    /// Keep every previously issued link active.
    #[default]
    Additive,
    /// Deactivate every other active link of the account.
    Exclusive,
}

impl LinkPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Additive => "additive",
            Self::Exclusive => "exclusive",
        }
    }
}

impl FromStr for LinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "additive" => Ok(Self::Additive),
            "exclusive" => Ok(Self::Exclusive),
            other => Err(format!("unknown link policy '{other}'")),
        }
    }
}

/// Accrued rewards of a user, split into paid and unpaid buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardBalance {
    pub user_id: UserId,
    pub total_paid: Decimal,
    pub total_unpaid: Decimal,
    /// `None` until the first credit.
    pub updated_at: Option<OffsetDateTime>,
}

impl RewardBalance {
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            total_paid: Decimal::ZERO,
            total_unpaid: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// Everything ever accrued: paid plus unpaid.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total_paid + self.total_unpaid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntryKind {
    Credit,
    Settle,
    Reverse,
}

impl LedgerEntryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Settle => "settle",
            Self::Reverse => "reverse",
        }
    }
}

impl FromStr for LedgerEntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "settle" => Ok(Self::Settle),
            "reverse" => Ok(Self::Reverse),
            other => Err(format!("unknown ledger entry kind '{other}'")),
        }
    }
}

/// Immutable journal row written with every balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub admin_id: Option<AdminId>,
    pub note: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Operator role. `SuperAdmin` satisfies every requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

impl AdminRole {
    #[must_use]
    pub fn satisfies(self, required: AdminRole) -> bool {
        self >= required
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown admin role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub id: AdminId,
    pub telegram_id: TelegramId,
    pub role: AdminRole,
    pub created_at: OffsetDateTime,
}

/// Namespaced configuration blob.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsEntry {
    pub namespace: String,
    pub settings: Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Append-only record of one settings transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingAudit {
    pub id: Uuid,
    /// `None` for system-initiated changes.
    pub admin_id: Option<AdminId>,
    pub namespace: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_satisfies_every_role() {
        assert!(AdminRole::SuperAdmin.satisfies(AdminRole::Admin));
        assert!(AdminRole::SuperAdmin.satisfies(AdminRole::SuperAdmin));
        assert!(AdminRole::Admin.satisfies(AdminRole::Admin));
        assert!(!AdminRole::Admin.satisfies(AdminRole::SuperAdmin));
    }

    #[test]
    fn role_parses_from_storage_form() {
        assert_eq!("admin".parse::<AdminRole>(), Ok(AdminRole::Admin));
        assert_eq!("super_admin".parse::<AdminRole>(), Ok(AdminRole::SuperAdmin));
        assert!("root".parse::<AdminRole>().is_err());
        assert_eq!(AdminRole::SuperAdmin.to_string(), "super_admin");
    }

    #[test]
    fn balance_total_sums_both_buckets() {
        let mut balance = RewardBalance::empty(Uuid::nil());
        assert_eq!(balance.total(), Decimal::ZERO);
        balance.total_paid = Decimal::new(40, 0);
        balance.total_unpaid = Decimal::new(605, 1);
        assert_eq!(balance.total(), Decimal::new(1005, 1));
    }

    #[test]
    fn link_policy_round_trips_through_str() {
        for policy in [LinkPolicy::Additive, LinkPolicy::Exclusive] {
            assert_eq!(policy.as_str().parse::<LinkPolicy>(), Ok(policy));
        }
        assert_eq!(LinkPolicy::default(), LinkPolicy::Additive);
    }
}
