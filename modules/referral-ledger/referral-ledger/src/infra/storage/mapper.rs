//! Conversions between `SeaORM` models and SDK contract types.
//!
//! Columns decoded from text (decimals, JSON, enum tags) fail with a storage
//! error rather than panicking on corrupted rows.

use std::str::FromStr;

use referral_ledger_sdk::{
    AdminRole, AdminUser, LedgerEntry, LedgerEntryKind, ReferralAccount, ReferralLink,
    RewardBalance, SettingAudit, SettingsEntry, User,
};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::error::DomainError;
use crate::domain::repos::{VersionedBalance, VersionedSettings};
use crate::infra::storage::entity::{
    admin_setting_audit, admin_settings, admin_user, referral_account, referral_link,
    reward_balance, reward_ledger_entry, user,
};

impl From<user::Model> for User {
    fn from(e: user::Model) -> Self {
        Self {
            id: e.id,
            telegram_id: e.telegram_id,
            username: e.username,
            first_name: e.first_name,
            last_name: e.last_name,
            referral_code: e.referral_code,
            referred_by: e.referred_by,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<referral_account::Model> for ReferralAccount {
    fn from(e: referral_account::Model) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            referral_code: e.referral_code,
            rewards_wallet_id: e.rewards_wallet_id,
            last_link_update_at: e.last_link_update_at,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<referral_link::Model> for ReferralLink {
    fn from(e: referral_link::Model) -> Self {
        Self {
            id: e.id,
            referral_account_id: e.referral_account_id,
            invite_code: e.invite_code,
            is_active: e.is_active,
            created_at: e.created_at,
        }
    }
}

fn corrupt(column: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::database(format!("corrupt value in column '{column}': {detail}"))
}

/// Canonical text form of a money amount.
pub fn decimal_to_text(amount: Decimal) -> String {
    amount.normalize().to_string()
}

pub fn decimal_from_text(column: &str, raw: &str) -> Result<Decimal, DomainError> {
    Decimal::from_str(raw).map_err(|e| corrupt(column, e))
}

pub fn json_to_text(value: &Value) -> String {
    value.to_string()
}

pub fn json_from_text(column: &str, raw: &str) -> Result<Value, DomainError> {
    serde_json::from_str(raw).map_err(|e| corrupt(column, e))
}

pub fn balance_from_model(e: reward_balance::Model) -> Result<VersionedBalance, DomainError> {
    Ok(VersionedBalance {
        balance: RewardBalance {
            user_id: e.user_id,
            total_paid: decimal_from_text("total_paid", &e.total_paid)?,
            total_unpaid: decimal_from_text("total_unpaid", &e.total_unpaid)?,
            updated_at: Some(e.updated_at),
        },
        version: e.version,
    })
}

pub fn entry_from_model(e: reward_ledger_entry::Model) -> Result<LedgerEntry, DomainError> {
    Ok(LedgerEntry {
        id: e.id,
        user_id: e.user_id,
        kind: LedgerEntryKind::from_str(&e.kind).map_err(|err| corrupt("kind", err))?,
        amount: decimal_from_text("amount", &e.amount)?,
        admin_id: e.admin_id,
        note: e.note,
        created_at: e.created_at,
    })
}

pub fn admin_from_model(e: admin_user::Model) -> Result<AdminUser, DomainError> {
    Ok(AdminUser {
        id: e.id,
        telegram_id: e.telegram_id,
        role: AdminRole::from_str(&e.role).map_err(|err| corrupt("role", err))?,
        created_at: e.created_at,
    })
}

pub fn settings_from_model(e: admin_settings::Model) -> Result<VersionedSettings, DomainError> {
    Ok(VersionedSettings {
        entry: SettingsEntry {
            settings: json_from_text("settings", &e.settings)?,
            namespace: e.namespace,
            created_at: e.created_at,
            updated_at: e.updated_at,
        },
        version: e.version,
    })
}

pub fn audit_from_model(e: admin_setting_audit::Model) -> Result<SettingAudit, DomainError> {
    Ok(SettingAudit {
        id: e.id,
        admin_id: e.admin_id,
        old_value: e
            .old_value
            .as_deref()
            .map(|raw| json_from_text("old_value", raw))
            .transpose()?,
        new_value: e
            .new_value
            .as_deref()
            .map(|raw| json_from_text("new_value", raw))
            .transpose()?,
        namespace: e.namespace,
        updated_at: e.updated_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn decimals_keep_exact_value() {
        let amount = Decimal::from_str("0.10").unwrap() + Decimal::from_str("0.20").unwrap();
        let text = decimal_to_text(amount);
        assert_eq!(text, "0.3");
        assert_eq!(decimal_from_text("amount", &text).unwrap(), amount);
    }

    #[test]
    fn corrupt_decimal_is_a_storage_error() {
        let err = decimal_from_text("total_paid", "12,5").unwrap_err();
        assert!(matches!(err, DomainError::Database { .. }));
    }

    #[test]
    fn audit_with_missing_old_value_maps_to_none() {
        let now = OffsetDateTime::now_utc();
        let audit = audit_from_model(admin_setting_audit::Model {
            id: Uuid::now_v7(),
            admin_id: None,
            namespace: "bot.rewards".to_owned(),
            old_value: None,
            new_value: Some(r#"{"rate":5}"#.to_owned()),
            updated_at: now,
        })
        .unwrap();
        assert_eq!(audit.old_value, None);
        assert_eq!(audit.new_value, Some(json!({"rate": 5})));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = admin_from_model(admin_user::Model {
            id: Uuid::now_v7(),
            telegram_id: 1,
            role: "root".to_owned(),
            created_at: OffsetDateTime::now_utc(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("role"));
    }
}
