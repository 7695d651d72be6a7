//! JSON views of ledger records for command output.

use referral_ledger_sdk::{
    AdminUser, LedgerEntry, ReferralAccount, ReferralLink, RewardBalance, SettingAudit, User,
};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

pub fn user(user: &User) -> Value {
    json!({
        "id": user.id,
        "telegram_id": user.telegram_id,
        "username": user.username,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "referral_code": user.referral_code,
        "referred_by": user.referred_by,
        "created_at": timestamp(user.created_at),
        "updated_at": timestamp(user.updated_at),
    })
}

pub fn account(account: &ReferralAccount) -> Value {
    json!({
        "id": account.id,
        "user_id": account.user_id,
        "referral_code": account.referral_code,
        "rewards_wallet_id": account.rewards_wallet_id,
        "last_link_update_at": account.last_link_update_at.map(timestamp),
        "created_at": timestamp(account.created_at),
    })
}

pub fn link(link: &ReferralLink) -> Value {
    json!({
        "id": link.id,
        "referral_account_id": link.referral_account_id,
        "invite_code": link.invite_code,
        "is_active": link.is_active,
        "created_at": timestamp(link.created_at),
    })
}

/// Amounts are rendered as strings to keep every decimal digit.
pub fn balance(balance: &RewardBalance) -> Value {
    json!({
        "user_id": balance.user_id,
        "total_paid": balance.total_paid.to_string(),
        "total_unpaid": balance.total_unpaid.to_string(),
        "total": balance.total().to_string(),
        "updated_at": balance.updated_at.map(timestamp),
    })
}

pub fn entry(entry: &LedgerEntry) -> Value {
    json!({
        "id": entry.id,
        "kind": entry.kind.as_str(),
        "amount": entry.amount.to_string(),
        "admin_id": entry.admin_id,
        "note": entry.note,
        "created_at": timestamp(entry.created_at),
    })
}

pub fn admin(admin: &AdminUser) -> Value {
    json!({
        "id": admin.id,
        "telegram_id": admin.telegram_id,
        "role": admin.role.as_str(),
        "created_at": timestamp(admin.created_at),
    })
}

pub fn audit(audit: &SettingAudit) -> Value {
    json!({
        "id": audit.id,
        "admin_id": audit.admin_id,
        "namespace": audit.namespace,
        "old_value": audit.old_value,
        "new_value": audit.new_value,
        "updated_at": timestamp(audit.updated_at),
    })
}

pub fn list<T>(items: &[T], view: fn(&T) -> Value) -> Value {
    Value::Array(items.iter().map(view).collect())
}
