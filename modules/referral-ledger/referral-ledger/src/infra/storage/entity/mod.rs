pub mod admin_setting_audit;
pub mod admin_settings;
pub mod admin_user;
pub mod referral_account;
pub mod referral_link;
pub mod reward_balance;
pub mod reward_ledger_entry;
pub mod user;
