use referral_ledger_sdk::LinkPolicy;
use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Configuration for the `referral-ledger` module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferralLedgerConfig {
    /// Length of user and account referral codes.
    pub code_length: usize,
    /// Length of invite codes.
    pub invite_code_length: usize,
    /// Attempts before a token allocation gives up with `CodeAllocationExhausted`.
    pub max_code_allocation_attempts: u32,
    /// Optimistic-write attempts before `ConcurrentModification`.
    pub max_write_retries: u32,
    /// Longest referrer chain walked by cycle detection.
    pub max_referral_depth: u32,
    pub default_link_policy: LinkPolicyConfig,
    pub default_audit_page_size: u64,
    pub max_audit_page_size: u64,
}

/// Serialized form of [`LinkPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicyConfig {
    #[default]
    Additive,
    Exclusive,
}

impl From<LinkPolicyConfig> for LinkPolicy {
    fn from(value: LinkPolicyConfig) -> Self {
        match value {
            LinkPolicyConfig::Additive => Self::Additive,
            LinkPolicyConfig::Exclusive => Self::Exclusive,
        }
    }
}

impl Default for ReferralLedgerConfig {
    fn default() -> Self {
        Self {
            code_length: 8,
            invite_code_length: 10,
            max_code_allocation_attempts: 5,
            max_write_retries: 8,
            max_referral_depth: 64,
            default_link_policy: LinkPolicyConfig::Additive,
            default_audit_page_size: 50,
            max_audit_page_size: 500,
        }
    }
}

impl ReferralLedgerConfig {
    /// Reject settings the services cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if !(4..=64).contains(&self.code_length) {
            return Err(format!(
                "code_length must be within 4..=64, got {}",
                self.code_length
            ));
        }
        if !(4..=64).contains(&self.invite_code_length) {
            return Err(format!(
                "invite_code_length must be within 4..=64, got {}",
                self.invite_code_length
            ));
        }
        if self.max_code_allocation_attempts == 0 {
            return Err("max_code_allocation_attempts must be at least 1".to_owned());
        }
        if self.max_write_retries == 0 {
            return Err("max_write_retries must be at least 1".to_owned());
        }
        if self.max_referral_depth == 0 {
            return Err("max_referral_depth must be at least 1".to_owned());
        }
        if self.default_audit_page_size == 0 || self.max_audit_page_size == 0 {
            return Err("audit page sizes must be at least 1".to_owned());
        }
        if self.default_audit_page_size > self.max_audit_page_size {
            return Err(format!(
                "default_audit_page_size ({}) exceeds max_audit_page_size ({})",
                self.default_audit_page_size, self.max_audit_page_size
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            code_length: self.code_length,
            invite_code_length: self.invite_code_length,
            max_code_allocation_attempts: self.max_code_allocation_attempts,
            max_write_retries: self.max_write_retries,
            max_referral_depth: self.max_referral_depth,
            default_link_policy: self.default_link_policy.into(),
            default_audit_page_size: self.default_audit_page_size,
            max_audit_page_size: self.max_audit_page_size,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ReferralLedgerConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.code_length, 8);
        assert_eq!(cfg.max_code_allocation_attempts, 5);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: ReferralLedgerConfig = serde_json::from_value(serde_json::json!({
            "default_link_policy": "exclusive",
            "max_write_retries": 3
        }))
        .unwrap();
        assert_eq!(cfg.default_link_policy, LinkPolicyConfig::Exclusive);
        assert_eq!(cfg.max_write_retries, 3);
        assert_eq!(cfg.invite_code_length, 10);
        assert_eq!(
            cfg.service_config().default_link_policy,
            LinkPolicy::Exclusive
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_value::<ReferralLedgerConfig>(serde_json::json!({
            "code_lenght": 8
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn inverted_audit_page_sizes_fail_validation() {
        let cfg = ReferralLedgerConfig {
            default_audit_page_size: 600,
            ..ReferralLedgerConfig::default()
        };
        assert!(cfg.validate().unwrap_err().contains("default_audit_page_size"));
    }

    #[test]
    fn zero_attempts_fail_validation() {
        let cfg = ReferralLedgerConfig {
            max_code_allocation_attempts: 0,
            ..ReferralLedgerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
