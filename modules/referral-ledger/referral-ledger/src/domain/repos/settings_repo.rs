use async_trait::async_trait;
use ledger_db::DbConnTrait;
use referral_ledger_sdk::{SettingAudit, SettingsEntry};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct VersionedSettings {
    pub entry: SettingsEntry,
    pub version: i64,
}

/// Repository trait for namespaced settings and their audit trail.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        namespace: &str,
    ) -> Result<Option<VersionedSettings>, DomainError>;

    /// Create a namespace at version 1. A concurrent creator surfaces as
    /// `DomainError::UniqueViolation` on `namespace`.
    async fn insert<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        entry: &SettingsEntry,
    ) -> Result<(), DomainError>;

    /// Replace the value if the stored version still equals `expected_version`.
    async fn compare_and_swap<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        expected_version: i64,
        entry: &SettingsEntry,
    ) -> Result<bool, DomainError>;

    async fn append_audit<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        audit: &SettingAudit,
    ) -> Result<(), DomainError>;

    /// Newest first, optionally restricted to one namespace.
    async fn list_audit<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
        namespace: Option<&str>,
        limit: u64,
    ) -> Result<Vec<SettingAudit>, DomainError>;

    /// Sorted ascending.
    async fn list_namespaces<C: DbConnTrait + Send + Sync>(
        &self,
        conn: &C,
    ) -> Result<Vec<String>, DomainError>;
}
