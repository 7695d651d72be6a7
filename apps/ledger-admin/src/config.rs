//! Layered configuration: defaults, then YAML, then `LEDGER__*` environment
//! variables, then command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use ledger_db::{ConnectOpts, redact_credentials_in_dsn};
use referral_ledger::ReferralLedgerConfig;
use serde::{Deserialize, Serialize};

/// Environment prefix; nesting uses `__`, e.g. `LEDGER__DATABASE__DSN`.
pub const ENV_PREFIX: &str = "LEDGER__";

const DEFAULT_DSN: &str = "sqlite://ledger.db?mode=rwc";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub referral_ledger: ReferralLedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub dsn: String,
    pub pool: ConnectOpts,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: DEFAULT_DSN.to_owned(),
            pool: ConnectOpts::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `referral_ledger=debug,sqlx=warn`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Text,
        }
    }
}

/// Command-line values that take precedence over every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dsn: Option<String>,
    pub verbose: u8,
}

impl AppConfig {
    /// Load the layered configuration.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or malformed, a key is unknown, or the
    /// referral ledger section is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment
            .extract()
            .context("failed to parse configuration (yaml/env)")?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(dsn) = &cli.dsn {
            self.database.dsn.clone_from(dsn);
        }
        match cli.verbose {
            0 => {}
            1 => "info".clone_into(&mut self.logging.level),
            2 => "debug".clone_into(&mut self.logging.level),
            _ => "trace".clone_into(&mut self.logging.level),
        }
    }

    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.database.dsn.trim().is_empty() {
            anyhow::bail!("database.dsn must not be empty");
        }
        self.referral_ledger
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid referral_ledger configuration")
    }

    /// Render as YAML with the DSN password redacted.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be rendered as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.database.dsn = redact_credentials_in_dsn(Some(&self.database.dsn));
        serde_saphyr::to_string(&shown).context("failed to render configuration as yaml")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_load_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.database.dsn, DEFAULT_DSN);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.referral_ledger, ReferralLedgerConfig::default());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  dsn: \"sqlite::memory:\"\nreferral_ledger:\n  code_length: 12\n  default_link_policy: exclusive"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.database.dsn, "sqlite::memory:");
        assert_eq!(config.referral_ledger.code_length, 12);
        assert_eq!(config.referral_ledger.invite_code_length, 10);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "referral_ledger:\n  bogus: 1").unwrap();

        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/ledger.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliOverrides {
            dsn: Some("sqlite::memory:".to_owned()),
            verbose: 2,
        });
        assert_eq!(config.database.dsn, "sqlite::memory:");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn yaml_dump_redacts_password() {
        let mut config = AppConfig::default();
        config.database.dsn = "postgres://ledger:hunter2@db:5432/ledger".to_owned();

        let yaml = config.to_yaml().unwrap();

        assert!(!yaml.contains("hunter2"), "{yaml}");
        assert!(yaml.contains("***"), "{yaml}");
    }

    #[test]
    fn pool_timeout_accepts_humantime() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database:\n  pool:\n    acquire_timeout: 5s\n    max_conns: 3").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.database.pool.acquire_timeout, std::time::Duration::from_secs(5));
        assert_eq!(config.database.pool.max_conns, 3);
    }
}
