//! Startup configuration, resolved once and handed to the services.

use anyhow::Context;

use sanctuary_observability::LogSettings;
use sanctuary_redaction::RedactionConfig;

use crate::consent_service::ConsentServiceConfig;

pub const MAX_CONFLICT_RETRIES_ENV: &str = "SANCTUARY_MAX_CONFLICT_RETRIES";

#[derive(Debug, Clone)]
pub struct Settings {
    pub log: LogSettings,
    pub redaction: RedactionConfig,
    pub consent: ConsentServiceConfig,
}

impl Settings {
    /// Read every setting from the process environment.
    ///
    /// Fails when `SANCTUARY_REDACTION_HASH_KEY` is unset or too short.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log = LogSettings::from_lookup(&lookup).context("invalid log settings")?;
        let redaction = RedactionConfig::from_lookup(&lookup).context("invalid redaction settings")?;

        let mut consent = ConsentServiceConfig::default();
        if let Some(raw) = lookup(MAX_CONFLICT_RETRIES_ENV) {
            consent.max_conflict_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_CONFLICT_RETRIES_ENV} must be a non-negative integer, got {raw:?}"))?;
        }

        tracing::debug!(
            minimal_visible_suffix = redaction.minimal_visible_suffix,
            max_conflict_retries = consent.max_conflict_retries,
            log_format = ?log.format,
            "settings loaded"
        );
        Ok(Self {
            log,
            redaction,
            consent,
        })
    }
}
