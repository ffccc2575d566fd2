//! Redaction settings, resolved once and passed to [`Redactor`](crate::Redactor).
//!
//! There is no built-in hash key. A deployment that cannot supply one cannot
//! build a config, so `HASH_ONLY` digests are never computed under a key an
//! outsider could know.

use thiserror::Error;

use crate::mask::IdentifierHasher;

pub const HASH_KEY_ENV: &str = "SANCTUARY_REDACTION_HASH_KEY";
pub const MINIMAL_SUFFIX_ENV: &str = "SANCTUARY_MINIMAL_SUFFIX";

/// Shortest accepted hash key, in bytes.
pub const MIN_HASH_KEY_LEN: usize = 16;
const DEFAULT_MINIMAL_SUFFIX: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },

    #[error("hash key must be at least {min} bytes, got {actual}")]
    KeyTooShort { min: usize, actual: usize },

    #[error("hash key rejected: {0}")]
    InvalidKey(String),

    #[error("{name} is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct RedactionConfig {
    hasher: IdentifierHasher,
    /// Characters left visible by `MINIMAL` masking.
    pub minimal_visible_suffix: usize,
}

impl std::fmt::Debug for RedactionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedactionConfig")
            .field("hash_key", &"<redacted>")
            .field("minimal_visible_suffix", &self.minimal_visible_suffix)
            .finish()
    }
}

impl RedactionConfig {
    /// Config with the given secret key and the default `MINIMAL` suffix.
    pub fn new(hash_key: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        let key = hash_key.as_ref();
        if key.len() < MIN_HASH_KEY_LEN {
            return Err(ConfigError::KeyTooShort {
                min: MIN_HASH_KEY_LEN,
                actual: key.len(),
            });
        }
        let hasher = IdentifierHasher::new(key).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        Ok(Self {
            hasher,
            minimal_visible_suffix: DEFAULT_MINIMAL_SUFFIX,
        })
    }

    pub fn with_minimal_visible_suffix(mut self, visible: usize) -> Self {
        self.minimal_visible_suffix = visible;
        self
    }

    pub fn hasher(&self) -> &IdentifierHasher {
        &self.hasher
    }

    /// Read settings from the process environment. The hash key is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup(HASH_KEY_ENV).ok_or(ConfigError::Missing { name: HASH_KEY_ENV })?;
        let mut config = Self::new(key)?;

        if let Some(raw) = lookup(MINIMAL_SUFFIX_ENV) {
            config.minimal_visible_suffix =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        name: MINIMAL_SUFFIX_ENV,
                        value: raw.clone(),
                    })?;
        }

        Ok(config)
    }
}
