// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading and validation for the kinezumiko daemon.
//!
//! This crate provides [`BotConfig`] — the top-level runtime settings —
//! together with loading from an optional TOML file and advisory
//! [`ConfigWarning`]s. There is no environment-variable layer and no config
//! merging: the daemon reads at most one file, once, at startup.
#![deny(unsafe_code)]

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading or validating a [`BotConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },
    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent startup but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The administrative conversation was left at its conventional default,
    /// which almost certainly does not identify a real conversation.
    AdminConversationIsDefault,
    /// The flow retention window is unusually short, so multi-step flows
    /// (e.g. the guessing game) may be evicted before a user replies.
    ShortFlowRetention {
        /// The configured retention window, in seconds.
        secs: f64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::AdminConversationIsDefault => {
                write!(f, "admin_conversation is left at its conventional default; no real conversation is ever addressed as such")
            }
            ConfigWarning::ShortFlowRetention { secs } => {
                write!(f, "flow_retention_secs is unusually short ({secs}s); flows may be evicted before a user can reply")
            }
        }
    }
}

/// The conventional default for [`BotConfig::admin_conversation`], carried
/// over from the source's `conf.INTERIOR` — an id no real gateway issues.
pub const DEFAULT_ADMIN_CONVERSATION: i64 = -114514;

const DEFAULT_FLOW_RETENTION_SECS: f64 = 300.0;
const SHORT_FLOW_RETENTION_THRESHOLD_SECS: f64 = 10.0;

/// Top-level runtime configuration for the kinezumiko daemon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// The conversation debug output and admin commands are addressed to.
    pub admin_conversation: i64,
    /// Base URL of the gateway HTTP endpoint (e.g. a gocqhttp instance).
    pub gateway_base_url: String,
    /// How long a started conversation flow survives without a reply, in
    /// seconds, before [`kzm_runtime`]'s `PipelineHost` evicts it as stale.
    pub flow_retention_secs: f64,
    /// Directory holding the workbook files `kzm-docstore` reads/writes.
    pub workbook_dir: PathBuf,
    /// Address the daemon's HTTP ingestion server binds to.
    pub bind_address: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            admin_conversation: DEFAULT_ADMIN_CONVERSATION,
            gateway_base_url: "http://127.0.0.1:5700".to_string(),
            flow_retention_secs: DEFAULT_FLOW_RETENTION_SECS,
            workbook_dir: PathBuf::from("./workbooks"),
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Loads a [`BotConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file, with any field it
///   omits falling back to [`BotConfig::default()`]'s value.
/// * If `path` is `None`, returns [`BotConfig::default()`] outright.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig, ConfigError> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .map_err(|_| ConfigError::FileNotFound { path: p.display().to_string() })?;
            parse_toml(&content)
        }
        None => Ok(BotConfig::default()),
    }
}

/// Parses a TOML string into a [`BotConfig`], field-by-field, falling back
/// to compiled-in defaults for anything the string omits.
pub fn parse_toml(content: &str) -> Result<BotConfig, ConfigError> {
    toml::from_str(content).map_err(|err| ConfigError::ParseError { reason: err.to_string() })
}

/// Validates a parsed configuration, returning advisory warnings.
///
/// There is currently no way to misconfigure a [`BotConfig`] into an
/// unusable state — every field has a workable fallback — so this never
/// returns [`ConfigError::ValidationError`] today. It still returns a
/// `Result` so a future hard constraint (e.g. an unparsable bind address)
/// doesn't need a signature change to report one.
pub fn validate_config(config: &BotConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut warnings = Vec::new();

    if config.admin_conversation == DEFAULT_ADMIN_CONVERSATION {
        warnings.push(ConfigWarning::AdminConversationIsDefault);
    }
    if config.flow_retention_secs < SHORT_FLOW_RETENTION_THRESHOLD_SECS {
        warnings.push(ConfigWarning::ShortFlowRetention { secs: config.flow_retention_secs });
    }

    Ok(warnings)
}
