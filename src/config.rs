//! Configuration management for wallet-session.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::controller::{Backoff, PollPolicy, SessionConfig};
use crate::sdk::loopback::{LoopbackAccount, LoopbackSettings};
use crate::sdk::{AuthParams, Blockchain, Network, WhiteLabel};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SDK credentials and network.
    pub sdk: SdkSection,
    /// Widget branding.
    pub white_label: WhiteLabelSection,
    /// Chain the RPC helper is bound to.
    pub chain: ChainSection,
    /// Address recovery poll.
    pub poll: PollSection,
    /// Logging configuration.
    pub logging: LoggingSection,
    /// Loopback backend used by the binary.
    pub loopback: LoopbackSection,
}

/// SDK configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkSection {
    /// Dashboard client id.
    pub client_id: String,
    /// Dashboard client secret.
    pub client_secret: String,
    /// Authentication network.
    pub network: Network,
}

/// Widget branding section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteLabelSection {
    /// Display name.
    pub name: String,
    /// Logo URL.
    pub logo: String,
}

impl Default for WhiteLabelSection {
    fn default() -> Self {
        Self {
            name: "XDC Auth".to_string(),
            logo: "https://xinfin.org/assets/images/brand-assets/xdc-icon.png".to_string(),
        }
    }
}

/// Chain descriptor section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSection {
    /// Blockchain family.
    pub blockchain: String,
    /// Network tier.
    pub network: String,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            blockchain: "xinfin".to_string(),
            network: "mainnet".to_string(),
        }
    }
}

/// Recovery poll section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSection {
    /// Interval between attempts in milliseconds.
    pub interval_ms: u64,
    /// Attempt cap; absent means unbounded.
    pub max_attempts: Option<u32>,
    /// Delay growth (`fixed` or `exponential`).
    pub backoff: Backoff,
    /// Backoff ceiling in milliseconds.
    pub max_interval_ms: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
            backoff: policy.backoff,
            max_interval_ms: policy.max_interval.as_millis() as u64,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Loopback backend section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackSection {
    /// Address the loopback provider resolves to.
    pub address: String,
    /// Chain id reported by the loopback RPC helper.
    pub chain_id: u64,
    /// Widget checks before the loopback provider appears.
    pub approve_after: u32,
}

impl Default for LoopbackSection {
    fn default() -> Self {
        let settings = LoopbackSettings::default();
        Self {
            address: settings.account.address,
            chain_id: settings.account.chain_id,
            approve_after: settings.approve_after,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(id) = std::env::var("WALLET_SESSION_CLIENT_ID") {
            self.sdk.client_id = id;
        }

        if let Ok(secret) = std::env::var("WALLET_SESSION_CLIENT_SECRET") {
            self.sdk.client_secret = secret;
        }

        if let Ok(network) = std::env::var("WALLET_SESSION_NETWORK") {
            self.sdk.network = network
                .parse()
                .map_err(|_| ConfigError::InvalidNetwork(network))?;
        }

        if let Ok(level) = std::env::var("WALLET_SESSION_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref id) = args.client_id {
            self.sdk.client_id = id.clone();
        }

        if let Some(ref secret) = args.client_secret {
            self.sdk.client_secret = secret.clone();
        }

        if let Some(network) = args.network {
            self.sdk.network = network;
        }

        if let Some(interval) = args.poll_interval_ms {
            self.poll.interval_ms = interval;
        }

        if let Some(max) = args.max_attempts {
            self.poll.max_attempts = Some(max);
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Build the poll policy.
    pub fn poll_policy(&self) -> Result<PollPolicy, ConfigError> {
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::InvalidPoll("interval_ms must be positive"));
        }
        if self.poll.backoff == Backoff::Exponential
            && self.poll.max_interval_ms < self.poll.interval_ms
        {
            return Err(ConfigError::InvalidPoll(
                "max_interval_ms must not be below interval_ms",
            ));
        }
        Ok(PollPolicy {
            interval: Duration::from_millis(self.poll.interval_ms),
            max_attempts: self.poll.max_attempts,
            backoff: self.poll.backoff,
            max_interval: Duration::from_millis(self.poll.max_interval_ms),
        })
    }

    /// Convert to the controller's settings.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        if self.sdk.client_id.trim().is_empty() {
            return Err(ConfigError::MissingField("sdk.client_id"));
        }

        Ok(SessionConfig {
            auth: AuthParams::web3auth(&self.sdk.client_id, &self.sdk.client_secret),
            white_label: WhiteLabel {
                name: self.white_label.name.clone(),
                logo: self.white_label.logo.clone(),
            },
            network: self.sdk.network,
            chain: Blockchain {
                blockchain: self.chain.blockchain.clone(),
                network: self.chain.network.clone(),
            },
            poll: self.poll_policy()?,
        })
    }

    /// Settings for the loopback backend.
    pub fn loopback_settings(&self) -> LoopbackSettings {
        LoopbackSettings {
            account: LoopbackAccount {
                address: self.loopback.address.clone(),
                chain_id: self.loopback.chain_id,
            },
            approve_after: self.loopback.approve_after,
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Unknown authentication network.
    InvalidNetwork(String),
    /// Inconsistent poll settings.
    InvalidPoll(&'static str),
    /// A required value is empty.
    MissingField(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidNetwork(network) => write!(f, "invalid network: {}", network),
            Self::InvalidPoll(reason) => write!(f, "invalid poll settings: {}", reason),
            Self::MissingField(field) => write!(f, "missing required setting: {}", field),
        }
    }
}

impl std::error::Error for ConfigError {}
