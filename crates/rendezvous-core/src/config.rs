//! Configuration system for the rendezvous relay.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RENDEZVOUS_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/rendezvous/config.toml
//!   3. ~/.config/rendezvous/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    pub network: NetworkConfig,
    pub registry: RegistryConfig,
    pub tls: TlsConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How often the stale-entry sweep runs. 0 = never.
    pub eviction_interval_secs: u64,
    /// Entries idle for longer than this are evicted by the sweep.
    pub eviction_threshold_secs: u64,
    /// Per-connection outbound queue depth, in frames.
    pub outbound_queue: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM certificate chain. Unset = plain HTTP/WS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
    /// PEM private key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origin allowed to call the HTTP endpoints, or "*".
    pub allowed_origin: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            eviction_interval_secs: 600,
            eviction_threshold_secs: 600,
            outbound_queue: 64,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Sweep period, or `None` when eviction is disabled.
    pub fn eviction_interval(&self) -> Option<Duration> {
        (self.eviction_interval_secs > 0).then(|| Duration::from_secs(self.eviction_interval_secs))
    }

    pub fn eviction_threshold(&self) -> Duration {
        Duration::from_secs(self.eviction_threshold_secs)
    }
}

impl TlsConfig {
    /// Certificate and key paths, when both are configured.
    pub fn paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("rendezvous")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RendezvousConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            RendezvousConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RENDEZVOUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&RendezvousConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.outbound_queue == 0 {
            return Err(ConfigError::Invalid("registry.outbound_queue must be at least 1"));
        }
        if self.registry.eviction_interval_secs > 0 && self.registry.eviction_threshold_secs == 0 {
            return Err(ConfigError::Invalid(
                "registry.eviction_threshold_secs must be non-zero while eviction is enabled",
            ));
        }
        if self.tls.cert_path.is_some() != self.tls.key_path.is_some() {
            return Err(ConfigError::Invalid(
                "tls.cert_path and tls.key_path must be set together",
            ));
        }
        Ok(())
    }

    /// Apply RENDEZVOUS_* overrides. `lookup` resolves a variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RENDEZVOUS_NETWORK__BIND_ADDR") {
            self.network.bind_addr = v;
        }
        if let Some(p) = lookup("RENDEZVOUS_NETWORK__PORT").and_then(|v| v.parse().ok()) {
            self.network.port = p;
        }
        if let Some(s) =
            lookup("RENDEZVOUS_REGISTRY__EVICTION_INTERVAL_SECS").and_then(|v| v.parse().ok())
        {
            self.registry.eviction_interval_secs = s;
        }
        if let Some(s) =
            lookup("RENDEZVOUS_REGISTRY__EVICTION_THRESHOLD_SECS").and_then(|v| v.parse().ok())
        {
            self.registry.eviction_threshold_secs = s;
        }
        if let Some(n) = lookup("RENDEZVOUS_REGISTRY__OUTBOUND_QUEUE").and_then(|v| v.parse().ok())
        {
            self.registry.outbound_queue = n;
        }
        if let Some(v) = lookup("RENDEZVOUS_TLS__CERT_PATH") {
            self.tls.cert_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RENDEZVOUS_TLS__KEY_PATH") {
            self.tls.key_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RENDEZVOUS_CORS__ALLOWED_ORIGIN") {
            self.cors.allowed_origin = v;
        }
    }
}
