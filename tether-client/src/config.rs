//! Configuration for the tether client.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::{Endpoint, Identity};

use crate::keepalive::DEFAULT_KEEPALIVE;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote endpoint settings.
    pub network: NetworkConfig,
    /// Session identity.
    pub session: SessionConfig,
    /// Liveness probing.
    pub keepalive: KeepaliveConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Remote endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote port.
    pub port: u16,
}

/// Session identity configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session identifier presented to the server.
    pub id: String,
    /// Shared secret; only its digest ever goes on the wire.
    pub secret: String,
}

/// Liveness probing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Seconds between probes. Values below 1 fall back to the default.
    pub interval_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 2022,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_KEEPALIVE.as_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading & derived values ─────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::debug!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.network.host.clone(), self.network.port)
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.session.id.clone(), self.session.secret.clone())
    }

    /// The effective keepalive interval, clamped to the default when
    /// configured below one second.
    pub fn keepalive_interval(&self) -> Duration {
        if self.keepalive.interval_secs < 1 {
            DEFAULT_KEEPALIVE
        } else {
            Duration::from_secs(self.keepalive.interval_secs)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ClientConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("port"));
        assert!(text.contains("interval_secs"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ClientConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, 2022);
        assert_eq!(parsed.keepalive.interval_secs, 5);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: ClientConfig =
            toml::from_str("[network]\nhost = \"example.com\"\n").unwrap();
        assert_eq!(parsed.network.host, "example.com");
        assert_eq!(parsed.network.port, 2022);
        assert_eq!(parsed.keepalive.interval_secs, 5);
    }

    #[test]
    fn keepalive_interval_clamps() {
        let mut cfg = ClientConfig::default();
        cfg.keepalive.interval_secs = 0;
        assert_eq!(cfg.keepalive_interval(), DEFAULT_KEEPALIVE);

        cfg.keepalive.interval_secs = 30;
        assert_eq!(cfg.keepalive_interval(), Duration::from_secs(30));
    }
}
