//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or an `EnvFilter` directive
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Network identifier (testnet, mainnet, devnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "liquidity-aggregator".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            network: "testnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LA_SERVICE_NAME`: Service name (default: liquidity-aggregator)
    /// - `LA_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `LA_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `LA_NETWORK`: Network name (default: testnet)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("LA_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("LA_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: lookup("LA_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            network: lookup("LA_NETWORK").unwrap_or(defaults.network),
        }
    }

    /// Configuration for the aggregator running on one chain.
    pub fn for_chain(chain_id: u16) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("{}-{}", config.service_name, chain_id);
        config
    }

    /// Service name qualified by network.
    pub fn full_service_name(&self) -> String {
        format!("{}@{}", self.service_name, self.network)
    }
}
