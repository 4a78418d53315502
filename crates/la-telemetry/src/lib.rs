//! # Liquidity Aggregator Telemetry
//!
//! Structured logging for aggregator nodes and test harnesses.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use la_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LA_SERVICE_NAME` | `liquidity-aggregator` | Service name in logs |
//! | `LA_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `LA_JSON_LOGS` | `false` (`true` in containers) | JSON output |
//! | `LA_NETWORK` | `testnet` | Network name |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, is_initialized};

// Used by the exported logging macros.
#[doc(hidden)]
pub use tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Log filter could not be parsed.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// `init_logging` already succeeded in this process.
    #[error("Logging already initialized")]
    AlreadyInitialized,

    /// Another global subscriber was installed first.
    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}
