//! # Liquidity Aggregator Test Suite
//!
//! Two aggregators on two chains, wired through loopback channels, so every
//! arrival order can be driven by hand.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Two-chain fixture, deliveries as values
//! └── integration/
//!     ├── flows.rs      # Dispatch fan-out and concurrent delivery
//!     └── scenarios.rs  # Arrival orders, failures, reconciliation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p la-tests
//!
//! # By category
//! cargo test -p la-tests integration::scenarios::
//!
//! # Benchmarks
//! cargo bench -p la-tests
//! ```
//!
//! Set `LA_LOG_LEVEL=debug` to see ledger transitions while a test runs.

pub mod harness;
pub mod integration;
