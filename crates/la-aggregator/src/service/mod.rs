//! # Service Layer
//!
//! Stateful components behind the inbound ports.

pub mod aggregator;
pub mod ledger;
pub mod orchestrator;
pub mod registry;
pub mod validator;

pub use aggregator::{AggregatorPorts, LiquidityAggregator};
pub use ledger::{LedgerContext, LedgerTotals, ReconciliationLedger};
pub use orchestrator::{AggregationOrchestrator, OrchestratorContext};
pub use registry::TrustedRemoteRegistry;
pub use validator::{LegRequestValidator, ValidatedLeg};
