//! # Liquidity Aggregator Service
//!
//! Wires registry, ledger and orchestrator together behind the inbound ports.

use crate::algorithms::{decode_bridge_payload, decode_message_payload};
use crate::domain::{
    Address, AggregateOutcome, AggregateRequest, AggregatorConfig, AggregatorError, Amount,
    ArrivalOutcome, ChainId, Channel, CorrelationKey, FundsArrival, InboundMessage,
    LegCorrelationRecord, RemotePair, SweepOutcome,
};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ports::inbound::{AggregatorAdminApi, InboundHandlerApi, LiquidityAggregatorApi};
use crate::ports::outbound::{BridgeChannel, Clock, LiquidityVault, MessageChannel};
use crate::service::ledger::{LedgerContext, LedgerTotals, ReconciliationLedger};
use crate::service::orchestrator::{AggregationOrchestrator, OrchestratorContext};
use crate::service::registry::TrustedRemoteRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// External collaborators of one aggregator.
#[derive(Clone)]
pub struct AggregatorPorts {
    /// Local balances.
    pub vault: Arc<dyn LiquidityVault>,
    /// Message network.
    pub messages: Arc<dyn MessageChannel>,
    /// Value bridge.
    pub bridge: Arc<dyn BridgeChannel>,
    /// Logical time.
    pub clock: Arc<dyn Clock>,
}

/// Cross-chain liquidity aggregator for one chain.
pub struct LiquidityAggregator {
    config: AggregatorConfig,
    registry: Arc<TrustedRemoteRegistry>,
    ledger: Arc<ReconciliationLedger>,
    orchestrator: AggregationOrchestrator,
    metrics: Arc<Metrics>,
}

impl LiquidityAggregator {
    /// Build an aggregator. The configured owner administers the trust table.
    pub fn new(config: AggregatorConfig, ports: AggregatorPorts) -> Result<Self, AggregatorError> {
        config.validate()?;

        let metrics = Arc::new(Metrics::new());
        let registry = Arc::new(TrustedRemoteRegistry::new(config.owner));
        let ledger = Arc::new(ReconciliationLedger::new(LedgerContext {
            local_chain_id: config.local_chain_id,
            settlement_window_secs: config.inbound_settlement_window_secs,
            retention_secs: config.retention_secs,
            registry: registry.clone(),
            vault: ports.vault.clone(),
            clock: ports.clock.clone(),
            metrics: metrics.clone(),
        }));
        let orchestrator = AggregationOrchestrator::new(OrchestratorContext {
            local_chain_id: config.local_chain_id,
            max_legs_per_request: config.max_legs_per_request,
            registry: registry.clone(),
            ledger: ledger.clone(),
            vault: ports.vault,
            messages: ports.messages,
            bridge: ports.bridge,
            clock: ports.clock,
            metrics: metrics.clone(),
        });

        info!(
            chain = %config.local_chain_id,
            address = %hex::encode(config.local_address),
            "Liquidity aggregator started"
        );
        Ok(Self {
            config,
            registry,
            ledger,
            orchestrator,
            metrics,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Chain this aggregator runs on.
    pub fn chain_id(&self) -> ChainId {
        self.config.local_chain_id
    }

    /// Trust table.
    pub fn registry(&self) -> &TrustedRemoteRegistry {
        &self.registry
    }

    /// Reconciliation ledger.
    pub fn ledger(&self) -> &ReconciliationLedger {
        &self.ledger
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Value totals of the ledger.
    pub fn totals(&self) -> LedgerTotals {
        self.ledger.totals()
    }

    /// Value parked for `chain`.
    pub fn suspense_balance(&self, chain: ChainId) -> Amount {
        self.ledger.suspense_balance(chain)
    }

    /// Archive terminal records past retention.
    pub fn prune_resolved(&self) -> usize {
        self.ledger.prune_resolved()
    }

    /// Owner-only removal of a trusted remote.
    pub fn remove_trusted_remote(
        &self,
        caller: Address,
        chain: ChainId,
    ) -> Result<Option<RemotePair>, AggregatorError> {
        self.registry.remove_trusted_remote(caller, chain)
    }
}

#[async_trait]
impl LiquidityAggregatorApi for LiquidityAggregator {
    async fn aggregate(
        &self,
        request: AggregateRequest,
    ) -> Result<AggregateOutcome, AggregatorError> {
        self.orchestrator.aggregate(request).await
    }

    fn sweep_expired(&self, key: &CorrelationKey) -> Result<SweepOutcome, AggregatorError> {
        self.ledger.sweep_expired(key)
    }

    fn record(&self, key: &CorrelationKey) -> Option<LegCorrelationRecord> {
        self.ledger.record(key)
    }
}

impl InboundHandlerApi for LiquidityAggregator {
    fn receive_message(
        &self,
        source_chain: ChainId,
        sender: Address,
        payload: &[u8],
    ) -> Result<ArrivalOutcome, AggregatorError> {
        // Trust before parsing anything the sender controls.
        self.ledger.authenticate(Channel::Message, source_chain, &sender)?;
        let payload = decode_message_payload(payload)?;
        self.ledger.on_message_arrived(InboundMessage {
            source_chain_id: source_chain,
            sender,
            payload,
        })
    }

    fn receive_funds(
        &self,
        source_chain: ChainId,
        sender: Address,
        observed_amount: Amount,
        payload: Option<&[u8]>,
    ) -> Result<ArrivalOutcome, AggregatorError> {
        self.ledger.authenticate(Channel::Funds, source_chain, &sender)?;
        let payload = match payload.map(decode_bridge_payload).transpose() {
            Ok(payload) => payload,
            Err(err) => {
                self.ledger
                    .park_rejected_funds(source_chain, observed_amount, &err);
                return Err(err);
            }
        };
        self.ledger.on_funds_arrived(FundsArrival {
            source_chain_id: source_chain,
            sender,
            observed_amount,
            payload,
        })
    }
}

impl AggregatorAdminApi for LiquidityAggregator {
    fn set_trusted_remote(
        &self,
        caller: Address,
        chain: ChainId,
        pair: RemotePair,
    ) -> Result<(), AggregatorError> {
        self.registry.set_trusted_remote(caller, chain, pair)
    }

    fn set_trusted_remote_path(
        &self,
        caller: Address,
        chain: ChainId,
        path: &[u8],
    ) -> Result<(), AggregatorError> {
        self.registry.set_trusted_remote_path(caller, chain, path)
    }

    fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), AggregatorError> {
        self.registry.transfer_ownership(caller, new_owner)
    }

    fn release_surplus(
        &self,
        caller: Address,
        key: &CorrelationKey,
        to: Address,
        amount: Amount,
    ) -> Result<(), AggregatorError> {
        self.ledger.release_surplus(caller, key, to, amount)
    }

    fn settle_suspense(
        &self,
        caller: Address,
        chain: ChainId,
        to: Address,
        amount: Amount,
    ) -> Result<(), AggregatorError> {
        self.ledger.settle_suspense(caller, chain, to, amount)
    }
}
