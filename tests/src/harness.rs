//! # Two-Chain Harness
//!
//! Two aggregators wired through loopback channels. Sends are collected as
//! [`Delivery`] values so a test decides the arrival order, drops some, or
//! replays them.

use la_aggregator::{
    Address, AggregateOutcome, AggregateRequest, AggregatorAdminApi, AggregatorConfig,
    AggregatorError, AggregatorPorts, Amount, ArrivalOutcome, BridgeTransfer, ChainId,
    InboundHandlerApi, InMemoryVault, Leg, LiquidityAggregator, LiquidityAggregatorApi,
    LoopbackBridgeChannel, LoopbackMessageChannel, ManualClock, OutboundMessage, RemotePair,
    MESSAGE_PAYLOAD_LEN,
};
use la_signature::test_helpers::{generate_signer, sign_leg, SigningKey};
use la_telemetry::{init_logging, log_event, TelemetryConfig, TelemetryError};
use std::sync::Arc;

/// First chain.
pub const CHAIN_A: ChainId = ChainId(101);
/// Second chain.
pub const CHAIN_B: ChainId = ChainId(102);
/// Owner of both aggregators.
pub const OWNER: Address = [0xA0; 20];
/// Base message fee on both loopback endpoints.
pub const BASE_FEE: Amount = 1_000;
/// Fee quoted per leg.
pub const LEG_FEE: Amount = BASE_FEE + MESSAGE_PAYLOAD_LEN as Amount;
/// Logical time at harness start.
pub const GENESIS: u64 = 1_700_000_000;

/// Install logging once per test binary.
pub fn init_test_logging() {
    let config = TelemetryConfig {
        log_level: "warn".to_string(),
        ..TelemetryConfig::from_env()
    };
    match init_logging(&config) {
        Ok(()) | Err(TelemetryError::AlreadyInitialized) => {}
        Err(err) => eprintln!("test logging disabled: {err}"),
    }
}

/// One chain: its aggregator and the adapters behind it.
pub struct Node {
    /// Aggregator under test.
    pub aggregator: Arc<LiquidityAggregator>,
    /// Local balances.
    pub vault: Arc<InMemoryVault>,
    /// Outbound message queue.
    pub messages: Arc<LoopbackMessageChannel>,
    /// Outbound bridge queue.
    pub bridge: Arc<LoopbackBridgeChannel>,
    /// Aggregator address.
    pub address: Address,
}

impl Node {
    /// Chain of this node.
    pub fn chain(&self) -> ChainId {
        self.aggregator.chain_id()
    }
}

/// A depositor with a signing key.
pub struct User {
    /// Signing key.
    pub key: SigningKey,
    /// Derived address.
    pub address: Address,
}

/// One queued send, not yet delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Message-channel send.
    Message(OutboundMessage),
    /// Bridge transfer.
    Funds(BridgeTransfer),
}

/// Two aggregators trusting each other.
pub struct Harness {
    /// Chain A.
    pub a: Node,
    /// Chain B.
    pub b: Node,
    /// Shared logical clock.
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Harness whose bridges carry correlation payloads.
    pub fn new() -> Self {
        Self::with_bridge_payloads(true)
    }

    /// Harness choosing whether bridges carry payloads.
    pub fn with_bridge_payloads(carry_payload: bool) -> Self {
        init_test_logging();
        let clock = Arc::new(ManualClock::new(GENESIS));
        let a = build_node(CHAIN_A, [0x0A; 20], carry_payload, clock.clone());
        let b = build_node(CHAIN_B, [0x0B; 20], carry_payload, clock.clone());

        a.aggregator
            .set_trusted_remote(OWNER, CHAIN_B, RemotePair::new(b.address, a.address))
            .expect("owner sets trusted remote");
        b.aggregator
            .set_trusted_remote(OWNER, CHAIN_A, RemotePair::new(a.address, b.address))
            .expect("owner sets trusted remote");

        Self { a, b, clock }
    }

    /// Node for `chain`.
    pub fn node(&self, chain: ChainId) -> &Node {
        if chain == CHAIN_A {
            &self.a
        } else {
            &self.b
        }
    }

    /// New user funded and approved on `node`.
    pub fn user(&self, node: &Node, balance: Amount) -> User {
        let (key, address) = generate_signer();
        node.vault.mint(address, balance);
        node.vault.approve(address, balance);
        User { key, address }
    }

    /// Leg from `src` signed by `user`.
    pub fn signed_leg(
        &self,
        user: &User,
        src: ChainId,
        dst: ChainId,
        amount: Amount,
        min_amount: Amount,
        deadline: u64,
    ) -> Leg {
        let mut leg = Leg {
            destination_chain_id: dst,
            amount,
            min_amount,
            deadline,
            signature: Vec::new(),
        };
        leg.signature = sign_leg(&leg.content(src, user.address), &user.key)
            .to_bytes()
            .to_vec();
        leg
    }

    /// Submit legs on `node` with exactly the quoted fee.
    pub async fn aggregate(
        &self,
        node: &Node,
        user: &User,
        legs: Vec<Leg>,
    ) -> Result<AggregateOutcome, AggregatorError> {
        let fee_paid = LEG_FEE * legs.len() as Amount;
        node.aggregator
            .aggregate(AggregateRequest {
                depositor: user.address,
                legs,
                fee_paid,
            })
            .await
    }

    /// Drain every queued send of `node`, messages first.
    pub fn collect(&self, node: &Node) -> Vec<Delivery> {
        let mut out: Vec<Delivery> = node
            .messages
            .drain()
            .into_iter()
            .map(Delivery::Message)
            .collect();
        out.extend(node.bridge.drain().into_iter().map(Delivery::Funds));
        out
    }

    /// Deliver one send to its destination aggregator.
    pub fn deliver(&self, delivery: &Delivery) -> Result<ArrivalOutcome, AggregatorError> {
        let (kind, src, dst) = match delivery {
            Delivery::Message(m) => ("message", m.source_chain, m.destination),
            Delivery::Funds(f) => ("funds", f.source_chain, f.destination),
        };
        log_event!(debug, "harness", "Delivering", kind, src_chain = %src, dst_chain = %dst);

        match delivery {
            Delivery::Message(msg) => self.node(msg.destination).aggregator.receive_message(
                msg.source_chain,
                msg.sender,
                &msg.payload,
            ),
            Delivery::Funds(transfer) => {
                let target = self.node(transfer.destination);
                target.vault.fund_custody(transfer.amount_delivered);
                target.aggregator.receive_funds(
                    transfer.source_chain,
                    transfer.sender,
                    transfer.amount_delivered,
                    transfer.payload.as_deref(),
                )
            }
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

fn build_node(
    chain: ChainId,
    address: Address,
    carry_payload: bool,
    clock: Arc<ManualClock>,
) -> Node {
    let vault = Arc::new(InMemoryVault::new());
    let messages = Arc::new(LoopbackMessageChannel::new(chain, address, BASE_FEE));
    let bridge = Arc::new(LoopbackBridgeChannel::new(chain, address, carry_payload));
    let ports = AggregatorPorts {
        vault: vault.clone(),
        messages: messages.clone(),
        bridge: bridge.clone(),
        clock,
    };
    let config = AggregatorConfig::for_chain(chain, address, OWNER);
    let aggregator = LiquidityAggregator::new(config, ports).expect("valid harness config");
    Node {
        aggregator: Arc::new(aggregator),
        vault,
        messages,
        bridge,
        address,
    }
}
