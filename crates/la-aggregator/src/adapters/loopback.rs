//! Loopback channel adapters.
//!
//! Sends are queued instead of delivered so a harness can hand them to the
//! destination aggregator in any order, drop them, or replay them.

use crate::domain::{Address, Amount, ChainId};
use crate::ports::outbound::{BridgeChannel, ChannelError, MessageChannel};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Message accepted by the loopback endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Chain the message was sent from.
    pub source_chain: ChainId,
    /// Sending aggregator.
    pub sender: Address,
    /// Destination chain.
    pub destination: ChainId,
    /// Encoded payload.
    pub payload: Vec<u8>,
    /// Fee paid.
    pub fee: Amount,
}

/// Transfer accepted by the loopback bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeTransfer {
    /// Chain the transfer was sent from.
    pub source_chain: ChainId,
    /// Sending aggregator.
    pub sender: Address,
    /// Destination chain.
    pub destination: ChainId,
    /// Amount handed to the bridge.
    pub amount_sent: Amount,
    /// Amount the destination will observe after bridge slippage.
    pub amount_delivered: Amount,
    /// Recipient on the destination.
    pub recipient: Address,
    /// Opaque payload, if carried.
    pub payload: Option<Vec<u8>>,
}

/// Queue-backed message channel.
#[derive(Debug)]
pub struct LoopbackMessageChannel {
    source_chain: ChainId,
    sender: Address,
    base_fee: Amount,
    outbox: Mutex<VecDeque<OutboundMessage>>,
    failing: AtomicBool,
}

impl LoopbackMessageChannel {
    /// Channel for the aggregator at `sender` on `source_chain`.
    pub fn new(source_chain: ChainId, sender: Address, base_fee: Amount) -> Self {
        Self {
            source_chain,
            sender,
            base_fee,
            outbox: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make subsequent sends fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Take every queued message.
    pub fn drain(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().drain(..).collect()
    }

    /// Number of queued messages.
    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }
}

#[async_trait]
impl MessageChannel for LoopbackMessageChannel {
    async fn estimate_fee(&self, _destination: ChainId, payload_len: usize) -> Amount {
        self.base_fee + payload_len as Amount
    }

    async fn send(
        &self,
        destination: ChainId,
        payload: Vec<u8>,
        fee_paid: Amount,
    ) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("loopback endpoint down".to_string()));
        }
        let quoted = self.estimate_fee(destination, payload.len()).await;
        if fee_paid < quoted {
            return Err(ChannelError::FeeTooLow {
                quoted,
                paid: fee_paid,
            });
        }

        debug!(dst_chain = %destination, bytes = payload.len(), "Message queued");
        self.outbox.lock().push_back(OutboundMessage {
            source_chain: self.source_chain,
            sender: self.sender,
            destination,
            payload,
            fee: fee_paid,
        });
        Ok(())
    }
}

/// Queue-backed value bridge with configurable slippage.
#[derive(Debug)]
pub struct LoopbackBridgeChannel {
    source_chain: ChainId,
    sender: Address,
    carries_payload: bool,
    slippage_bps: AtomicU64,
    outbox: Mutex<VecDeque<BridgeTransfer>>,
    failing: AtomicBool,
}

impl LoopbackBridgeChannel {
    /// Bridge for the aggregator at `sender` on `source_chain`.
    pub fn new(source_chain: ChainId, sender: Address, carries_payload: bool) -> Self {
        Self {
            source_chain,
            sender,
            carries_payload,
            slippage_bps: AtomicU64::new(0),
            outbox: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Fraction of each transfer lost in transit, in basis points.
    pub fn set_slippage_bps(&self, bps: u64) {
        self.slippage_bps.store(bps.min(10_000), Ordering::SeqCst);
    }

    /// Make subsequent transfers fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Take every queued transfer.
    pub fn drain(&self) -> Vec<BridgeTransfer> {
        self.outbox.lock().drain(..).collect()
    }

    /// Number of queued transfers.
    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }
}

#[async_trait]
impl BridgeChannel for LoopbackBridgeChannel {
    fn supports_payload(&self) -> bool {
        self.carries_payload
    }

    async fn bridge(
        &self,
        destination: ChainId,
        amount: Amount,
        recipient: Address,
        payload: Option<Vec<u8>>,
    ) -> Result<(), ChannelError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("loopback bridge down".to_string()));
        }

        let bps = self.slippage_bps.load(Ordering::SeqCst) as Amount;
        let lost = amount.saturating_mul(bps) / 10_000;
        let payload = if self.carries_payload { payload } else { None };

        debug!(dst_chain = %destination, %amount, %lost, "Bridge transfer queued");
        self.outbox.lock().push_back(BridgeTransfer {
            source_chain: self.source_chain,
            sender: self.sender,
            destination,
            amount_sent: amount,
            amount_delivered: amount - lost,
            recipient,
            payload,
        });
        Ok(())
    }
}
