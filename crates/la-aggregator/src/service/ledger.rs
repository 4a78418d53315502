//! # Reconciliation Ledger
//!
//! Per-leg correlation of the two inbound channels and the single
//! `Pending → {Credited, Refunded, Expired}` transition.
//!
//! ## Locking
//!
//! Records sit behind their own mutex inside the key map. Nothing takes the
//! map lock while holding a record lock; pruning is the only path that locks
//! records under the map lock. Distinct keys never contend and the same key
//! is fully linearised.
//!
//! ## Value accounting
//!
//! Every accepted funds arrival adds to `bridged_in`, and debited value parked
//! after an unconfirmed bridge send adds to `outbound_parked`. Value leaves
//! only as a credit, a refund, or an owner release of surplus or suspense, so
//! `credited + refunded + released <= bridged_in + outbound_parked` holds at
//! all times. Totals saturate rather than wrap.

use crate::algorithms::decide_resolution;
use crate::domain::{
    invariant_conservation, Address, AggregatorError, Amount, ArrivalOutcome, ChainId, Channel,
    CorrelationKey, FundsArrival, InboundMessage, LegCorrelationRecord, LegOrigin, LegStatus,
    OutboundLegParams, SweepOutcome,
};
use crate::metrics::Metrics;
use crate::ports::outbound::{Clock, LiquidityVault};
use crate::service::registry::TrustedRemoteRegistry;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type RecordCell = Arc<Mutex<LegCorrelationRecord>>;

/// Running value totals on this chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Value accepted from the bridge, including parked value.
    pub bridged_in: Amount,
    /// Value credited to recipients.
    pub credited: Amount,
    /// Value returned on slippage refunds and inbound expiries.
    pub refunded: Amount,
    /// Surplus and suspense released by the owner.
    pub released: Amount,
    /// Debited value returned to depositors on outbound expiry.
    pub outbound_returned: Amount,
    /// Debited value parked because a bridge send never confirmed.
    pub outbound_parked: Amount,
}

impl LedgerTotals {
    /// Paid-out value never exceeds bridged-in value.
    pub fn is_conserved(&self) -> bool {
        invariant_conservation(
            self.bridged_in.saturating_add(self.outbound_parked),
            self.credited,
            self.refunded,
            self.released,
        )
    }
}

/// Dependencies of the ledger.
pub struct LedgerContext {
    /// Chain the ledger runs on.
    pub local_chain_id: ChainId,
    /// Deadline window for inbound-created records.
    pub settlement_window_secs: u64,
    /// Age after which terminal records are archived.
    pub retention_secs: u64,
    /// Trust table for inbound authentication.
    pub registry: Arc<TrustedRemoteRegistry>,
    /// Where credits and refunds are paid from.
    pub vault: Arc<dyn LiquidityVault>,
    /// Logical time.
    pub clock: Arc<dyn Clock>,
    /// Shared counters.
    pub metrics: Arc<Metrics>,
}

/// Reconciliation state machine.
pub struct ReconciliationLedger {
    ctx: LedgerContext,
    records: RwLock<HashMap<CorrelationKey, RecordCell>>,
    archived: RwLock<HashSet<CorrelationKey>>,
    suspense: Mutex<HashMap<ChainId, Amount>>,
    totals: Mutex<LedgerTotals>,
    next_seq: AtomicU64,
    // Serialises payload-less funds matching so two arrivals never pick the same record.
    fallback: Mutex<()>,
}

impl ReconciliationLedger {
    /// Empty ledger.
    pub fn new(ctx: LedgerContext) -> Self {
        Self {
            ctx,
            records: RwLock::new(HashMap::new()),
            archived: RwLock::new(HashSet::new()),
            suspense: Mutex::new(HashMap::new()),
            totals: Mutex::new(LedgerTotals::default()),
            next_seq: AtomicU64::new(0),
            fallback: Mutex::new(()),
        }
    }

    /// Reject events whose sender is not the trusted remote for `chain`.
    pub fn authenticate(
        &self,
        channel: Channel,
        chain: ChainId,
        sender: &Address,
    ) -> Result<(), AggregatorError> {
        if chain != self.ctx.local_chain_id && self.ctx.registry.is_trusted(chain, sender) {
            return Ok(());
        }
        self.ctx.metrics.record_untrusted();
        warn!(
            %channel,
            src_chain = %chain,
            sender = %hex::encode(sender),
            "Rejected inbound event from untrusted source"
        );
        Err(AggregatorError::UntrustedSource {
            chain,
            sender: *sender,
        })
    }

    // ---------------------------------------------------------------------
    // Outbound side
    // ---------------------------------------------------------------------

    /// Create the record for a leg dispatched from this chain.
    pub fn register_outbound(&self, params: OutboundLegParams) -> Result<(), AggregatorError> {
        let key = params.correlation_key;
        if self.archived.read().contains(&key) {
            return Err(AggregatorError::DuplicateRecord(key));
        }
        let mut records = self.records.write();
        if records.contains_key(&key) {
            return Err(AggregatorError::DuplicateRecord(key));
        }
        let record = LegCorrelationRecord::outbound(params, self.next_seq());
        records.insert(key, Arc::new(Mutex::new(record)));
        Ok(())
    }

    /// Record which channel sends went out. Held value is released from the
    /// record once the bridge has taken it.
    pub fn complete_dispatch(
        &self,
        key: &CorrelationKey,
        message_dispatched: bool,
        funds_dispatched: bool,
    ) -> Result<(), AggregatorError> {
        let cell = self.cell(key).ok_or(AggregatorError::RecordNotFound(*key))?;
        let mut record = cell.lock();
        record.message_dispatched = message_dispatched;
        record.funds_dispatched = funds_dispatched;
        if funds_dispatched {
            record.held = 0;
        }
        record.dispatch_in_flight = false;
        Ok(())
    }

    /// Close out a dispatch whose sends were cut short.
    ///
    /// If the bridge call never started, the debit stays held for the sweep
    /// to return. If it started but never confirmed, the value may already be
    /// on its way, so it is parked in suspense for the destination chain.
    pub fn abandon_dispatch(
        &self,
        key: &CorrelationKey,
        message_dispatched: bool,
        bridge_started: bool,
    ) {
        let Some(cell) = self.cell(key) else {
            return;
        };
        let mut record = cell.lock();
        if !record.dispatch_in_flight {
            return;
        }
        record.message_dispatched = message_dispatched;
        record.funds_dispatched = false;
        record.dispatch_in_flight = false;

        let parked = if bridge_started {
            std::mem::take(&mut record.held)
        } else {
            0
        };
        if parked > 0 {
            {
                let mut totals = self.totals.lock();
                add_total(&mut totals.outbound_parked, parked);
            }
            let chain = record
                .destination_chain_id
                .unwrap_or(record.source_chain_id);
            self.add_suspense(chain, parked);
        }
        warn!(
            correlation_key = %key,
            message_dispatched,
            bridge_started,
            parked = %parked,
            "Dispatch abandoned before completion"
        );
    }

    // ---------------------------------------------------------------------
    // Inbound side
    // ---------------------------------------------------------------------

    /// Message channel delivered a leg's metadata.
    pub fn on_message_arrived(
        &self,
        message: InboundMessage,
    ) -> Result<ArrivalOutcome, AggregatorError> {
        self.authenticate(Channel::Message, message.source_chain_id, &message.sender)?;

        let payload = message.payload;
        let key = payload.correlation_key;
        let cell = self.inbound_cell(key, message.source_chain_id)?;
        let mut record = cell.lock();
        check_inbound_record(&record, message.source_chain_id, &message.sender)?;

        if record.message_arrived {
            self.ctx.metrics.record_duplicate();
            debug!(correlation_key = %key, "Replayed message ignored");
            return Ok(ArrivalOutcome::Duplicate(key));
        }
        if record.status.is_terminal() {
            return Err(AggregatorError::AlreadyResolved(key));
        }

        record.expected_amount = payload.amount;
        record.min_amount = payload.min_amount;
        record.recipient = Some(payload.recipient);
        record.refund_recipient.get_or_insert(payload.recipient);
        record.message_arrived = true;
        self.ctx.metrics.record_message_accepted();

        if record.funds_arrived {
            return self.resolve(&mut record, payload.recipient);
        }
        info!(
            correlation_key = %key,
            src_chain = %message.source_chain_id,
            amount = %payload.amount,
            "Message recorded, awaiting funds"
        );
        Ok(ArrivalOutcome::Recorded(key))
    }

    /// Bridge delivered value, with or without a correlating payload.
    ///
    /// Value that cannot be applied to a record is parked in suspense for the
    /// source chain and the event is rejected.
    pub fn on_funds_arrived(
        &self,
        arrival: FundsArrival,
    ) -> Result<ArrivalOutcome, AggregatorError> {
        self.authenticate(Channel::Funds, arrival.source_chain_id, &arrival.sender)?;

        let result = match arrival.payload {
            Some(payload) => self
                .inbound_cell(payload.correlation_key, arrival.source_chain_id)
                .and_then(|cell| {
                    let mut record = cell.lock();
                    check_inbound_record(&record, arrival.source_chain_id, &arrival.sender)?;
                    self.apply_funds(&mut record, arrival.observed_amount, Some(payload.recipient))
                }),
            None => self.apply_funds_fallback(&arrival),
        };

        if let Err(err) = &result {
            self.park(arrival.source_chain_id, arrival.observed_amount, err);
        }
        result
    }

    /// Permissionless deadline sweep. Idempotent; anything not eligible is a no-op.
    pub fn sweep_expired(&self, key: &CorrelationKey) -> Result<SweepOutcome, AggregatorError> {
        let Some(cell) = self.cell(key) else {
            return Ok(SweepOutcome::NotEligible);
        };
        let now = self.ctx.clock.now();
        let mut record = cell.lock();
        if record.status.is_terminal() || !record.is_past_deadline(now) || record.dispatch_in_flight
        {
            return Ok(SweepOutcome::NotEligible);
        }

        record.transition_to(LegStatus::Expired, now)?;
        let returned = std::mem::take(&mut record.held);
        if returned > 0 {
            match record.refund_recipient {
                Some(to) => self.ctx.vault.release(&to, returned),
                None => self.add_suspense(record.source_chain_id, returned),
            }
        }

        {
            let mut totals = self.totals.lock();
            match record.origin {
                LegOrigin::Inbound if record.refund_recipient.is_some() => {
                    add_total(&mut totals.refunded, returned)
                }
                LegOrigin::Inbound => {}
                LegOrigin::Outbound => add_total(&mut totals.outbound_returned, returned),
            }
        }
        self.ctx.metrics.record_expired(returned);
        info!(
            correlation_key = %key,
            origin = ?record.origin,
            message_arrived = record.message_arrived,
            funds_arrived = record.funds_arrived,
            returned = %returned,
            "Leg expired"
        );
        Ok(SweepOutcome::Expired {
            correlation_key: *key,
            refunded: returned,
        })
    }

    // ---------------------------------------------------------------------
    // Owner reconciliation
    // ---------------------------------------------------------------------

    /// Release retained surplus of a terminal leg.
    pub fn release_surplus(
        &self,
        caller: Address,
        key: &CorrelationKey,
        to: Address,
        amount: Amount,
    ) -> Result<(), AggregatorError> {
        self.ctx.registry.ensure_owner(&caller)?;
        let cell = self.cell(key).ok_or(AggregatorError::RecordNotFound(*key))?;
        let mut record = cell.lock();
        if amount == 0 || amount > record.surplus {
            return Err(AggregatorError::NothingToRelease {
                requested: amount,
                held: record.surplus,
            });
        }
        record.surplus -= amount;
        self.ctx.vault.release(&to, amount);
        add_total(&mut self.totals.lock().released, amount);
        info!(correlation_key = %key, %amount, to = %hex::encode(to), "Surplus released");
        Ok(())
    }

    /// Release value parked in suspense for `chain`.
    pub fn settle_suspense(
        &self,
        caller: Address,
        chain: ChainId,
        to: Address,
        amount: Amount,
    ) -> Result<(), AggregatorError> {
        self.ctx.registry.ensure_owner(&caller)?;
        {
            let mut suspense = self.suspense.lock();
            let held = suspense.get(&chain).copied().unwrap_or(0);
            if amount == 0 || amount > held {
                return Err(AggregatorError::NothingToRelease {
                    requested: amount,
                    held,
                });
            }
            suspense.insert(chain, held - amount);
        }
        self.ctx.vault.release(&to, amount);
        add_total(&mut self.totals.lock().released, amount);
        info!(src_chain = %chain, %amount, to = %hex::encode(to), "Suspense settled");
        Ok(())
    }

    /// Archive terminal records past retention. Records still holding value are kept.
    pub fn prune_resolved(&self) -> usize {
        let now = self.ctx.clock.now();
        let retention = self.ctx.retention_secs;
        let mut records = self.records.write();
        let expired: Vec<CorrelationKey> = records
            .iter()
            .filter(|(_, cell)| {
                let record = cell.lock();
                record.status.is_terminal()
                    && record.held == 0
                    && record.surplus == 0
                    && record
                        .resolved_at
                        .is_some_and(|at| at.saturating_add(retention) <= now)
            })
            .map(|(key, _)| *key)
            .collect();

        let mut archived = self.archived.write();
        for key in &expired {
            records.remove(key);
            archived.insert(*key);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "Archived resolved records");
        }
        expired.len()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Snapshot of a live record.
    pub fn record(&self, key: &CorrelationKey) -> Option<LegCorrelationRecord> {
        self.cell(key).map(|cell| cell.lock().clone())
    }

    /// Key was pruned after resolution.
    pub fn is_archived(&self, key: &CorrelationKey) -> bool {
        self.archived.read().contains(key)
    }

    /// Live records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// No live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of records still `Pending`.
    pub fn pending_keys(&self) -> Vec<CorrelationKey> {
        self.snapshot_cells()
            .into_iter()
            .filter(|(_, cell)| cell.lock().status == LegStatus::Pending)
            .map(|(key, _)| key)
            .collect()
    }

    /// Value parked for `chain`.
    pub fn suspense_balance(&self, chain: ChainId) -> Amount {
        self.suspense.lock().get(&chain).copied().unwrap_or(0)
    }

    /// Running value totals.
    pub fn totals(&self) -> LedgerTotals {
        *self.totals.lock()
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    fn cell(&self, key: &CorrelationKey) -> Option<RecordCell> {
        self.records.read().get(key).cloned()
    }

    fn snapshot_cells(&self) -> Vec<(CorrelationKey, RecordCell)> {
        self.records
            .read()
            .iter()
            .map(|(key, cell)| (*key, cell.clone()))
            .collect()
    }

    /// Existing record, or a fresh inbound one for whichever channel came first.
    fn inbound_cell(
        &self,
        key: CorrelationKey,
        source_chain: ChainId,
    ) -> Result<RecordCell, AggregatorError> {
        if let Some(cell) = self.cell(&key) {
            return Ok(cell);
        }
        if self.archived.read().contains(&key) {
            return Err(AggregatorError::AlreadyResolved(key));
        }

        let deadline = self
            .ctx
            .clock
            .now()
            .saturating_add(self.ctx.settlement_window_secs);
        let mut records = self.records.write();
        let cell = records.entry(key).or_insert_with(|| {
            let record =
                LegCorrelationRecord::inbound(key, source_chain, deadline, self.next_seq());
            Arc::new(Mutex::new(record))
        });
        Ok(cell.clone())
    }

    fn apply_funds(
        &self,
        record: &mut LegCorrelationRecord,
        observed: Amount,
        bridge_recipient: Option<Address>,
    ) -> Result<ArrivalOutcome, AggregatorError> {
        let key = record.correlation_key;
        if record.status.is_terminal() {
            return Err(AggregatorError::AlreadyResolved(key));
        }
        if record.funds_arrived {
            return Err(AggregatorError::DuplicateFunds(key));
        }

        record.funds_arrived = true;
        record.funds_amount_observed = observed;
        record.held = observed;
        if let Some(recipient) = bridge_recipient {
            record.refund_recipient.get_or_insert(recipient);
        }
        add_total(&mut self.totals.lock().bridged_in, observed);
        self.ctx.metrics.record_funds_accepted();

        if let (true, Some(recipient)) = (record.message_arrived, record.recipient) {
            return self.resolve(record, recipient);
        }
        info!(
            correlation_key = %key,
            src_chain = %record.source_chain_id,
            amount = %observed,
            "Funds recorded, awaiting message"
        );
        Ok(ArrivalOutcome::Recorded(key))
    }

    /// Oldest pending inbound record from the same chain that has its message,
    /// lacks funds, and authorises at least the observed amount.
    fn apply_funds_fallback(
        &self,
        arrival: &FundsArrival,
    ) -> Result<ArrivalOutcome, AggregatorError> {
        let _serial = self.fallback.lock();

        let mut candidates: Vec<(u64, RecordCell)> = self
            .snapshot_cells()
            .into_iter()
            .filter_map(|(_, cell)| {
                let seq = {
                    let record = cell.lock();
                    fallback_matches(&record, arrival).then_some(record.created_seq)
                };
                seq.map(|seq| (seq, cell))
            })
            .collect();
        candidates.sort_by_key(|(seq, _)| *seq);

        for (_, cell) in candidates {
            let mut record = cell.lock();
            // A keyed arrival may have landed since the scan.
            if fallback_matches(&record, arrival) {
                debug!(
                    correlation_key = %record.correlation_key,
                    amount = %arrival.observed_amount,
                    "Payload-less funds matched"
                );
                return self.apply_funds(&mut record, arrival.observed_amount, None);
            }
        }

        Err(AggregatorError::UncorrelatedFunds {
            chain: arrival.source_chain_id,
            amount: arrival.observed_amount,
        })
    }

    fn resolve(
        &self,
        record: &mut LegCorrelationRecord,
        recipient: Address,
    ) -> Result<ArrivalOutcome, AggregatorError> {
        let now = self.ctx.clock.now();
        let resolution = decide_resolution(
            record.funds_amount_observed,
            record.expected_amount,
            record.min_amount,
        );
        record.transition_to(resolution.status, now)?;

        let paid = resolution.credited + resolution.refunded;
        if paid > 0 {
            self.ctx.vault.release(&recipient, paid);
        }
        record.held = 0;
        record.surplus = resolution.surplus;

        {
            let mut totals = self.totals.lock();
            add_total(&mut totals.credited, resolution.credited);
            add_total(&mut totals.refunded, resolution.refunded);
        }
        match resolution.status {
            LegStatus::Credited => self.ctx.metrics.record_credited(resolution.credited),
            _ => self.ctx.metrics.record_refunded(resolution.refunded),
        }

        info!(
            correlation_key = %record.correlation_key,
            src_chain = %record.source_chain_id,
            status = ?resolution.status,
            credited = %resolution.credited,
            refunded = %resolution.refunded,
            surplus = %resolution.surplus,
            "Leg resolved"
        );
        Ok(ArrivalOutcome::Resolved {
            correlation_key: record.correlation_key,
            status: resolution.status,
            credited: resolution.credited,
            refunded: resolution.refunded,
            surplus: resolution.surplus,
        })
    }

    /// Newly arrived value that could not be applied to a record.
    fn park(&self, chain: ChainId, amount: Amount, reason: &AggregatorError) {
        add_total(&mut self.totals.lock().bridged_in, amount);
        self.add_suspense(chain, amount);
        warn!(src_chain = %chain, %amount, %reason, "Funds parked in suspense");
    }

    fn add_suspense(&self, chain: ChainId, amount: Amount) {
        if amount == 0 {
            return;
        }
        add_total(self.suspense.lock().entry(chain).or_default(), amount);
        self.ctx.metrics.record_parked(amount);
    }

    /// Park value that arrived but could not be decoded.
    pub(crate) fn park_rejected_funds(
        &self,
        chain: ChainId,
        amount: Amount,
        reason: &AggregatorError,
    ) {
        self.park(chain, amount, reason);
    }
}

fn add_total(total: &mut Amount, amount: Amount) {
    *total = total.saturating_add(amount);
}

fn check_inbound_record(
    record: &LegCorrelationRecord,
    source_chain: ChainId,
    sender: &Address,
) -> Result<(), AggregatorError> {
    if record.origin == LegOrigin::Outbound {
        return Err(AggregatorError::DuplicateRecord(record.correlation_key));
    }
    if record.source_chain_id != source_chain {
        return Err(AggregatorError::UntrustedSource {
            chain: source_chain,
            sender: *sender,
        });
    }
    Ok(())
}

fn fallback_matches(record: &LegCorrelationRecord, arrival: &FundsArrival) -> bool {
    record.origin == LegOrigin::Inbound
        && record.status == LegStatus::Pending
        && record.source_chain_id == arrival.source_chain_id
        && record.message_arrived
        && !record.funds_arrived
        && record.expected_amount >= arrival.observed_amount
}
