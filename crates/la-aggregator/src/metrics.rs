//! Counters for dispatch and reconciliation
//!
//! Lock-free counters updated on the hot path. Repeated untrusted-source
//! rejections are the main operational signal for spoofing attempts.

use crate::domain::Amount;
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregator counters.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Legs debited and recorded
    pub legs_dispatched: AtomicU64,
    /// Legs rejected before debit
    pub legs_rejected: AtomicU64,
    /// Message sends that failed after the record was created
    pub message_dispatch_failures: AtomicU64,
    /// Bridge sends that failed after the record was created
    pub funds_dispatch_failures: AtomicU64,
    /// Inbound messages that mutated a record
    pub messages_accepted: AtomicU64,
    /// Inbound funds that mutated a record
    pub funds_accepted: AtomicU64,
    /// Replayed inbound events ignored
    pub duplicates_ignored: AtomicU64,
    /// Inbound events from unregistered or mismatched remotes
    pub untrusted_rejections: AtomicU64,
    /// Legs resolved `Credited`
    pub legs_credited: AtomicU64,
    /// Legs resolved `Refunded`
    pub legs_refunded: AtomicU64,
    /// Legs resolved `Expired`
    pub legs_expired: AtomicU64,
    /// Value credited to recipients (saturating)
    pub value_credited: AtomicU64,
    /// Value refunded (saturating)
    pub value_refunded: AtomicU64,
    /// Value parked in suspense (saturating)
    pub value_parked: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a leg dispatch
    pub fn record_dispatch(&self, message_ok: bool, funds_ok: bool) {
        self.legs_dispatched.fetch_add(1, Ordering::Relaxed);
        if !message_ok {
            self.message_dispatch_failures.fetch_add(1, Ordering::Relaxed);
        }
        if !funds_ok {
            self.funds_dispatch_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a rejected leg
    pub fn record_rejection(&self) {
        self.legs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accepted inbound message
    pub fn record_message_accepted(&self) {
        self.messages_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record accepted inbound funds
    pub fn record_funds_accepted(&self) {
        self.funds_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an idempotent replay
    pub fn record_duplicate(&self) {
        self.duplicates_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an untrusted-source rejection
    pub fn record_untrusted(&self) {
        self.untrusted_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a credit
    pub fn record_credited(&self, amount: Amount) {
        self.legs_credited.fetch_add(1, Ordering::Relaxed);
        add_value(&self.value_credited, amount);
    }

    /// Record a slippage refund
    pub fn record_refunded(&self, amount: Amount) {
        self.legs_refunded.fetch_add(1, Ordering::Relaxed);
        add_value(&self.value_refunded, amount);
    }

    /// Record an expiry; `returned` is the held value paid back
    pub fn record_expired(&self, returned: Amount) {
        self.legs_expired.fetch_add(1, Ordering::Relaxed);
        add_value(&self.value_refunded, returned);
    }

    /// Record value parked in suspense
    pub fn record_parked(&self, amount: Amount) {
        add_value(&self.value_parked, amount);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            legs_dispatched: self.legs_dispatched.load(Ordering::Relaxed),
            legs_rejected: self.legs_rejected.load(Ordering::Relaxed),
            message_dispatch_failures: self.message_dispatch_failures.load(Ordering::Relaxed),
            funds_dispatch_failures: self.funds_dispatch_failures.load(Ordering::Relaxed),
            messages_accepted: self.messages_accepted.load(Ordering::Relaxed),
            funds_accepted: self.funds_accepted.load(Ordering::Relaxed),
            duplicates_ignored: self.duplicates_ignored.load(Ordering::Relaxed),
            untrusted_rejections: self.untrusted_rejections.load(Ordering::Relaxed),
            legs_credited: self.legs_credited.load(Ordering::Relaxed),
            legs_refunded: self.legs_refunded.load(Ordering::Relaxed),
            legs_expired: self.legs_expired.load(Ordering::Relaxed),
            value_credited: self.value_credited.load(Ordering::Relaxed),
            value_refunded: self.value_refunded.load(Ordering::Relaxed),
            value_parked: self.value_parked.load(Ordering::Relaxed),
        }
    }
}

// Value counters are u64; larger amounts clamp instead of wrapping.
fn add_value(counter: &AtomicU64, amount: Amount) {
    let amount = u64::try_from(amount).unwrap_or(u64::MAX);
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_add(amount))
    });
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Legs dispatched
    pub legs_dispatched: u64,
    /// Legs rejected
    pub legs_rejected: u64,
    /// Failed message sends
    pub message_dispatch_failures: u64,
    /// Failed bridge sends
    pub funds_dispatch_failures: u64,
    /// Inbound messages accepted
    pub messages_accepted: u64,
    /// Inbound funds accepted
    pub funds_accepted: u64,
    /// Replays ignored
    pub duplicates_ignored: u64,
    /// Untrusted-source rejections
    pub untrusted_rejections: u64,
    /// Legs credited
    pub legs_credited: u64,
    /// Legs refunded
    pub legs_refunded: u64,
    /// Legs expired
    pub legs_expired: u64,
    /// Value credited
    pub value_credited: u64,
    /// Value refunded or returned
    pub value_refunded: u64,
    /// Value parked in suspense
    pub value_parked: u64,
}
