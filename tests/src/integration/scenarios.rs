//! # Reconciliation Scenarios
//!
//! Arrival orders and failure modes across two chains:
//!
//! 1. Funds before message, within slippage → `Credited`
//! 2. Message only, deadline passes → `Expired`, no value moves
//! 3. Funds below the floor → `Refunded`
//! 4. Untrusted source → rejected, nothing recorded
//!
//! plus idempotent delivery, no double credit, conservation under shuffled
//! arrival, partial dispatch failure and payload-less bridge matching.

#[cfg(test)]
mod tests {
    use crate::harness::{Delivery, Harness, CHAIN_A, CHAIN_B, GENESIS, LEG_FEE, OWNER};
    use la_aggregator::{
        AggregatorAdminApi, AggregatorError, ArrivalOutcome, ChainId, CorrelationKey,
        InboundHandlerApi, LegDispatchResult, LegStatus, LiquidityAggregatorApi, SweepOutcome,
    };
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    const DAY: u64 = 24 * 3600;

    fn split(deliveries: Vec<Delivery>) -> (Vec<Delivery>, Vec<Delivery>) {
        deliveries
            .into_iter()
            .partition(|d| matches!(d, Delivery::Message(_)))
    }

    fn only_key(outcome: &la_aggregator::AggregateOutcome) -> CorrelationKey {
        outcome.results[0]
            .correlation_key()
            .expect("leg dispatched")
    }

    // =========================================================================
    // SCENARIOS A-D
    // =========================================================================

    #[tokio::test]
    async fn scenario_a_funds_before_message_credits_observed() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        h.a.bridge.set_slippage_bps(300);

        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let outcome = h.aggregate(&h.a, &user, vec![leg]).await.unwrap();
        let key = only_key(&outcome);

        let (messages, funds) = split(h.collect(&h.a));
        assert_eq!(
            h.deliver(&funds[0]).unwrap(),
            ArrivalOutcome::Recorded(key)
        );
        let resolved = h.deliver(&messages[0]).unwrap();
        assert_eq!(
            resolved,
            ArrivalOutcome::Resolved {
                correlation_key: key,
                status: LegStatus::Credited,
                credited: 97,
                refunded: 0,
                surplus: 0,
            }
        );
        assert_eq!(h.b.vault.balance_of(&user.address), 97);
        assert_eq!(h.a.vault.balance_of(&user.address), 900);
    }

    #[tokio::test]
    async fn scenario_b_message_only_expires_without_value() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + 60);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());

        let (messages, _lost_funds) = split(h.collect(&h.a));
        h.deliver(&messages[0]).unwrap();

        assert_eq!(
            h.b.aggregator.sweep_expired(&key).unwrap(),
            SweepOutcome::NotEligible
        );
        h.clock.advance(DAY + 1);
        assert_eq!(
            h.b.aggregator.sweep_expired(&key).unwrap(),
            SweepOutcome::Expired {
                correlation_key: key,
                refunded: 0
            }
        );
        let record = h.b.aggregator.record(&key).unwrap();
        assert_eq!(record.status, LegStatus::Expired);
        assert_eq!(h.b.vault.balance_of(&user.address), 0);
        assert_eq!(h.b.vault.custody(), 0);
    }

    #[tokio::test]
    async fn scenario_c_below_floor_refunds_observed() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        h.a.bridge.set_slippage_bps(2_000);

        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());
        for delivery in h.collect(&h.a) {
            h.deliver(&delivery).unwrap();
        }

        let record = h.b.aggregator.record(&key).unwrap();
        assert_eq!(record.status, LegStatus::Refunded);
        assert_eq!(record.funds_amount_observed, 80);
        assert_eq!(h.b.vault.balance_of(&user.address), 80);
        assert_eq!(h.b.aggregator.metrics().legs_credited, 0);
        assert_eq!(h.b.aggregator.metrics().legs_refunded, 1);
    }

    #[tokio::test]
    async fn scenario_d_untrusted_chain_rejected_without_record() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());
        let (messages, _) = split(h.collect(&h.a));
        let Delivery::Message(msg) = &messages[0] else {
            unreachable!()
        };

        // Unregistered chain id.
        let err = h
            .b
            .aggregator
            .receive_message(ChainId(999), msg.sender, &msg.payload)
            .unwrap_err();
        assert!(matches!(err, AggregatorError::UntrustedSource { .. }));

        // Registered chain, wrong sender.
        let err = h
            .b
            .aggregator
            .receive_message(CHAIN_A, [0xEE; 20], &msg.payload)
            .unwrap_err();
        assert!(matches!(err, AggregatorError::UntrustedSource { .. }));

        assert!(h.b.aggregator.record(&key).is_none());
        assert!(h.b.aggregator.ledger().is_empty());
        assert_eq!(h.b.aggregator.metrics().untrusted_rejections, 2);
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    #[tokio::test]
    async fn replayed_message_changes_nothing() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());
        let (messages, _) = split(h.collect(&h.a));

        h.deliver(&messages[0]).unwrap();
        let once = h.b.aggregator.record(&key).unwrap();
        assert_eq!(
            h.deliver(&messages[0]).unwrap(),
            ArrivalOutcome::Duplicate(key)
        );
        assert_eq!(h.b.aggregator.record(&key).unwrap(), once);
    }

    #[tokio::test]
    async fn replays_never_credit_twice() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());
        let deliveries = h.collect(&h.a);

        for delivery in &deliveries {
            h.deliver(delivery).unwrap();
        }
        assert_eq!(h.deliver(&deliveries[0]).unwrap(), ArrivalOutcome::Duplicate(key));
        assert_eq!(
            h.deliver(&deliveries[1]),
            Err(AggregatorError::AlreadyResolved(key))
        );

        assert_eq!(h.b.vault.balance_of(&user.address), 100);
        assert_eq!(h.b.aggregator.metrics().legs_credited, 1);
        // The replayed transfer is parked, not credited.
        assert_eq!(h.b.aggregator.suspense_balance(CHAIN_A), 100);
        assert!(h.b.aggregator.totals().is_conserved());
    }

    #[tokio::test]
    async fn conservation_holds_under_shuffled_arrival() {
        for seed in 0..8u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let h = Harness::new();
            h.a.bridge.set_slippage_bps(rng.gen_range(0..800));
            h.b.bridge.set_slippage_bps(rng.gen_range(0..800));

            let alice = h.user(&h.a, 10_000);
            let bob = h.user(&h.b, 10_000);
            let a_legs = (0..5)
                .map(|i| h.signed_leg(&alice, CHAIN_A, CHAIN_B, 100 + i * 10, 95 + i * 9, GENESIS + DAY))
                .collect();
            let b_legs = (0..3)
                .map(|i| h.signed_leg(&bob, CHAIN_B, CHAIN_A, 200 + i, 190, GENESIS + DAY))
                .collect();
            h.aggregate(&h.a, &alice, a_legs).await.unwrap();
            h.aggregate(&h.b, &bob, b_legs).await.unwrap();

            let mut deliveries = h.collect(&h.a);
            deliveries.extend(h.collect(&h.b));
            // At-least-once: replay a few sends.
            let replays: Vec<Delivery> = deliveries
                .choose_multiple(&mut rng, 3)
                .cloned()
                .collect();
            deliveries.extend(replays);
            deliveries.shuffle(&mut rng);

            for delivery in &deliveries {
                // Replayed funds are rejected and parked; that is expected here.
                let _ = h.deliver(delivery);
            }

            for node in [&h.a, &h.b] {
                let ledger = node.aggregator.ledger();
                let totals = node.aggregator.totals();
                assert!(totals.is_conserved(), "seed {seed}: {totals:?}");
                assert!(
                    ledger
                        .pending_keys()
                        .iter()
                        .all(|k| ledger.record(k).is_some_and(|r| r.origin
                            == la_aggregator::LegOrigin::Outbound)),
                    "seed {seed}: inbound leg left pending"
                );
                assert_eq!(
                    totals.credited + totals.refunded + totals.released + node.aggregator.suspense_balance(
                        if node.chain() == CHAIN_A { CHAIN_B } else { CHAIN_A }
                    ),
                    totals.bridged_in,
                    "seed {seed}"
                );
            }
        }
    }

    #[tokio::test]
    async fn every_leg_terminal_after_sweep() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let legs = (0..3)
            .map(|i| h.signed_leg(&user, CHAIN_A, CHAIN_B, 100 + i, 90, GENESIS + 10))
            .collect();
        let outcome = h.aggregate(&h.a, &user, legs).await.unwrap();
        let keys: Vec<_> = outcome
            .results
            .iter()
            .filter_map(LegDispatchResult::correlation_key)
            .collect();

        // Deliver only the first leg's message and the second leg's funds.
        let (messages, funds) = split(h.collect(&h.a));
        h.deliver(&messages[0]).unwrap();
        h.deliver(&funds[1]).unwrap();

        h.clock.advance(DAY + 1);
        for key in &keys {
            h.a.aggregator.sweep_expired(key).unwrap();
            h.b.aggregator.sweep_expired(key).unwrap();
        }
        assert!(h.a.aggregator.ledger().pending_keys().is_empty());
        assert!(h.b.aggregator.ledger().pending_keys().is_empty());

        // Funds-only leg went back to the bridge recipient on B.
        assert_eq!(h.b.vault.balance_of(&user.address), 101);
        assert_eq!(h.b.aggregator.metrics().legs_expired, 2);
    }

    // =========================================================================
    // DISPATCH FAILURE
    // =========================================================================

    #[tokio::test]
    async fn failed_bridge_send_returns_debit_on_sweep() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        h.a.bridge.set_failing(true);

        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + 60);
        let outcome = h.aggregate(&h.a, &user, vec![leg]).await.unwrap();
        assert!(matches!(
            outcome.results[0],
            LegDispatchResult::Dispatched {
                message_dispatched: true,
                funds_dispatched: false,
                ..
            }
        ));
        let key = only_key(&outcome);
        assert_eq!(h.a.vault.balance_of(&user.address), 900);

        let (messages, funds) = split(h.collect(&h.a));
        assert!(funds.is_empty());
        assert_eq!(
            h.deliver(&messages[0]).unwrap(),
            ArrivalOutcome::Recorded(key)
        );

        h.clock.advance(61);
        assert_eq!(
            h.a.aggregator.sweep_expired(&key).unwrap(),
            SweepOutcome::Expired {
                correlation_key: key,
                refunded: 100
            }
        );
        assert_eq!(h.a.vault.balance_of(&user.address), 1_000);
        assert_eq!(h.a.aggregator.totals().outbound_returned, 100);
    }

    #[tokio::test]
    async fn failed_message_send_refunds_funds_on_destination() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        h.a.messages.set_failing(true);

        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + 60);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());
        let (messages, funds) = split(h.collect(&h.a));
        assert!(messages.is_empty());
        h.deliver(&funds[0]).unwrap();

        h.clock.advance(DAY + 1);
        assert!(matches!(
            h.b.aggregator.sweep_expired(&key).unwrap(),
            SweepOutcome::Expired { refunded: 100, .. }
        ));
        assert_eq!(h.b.vault.balance_of(&user.address), 100);
        // Nothing held on A: the bridge took the value.
        assert!(matches!(
            h.a.aggregator.sweep_expired(&key).unwrap(),
            SweepOutcome::Expired { refunded: 0, .. }
        ));
    }

    // =========================================================================
    // PAYLOAD-LESS BRIDGE
    // =========================================================================

    #[tokio::test]
    async fn payloadless_funds_match_oldest_open_message() {
        let h = Harness::with_bridge_payloads(false);
        let user = h.user(&h.a, 1_000);
        let legs = vec![
            h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY),
            h.signed_leg(&user, CHAIN_A, CHAIN_B, 150, 140, GENESIS + DAY),
        ];
        let outcome = h.aggregate(&h.a, &user, legs).await.unwrap();
        let first = outcome.results[0].correlation_key().unwrap();
        let second = outcome.results[1].correlation_key().unwrap();

        let (messages, funds) = split(h.collect(&h.a));
        for m in &messages {
            h.deliver(m).unwrap();
        }
        // The 150 transfer cannot belong to the 100 leg.
        assert!(matches!(
            h.deliver(&funds[1]).unwrap(),
            ArrivalOutcome::Resolved { correlation_key, credited: 150, .. } if correlation_key == second
        ));
        assert!(matches!(
            h.deliver(&funds[0]).unwrap(),
            ArrivalOutcome::Resolved { correlation_key, credited: 100, .. } if correlation_key == first
        ));
        assert_eq!(h.b.vault.balance_of(&user.address), 250);
    }

    #[tokio::test]
    async fn payloadless_funds_without_message_go_to_suspense() {
        let h = Harness::with_bridge_payloads(false);
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        h.aggregate(&h.a, &user, vec![leg]).await.unwrap();

        let (_, funds) = split(h.collect(&h.a));
        assert_eq!(
            h.deliver(&funds[0]),
            Err(AggregatorError::UncorrelatedFunds {
                chain: CHAIN_A,
                amount: 100
            })
        );
        assert_eq!(h.b.aggregator.suspense_balance(CHAIN_A), 100);

        assert_eq!(
            h.b.aggregator
                .settle_suspense(user.address, CHAIN_A, user.address, 100),
            Err(AggregatorError::NotOwner)
        );
        h.b.aggregator
            .settle_suspense(OWNER, CHAIN_A, user.address, 100)
            .unwrap();
        assert_eq!(h.b.vault.balance_of(&user.address), 100);
        assert!(h.b.aggregator.totals().is_conserved());
    }

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================

    #[tokio::test]
    async fn signed_leg_cannot_be_submitted_twice() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);

        h.aggregate(&h.a, &user, vec![leg.clone()]).await.unwrap();
        let replay = h.aggregate(&h.a, &user, vec![leg]).await.unwrap();
        assert!(matches!(
            replay.results[0],
            LegDispatchResult::Rejected {
                error: AggregatorError::Unauthorized(_),
                ..
            }
        ));
        assert_eq!(replay.fee_refund, LEG_FEE);
        assert_eq!(h.a.vault.balance_of(&user.address), 900);
    }

    #[tokio::test]
    async fn leg_signed_for_other_chain_unauthorized() {
        let h = Harness::new();
        let user = h.user(&h.b, 1_000);
        // Signed as if submitted on A, submitted on B.
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_A, 100, 95, GENESIS + DAY);
        let outcome = h.aggregate(&h.b, &user, vec![leg]).await.unwrap();
        assert!(matches!(
            outcome.results[0],
            LegDispatchResult::Rejected {
                error: AggregatorError::Unauthorized(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn relayer_cannot_move_depositor_liquidity_with_own_signature() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let relayer = h.user(&h.a, 0);
        // Signature binds the relayer as caller, not the depositor.
        let leg = h.signed_leg(&relayer, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let outcome = h.aggregate(&h.a, &user, vec![leg]).await.unwrap();
        assert!(!outcome.results[0].is_dispatched());
        assert_eq!(h.a.vault.balance_of(&user.address), 1_000);
    }

    // =========================================================================
    // OWNER RECONCILIATION
    // =========================================================================

    #[tokio::test]
    async fn surplus_retained_until_owner_release() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        let key = only_key(&h.aggregate(&h.a, &user, vec![leg]).await.unwrap());
        let (messages, funds) = split(h.collect(&h.a));
        h.deliver(&messages[0]).unwrap();

        // Bridge delivers more than the message authorises.
        let Delivery::Funds(mut transfer) = funds[0].clone() else {
            unreachable!()
        };
        transfer.amount_delivered = 130;
        let outcome = h.deliver(&Delivery::Funds(transfer)).unwrap();
        assert!(matches!(
            outcome,
            ArrivalOutcome::Resolved {
                credited: 100,
                surplus: 30,
                ..
            }
        ));
        assert_eq!(h.b.vault.balance_of(&user.address), 100);

        h.b.aggregator
            .release_surplus(OWNER, &key, OWNER, 30)
            .unwrap();
        assert_eq!(h.b.vault.balance_of(&OWNER), 30);
        assert_eq!(h.b.aggregator.record(&key).unwrap().surplus, 0);
    }

    #[tokio::test]
    async fn removed_remote_is_no_longer_trusted() {
        let h = Harness::new();
        let user = h.user(&h.a, 1_000);
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 100, 95, GENESIS + DAY);
        h.aggregate(&h.a, &user, vec![leg]).await.unwrap();

        h.b.aggregator.remove_trusted_remote(OWNER, CHAIN_A).unwrap();
        let (messages, _) = split(h.collect(&h.a));
        assert!(matches!(
            h.deliver(&messages[0]),
            Err(AggregatorError::UntrustedSource { .. })
        ));

        // And A can no longer send to B once B's entry on A is gone.
        h.a.aggregator.remove_trusted_remote(OWNER, CHAIN_B).unwrap();
        let leg = h.signed_leg(&user, CHAIN_A, CHAIN_B, 50, 45, GENESIS + DAY);
        let outcome = h.aggregate(&h.a, &user, vec![leg]).await.unwrap();
        assert!(matches!(
            outcome.results[0],
            LegDispatchResult::Rejected {
                error: AggregatorError::UnknownDestination(CHAIN_B),
                ..
            }
        ));
    }
}
