//! # Liquidity Aggregator Benchmarks
//!
//! | Path | Work per call |
//! |------|---------------|
//! | Leg authorization | keccak256 + secp256k1 recovery |
//! | Payload decode | fixed-width slice reads |
//! | Leg reconciliation | message + funds arrival, resolve, vault release |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use la_aggregator::{
    decode_message_payload, encode_bridge_payload, encode_message_payload, BridgePayload,
    BridgeTransfer, ChainId, CorrelationKey, Leg, MessagePayload, OutboundMessage,
};
use la_signature::test_helpers::{generate_signer, sign_leg};
use la_signature::SignatureAuthorizer;
use la_tests::harness::{Delivery, Harness, CHAIN_A, CHAIN_B, GENESIS};
use std::time::Duration;

fn bench_leg_authorization(c: &mut Criterion) {
    let mut group = c.benchmark_group("leg-authorization");
    group.measurement_time(Duration::from_secs(10));

    let (key, address) = generate_signer();
    let leg = Leg {
        destination_chain_id: ChainId(102),
        amount: 1_000_000,
        min_amount: 990_000,
        deadline: GENESIS,
        signature: Vec::new(),
    };
    let content = leg.content(ChainId(101), address);
    let signature = sign_leg(&content, &key).to_bytes();
    let authorizer = SignatureAuthorizer::new();

    group.bench_function("verify_leg_signature", |b| {
        b.iter(|| {
            black_box(
                authorizer
                    .verify(&content, &signature, address)
                    .is_authorized(),
            )
        })
    });
    group.finish();
}

fn bench_payload_decode(c: &mut Criterion) {
    let bytes = encode_message_payload(&MessagePayload {
        correlation_key: CorrelationKey([7u8; 32]),
        amount: 1_000,
        min_amount: 990,
        recipient: [9u8; 20],
    });
    c.bench_function("decode_message_payload", |b| {
        b.iter(|| black_box(decode_message_payload(black_box(&bytes))))
    });
}

fn bench_leg_reconciliation(c: &mut Criterion) {
    let h = Harness::new();
    let mut counter: u64 = 0;

    c.bench_function("reconcile_leg_funds_first", |b| {
        b.iter_batched(
            || {
                counter += 1;
                let mut raw = [0u8; 32];
                raw[..8].copy_from_slice(&counter.to_be_bytes());
                let key = CorrelationKey(raw);
                let recipient = [0x42; 20];
                let message = Delivery::Message(OutboundMessage {
                    source_chain: CHAIN_A,
                    sender: h.a.address,
                    destination: CHAIN_B,
                    payload: encode_message_payload(&MessagePayload {
                        correlation_key: key,
                        amount: 100,
                        min_amount: 95,
                        recipient,
                    }),
                    fee: 0,
                });
                let funds = Delivery::Funds(BridgeTransfer {
                    source_chain: CHAIN_A,
                    sender: h.a.address,
                    destination: CHAIN_B,
                    amount_sent: 100,
                    amount_delivered: 98,
                    recipient,
                    payload: Some(encode_bridge_payload(&BridgePayload {
                        correlation_key: key,
                        recipient,
                    })),
                });
                (funds, message)
            },
            |(funds, message)| {
                let _ = black_box(h.deliver(&funds));
                black_box(h.deliver(&message))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_leg_authorization,
    bench_payload_decode,
    bench_leg_reconciliation
);
criterion_main!(benches);
