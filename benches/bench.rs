use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use cose_recipients::{
    algorithm::Algorithm,
    attribute::Curve,
    crypto::{CryptoBackend, RustCrypto},
    key::CoseKey,
    recipient::{Operation, Recipient, Recipients},
};

// Recipients -----------------------------------------------------------------

const KEK: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
    0x0C, 0x0D, 0x0E, 0x0F,
];
// ECDH-ES + A128KW recipient with a nested A128KW recipient
const NESTED_RECIPIENT: [u8; 55] = [
    0x84, 0x44, 0xA1, 0x01, 0x38, 0x1C, 0xA1, 0x20, 0xA3, 0x01, 0x01, 0x20,
    0x04, 0x21, 0x42, 0x01, 0x02, 0x40, 0x81, 0x83, 0x40, 0xA2, 0x01, 0x22,
    0x04, 0x43, 0x6B, 0x69, 0x64, 0x58, 0x18, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
];

fn key_wrap_recipients() -> Recipients {
    let mut recipients = Recipients::default();
    recipients
        .push(
            Recipient::for_algorithm(Algorithm::A128Kw)
                .unwrap()
                .with_key(CoseKey::symmetric(&KEK)),
        )
        .unwrap();
    recipients
}

fn recipients(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipients");

    group.bench_function("decode_nested", |b| {
        b.iter(|| {
            let mut recipients = Recipients::default();
            recipients.decode(&NESTED_RECIPIENT).unwrap()
        })
    });

    let mut sealed = key_wrap_recipients();
    sealed
        .establish_cek(Algorithm::A128Gcm, &RustCrypto)
        .unwrap();
    let id = sealed.top_level()[0];
    group.bench_function("encode_key_wrap", |b| {
        b.iter(|| sealed.encode(id).unwrap())
    });

    group.bench_function("establish_key_wrap", |b| {
        b.iter_batched(
            key_wrap_recipients,
            |mut recipients| {
                recipients
                    .establish_cek(Algorithm::A128Gcm, &RustCrypto)
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("compute_cek_key_wrap", |b| {
        b.iter(|| {
            sealed
                .compute_cek(
                    id,
                    Algorithm::A128Gcm,
                    Operation::Decrypt,
                    &RustCrypto,
                )
                .unwrap()
        })
    });

    group.finish();
}

fn agreement(c: &mut Criterion) {
    let mut group = c.benchmark_group("agreement");
    let receiver = RustCrypto.generate_key(Curve::X25519).unwrap();

    group.bench_function("direct_key_agreement", |b| {
        b.iter_batched(
            || {
                let mut recipients = Recipients::default();
                let id = recipients
                    .push(
                        Recipient::for_algorithm(Algorithm::EcdhEsHkdf256)
                            .unwrap()
                            .with_static_key(receiver.public_only()),
                    )
                    .unwrap();
                (recipients, id)
            },
            |(mut recipients, id)| {
                recipients
                    .agree(id, Algorithm::A128Gcm, &RustCrypto)
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("key_agreement_with_key_wrap", |b| {
        b.iter_batched(
            || {
                let mut recipients = Recipients::default();
                let id = recipients
                    .push(
                        Recipient::for_algorithm(Algorithm::EcdhEsA128Kw)
                            .unwrap()
                            .with_static_key(receiver.public_only()),
                    )
                    .unwrap();
                (recipients, id)
            },
            |(mut recipients, id)| {
                recipients.wrap_cek(id, &KEK, &RustCrypto).unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

// Criterion ------------------------------------------------------------------

criterion_group!(recipient_benches, recipients, agreement);
criterion_main!(recipient_benches);
