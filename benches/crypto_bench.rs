//! Cryptographic and codec benchmarks.
//!
//! Measures the per-request cost of the handshake and of sealing and
//! opening envelopes.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use formwire::crypto::{Checksum, EphemeralSecret, PublicKey, StreamCipher};
use formwire::handshake::{accept_handshake, AgentHandshake};
use formwire::obfuscation::{DecoyConfig, DecoyGenerator, SentinelSet};
use formwire::wire::{Direction, Envelope, HandshakeBlob};

const SESSION: &str = "0123456789abcdef0123456789abcdef";

fn bench_p384_keygen(c: &mut Criterion) {
    c.bench_function("p384_keygen", |b| {
        b.iter(|| {
            let secret = EphemeralSecret::random();
            black_box(PublicKey::from(&secret))
        })
    });
}

fn bench_p384_dh(c: &mut Criterion) {
    let alice_secret = EphemeralSecret::random();
    let (_, bob_public) = EphemeralSecret::generate();

    c.bench_function("p384_dh", |b| {
        b.iter(|| black_box(alice_secret.diffie_hellman(&bob_public)))
    });
}

fn bench_rc4_encrypt(c: &mut Criterion) {
    let (alice, _) = EphemeralSecret::generate();
    let (_, bob_public) = EphemeralSecret::generate();
    let secret = alice.diffie_hellman(&bob_public);
    let plaintext = vec![0u8; 4096];

    let mut group = c.benchmark_group("rc4_encrypt");
    group.throughput(Throughput::Bytes(4096));

    group.bench_function("4096_bytes", |b| {
        b.iter(|| black_box(StreamCipher::encrypt(&secret, &plaintext).unwrap()))
    });

    group.finish();
}

fn bench_md5_checksum(c: &mut Criterion) {
    let data = vec![0x42u8; 4096];

    let mut group = c.benchmark_group("md5_checksum");
    group.throughput(Throughput::Bytes(4096));

    group.bench_function("4096_bytes", |b| b.iter(|| black_box(Checksum::hex(&data))));

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let (alice, _) = EphemeralSecret::generate();
    let (_, bob_public) = EphemeralSecret::generate();
    let secret = alice.diffie_hellman(&bob_public);
    let payload = vec![0x61u8; 1024];

    let mut group = c.benchmark_group("envelope");
    group.throughput(Throughput::Bytes(1024));

    group.bench_function("seal_1024_bytes", |b| {
        b.iter(|| {
            let envelope = Envelope::new(SESSION, Direction::ToController, payload.clone());
            black_box(envelope.seal(&secret).unwrap())
        })
    });

    let sealed = Envelope::new(SESSION, Direction::ToController, payload.clone())
        .seal(&secret)
        .unwrap();
    group.bench_function("open_1024_bytes", |b| {
        b.iter(|| black_box(Envelope::open(&sealed, &secret).unwrap()))
    });

    group.bench_function("seal_compressed_1024_bytes", |b| {
        b.iter(|| {
            let envelope =
                Envelope::with_compression(SESSION, Direction::ToAgent, &payload, true).unwrap();
            black_box(envelope.seal(&secret).unwrap())
        })
    });

    group.finish();
}

fn bench_handshake_blob(c: &mut Criterion) {
    let (_, public) = EphemeralSecret::generate();
    let marshalled = public.to_sec1_bytes();
    let blob = HandshakeBlob::encode(&marshalled);

    c.bench_function("handshake_blob_decode", |b| {
        b.iter(|| black_box(HandshakeBlob::decode(&blob).unwrap()))
    });
}

fn bench_decoy_build(c: &mut Criterion) {
    let generator = DecoyGenerator::new(DecoyConfig::default(), SentinelSet::default());
    let value = "x".repeat(256);

    c.bench_function("decoy_build", |b| {
        b.iter(|| black_box(generator.build(SESSION, &value)))
    });
}

fn bench_full_handshake(c: &mut Criterion) {
    c.bench_function("full_handshake", |b| {
        b.iter(|| {
            let (agent, blob) = AgentHandshake::start();
            let accepted = accept_handshake(&blob).unwrap();
            black_box(agent.finish(&accepted.reply).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_p384_keygen,
    bench_p384_dh,
    bench_rc4_encrypt,
    bench_md5_checksum,
    bench_envelope,
    bench_handshake_blob,
    bench_decoy_build,
    bench_full_handshake,
);

criterion_main!(benches);
