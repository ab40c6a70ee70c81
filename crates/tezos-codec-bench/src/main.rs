//! Throughput benchmark for operation batches.
//!
//! Builds signed transfer batches, then times encoding, decoding, signing
//! and fee estimation. Usage: `bench-batches [COUNT] [BATCH_SIZE]`.

use std::env;
use std::sync::Arc;
use std::time::Instant;

use tezos_codec::codec::fees::GAS_SAFETY_MARGIN;
use tezos_codec::{
    Address, BlockHash, Limits, ManagerFields, N, Op, OpKind, Operation, Params, PrivateKey, Reveal,
    Transaction, decode_op, validate_op,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_COUNT: usize = 10_000;
const DEFAULT_BATCH_SIZE: usize = 4;
const DECODE_ITERS: u32 = 5;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn arg(index: usize, default: usize) -> usize {
    env::args()
        .nth(index)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn transfer(source: Address, destination: Address, amount: u64) -> Operation {
    Operation::Transaction(Transaction {
        manager: ManagerFields::new(source),
        amount: N::from(amount),
        destination,
        parameters: None,
    })
}

/// One envelope: a reveal followed by `batch_size - 1` transfers.
fn build_batch(key: &PrivateKey, params: &Arc<Params>, seq: usize, batch_size: usize) -> Op {
    let public_key = key.public_key().expect("Failed to derive public key");
    let source = Address::from_public_key(&public_key);

    let mut branch = [0u8; 32];
    branch[..8].copy_from_slice(&(seq as u64).to_be_bytes());
    branch[31] = 1;

    let mut op = Op::new()
        .with_params(Arc::clone(params))
        .with_branch(BlockHash::new(branch))
        .with_ttl(120);
    for i in 1..batch_size {
        let mut hash = [0u8; 20];
        hash[..8].copy_from_slice(&((seq * batch_size + i) as u64).to_be_bytes());
        let destination = Address::new(source.kind(), hash);
        op = op.with_contents(transfer(source, destination, 1_000 * i as u64));
    }
    op = op.with_contents_front(Operation::Reveal(Reveal {
        manager: ManagerFields::new(source),
        public_key,
    }));

    let limits: Vec<Limits> = op
        .contents
        .iter()
        .map(|content| Limits {
            fee: 0,
            gas_limit: if content.kind() == OpKind::Reveal {
                1_000
            } else {
                2_100
            },
            storage_limit: 0,
        })
        .collect();

    op.with_counter(1_000_000 + seq as i64)
        .with_limits(&limits, GAS_SAFETY_MARGIN, 0)
        .expect("Failed to apply limits")
}

fn main() {
    init_tracing();

    let count = arg(1, DEFAULT_COUNT);
    let batch_size = arg(2, DEFAULT_BATCH_SIZE).max(1);
    let params = Arc::new(Params::default());
    let key = PrivateKey::ed25519_from_seed([7u8; 32]);

    info!(count, batch_size, network = %params.network, "building envelopes");

    // Build (includes the fee fixed-point loop)
    let build_start = Instant::now();
    let mut ops: Vec<Op> = (0..count)
        .map(|seq| build_batch(&key, &params, seq, batch_size))
        .collect();
    let build_time = build_start.elapsed();
    println!("Built {} envelopes in {:?}", ops.len(), build_time);

    for op in &ops {
        validate_op(op, &params).expect("Generated envelope is invalid");
    }

    // Sign
    let sign_start = Instant::now();
    for op in &mut ops {
        op.sign(&key).expect("Failed to sign");
    }
    let sign_time = sign_start.elapsed();
    println!(
        "\nSign: {:?} ({:.0} ops/s)",
        sign_time,
        ops.len() as f64 / sign_time.as_secs_f64()
    );

    // Encode
    let encode_start = Instant::now();
    let encoded: Vec<Vec<u8>> = ops.iter().map(Op::bytes).collect();
    let encode_time = encode_start.elapsed();
    let total_bytes: usize = encoded.iter().map(Vec::len).sum();
    println!("\nEncode: {} bytes in {:?}", total_bytes, encode_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (total_bytes as f64 / 1_000_000.0) / encode_time.as_secs_f64()
    );

    // Decode
    for bytes in encoded.iter().take(100) {
        let _ = decode_op(bytes, &params).expect("Failed to decode");
    }
    let decode_start = Instant::now();
    for _ in 0..DECODE_ITERS {
        for (bytes, op) in encoded.iter().zip(&ops) {
            let decoded = decode_op(bytes, &params).expect("Failed to decode");
            assert_eq!(decoded.contents.len(), op.contents.len());
        }
    }
    let decode_time = decode_start.elapsed() / DECODE_ITERS;
    println!("\nDecode: {:?} (avg of {} iterations)", decode_time, DECODE_ITERS);
    println!(
        "  Throughput: {:.2} MB/s",
        (total_bytes as f64 / 1_000_000.0) / decode_time.as_secs_f64()
    );

    // Verify
    let public_key = key.public_key().expect("Failed to derive public key");
    let verify_start = Instant::now();
    for op in &ops {
        op.verify(&public_key).expect("Signature does not verify");
    }
    println!("\nVerify: {:?}", verify_start.elapsed());

    // Sample
    if let Some(op) = ops.first() {
        let json = serde_json::to_string_pretty(op).expect("Failed to serialize");
        println!("\n=== Sample ===");
        println!("{}", json);
        println!("hash:  {}", op.hash().expect("Failed to hash"));
        println!("bytes: {}", encoded[0].len());
        println!("fee:   {} mutez", op.limits().fee);
    }

    // Summary
    println!("\n=== Summary ===");
    println!("Envelopes: {}", ops.len());
    println!("Contents: {}", ops.len() * batch_size);
    println!(
        "Average size: {:.1} bytes",
        total_bytes as f64 / ops.len().max(1) as f64
    );
}
