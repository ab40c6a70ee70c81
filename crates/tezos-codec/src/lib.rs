//! Tezos operations: binary codec, signing and fee estimation.
//!
//! This crate reads and writes the binary forms of Tezos operation groups
//! and block headers, as broadcast to and signed by nodes.
//!
//! # Overview
//!
//! - **Version aware**: tag bytes and consensus layouts follow the
//!   operation tags version carried by [`Params`]
//! - **Lossless**: decoding what was encoded yields equal values, and the
//!   JSON form of both matches
//! - **Signing**: watermarked digests, Ed25519 signatures and operation
//!   hashes
//!
//! # Quick Start
//!
//! ```rust
//! use tezos_codec::{BlockHash, ManagerFields, N, Op, Operation, Params, Transaction, decode_op};
//!
//! let source = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse().unwrap();
//! let mut manager = ManagerFields::new(source);
//! manager.counter = N::from(42u64);
//!
//! let op = Op::new()
//!     .with_branch(BlockHash::new([1u8; 32]))
//!     .with_contents(Operation::Transaction(Transaction {
//!         manager,
//!         amount: N::from(1_000_000u64),
//!         destination: source,
//!         parameters: None,
//!     }));
//!
//! let bytes = op.bytes();
//! assert_eq!(bytes[32], 108);
//!
//! let decoded = decode_op(&bytes, &Params::default()).unwrap();
//! assert_eq!(decoded, op);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Value types (numbers, hashes, addresses, keys, operations)
//! - [`codec`]: Binary encoding/decoding, signing payloads and fees
//! - [`validate`]: Checks against protocol limits
//! - [`params`]: Protocol parameters and their loaders
//! - [`error`]: Error types
//! - [`limits`]: Wire sizes and decoding bounds
//!
//! # Security
//!
//! The decoder is meant for untrusted input:
//! - Length prefixes are checked against [`limits`] before allocating
//! - Non-canonical numbers and booleans are rejected
//! - A failed decode leaves the reader where it started

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod params;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{decode_op, decode_operation_bytes, encode_op, encode_operation_bytes};
pub use error::{DecodeError, EncodeError, ErrorKind, ParamsError, ParseError, SignError, ValidationError};
pub use model::{
    Address, BlockHash, BlockHeader, ChainId, KeyKind, Limits, ManagerFields, N, Op, OpKind,
    Operation, OperationHash, PrivateKey, PublicKey, Reveal, Signature, Transaction, Z,
};
pub use params::{DEFAULT_PARAMS, LATEST_TAGS_VERSION, Params};
pub use validate::validate_op;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
