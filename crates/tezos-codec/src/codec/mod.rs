//! Binary encoding/decoding for Tezos operations and block headers.
//!
//! Every call takes the [`Params`](crate::params::Params) in effect; the
//! operation tags version selects tag bytes and consensus layouts.

pub mod block;
mod consensus;
pub mod envelope;
pub mod fees;
pub mod manager;
pub mod op;
pub mod primitives;
pub mod registry;
mod rollup;

pub use block::{
    BLOCK_WATERMARK, TENDERBAKE_BLOCK_WATERMARK, decode_block_header, encode_block_header,
};
pub use envelope::{
    ENDORSEMENT_WATERMARK, GENERIC_WATERMARK, PREENDORSEMENT_WATERMARK,
    TENDERBAKE_ENDORSEMENT_WATERMARK, decode_op, encode_op,
};
pub use fees::{GAS_SAFETY_MARGIN, calculate_min_fee, min_fee};
pub use op::{
    decode_kind, decode_operation, decode_operation_bytes, encode_operation,
    encode_operation_bytes, encoded_len,
};
pub use primitives::{Reader, Writer};
