//! Wire-size constants and decoding bounds.
//!
//! The decoder handles untrusted input, so every length-prefixed field is
//! checked against one of these bounds before allocation.

/// Size of a block hash used as operation branch.
pub const BRANCH_LEN: usize = 32;

/// Size of a raw signature appended to an operation.
pub const SIGNATURE_LEN: usize = 64;

/// Size of a chain id.
pub const CHAIN_ID_LEN: usize = 4;

/// Size of an implicit account address (key tag + hash).
pub const IMPLICIT_ADDRESS_LEN: usize = 21;

/// Size of a padded contract address.
pub const CONTRACT_ADDRESS_LEN: usize = 22;

/// Size of a raw 20-byte address hash.
pub const ADDRESS_HASH_LEN: usize = 20;

/// Smallest encoded operation content (legacy endorsement: tag + level).
pub const MIN_CONTENT_LEN: usize = 5;

/// Smallest plausible encoded operation (branch + smallest content).
pub const MIN_OPERATION_LEN: usize = BRANCH_LEN + MIN_CONTENT_LEN;

/// Maximum size of any single length-prefixed blob.
pub const MAX_BYTES_LEN: usize = 1 << 20;

/// Maximum number of entries in a length-prefixed list.
pub const MAX_LIST_LEN: usize = 1 << 16;

/// Maximum length of a named entrypoint.
pub const MAX_ENTRYPOINT_LEN: usize = 31;

/// Maximum number of fee recomputation rounds in the limits loop.
pub const MAX_FEE_ITERATIONS: usize = 16;

/// Size of the proof-of-work nonce in block headers.
pub const POW_NONCE_LEN: usize = 8;

/// Size of a DAL commitment and of its proof.
pub const DAL_COMMITMENT_LEN: usize = 48;

/// Size of each half of a VDF solution.
pub const VDF_SOLUTION_PART_LEN: usize = 100;
