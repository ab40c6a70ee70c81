//! Base58check hashes and digest helpers.
//!
//! Every hash is a fixed-size byte array with a textual base58check form
//! that starts with a type-specific prefix (`B` for blocks, `o` for
//! operations, `Net` for chain ids, ...).

use std::fmt;
use std::str::FromStr;

use cryptoxide::blake2b::Blake2b;
use cryptoxide::digest::Digest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::ParseError;
use crate::limits::{CHAIN_ID_LEN, DAL_COMMITMENT_LEN};

// =============================================================================
// BASE58CHECK
// =============================================================================

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Encodes `prefix || payload` as base58 with a 4-byte double SHA-256 checksum.
pub fn encode_base58check(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len() + 4);
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    let checksum = double_sha256(&data);
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

/// Decodes a base58check string and verifies its checksum.
///
/// Returns the decoded bytes including the prefix.
pub fn decode_base58check(s: &str) -> Result<Vec<u8>, ParseError> {
    let mut data = bs58::decode(s)
        .into_vec()
        .map_err(|_| ParseError::InvalidBase58)?;
    if data.len() < 4 {
        return Err(ParseError::InvalidChecksum);
    }
    let split = data.len() - 4;
    let checksum = double_sha256(&data[..split]);
    if checksum[..4] != data[split..] {
        return Err(ParseError::InvalidChecksum);
    }
    data.truncate(split);
    Ok(data)
}

/// Decodes a base58check string carrying `prefix` and a payload of `len` bytes.
pub fn decode_prefixed(
    s: &str,
    prefix: &[u8],
    len: usize,
    what: &'static str,
) -> Result<Vec<u8>, ParseError> {
    let data = decode_base58check(s)?;
    if !data.starts_with(prefix) {
        return Err(ParseError::InvalidPrefix { expected: what });
    }
    let payload = &data[prefix.len()..];
    if payload.len() != len {
        return Err(ParseError::InvalidLength {
            what,
            expected: len,
            actual: payload.len(),
        });
    }
    Ok(payload.to_vec())
}

// =============================================================================
// BLAKE2B
// =============================================================================

fn blake2b<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut hasher = Blake2b::new(N);
    hasher.input(data);
    let mut out = [0u8; N];
    hasher.result(&mut out);
    out
}

/// BLAKE2b with a 32-byte output, used for operation and block digests.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b(data)
}

/// BLAKE2b with a 20-byte output, used for public key hashes.
pub fn blake2b_160(data: &[u8]) -> [u8; 20] {
    blake2b(data)
}

// =============================================================================
// TYPED HASHES
// =============================================================================

macro_rules! define_hash {
    ($(#[$meta:meta])* $name:ident, $size:expr, $prefix:expr, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $size]);

        impl $name {
            /// Size of the raw hash in bytes.
            pub const LEN: usize = $size;
            /// Base58check prefix bytes.
            pub const PREFIX: &'static [u8] = &$prefix;

            pub const fn new(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            /// Builds the hash from a slice of exactly `LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
                let arr: [u8; $size] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
                    what: $what,
                    expected: $size,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }

            /// Returns true for the all-zero hash, which never names real data.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn to_base58(&self) -> String {
                encode_base58check(Self::PREFIX, &self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $size])
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_base58())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_base58())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let payload = decode_prefixed(s, Self::PREFIX, $size, $what)?;
                Self::from_slice(&payload)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_base58())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_hash!(
    /// Block hash (`B...`), also used as operation branch.
    BlockHash, 32, [1, 52], "block hash"
);
define_hash!(
    /// Operation hash (`o...`).
    OperationHash, 32, [5, 116], "operation hash"
);
define_hash!(
    /// Hash of the operation lists of a block (`LLo...`).
    OperationListListHash, 32, [29, 159, 109], "operation list list hash"
);
define_hash!(
    /// Context hash (`Co...`).
    ContextHash, 32, [79, 199], "context hash"
);
define_hash!(
    /// Block payload hash (`vh...`).
    PayloadHash, 32, [1, 106, 242], "payload hash"
);
define_hash!(
    /// Seed nonce hash (`nce...`).
    NonceHash, 32, [69, 220, 169], "nonce hash"
);
define_hash!(
    /// Protocol hash (`P...`).
    ProtocolHash, 32, [2, 170], "protocol hash"
);
define_hash!(
    /// Smart rollup commitment hash (`src1...`).
    SmartRollupCommitmentHash, 32, [17, 165, 134, 138], "smart rollup commitment hash"
);
define_hash!(
    /// Smart rollup state hash (`srs1...`).
    SmartRollupStateHash, 32, [17, 165, 235, 240], "smart rollup state hash"
);
define_hash!(
    /// Chain id (`Net...`).
    ChainId, CHAIN_ID_LEN, [87, 82, 0], "chain id"
);
define_hash!(
    /// DAL slot commitment (`sh...`).
    DalCommitment, DAL_COMMITMENT_LEN, [2, 116, 180], "dal commitment"
);

impl OperationHash {
    /// Hashes an encoded operation (`branch || contents || signature`).
    pub fn digest(bytes: &[u8]) -> Self {
        Self(blake2b_256(bytes))
    }
}

impl BlockHash {
    /// Hashes an encoded, signed block header.
    pub fn digest(bytes: &[u8]) -> Self {
        Self(blake2b_256(bytes))
    }
}

impl ChainId {
    /// Mainnet chain id `NetXdQprcVkpaWU`.
    pub const MAINNET: ChainId = ChainId([0x7a, 0x06, 0xa7, 0x70]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base58check_known_value() {
        // Payload without a prefix, as used by chain tooling test suites.
        let encoded = encode_base58check(&[], &hex::decode("8eceda2f").unwrap());
        assert_eq!(encoded, "QtRAcc9FSRg");
        assert_eq!(
            decode_base58check("QtRAcc9FSRg").unwrap(),
            hex::decode("8eceda2f").unwrap()
        );
    }

    #[test]
    fn test_chain_id_mainnet() {
        assert_eq!(ChainId::MAINNET.to_base58(), "NetXdQprcVkpaWU");
        let parsed: ChainId = "NetXdQprcVkpaWU".parse().unwrap();
        assert_eq!(parsed, ChainId::MAINNET);
    }

    #[test]
    fn test_block_hash_text_roundtrip() {
        let hash = BlockHash::new([7u8; 32]);
        let text = hash.to_base58();
        assert!(text.starts_with('B'));
        assert_eq!(text.parse::<BlockHash>().unwrap(), hash);
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let text = OperationHash::new([1u8; 32]).to_base58();
        assert!(text.starts_with('o'));
        assert!(matches!(
            text.parse::<BlockHash>(),
            Err(ParseError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let mut text = BlockHash::new([9u8; 32]).to_base58();
        let last = text.pop().unwrap();
        text.push(if last == '1' { '2' } else { '1' });
        assert!(text.parse::<BlockHash>().is_err());
    }

    #[test]
    fn test_zero_hash() {
        assert!(BlockHash::default().is_zero());
        assert!(!BlockHash::new([1u8; 32]).is_zero());
    }

    #[test]
    fn test_blake2b_sizes() {
        assert_eq!(blake2b_256(b"").len(), 32);
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
        assert_eq!(blake2b_160(b"abc").len(), 20);
    }

    #[test]
    fn test_prefixes_render_expected_leaders() {
        assert!(PayloadHash::new([3u8; 32]).to_base58().starts_with("vh"));
        assert!(ContextHash::new([3u8; 32]).to_base58().starts_with("Co"));
        assert!(OperationListListHash::new([3u8; 32]).to_base58().starts_with("LLo"));
        assert!(NonceHash::new([3u8; 32]).to_base58().starts_with("nce"));
        assert!(ProtocolHash::new([3u8; 32]).to_base58().starts_with('P'));
        assert!(SmartRollupCommitmentHash::new([3u8; 32]).to_base58().starts_with("src1"));
        assert!(SmartRollupStateHash::new([3u8; 32]).to_base58().starts_with("srs1"));
        assert!(DalCommitment::new([3u8; 48]).to_base58().starts_with("sh"));
    }
}
