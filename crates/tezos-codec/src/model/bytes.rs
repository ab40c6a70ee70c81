//! Opaque byte blobs rendered as lowercase hex in JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::limits::{DAL_COMMITMENT_LEN, POW_NONCE_LEN, VDF_SOLUTION_PART_LEN};

/// Variable-length bytes (Micheline payloads, proofs, kernels, messages).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for HexBytes {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s).map(Self).map_err(|_| ParseError::InvalidHex)
    }
}

/// Declares a fixed-size byte array with a hex text form.
macro_rules! define_fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; $size]);

        impl $name {
            pub const LEN: usize = $size;

            pub const fn new(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
                let arr: [u8; $size] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
                    what: stringify!($name),
                    expected: $size,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $size])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|_| ParseError::InvalidHex)?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
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

define_fixed_bytes!(
    /// Activation secret of a fundraiser account.
    ActivationSecret, 20
);
define_fixed_bytes!(
    /// Revealed seed nonce.
    SeedNonce, 32
);
define_fixed_bytes!(
    /// Proof-of-work nonce in a block header.
    PowNonce, POW_NONCE_LEN
);
define_fixed_bytes!(
    /// KZG proof accompanying a DAL commitment.
    DalCommitmentProof, DAL_COMMITMENT_LEN
);
define_fixed_bytes!(
    /// VDF solution (result followed by proof).
    VdfSolution, 2 * VDF_SOLUTION_PART_LEN
);

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_json() {
        let bytes = HexBytes::from(vec![0x03, 0x0b]);
        assert_eq!(serde_json::to_string(&bytes).unwrap(), "\"030b\"");
        let back: HexBytes = serde_json::from_str("\"030b\"").unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_fixed_length_checked() {
        assert!(PowNonce::from_slice(&[0u8; 7]).is_err());
        let nonce: PowNonce = "0102030405060708".parse().unwrap();
        assert_eq!(nonce.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!("zz".parse::<HexBytes>().is_err());
    }
}
