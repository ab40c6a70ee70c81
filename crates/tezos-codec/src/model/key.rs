//! Public keys, private keys and signatures.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ParseError, SignError};
use crate::model::hash::{blake2b_160, decode_base58check, encode_base58check};

/// Signature scheme of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Ed25519,
    Secp256k1,
    P256,
    Bls,
}

impl KeyKind {
    /// Returns the binary tag used for keys and implicit addresses.
    pub fn tag(self) -> u8 {
        match self {
            KeyKind::Ed25519 => 0,
            KeyKind::Secp256k1 => 1,
            KeyKind::P256 => 2,
            KeyKind::Bls => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(KeyKind::Ed25519),
            1 => Some(KeyKind::Secp256k1),
            2 => Some(KeyKind::P256),
            3 => Some(KeyKind::Bls),
            _ => None,
        }
    }

    /// Size of the raw public key.
    pub fn public_key_len(self) -> usize {
        match self {
            KeyKind::Ed25519 => 32,
            KeyKind::Secp256k1 | KeyKind::P256 => 33,
            KeyKind::Bls => 48,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyKind::Ed25519 => "ed25519",
            KeyKind::Secp256k1 => "secp256k1",
            KeyKind::P256 => "p256",
            KeyKind::Bls => "bls",
        }
    }

    fn public_key_prefix(self) -> &'static [u8] {
        match self {
            KeyKind::Ed25519 => &[13, 15, 37, 217],
            KeyKind::Secp256k1 => &[3, 254, 226, 86],
            KeyKind::P256 => &[3, 178, 139, 127],
            KeyKind::Bls => &[6, 149, 135, 204],
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PUBLIC KEY
// =============================================================================

/// A public key of any supported scheme (`edpk`, `sppk`, `p2pk`, `BLpk`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    kind: KeyKind,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Builds a key from raw bytes, checking the length for the scheme.
    pub fn from_bytes(kind: KeyKind, bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() != kind.public_key_len() {
            return Err(ParseError::InvalidLength {
                what: "public key",
                expected: kind.public_key_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            kind,
            bytes: bytes.to_vec(),
        })
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the binary tagged form.
    pub fn encoded_len(&self) -> usize {
        1 + self.bytes.len()
    }

    pub fn to_base58(&self) -> String {
        encode_base58check(self.kind.public_key_prefix(), &self.bytes)
    }

    /// Hash of the key as used by implicit addresses.
    pub fn hash(&self) -> [u8; 20] {
        blake2b_160(&self.bytes)
    }

    /// Verifies `signature` over a 32-byte digest.
    pub fn verify_digest(&self, digest: &[u8; 32], signature: &Signature) -> Result<(), SignError> {
        match self.kind {
            KeyKind::Ed25519 => {
                let raw: [u8; 32] = self
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| SignError::InvalidKey("ed25519 public key size".to_string()))?;
                let key = VerifyingKey::from_bytes(&raw)
                    .map_err(|e| SignError::InvalidKey(e.to_string()))?;
                let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
                key.verify_strict(digest, &sig)
                    .map_err(|_| SignError::Verification)
            }
            other => Err(SignError::UnsupportedKey(other)),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

impl FromStr for PublicKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_base58check(s)?;
        for kind in [KeyKind::Ed25519, KeyKind::Secp256k1, KeyKind::P256, KeyKind::Bls] {
            let prefix = kind.public_key_prefix();
            if data.starts_with(prefix) {
                return PublicKey::from_bytes(kind, &data[prefix.len()..]);
            }
        }
        Err(ParseError::InvalidPrefix {
            expected: "public key",
        })
    }
}

// =============================================================================
// SIGNATURE
// =============================================================================

const GENERIC_SIGNATURE_PREFIX: &[u8] = &[4, 130, 43];
const ED25519_SIGNATURE_PREFIX: &[u8] = &[9, 245, 205, 134, 18];
const SECP256K1_SIGNATURE_PREFIX: &[u8] = &[13, 115, 101, 19, 63];
const P256_SIGNATURE_PREFIX: &[u8] = &[54, 240, 44, 52];

/// A 64-byte signature. The wire form carries no scheme tag, so the text
/// form defaults to the generic `sig` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const LEN: usize = 64;

    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
            what: "signature",
            expected: 64,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// An all-zero signature is used as a placeholder and never verifies.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Generic `sig...` text form.
    pub fn to_base58(&self) -> String {
        encode_base58check(GENERIC_SIGNATURE_PREFIX, &self.0)
    }

    /// Scheme-specific text form (`edsig`, `spsig1`, `p2sig`).
    pub fn to_base58_for(&self, kind: KeyKind) -> String {
        let prefix = match kind {
            KeyKind::Ed25519 => ED25519_SIGNATURE_PREFIX,
            KeyKind::Secp256k1 => SECP256K1_SIGNATURE_PREFIX,
            KeyKind::P256 => P256_SIGNATURE_PREFIX,
            KeyKind::Bls => GENERIC_SIGNATURE_PREFIX,
        };
        encode_base58check(prefix, &self.0)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base58())
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_base58check(s)?;
        for prefix in [
            ED25519_SIGNATURE_PREFIX,
            SECP256K1_SIGNATURE_PREFIX,
            P256_SIGNATURE_PREFIX,
            GENERIC_SIGNATURE_PREFIX,
        ] {
            if data.starts_with(prefix) && data.len() == prefix.len() + 64 {
                return Signature::from_slice(&data[prefix.len()..]);
            }
        }
        Err(ParseError::InvalidPrefix {
            expected: "signature",
        })
    }
}

// =============================================================================
// PRIVATE KEY
// =============================================================================

const ED25519_SEED_PREFIX: &[u8] = &[13, 15, 58, 7];
const ED25519_SECRET_PREFIX: &[u8] = &[43, 246, 78, 7];
const SECP256K1_SECRET_PREFIX: &[u8] = &[17, 162, 224, 201];
const P256_SECRET_PREFIX: &[u8] = &[16, 81, 238, 189];

/// A private key. Only ed25519 keys can sign.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    kind: KeyKind,
    secret: [u8; 32],
}

impl PrivateKey {
    /// Builds an ed25519 key from its 32-byte seed.
    pub fn ed25519_from_seed(seed: [u8; 32]) -> Self {
        Self {
            kind: KeyKind::Ed25519,
            secret: seed,
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn to_base58(&self) -> String {
        let prefix = match self.kind {
            KeyKind::Secp256k1 => SECP256K1_SECRET_PREFIX,
            KeyKind::P256 => P256_SECRET_PREFIX,
            _ => ED25519_SEED_PREFIX,
        };
        encode_base58check(prefix, &self.secret)
    }

    fn signing_key(&self) -> Result<SigningKey, SignError> {
        match self.kind {
            KeyKind::Ed25519 => Ok(SigningKey::from_bytes(&self.secret)),
            other => Err(SignError::UnsupportedKey(other)),
        }
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> Result<PublicKey, SignError> {
        let key = self.signing_key()?;
        PublicKey::from_bytes(KeyKind::Ed25519, key.verifying_key().as_bytes())
            .map_err(|e| SignError::InvalidKey(e.to_string()))
    }

    /// Signs a 32-byte digest.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SignError> {
        let key = self.signing_key()?;
        Ok(Signature(key.sign(digest).to_bytes()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, <redacted>)", self.kind)
    }
}

impl FromStr for PrivateKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_base58check(s)?;
        let (kind, payload) = if let Some(rest) = data.strip_prefix(ED25519_SEED_PREFIX) {
            (KeyKind::Ed25519, rest)
        } else if let Some(rest) = data.strip_prefix(ED25519_SECRET_PREFIX) {
            // 64-byte expanded form: seed followed by the public key.
            if rest.len() != 64 {
                return Err(ParseError::InvalidLength {
                    what: "private key",
                    expected: 64,
                    actual: rest.len(),
                });
            }
            (KeyKind::Ed25519, &rest[..32])
        } else if let Some(rest) = data.strip_prefix(SECP256K1_SECRET_PREFIX) {
            (KeyKind::Secp256k1, rest)
        } else if let Some(rest) = data.strip_prefix(P256_SECRET_PREFIX) {
            (KeyKind::P256, rest)
        } else {
            return Err(ParseError::InvalidPrefix {
                expected: "private key",
            });
        };
        let secret: [u8; 32] = payload.try_into().map_err(|_| ParseError::InvalidLength {
            what: "private key",
            expected: 32,
            actual: payload.len(),
        })?;
        Ok(Self { kind, secret })
    }
}

macro_rules! impl_text_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_base58())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_text_serde!(PublicKey);
impl_text_serde!(Signature);
