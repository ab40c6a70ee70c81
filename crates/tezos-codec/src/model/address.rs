//! Account, contract and rollup addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::limits::ADDRESS_HASH_LEN;
use crate::model::hash::{decode_base58check, encode_base58check};
use crate::model::key::{KeyKind, PublicKey};

/// What an address points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// `tz1`/`tz2`/`tz3`/`tz4` accounts controlled by a key.
    Implicit(KeyKind),
    /// `KT1` originated contracts.
    Originated,
    /// `sr1` smart rollups.
    SmartRollup,
}

impl AddressKind {
    fn prefix(self) -> &'static [u8] {
        match self {
            AddressKind::Implicit(KeyKind::Ed25519) => &[6, 161, 159],
            AddressKind::Implicit(KeyKind::Secp256k1) => &[6, 161, 161],
            AddressKind::Implicit(KeyKind::P256) => &[6, 161, 164],
            AddressKind::Implicit(KeyKind::Bls) => &[6, 161, 166],
            AddressKind::Originated => &[2, 90, 121],
            AddressKind::SmartRollup => &[6, 124, 117],
        }
    }

    const ALL: [AddressKind; 6] = [
        AddressKind::Implicit(KeyKind::Ed25519),
        AddressKind::Implicit(KeyKind::Secp256k1),
        AddressKind::Implicit(KeyKind::P256),
        AddressKind::Implicit(KeyKind::Bls),
        AddressKind::Originated,
        AddressKind::SmartRollup,
    ];
}

/// A 20-byte hash plus the kind of entity it identifies.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    kind: AddressKind,
    hash: [u8; ADDRESS_HASH_LEN],
}

impl Address {
    pub const fn new(kind: AddressKind, hash: [u8; ADDRESS_HASH_LEN]) -> Self {
        Self { kind, hash }
    }

    /// Implicit address of a public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self::new(AddressKind::Implicit(key.kind()), key.hash())
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; ADDRESS_HASH_LEN] {
        &self.hash
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self.kind, AddressKind::Implicit(_))
    }

    pub fn is_originated(&self) -> bool {
        self.kind == AddressKind::Originated
    }

    pub fn is_rollup(&self) -> bool {
        self.kind == AddressKind::SmartRollup
    }

    /// An all-zero hash never names a real account.
    pub fn is_zero(&self) -> bool {
        self.hash.iter().all(|b| *b == 0)
    }

    pub fn to_base58(&self) -> String {
        encode_base58check(self.kind.prefix(), &self.hash)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_base58check(s)?;
        let kind = AddressKind::ALL
            .into_iter()
            .find(|k| data.starts_with(k.prefix()))
            .ok_or(ParseError::InvalidPrefix { expected: "address" })?;
        let payload = &data[kind.prefix().len()..];
        let hash: [u8; ADDRESS_HASH_LEN] =
            payload.try_into().map_err(|_| ParseError::InvalidLength {
                what: "address",
                expected: ADDRESS_HASH_LEN,
                actual: payload.len(),
            })?;
        Ok(Self { kind, hash })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_kind() {
        let cases = [
            ("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", AddressKind::Implicit(KeyKind::Ed25519)),
            ("tz2WU9XW86EdgVQZrbPphjUZiRfXXssY9wEP", AddressKind::Implicit(KeyKind::Secp256k1)),
            ("tz3hqqamVC1G22LACFoMgcJeFKZgoGMFSfSn", AddressKind::Implicit(KeyKind::P256)),
            ("tz4Uzyxg26DJyM4pc1V2pUvLpdsR5jdyzYsZ", AddressKind::Implicit(KeyKind::Bls)),
            ("KT1EY9XA4Z5tybQN5zmVUL5cntku1zTCBLTv", AddressKind::Originated),
        ];
        for (text, kind) in cases {
            let addr: Address = text.parse().unwrap();
            assert_eq!(addr.kind(), kind, "{text}");
            assert_eq!(addr.to_base58(), text);
        }
    }

    #[test]
    fn test_known_hash() {
        let addr: Address = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse().unwrap();
        assert_eq!(
            hex::encode(addr.hash()),
            "02298c03ed7d454a101eb7022bc95f7e5f41ac78"
        );
    }

    #[test]
    fn test_rollup_prefix() {
        let addr = Address::new(AddressKind::SmartRollup, [4u8; 20]);
        let text = addr.to_base58();
        assert!(text.starts_with("sr1"));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_from_public_key() {
        let key: PublicKey = "sppk7bo7kcRyjajZaAqEfqdtCNx3wgizhJPFqaEuisncbDFMgn6v4iP"
            .parse()
            .unwrap();
        let addr = Address::from_public_key(&key);
        assert_eq!(addr.kind(), AddressKind::Implicit(KeyKind::Secp256k1));
        assert_eq!(addr.hash(), &key.hash());
        assert!(addr.to_base58().starts_with("tz2"));
    }

    #[test]
    fn test_json_is_text() {
        let addr: Address = "KT1EY9XA4Z5tybQN5zmVUL5cntku1zTCBLTv".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"KT1EY9XA4Z5tybQN5zmVUL5cntku1zTCBLTv\""
        );
    }
}
