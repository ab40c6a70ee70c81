//! Arbitrary-precision naturals (`N`) and integers (`Z`).
//!
//! Both serialize to JSON as decimal strings, which is how the node RPC
//! renders fees, counters, limits and amounts.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// An unsigned arbitrary-precision number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct N(BigUint);

impl N {
    /// Creates a natural from a big unsigned integer.
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Returns zero.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Returns the underlying big integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_inner(self) -> BigUint {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the value if it fits into `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// Returns the value as `i64`, saturating at `i64::MAX`.
    pub fn to_i64_saturating(&self) -> i64 {
        self.0.to_i64().unwrap_or(i64::MAX)
    }

    /// Number of bytes of the binary zarith encoding.
    pub fn encoded_len(&self) -> usize {
        let bits = self.0.bits() as usize;
        bits.div_ceil(7).max(1)
    }
}

impl From<u64> for N {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u32> for N {
    fn from(value: u32) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for N {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<N> for BigUint {
    fn from(value: N) -> Self {
        value.0
    }
}

impl TryFrom<i64> for N {
    type Error = ParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(N::from)
            .map_err(|_| ParseError::InvalidNumber(value.to_string()))
    }
}

impl fmt::Display for N {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for N {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str(s)
            .map(N)
            .map_err(|_| ParseError::InvalidNumber(s.to_string()))
    }
}

/// A signed arbitrary-precision number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Z(BigInt);

impl Z {
    pub fn new(value: BigInt) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn into_inner(self) -> BigInt {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// Returns the absolute value.
    pub fn magnitude(&self) -> &BigUint {
        self.0.magnitude()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Number of bytes of the binary zarith encoding.
    pub fn encoded_len(&self) -> usize {
        let bits = self.0.magnitude().bits() as usize;
        if bits <= 6 {
            1
        } else {
            1 + (bits - 6).div_ceil(7)
        }
    }
}

impl From<i64> for Z {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<i32> for Z {
    fn from(value: i32) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<BigInt> for Z {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<N> for Z {
    fn from(value: N) -> Self {
        Self(BigInt::from_biguint(Sign::Plus, value.0))
    }
}

impl fmt::Display for Z {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Z {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s)
            .map(Z)
            .map_err(|_| ParseError::InvalidNumber(s.to_string()))
    }
}

macro_rules! impl_decimal_serde {
    ($ty:ident, $expecting:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct DecimalVisitor;

                impl Visitor<'_> for DecimalVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str($expecting)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<$ty, E> {
                        v.parse().map_err(E::custom)
                    }

                    fn visit_u64<E: de::Error>(self, v: u64) -> Result<$ty, E> {
                        v.to_string().parse().map_err(E::custom)
                    }

                    fn visit_i64<E: de::Error>(self, v: i64) -> Result<$ty, E> {
                        v.to_string().parse().map_err(E::custom)
                    }
                }

                deserializer.deserialize_any(DecimalVisitor)
            }
        }
    };
}

impl_decimal_serde!(N, "a non-negative decimal number or string");
impl_decimal_serde!(Z, "a decimal number or string");
