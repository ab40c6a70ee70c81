//! Error types for Tezos operation encoding, decoding, signing and validation.

use thiserror::Error;

use crate::model::{KeyKind, OpKind};

/// Coarse classification shared by encode and decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fewer bytes remain than a field declares.
    ShortBuffer,
    /// The tag byte does not belong to the kind being decoded.
    TagMismatch,
    /// The tag byte belongs to no known kind under the active tags version.
    UnknownTag,
    /// A caller-side precondition (branch, contents) is not met.
    Precondition,
    /// Any other structurally invalid input.
    Malformed,
}

impl ErrorKind {
    /// Returns a short stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::ShortBuffer => "short_buffer",
            ErrorKind::TagMismatch => "tag_mismatch",
            ErrorKind::UnknownTag => "unknown_tag",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Malformed => "malformed",
        }
    }
}

/// Error during binary decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("short buffer while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("tag mismatch for {kind}: expected {expected}, found {found}")]
    TagMismatch { kind: OpKind, expected: u8, found: u8 },

    #[error("unknown operation tag {tag} for tags version {version}")]
    UnknownTag { tag: u8, version: u8 },

    #[error("invalid bool value: {value:#04x} (expected 0x00 or 0xff)")]
    InvalidBool { value: u8 },

    #[error("invalid address tag {tag} in {context}")]
    InvalidAddressTag { tag: u8, context: &'static str },

    #[error("invalid public key tag {tag}")]
    InvalidKeyTag { tag: u8 },

    #[error("non-zero padding byte in {context}")]
    InvalidPadding { context: &'static str },

    #[error("non-canonical zarith number in {context}")]
    NonCanonicalVarint { context: &'static str },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} declares {declared} bytes but its content used {consumed}")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        consumed: usize,
    },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("invalid {field} value: {value}")]
    InvalidEnumValue { field: &'static str, value: u8 },

    #[error("{kind} is not allowed inside {context}")]
    UnexpectedKind { kind: OpKind, context: &'static str },

    #[error("smart rollup refutation proof steps have no defined binary layout")]
    UnsupportedRefutationStep,

    #[error("{count} unexpected trailing bytes")]
    TrailingBytes { count: usize },

    #[error("malformed encoding: {context}")]
    MalformedEncoding { context: &'static str },
}

impl DecodeError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnexpectedEof { .. } => ErrorKind::ShortBuffer,
            DecodeError::TagMismatch { .. } => ErrorKind::TagMismatch,
            DecodeError::UnknownTag { .. } => ErrorKind::UnknownTag,
            _ => ErrorKind::Malformed,
        }
    }
}

/// Error during binary encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("operation has no branch")]
    MissingBranch,

    #[error("operation has no contents")]
    EmptyContents,

    #[error("{kind} has no tag under tags version {version}")]
    UnsupportedKind { kind: OpKind, version: u8 },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{address} cannot be written as {form}")]
    InvalidAddress { address: String, form: &'static str },

    #[error("{kind} is not allowed inside {context}")]
    UnexpectedKind { kind: OpKind, context: &'static str },

    #[error("smart rollup refutation proof steps have no defined binary layout")]
    UnsupportedRefutationStep,

    #[error("{field} must be exactly {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl EncodeError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::MissingBranch | EncodeError::EmptyContents => ErrorKind::Precondition,
            _ => ErrorKind::Malformed,
        }
    }
}

/// Error while signing or verifying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("operation has no branch")]
    MissingBranch,

    #[error("operation has no contents")]
    EmptyContents,

    #[error("operation has no signature")]
    MissingSignature,

    #[error("signing with {0} keys is not supported")]
    UnsupportedKey(KeyKind),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    Verification,

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl From<SignError> for ErrorKind {
    fn from(err: SignError) -> Self {
        match err {
            SignError::MissingBranch | SignError::EmptyContents => ErrorKind::Precondition,
            SignError::Encode(e) => e.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}

/// Error while parsing a textual (base58, hex, decimal) value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid base58 string")]
    InvalidBase58,

    #[error("invalid base58 checksum")]
    InvalidChecksum,

    #[error("unknown or unexpected prefix for {expected}")]
    InvalidPrefix { expected: &'static str },

    #[error("{what} must be {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid hex string")]
    InvalidHex,

    #[error("invalid decimal number: {0}")]
    InvalidNumber(String),

    #[error("invalid entrypoint: {0}")]
    InvalidEntrypoint(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown operation kind: {0}")]
    UnknownKind(String),
}

/// Error during semantic validation of an operation against protocol limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("operation has no branch")]
    MissingBranch,

    #[error("operation has no contents")]
    EmptyContents,

    #[error("ttl {ttl} exceeds maximum {max}")]
    TtlTooLarge { ttl: i64, max: i64 },

    #[error("content {index}: gas limit {gas} exceeds per-operation maximum {max}")]
    GasLimitPerOperation { index: usize, gas: i64, max: i64 },

    #[error("content {index}: storage limit {storage} exceeds per-operation maximum {max}")]
    StorageLimitPerOperation { index: usize, storage: i64, max: i64 },

    #[error("total gas limit {gas} exceeds per-block maximum {max}")]
    GasLimitPerBlock { gas: i64, max: i64 },

    #[error("content {index}: source {found} differs from batch source {expected}")]
    MixedSources {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("consensus operation {kind} must be the only content")]
    ConsensusNotAlone { kind: OpKind },

    #[error("content {index}: {kind} is not available under tags version {version}")]
    UnsupportedKind { index: usize, kind: OpKind, version: u8 },
}

/// Error while loading protocol parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("invalid parameters document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported operation tags version {0}")]
    UnsupportedTagsVersion(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_kinds() {
        assert_eq!(
            DecodeError::UnexpectedEof { context: "branch" }.kind(),
            ErrorKind::ShortBuffer
        );
        assert_eq!(
            DecodeError::UnknownTag { tag: 99, version: 2 }.kind(),
            ErrorKind::UnknownTag
        );
        assert_eq!(
            DecodeError::TagMismatch {
                kind: OpKind::Transaction,
                expected: 108,
                found: 107
            }
            .kind(),
            ErrorKind::TagMismatch
        );
        assert_eq!(
            DecodeError::InvalidBool { value: 1 }.kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_encode_error_kinds() {
        assert_eq!(EncodeError::MissingBranch.kind(), ErrorKind::Precondition);
        assert_eq!(EncodeError::EmptyContents.kind(), ErrorKind::Precondition);
        assert_eq!(
            ErrorKind::from(SignError::Encode(EncodeError::EmptyContents)),
            ErrorKind::Precondition
        );
        assert_eq!(ErrorKind::ShortBuffer.name(), "short_buffer");
    }

    #[test]
    fn test_messages() {
        let err = DecodeError::UnexpectedEof { context: "fee" };
        assert_eq!(err.to_string(), "short buffer while reading fee");
        let err = EncodeError::UnsupportedKind {
            kind: OpKind::SmartRollupCement,
            version: 1,
        };
        assert_eq!(
            err.to_string(),
            "smart_rollup_cement has no tag under tags version 1"
        );
    }
}
