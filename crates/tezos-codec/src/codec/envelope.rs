//! Envelope encoding/decoding, watermarking and signing.
//!
//! Wire format: 32-byte branch, the encoded contents in order, then the
//! raw 64-byte signature when one is present. The signing payload is the
//! same bytes without signature, prefixed by a watermark chosen from the
//! first content's kind.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::op::{decode_kind, encode_operation};
use crate::codec::primitives::{Reader, Writer};
use crate::codec::registry;
use crate::error::{DecodeError, EncodeError, SignError};
use crate::limits::{MIN_OPERATION_LEN, SIGNATURE_LEN};
use crate::model::{BlockHash, Op, OpKind, OperationHash, PrivateKey, PublicKey, blake2b_256};
use crate::params::Params;

/// Watermark of operations outside consensus.
pub const GENERIC_WATERMARK: u8 = 0x03;

/// Watermark of legacy endorsements.
pub const ENDORSEMENT_WATERMARK: u8 = 0x02;

/// Watermark of Tenderbake endorsements, followed by the chain id.
pub const TENDERBAKE_ENDORSEMENT_WATERMARK: u8 = 0x13;

/// Watermark of Tenderbake preendorsements, followed by the chain id.
pub const PREENDORSEMENT_WATERMARK: u8 = 0x12;

// =============================================================================
// ENCODING
// =============================================================================

fn check_preconditions(op: &Op) -> Result<(), EncodeError> {
    if op.branch.is_zero() {
        return Err(EncodeError::MissingBranch);
    }
    if op.contents.is_empty() {
        return Err(EncodeError::EmptyContents);
    }
    Ok(())
}

fn encode_unsigned(writer: &mut Writer, op: &Op) -> Result<(), EncodeError> {
    check_preconditions(op)?;
    let params = op.params();
    writer.write_bytes(op.branch.as_bytes());
    for content in &op.contents {
        encode_operation(writer, content, params)?;
    }
    Ok(())
}

/// True when the envelope never carries an outer signature.
fn is_unsigned_kind(op: &Op) -> bool {
    op.contents
        .first()
        .is_some_and(|c| c.kind() == OpKind::EndorsementWithSlot)
}

/// Encodes an envelope for broadcast.
pub fn encode_op(op: &Op) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::with_capacity(128);
    encode_unsigned(&mut writer, op)?;
    if let Some(signature) = &op.signature {
        if !is_unsigned_kind(op) {
            writer.write_signature(signature);
        }
    }
    Ok(writer.into_bytes())
}

/// Watermark byte and optional chain id for the envelope's first content.
fn watermark(op: &Op) -> (u8, bool) {
    let tenderbake = op.params().is_tenderbake();
    match op.contents.first().map(|c| c.kind()) {
        Some(OpKind::Endorsement | OpKind::EndorsementWithDal) if tenderbake => {
            (TENDERBAKE_ENDORSEMENT_WATERMARK, true)
        }
        Some(OpKind::Preendorsement) if tenderbake => (PREENDORSEMENT_WATERMARK, true),
        Some(OpKind::Endorsement | OpKind::EndorsementWithSlot) => (ENDORSEMENT_WATERMARK, false),
        _ => (GENERIC_WATERMARK, false),
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes an envelope.
///
/// Contents are read until the input is exhausted. When exactly 64 bytes
/// remain and they do not start a decodable content, they are taken as the
/// trailing signature.
pub fn decode_op(bytes: &[u8], params: &Params) -> Result<Op, DecodeError> {
    if bytes.len() < MIN_OPERATION_LEN {
        return Err(DecodeError::UnexpectedEof {
            context: "operation",
        });
    }
    let version = params.tags_version();
    let mut reader = Reader::new(bytes);
    let mut op = Op::new().with_params(Arc::new(params.clone()));
    op.branch = BlockHash::new(reader.read_array("branch")?);

    while !reader.is_empty() {
        let at_signature = reader.remaining_len() == SIGNATURE_LEN;
        let tag = reader.peek_byte("tag")?;
        let Some(kind) = registry::kind_for(tag, version) else {
            if at_signature {
                debug!(tag, version, "unknown tag before 64 bytes, reading signature");
                break;
            }
            return Err(DecodeError::UnknownTag { tag, version });
        };
        match decode_kind(&mut reader, kind, params) {
            Ok(content) => {
                trace!(%kind, offset = reader.position(), "decoded content");
                op.contents.push(content);
            }
            Err(err) if at_signature => {
                debug!(%kind, error = %err, "undecodable content before 64 bytes, reading signature");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    if reader.remaining_len() == SIGNATURE_LEN {
        op.signature = Some(reader.read_signature("signature")?);
    }
    if op.contents.is_empty() {
        return Err(DecodeError::MalformedEncoding {
            context: "operation without contents",
        });
    }
    Ok(op)
}

// =============================================================================
// ENVELOPE METHODS
// =============================================================================

impl Op {
    /// Broadcast bytes, or an empty vector when the envelope has no branch,
    /// no contents, or cannot be encoded.
    pub fn bytes(&self) -> Vec<u8> {
        match encode_op(self) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(error = %err, "operation not encodable");
                Vec::new()
            }
        }
    }

    /// Like [`Op::bytes`] but reports why encoding failed.
    pub fn try_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_op(self)
    }

    /// Signing payload: watermark, chain id for Tenderbake consensus
    /// operations, branch and contents.
    pub fn watermarked_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        check_preconditions(self)?;
        let (mark, with_chain_id) = watermark(self);
        let mut writer = Writer::with_capacity(128);
        writer.write_byte(mark);
        if with_chain_id {
            if let Some(chain_id) = self.chain_id.or(self.params().chain_id) {
                writer.write_bytes(chain_id.as_bytes());
            }
        }
        encode_unsigned(&mut writer, self)?;
        Ok(writer.into_bytes())
    }

    /// BLAKE2b-256 of the watermarked bytes.
    pub fn digest(&self) -> Result<[u8; 32], EncodeError> {
        Ok(blake2b_256(&self.watermarked_bytes()?))
    }

    /// Signs the envelope. An existing non-zero signature is kept.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), SignError> {
        if self.branch.is_zero() {
            return Err(SignError::MissingBranch);
        }
        if self.contents.is_empty() {
            return Err(SignError::EmptyContents);
        }
        if self.is_signed() {
            return Ok(());
        }
        let digest = self.digest()?;
        self.signature = Some(key.sign_digest(&digest)?);
        Ok(())
    }

    /// Checks the signature against `key`.
    pub fn verify(&self, key: &PublicKey) -> Result<(), SignError> {
        let signature = self.signature.ok_or(SignError::MissingSignature)?;
        key.verify_digest(&self.digest()?, &signature)
    }

    /// Operation hash of the broadcast bytes.
    pub fn hash(&self) -> Result<OperationHash, EncodeError> {
        Ok(OperationHash::digest(&encode_op(self)?))
    }

    /// Decodes an envelope under `params`.
    pub fn from_bytes(bytes: &[u8], params: &Params) -> Result<Self, DecodeError> {
        decode_op(bytes, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{BRANCH_LEN, MIN_CONTENT_LEN};
    use crate::model::{
        ChainId, ConsensusContent, Endorsement, EndorsementWithSlot, InlinedEndorsement,
        ManagerFields, N, Operation, PayloadHash, Reveal, Signature, Transaction,
    };

    const E2E_BRANCH: &str = "09af86390e5f9d6a0b5f1f6c7a4e8b1d2c3f4a5b6c7d8e9fa0b1c2d3e4f50617";
    const E2E_HEX: &str = concat!(
        "09af86390e5f9d6a0b5f1f6c7a4e8b1d2c3f4a5b6c7d8e9fa0b1c2d3e4f50617",
        "6b",
        "0002298c03ed7d454a101eb7022bc95f7e5f41ac78",
        "e807",
        "c197b001",
        "e807",
        "00",
        "0103480fcf4241d5903bd5b9a71db63fc6784dc9e686acf0dac9b4305d54cb642946",
    );

    fn branch() -> BlockHash {
        BlockHash::from_slice(&hex::decode(E2E_BRANCH).unwrap()).unwrap()
    }

    fn reveal() -> Operation {
        Operation::Reveal(Reveal {
            manager: ManagerFields {
                source: "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse().unwrap(),
                fee: N::from(1000u64),
                counter: N::from(2_886_593u64),
                gas_limit: N::from(1000u64),
                storage_limit: N::zero(),
            },
            public_key: "sppk7bo7kcRyjajZaAqEfqdtCNx3wgizhJPFqaEuisncbDFMgn6v4iP"
                .parse()
                .unwrap(),
        })
    }

    fn transfer(counter: u64) -> Operation {
        let mut manager = ManagerFields::new("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse().unwrap());
        manager.counter = N::from(counter);
        Operation::Transaction(Transaction {
            manager,
            amount: N::from(1u64),
            destination: "tz1gjaF81ZRRvdzjobyfVNsAeSC6PScjfQwN".parse().unwrap(),
            parameters: None,
        })
    }

    #[test]
    fn test_end_to_end_reveal() {
        let op = Op::new().with_branch(branch()).with_contents(reveal());
        assert_eq!(hex::encode(op.bytes()), E2E_HEX);

        let decoded = decode_op(&hex::decode(E2E_HEX).unwrap(), &Params::default()).unwrap();
        assert_eq!(decoded, op);
        assert!(decoded.signature.is_none());
        assert_eq!(
            serde_json::to_string(&decoded).unwrap(),
            serde_json::to_string(&op).unwrap()
        );
    }

    #[test]
    fn test_bytes_preconditions() {
        assert!(Op::new().with_contents(reveal()).bytes().is_empty());
        assert!(Op::new().with_branch(branch()).bytes().is_empty());
        assert_eq!(
            Op::new().with_branch(branch()).try_bytes(),
            Err(EncodeError::EmptyContents)
        );
        assert_eq!(
            Op::new().with_contents(reveal()).watermarked_bytes(),
            Err(EncodeError::MissingBranch)
        );
    }

    #[test]
    fn test_sign_preconditions() {
        let key = PrivateKey::ed25519_from_seed([1u8; 32]);
        assert_eq!(
            Op::new().with_contents(reveal()).sign(&key),
            Err(SignError::MissingBranch)
        );
        assert_eq!(
            Op::new().with_branch(branch()).sign(&key),
            Err(SignError::EmptyContents)
        );
    }

    #[test]
    fn test_sign_verify_and_decode_signed() {
        let key = PrivateKey::ed25519_from_seed([3u8; 32]);
        let mut op = Op::new()
            .with_branch(branch())
            .with_contents(transfer(1))
            .with_contents(transfer(2));
        op.sign(&key).unwrap();
        assert!(op.is_signed());
        op.verify(&key.public_key().unwrap()).unwrap();

        let bytes = op.bytes();
        let decoded = decode_op(&bytes, &Params::default()).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(decoded.contents.len(), 2);
        decoded.verify(&key.public_key().unwrap()).unwrap();

        let first = op.signature;
        op.sign(&key).unwrap();
        assert_eq!(op.signature, first);

        assert!(op.hash().unwrap().to_base58().starts_with('o'));
    }

    #[test]
    fn test_generic_watermark() {
        let op = Op::new().with_branch(branch()).with_contents(reveal());
        let wm = op.watermarked_bytes().unwrap();
        assert_eq!(wm[0], GENERIC_WATERMARK);
        assert_eq!(&wm[1..], op.bytes().as_slice());
        assert_eq!(op.digest().unwrap(), blake2b_256(&wm));
    }

    #[test]
    fn test_consensus_watermarks() {
        let content = ConsensusContent {
            slot: 1,
            level: 2,
            round: 0,
            block_payload_hash: PayloadHash::new([4u8; 32]),
        };
        let chain = ChainId::new([9, 8, 7, 6]);

        let op = Op::new()
            .with_branch(branch())
            .with_contents(Operation::TenderbakeEndorsement(content.clone()))
            .with_chain_id(chain);
        let wm = op.watermarked_bytes().unwrap();
        assert_eq!(&wm[..5], &[TENDERBAKE_ENDORSEMENT_WATERMARK, 9, 8, 7, 6]);
        assert_eq!(&wm[5..37], branch().as_bytes());

        let op = Op::new()
            .with_branch(branch())
            .with_contents(Operation::Preendorsement(content));
        let wm = op.watermarked_bytes().unwrap();
        assert_eq!(wm[0], PREENDORSEMENT_WATERMARK);
        assert_eq!(&wm[1..5], ChainId::MAINNET.as_bytes());

        let legacy = Arc::new(Params::for_protocol_version(9));
        let op = Op::new()
            .with_params(legacy)
            .with_branch(branch())
            .with_contents(Operation::Endorsement(Endorsement { level: 7 }));
        let wm = op.watermarked_bytes().unwrap();
        assert_eq!(wm[0], ENDORSEMENT_WATERMARK);
        assert_eq!(&wm[1..33], branch().as_bytes());
    }

    #[test]
    fn test_endorsement_with_slot_never_signed() {
        let legacy = Arc::new(Params::for_protocol_version(9));
        let op = Op::new()
            .with_params(legacy)
            .with_branch(branch())
            .with_contents(Operation::EndorsementWithSlot(EndorsementWithSlot {
                endorsement: InlinedEndorsement {
                    branch: branch(),
                    operations: Box::new(Operation::Endorsement(Endorsement { level: 7 })),
                    signature: Signature::new([5u8; 64]),
                },
                slot: 3,
            }))
            .with_signature(Signature::new([6u8; 64]));
        let bytes = op.bytes();
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 3]);
    }

    #[test]
    fn test_unknown_tag_with_64_bytes_is_signature() {
        let op = Op::new().with_branch(branch()).with_contents(reveal());
        let mut bytes = op.bytes();
        let mut signature = [0u8; 64];
        signature[0] = 0xfe;
        bytes.extend_from_slice(&signature);

        let decoded = decode_op(&bytes, &Params::default()).unwrap();
        assert_eq!(decoded.contents.len(), 1);
        assert_eq!(decoded.signature, Some(Signature::new(signature)));
    }

    #[test]
    fn test_known_tag_with_64_bytes_falls_back_to_signature() {
        let op = Op::new().with_branch(branch()).with_contents(reveal());
        let mut bytes = op.bytes();
        // 108 is the transaction tag, but 64 bytes cannot hold a transaction
        // with a contract destination and its trailer.
        let mut signature = [0xffu8; 64];
        signature[0] = 108;
        bytes.extend_from_slice(&signature);

        let decoded = decode_op(&bytes, &Params::default()).unwrap();
        assert_eq!(decoded.contents.len(), 1);
        assert_eq!(decoded.signature, Some(Signature::new(signature)));
    }

    #[test]
    fn test_unknown_tag_elsewhere_is_error() {
        let op = Op::new().with_branch(branch()).with_contents(reveal());
        let mut bytes = op.bytes();
        bytes.extend_from_slice(&[0xfe; 10]);
        assert_eq!(
            decode_op(&bytes, &Params::default()),
            Err(DecodeError::UnknownTag { tag: 0xfe, version: 2 })
        );
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            decode_op(&[0u8; 32], &Params::default()),
            Err(DecodeError::UnexpectedEof {
                context: "operation"
            })
        );
    }

    #[test]
    fn test_decode_shorter_than_smallest_content() {
        // Branch plus a tag and three bytes of level.
        let mut bytes = vec![0u8; MIN_OPERATION_LEN - 1];
        bytes[BRANCH_LEN] = 21;
        assert_eq!(MIN_OPERATION_LEN, BRANCH_LEN + MIN_CONTENT_LEN);
        assert_eq!(
            decode_op(&bytes, &Params::default()),
            Err(DecodeError::UnexpectedEof {
                context: "operation"
            })
        );
    }

    #[test]
    fn test_decoded_op_keeps_params() {
        let legacy = Params::for_protocol_version(9);
        let op = Op::new()
            .with_params(Arc::new(legacy.clone()))
            .with_branch(branch())
            .with_contents(transfer(5));
        let bytes = op.bytes();
        assert_eq!(bytes[32], 108);
        let decoded = decode_op(&bytes, &legacy).unwrap();
        assert_eq!(decoded.params().tags_version(), 1);
        assert_eq!(decoded.bytes(), bytes);
    }
}
