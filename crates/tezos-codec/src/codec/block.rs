//! Block header encoding/decoding and signing.
//!
//! Shell header: level, proto, predecessor, timestamp, validation pass,
//! operations hash, fitness and context. The protocol data that follows
//! depends on the tags version:
//!
//! - Tenderbake: payload hash, payload round, pow nonce, optional seed
//!   nonce hash, per-block votes byte.
//! - Legacy: priority, pow nonce, optional seed nonce hash.
//!
//! Both end with an optional 64-byte signature.

use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, EncodeError, SignError};
use crate::limits::{MAX_BYTES_LEN, SIGNATURE_LEN};
use crate::model::{
    BlockHash, BlockHeader, ContextHash, HexBytes, NonceHash, OperationListListHash, PayloadHash,
    PowNonce, PrivateKey, PublicKey, blake2b_256,
};
use crate::params::Params;
use crate::util::Timestamp;

/// Watermark of legacy block signatures.
pub const BLOCK_WATERMARK: u8 = 0x01;

/// Watermark of Tenderbake block signatures, followed by the chain id.
pub const TENDERBAKE_BLOCK_WATERMARK: u8 = 0x11;

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a block header, appending its signature when `with_signature`
/// is set and one is present.
pub fn encode_block_header(
    writer: &mut Writer,
    header: &BlockHeader,
    params: &Params,
    with_signature: bool,
) -> Result<(), EncodeError> {
    writer.write_i32(header.level);
    writer.write_byte(header.proto);
    writer.write_bytes(header.predecessor.as_bytes());
    writer.write_i64(header.timestamp.seconds());
    writer.write_byte(header.validation_pass);
    writer.write_bytes(header.operations_hash.as_bytes());
    writer.write_prefixed_with("fitness", |w| {
        for part in &header.fitness {
            w.write_bytes_prefixed(part.as_slice(), "fitness")?;
        }
        Ok(())
    })?;
    writer.write_bytes(header.context.as_bytes());

    if params.is_tenderbake() {
        writer.write_bytes(header.payload_hash.as_bytes());
        writer.write_i32(header.payload_round);
    } else {
        writer.write_u16(header.priority);
    }

    writer.write_bytes(header.proof_of_work_nonce.as_bytes());
    match &header.seed_nonce_hash {
        Some(hash) => {
            writer.write_bool(true);
            writer.write_bytes(hash.as_bytes());
        }
        None => writer.write_bool(false),
    }

    if params.is_tenderbake() {
        writer.write_byte(header.per_block_votes());
    }

    if with_signature {
        if let Some(signature) = &header.signature {
            writer.write_signature(signature);
        }
    }
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a block header. A signature is read when at least 64 bytes
/// remain after the protocol data.
pub fn decode_block_header(
    reader: &mut Reader<'_>,
    params: &Params,
) -> Result<BlockHeader, DecodeError> {
    let mut header = BlockHeader {
        level: reader.read_i32("level")?,
        proto: reader.read_byte("proto")?,
        predecessor: BlockHash::new(reader.read_array("predecessor")?),
        timestamp: Timestamp(reader.read_i64("timestamp")?),
        validation_pass: reader.read_byte("validation_pass")?,
        operations_hash: OperationListListHash::new(reader.read_array("operations_hash")?),
        fitness: reader.read_list_prefixed("fitness", |r| {
            r.read_bytes_prefixed(MAX_BYTES_LEN, "fitness")
                .map(HexBytes::from)
        })?,
        context: ContextHash::new(reader.read_array("context")?),
        ..BlockHeader::default()
    };

    if params.is_tenderbake() {
        header.payload_hash = PayloadHash::new(reader.read_array("payload_hash")?);
        header.payload_round = reader.read_i32("payload_round")?;
    } else {
        header.priority = reader.read_u16("priority")?;
    }

    header.proof_of_work_nonce = PowNonce::new(reader.read_array("proof_of_work_nonce")?);
    if reader.read_bool("seed_nonce_hash")? {
        header.seed_nonce_hash = Some(NonceHash::new(reader.read_array("seed_nonce_hash")?));
    }

    if params.is_tenderbake() {
        header.set_per_block_votes(reader.read_byte("per_block_votes")?)?;
    }

    if reader.remaining_len() >= SIGNATURE_LEN {
        header.signature = Some(reader.read_signature("signature")?);
    }
    Ok(header)
}

// =============================================================================
// SIGNING
// =============================================================================

impl BlockHeader {
    /// Encoded header without signature.
    pub fn bytes(&self, params: &Params) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::with_capacity(256);
        encode_block_header(&mut writer, self, params, false)?;
        Ok(writer.into_bytes())
    }

    /// Encoded header including its signature, if any.
    pub fn signed_bytes(&self, params: &Params) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::with_capacity(256 + SIGNATURE_LEN);
        encode_block_header(&mut writer, self, params, true)?;
        Ok(writer.into_bytes())
    }

    /// Decodes a header that spans the whole slice.
    pub fn from_bytes(bytes: &[u8], params: &Params) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let header = decode_block_header(&mut reader, params)?;
        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes {
                count: reader.remaining_len(),
            });
        }
        Ok(header)
    }

    /// Signing payload: watermark, chain id (Tenderbake) and unsigned header.
    pub fn watermarked_bytes(&self, params: &Params) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::with_capacity(256);
        if params.is_tenderbake() {
            writer.write_byte(TENDERBAKE_BLOCK_WATERMARK);
            if let Some(chain_id) = self.chain_id.or(params.chain_id) {
                writer.write_bytes(chain_id.as_bytes());
            }
        } else {
            writer.write_byte(BLOCK_WATERMARK);
        }
        encode_block_header(&mut writer, self, params, false)?;
        Ok(writer.into_bytes())
    }

    /// BLAKE2b-256 of the watermarked bytes.
    pub fn digest(&self, params: &Params) -> Result<[u8; 32], EncodeError> {
        Ok(blake2b_256(&self.watermarked_bytes(params)?))
    }

    /// Signs the header. Existing valid signatures are kept.
    pub fn sign(&mut self, key: &PrivateKey, params: &Params) -> Result<(), SignError> {
        if self.signature.is_some_and(|s| !s.is_zero()) {
            return Ok(());
        }
        let digest = self.digest(params)?;
        self.signature = Some(key.sign_digest(&digest)?);
        Ok(())
    }

    pub fn verify(&self, key: &PublicKey, params: &Params) -> Result<(), SignError> {
        let signature = self.signature.ok_or(SignError::MissingSignature)?;
        key.verify_digest(&self.digest(params)?, &signature)
    }

    /// Block hash: BLAKE2b-256 of the signed header.
    pub fn hash(&self, params: &Params) -> Result<BlockHash, EncodeError> {
        Ok(BlockHash::digest(&self.signed_bytes(params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChainId, FeatureVote, Signature};

    fn header() -> BlockHeader {
        BlockHeader {
            level: 3_000_000,
            proto: 17,
            predecessor: BlockHash::new([1u8; 32]),
            timestamp: "2023-01-01T00:00:00Z".parse().unwrap(),
            validation_pass: 4,
            operations_hash: [2u8; 32].into(),
            fitness: vec![
                HexBytes::new(vec![2]),
                HexBytes::new(vec![0, 0x2d, 0xc6, 0xc0]),
                HexBytes::new(vec![]),
                HexBytes::new(vec![0xff, 0xff, 0xff, 0xff]),
                HexBytes::new(vec![0, 0, 0, 0]),
            ],
            context: [3u8; 32].into(),
            payload_hash: [4u8; 32].into(),
            payload_round: 1,
            proof_of_work_nonce: PowNonce::new([5u8; 8]),
            seed_nonce_hash: Some(NonceHash::new([6u8; 32])),
            liquidity_baking_toggle_vote: FeatureVote::Off,
            adaptive_issuance_vote: FeatureVote::On,
            ..BlockHeader::default()
        }
    }

    #[test]
    fn test_tenderbake_roundtrip() {
        let params = Params::default();
        let h = header().with_signature(Signature::new([9u8; 64]));
        let bytes = h.signed_bytes(&params).unwrap();
        assert_eq!(bytes.len(), h.bytes(&params).unwrap().len() + SIGNATURE_LEN);
        assert_eq!(BlockHeader::from_bytes(&bytes, &params).unwrap(), h);
    }

    #[test]
    fn test_legacy_layout() {
        let params = Params::for_protocol_version(9);
        let mut h = header();
        h.payload_hash = Default::default();
        h.payload_round = 0;
        h.priority = 3;
        h.liquidity_baking_toggle_vote = FeatureVote::Pass;
        h.adaptive_issuance_vote = FeatureVote::Pass;

        let legacy = h.bytes(&params).unwrap();
        let tenderbake = h.bytes(&Params::default()).unwrap();
        // payload hash + round + votes byte replace the 2-byte priority
        assert_eq!(tenderbake.len(), legacy.len() + 32 + 4 + 1 - 2);
        assert_eq!(BlockHeader::from_bytes(&legacy, &params).unwrap(), h);
    }

    #[test]
    fn test_per_block_votes_byte() {
        let params = Params::default();
        let bytes = header().bytes(&params).unwrap();
        // Off | On << 2
        assert_eq!(bytes.last(), Some(&0x01));
    }

    #[test]
    fn test_watermarks() {
        let chain = ChainId::new([1, 2, 3, 4]);
        let h = header().with_chain_id(chain);
        let tb = h.watermarked_bytes(&Params::default()).unwrap();
        assert_eq!(&tb[..5], &[TENDERBAKE_BLOCK_WATERMARK, 1, 2, 3, 4]);
        let legacy = h.watermarked_bytes(&Params::for_protocol_version(9)).unwrap();
        assert_eq!(legacy[0], BLOCK_WATERMARK);
        assert_eq!(&legacy[1..5], &3_000_000i32.to_be_bytes());
    }

    #[test]
    fn test_sign_and_verify() {
        let params = Params::default();
        let key = PrivateKey::ed25519_from_seed([7u8; 32]);
        let mut h = header();
        h.sign(&key, &params).unwrap();
        assert!(h.signature.is_some());
        h.verify(&key.public_key().unwrap(), &params).unwrap();

        let first = h.signature;
        h.sign(&key, &params).unwrap();
        assert_eq!(h.signature, first);

        let hash = h.hash(&params).unwrap();
        assert_eq!(hash, BlockHash::digest(&h.signed_bytes(&params).unwrap()));
        assert!(hash.to_base58().starts_with('B'));

        h.level += 1;
        assert_eq!(
            h.verify(&key.public_key().unwrap(), &params),
            Err(SignError::Verification)
        );
    }

    #[test]
    fn test_truncated_header() {
        let params = Params::default();
        let bytes = header().bytes(&params).unwrap();
        assert!(matches!(
            BlockHeader::from_bytes(&bytes[..bytes.len() - 1], &params),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}
