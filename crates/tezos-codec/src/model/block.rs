//! Block header value type.
//!
//! One struct covers both the legacy (emmy) and Tenderbake layouts. Fields
//! unused by the active layout keep their default values.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::model::bytes::{HexBytes, PowNonce};
use crate::model::hash::{
    BlockHash, ChainId, ContextHash, NonceHash, OperationListListHash, PayloadHash,
};
use crate::model::key::Signature;
use crate::util::Timestamp;

/// A per-block toggle vote (liquidity baking, adaptive issuance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureVote {
    On,
    Off,
    #[default]
    Pass,
}

impl FeatureVote {
    pub fn to_byte(self) -> u8 {
        match self {
            FeatureVote::On => 0,
            FeatureVote::Off => 1,
            FeatureVote::Pass => 2,
        }
    }

    pub fn from_byte(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(FeatureVote::On),
            1 => Ok(FeatureVote::Off),
            2 => Ok(FeatureVote::Pass),
            _ => Err(DecodeError::InvalidEnumValue {
                field: "per_block_votes",
                value,
            }),
        }
    }
}

/// A block header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    pub level: i32,
    pub proto: u8,
    pub predecessor: BlockHash,
    pub timestamp: Timestamp,
    pub validation_pass: u8,
    pub operations_hash: OperationListListHash,
    pub fitness: Vec<HexBytes>,
    pub context: ContextHash,

    /// Tenderbake only.
    #[serde(default)]
    pub payload_hash: PayloadHash,
    /// Tenderbake only.
    #[serde(default)]
    pub payload_round: i32,
    /// Legacy only.
    #[serde(default)]
    pub priority: u16,

    pub proof_of_work_nonce: PowNonce,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_nonce_hash: Option<NonceHash>,
    /// Tenderbake only.
    #[serde(default)]
    pub liquidity_baking_toggle_vote: FeatureVote,
    /// Tenderbake only.
    #[serde(default)]
    pub adaptive_issuance_vote: FeatureVote,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    /// Chain id mixed into the Tenderbake signing watermark. Never encoded.
    #[serde(skip)]
    pub chain_id: Option<ChainId>,
}

impl BlockHeader {
    /// Combined per-block votes byte.
    pub fn per_block_votes(&self) -> u8 {
        self.liquidity_baking_toggle_vote.to_byte() | (self.adaptive_issuance_vote.to_byte() << 2)
    }

    /// Splits a per-block votes byte into its two votes.
    pub fn set_per_block_votes(&mut self, votes: u8) -> Result<(), DecodeError> {
        if votes >> 4 != 0 {
            return Err(DecodeError::InvalidEnumValue {
                field: "per_block_votes",
                value: votes,
            });
        }
        self.liquidity_baking_toggle_vote = FeatureVote::from_byte(votes & 0x03)?;
        self.adaptive_issuance_vote = FeatureVote::from_byte((votes >> 2) & 0x03)?;
        Ok(())
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }
}
