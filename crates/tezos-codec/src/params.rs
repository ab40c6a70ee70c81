//! Protocol parameters threaded through every encode and decode call.
//!
//! The operation tags version selects tag bytes and layouts; the remaining
//! constants bound TTLs, gas and storage for validation and fee estimation.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ParamsError;
use crate::model::{ChainId, ProtocolHash};

/// Highest operation tags version this crate knows.
pub const LATEST_TAGS_VERSION: u8 = 2;

/// First tags version with Tenderbake consensus layouts.
pub const TENDERBAKE_TAGS_VERSION: u8 = 2;

lazy_static! {
    /// Mainnet Tenderbake parameters, used when a caller supplies none.
    pub static ref DEFAULT_PARAMS: Params = Params::default();
}

/// Protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub network: String,
    pub chain_id: Option<ChainId>,
    pub protocol: Option<ProtocolHash>,
    /// Protocol sequence number (e.g. 12 for Ithaca).
    pub version: u32,
    pub operation_tags_version: u8,
    pub max_operations_ttl: i64,
    pub hard_gas_limit_per_operation: i64,
    pub hard_gas_limit_per_block: i64,
    pub hard_storage_limit_per_operation: i64,
    pub cost_per_byte: i64,
    pub origination_size: i64,
    /// Seconds.
    pub minimal_block_delay: i64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            chain_id: Some(ChainId::MAINNET),
            protocol: None,
            version: 19,
            operation_tags_version: LATEST_TAGS_VERSION,
            max_operations_ttl: 240,
            hard_gas_limit_per_operation: 1_040_000,
            hard_gas_limit_per_block: 2_600_000,
            hard_storage_limit_per_operation: 60_000,
            cost_per_byte: 250,
            origination_size: 257,
            minimal_block_delay: 8,
        }
    }
}

/// Reads an integer that the node may render as a JSON number or string.
fn constant(doc: &Value, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl Params {
    /// Loads parameters from their own JSON form. Missing fields take
    /// default values.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Params = serde_json::from_str(json)?;
        if params.operation_tags_version > LATEST_TAGS_VERSION {
            return Err(ParamsError::UnsupportedTagsVersion(
                params.operation_tags_version,
            ));
        }
        debug!(
            network = %params.network,
            tags_version = params.operation_tags_version,
            "loaded protocol parameters"
        );
        Ok(params)
    }

    /// Overlays a node protocol-constants document onto the defaults.
    pub fn from_constants_json(json: &str) -> Result<Self, ParamsError> {
        let doc: Value = serde_json::from_str(json)?;
        let mut params = Params::default();
        if let Some(v) = constant(&doc, "max_operations_time_to_live") {
            params.max_operations_ttl = v;
        }
        if let Some(v) = constant(&doc, "hard_gas_limit_per_operation") {
            params.hard_gas_limit_per_operation = v;
        }
        if let Some(v) = constant(&doc, "hard_gas_limit_per_block") {
            params.hard_gas_limit_per_block = v;
        }
        if let Some(v) = constant(&doc, "hard_storage_limit_per_operation") {
            params.hard_storage_limit_per_operation = v;
        }
        if let Some(v) = constant(&doc, "cost_per_byte") {
            params.cost_per_byte = v;
        }
        if let Some(v) = constant(&doc, "origination_size") {
            params.origination_size = v;
        }
        if let Some(v) = constant(&doc, "minimal_block_delay") {
            params.minimal_block_delay = v;
        }
        debug!(
            ttl = params.max_operations_ttl,
            gas_per_op = params.hard_gas_limit_per_operation,
            "loaded protocol constants"
        );
        Ok(params)
    }

    /// Default parameters for a protocol sequence number.
    pub fn for_protocol_version(version: u32) -> Self {
        Self {
            version,
            operation_tags_version: tags_version_for_protocol(version),
            ..Self::default()
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolHash) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Versions above the latest known one are clamped to it.
    pub fn with_operation_tags_version(mut self, version: u8) -> Self {
        self.operation_tags_version = version.min(LATEST_TAGS_VERSION);
        self
    }

    pub fn with_max_operations_ttl(mut self, ttl: i64) -> Self {
        self.max_operations_ttl = ttl;
        self
    }

    /// Active tags version, clamped to the latest known one.
    pub fn tags_version(&self) -> u8 {
        self.operation_tags_version.min(LATEST_TAGS_VERSION)
    }

    /// True when consensus operations use the Tenderbake layouts.
    pub fn is_tenderbake(&self) -> bool {
        self.tags_version() >= TENDERBAKE_TAGS_VERSION
    }
}

/// Tags version used by a protocol sequence number.
///
/// Protocols before Babylon (005) use version 0, Babylon to Hangzhou use
/// version 1, Ithaca (012) and later use version 2.
pub fn tags_version_for_protocol(version: u32) -> u8 {
    match version {
        0..=4 => 0,
        5..=11 => 1,
        _ => 2,
    }
}
