//! Semantic validation of operation envelopes.
//!
//! Structural checks happen while encoding and decoding. The checks here
//! need the protocol limits in [`Params`] and look at the envelope as a
//! whole: TTL, gas and storage bounds, batch sources and consensus
//! operations sharing an envelope.

use crate::codec::registry;
use crate::error::ValidationError;
use crate::model::{Address, Op};
use crate::params::Params;

/// Validates an envelope against protocol limits.
///
/// Checks run in order and the first failure is returned:
/// - branch set and contents non-empty
/// - TTL within `max_operations_ttl`
/// - every kind available under the active tags version
/// - a consensus operation is the only content
/// - per-operation gas and storage limits
/// - all manager contents share one source
/// - total gas within the per-block limit
pub fn validate_op(op: &Op, params: &Params) -> Result<(), ValidationError> {
    if op.branch.is_zero() {
        return Err(ValidationError::MissingBranch);
    }
    if op.contents.is_empty() {
        return Err(ValidationError::EmptyContents);
    }
    if op.ttl > params.max_operations_ttl {
        return Err(ValidationError::TtlTooLarge {
            ttl: op.ttl,
            max: params.max_operations_ttl,
        });
    }

    let version = params.tags_version();
    for (index, content) in op.contents.iter().enumerate() {
        let kind = content.kind();
        if !registry::is_supported(kind, version) {
            return Err(ValidationError::UnsupportedKind {
                index,
                kind,
                version,
            });
        }
        if kind.is_consensus() && op.contents.len() > 1 {
            return Err(ValidationError::ConsensusNotAlone { kind });
        }
    }

    let mut batch_source: Option<&Address> = None;
    let mut total_gas: i64 = 0;
    for (index, content) in op.contents.iter().enumerate() {
        let Some(manager) = content.manager() else {
            continue;
        };
        let limits = manager.limits();
        if limits.gas_limit > params.hard_gas_limit_per_operation {
            return Err(ValidationError::GasLimitPerOperation {
                index,
                gas: limits.gas_limit,
                max: params.hard_gas_limit_per_operation,
            });
        }
        if limits.storage_limit > params.hard_storage_limit_per_operation {
            return Err(ValidationError::StorageLimitPerOperation {
                index,
                storage: limits.storage_limit,
                max: params.hard_storage_limit_per_operation,
            });
        }
        match batch_source {
            None => batch_source = Some(&manager.source),
            Some(expected) if *expected != manager.source => {
                return Err(ValidationError::MixedSources {
                    index,
                    expected: expected.to_base58(),
                    found: manager.source.to_base58(),
                });
            }
            Some(_) => {}
        }
        total_gas = total_gas.saturating_add(limits.gas_limit);
    }

    if total_gas > params.hard_gas_limit_per_block {
        return Err(ValidationError::GasLimitPerBlock {
            gas: total_gas,
            max: params.hard_gas_limit_per_block,
        });
    }
    Ok(())
}
