//! Minimum fee estimation and the fee fixed-point loop.
//!
//! The fee is part of the encoded content, so raising it can grow the
//! content by a byte and raise the minimum fee again. [`Op::with_limits`]
//! repeats measure and set until the fee stops changing.

use tracing::{debug, trace};

use crate::codec::op::encoded_len;
use crate::error::EncodeError;
use crate::limits::{BRANCH_LEN, MAX_FEE_ITERATIONS, SIGNATURE_LEN};
use crate::model::{Limits, Op, Operation};
use crate::params::Params;

/// Gas added on top of simulated consumption.
pub const GAS_SAFETY_MARGIN: i64 = 100;

/// Flat part of the minimum fee, in nanotez.
pub const MINIMAL_FEES_NANOTEZ: i64 = 100_000;

pub const MINIMAL_NANOTEZ_PER_BYTE: i64 = 1_000;

pub const MINIMAL_NANOTEZ_PER_GAS_UNIT: i64 = 100;

/// Bytes a content is charged for the envelope's branch and signature.
pub const ENVELOPE_OVERHEAD: usize = BRANCH_LEN + SIGNATURE_LEN;

/// Minimum fee in mutez for `size` bytes and `gas` units, rounded up.
pub fn min_fee(size: usize, gas: i64) -> i64 {
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    let nanotez = MINIMAL_FEES_NANOTEZ
        .saturating_add(MINIMAL_NANOTEZ_PER_BYTE.saturating_mul(size))
        .saturating_add(MINIMAL_NANOTEZ_PER_GAS_UNIT.saturating_mul(gas.max(0)));
    nanotez.saturating_add(999) / 1000
}

/// Minimum fee of a single content and the size it was charged for.
///
/// With `with_header` the content also pays for the envelope's branch and
/// signature, which the first manager content of a batch does.
pub fn calculate_min_fee(
    op: &Operation,
    gas: i64,
    with_header: bool,
    params: &Params,
) -> Result<(i64, usize), EncodeError> {
    let mut size = encoded_len(op, params)?;
    if with_header {
        size += ENVELOPE_OVERHEAD;
    }
    Ok((min_fee(size, gas), size))
}

impl Op {
    /// Applies per-content limits and sets each manager content's fee to
    /// its converged minimum.
    ///
    /// `limits[i]` applies to `contents[i]`; contents without an entry, and
    /// contents without manager fields, are left untouched. Margins are
    /// added to gas and storage before clamping to the hard per-operation
    /// limits. A caller-supplied fee acts as a floor.
    pub fn with_limits(
        mut self,
        limits: &[Limits],
        gas_margin: i64,
        storage_margin: i64,
    ) -> Result<Self, EncodeError> {
        let params = self.params().clone();
        let mut header_paid = false;

        for (index, (content, wanted)) in self.contents.iter_mut().zip(limits).enumerate() {
            if !content.is_manager() {
                continue;
            }
            let with_header = !header_paid;
            header_paid = true;
            let gas = wanted
                .gas_limit
                .saturating_add(gas_margin)
                .clamp(0, params.hard_gas_limit_per_operation);
            let storage = wanted
                .storage_limit
                .saturating_add(storage_margin)
                .clamp(0, params.hard_storage_limit_per_operation);

            let floor = wanted.fee.max(0);
            let mut fee = floor;
            let mut converged = false;
            for round in 0..MAX_FEE_ITERATIONS {
                content.set_limits(Limits {
                    fee,
                    gas_limit: gas,
                    storage_limit: storage,
                });
                let (min, size) = calculate_min_fee(content, gas, with_header, &params)?;
                let next = min.max(floor);
                trace!(index, round, fee, min, size, "fee iteration");
                if next == fee {
                    converged = true;
                    break;
                }
                fee = next;
            }
            if !converged {
                // Fees only grow, so the last value set is at least every
                // minimum seen so far.
                debug!(index, fee, "fee did not settle within the iteration bound");
            }
        }
        Ok(self)
    }

    /// Sum of the minimum fees of all manager contents at their current gas
    /// limits.
    pub fn calculate_min_fee(&self) -> Result<i64, EncodeError> {
        let params = self.params();
        self.contents
            .iter()
            .filter(|op| op.is_manager())
            .enumerate()
            .try_fold(0i64, |total, (index, op)| {
                let (fee, _) = calculate_min_fee(op, op.limits().gas_limit, index == 0, params)?;
                Ok(total.saturating_add(fee))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, BlockHash, Endorsement, ManagerFields, N, Transaction};
    use std::sync::Arc;

    fn source() -> Address {
        "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse().unwrap()
    }

    fn transfer() -> Operation {
        let mut manager = ManagerFields::new(source());
        manager.counter = N::from(2_886_593u64);
        Operation::Transaction(Transaction {
            manager,
            amount: N::from(1_000_000u64),
            destination: source(),
            parameters: None,
        })
    }

    fn envelope() -> Op {
        Op::new()
            .with_branch(BlockHash::new([7u8; 32]))
            .with_contents(transfer())
    }

    fn gas(gas_limit: i64) -> Limits {
        Limits {
            fee: 0,
            gas_limit,
            storage_limit: 0,
        }
    }

    #[test]
    fn test_min_fee_formula() {
        assert_eq!(min_fee(0, 0), 100);
        assert_eq!(min_fee(200, 1000), 400);
        // 101.1 rounds up
        assert_eq!(min_fee(1, 1), 102);
        assert_eq!(min_fee(0, -5), 100);
    }

    #[test]
    fn test_header_is_charged_once() {
        let params = Params::default();
        let op = transfer();
        let (first, first_size) = calculate_min_fee(&op, 1000, true, &params).unwrap();
        let (other, other_size) = calculate_min_fee(&op, 1000, false, &params).unwrap();
        assert_eq!(first_size, other_size + ENVELOPE_OVERHEAD);
        assert_eq!(first, other + ENVELOPE_OVERHEAD as i64);
    }

    #[test]
    fn test_with_limits_converges() {
        let op = envelope()
            .with_limits(&[gas(1000)], GAS_SAFETY_MARGIN, 0)
            .unwrap();
        let limits = op.contents[0].limits();
        assert_eq!(limits.gas_limit, 1100);
        assert_eq!(limits.storage_limit, 0);

        let (min, _) = calculate_min_fee(&op.contents[0], 1100, true, op.params()).unwrap();
        assert_eq!(limits.fee, min);
        assert_eq!(op.calculate_min_fee().unwrap(), limits.fee);
    }

    #[test]
    fn test_fixed_point_across_varint_boundaries() {
        // Fees near 16384 need a third varint byte.
        for gas_limit in (160_000..166_000).step_by(37) {
            let op = envelope().with_limits(&[gas(gas_limit)], 0, 0).unwrap();
            let fee = op.contents[0].limits().fee;
            let (min, _) =
                calculate_min_fee(&op.contents[0], gas_limit, true, op.params()).unwrap();
            assert_eq!(fee, min, "gas {gas_limit}");
        }
    }

    #[test]
    fn test_fee_floor_and_clamping() {
        let params = Arc::new(Params::default().with_network("ghostnet"));
        let wanted = Limits {
            fee: 500_000,
            gas_limit: 5_000_000,
            storage_limit: 100_000,
        };
        let op = envelope()
            .with_params(params)
            .with_limits(&[wanted], GAS_SAFETY_MARGIN, 257)
            .unwrap();
        let limits = op.contents[0].limits();
        assert_eq!(limits.fee, 500_000);
        assert_eq!(limits.gas_limit, 1_040_000);
        assert_eq!(limits.storage_limit, 60_000);
    }

    #[test]
    fn test_non_manager_untouched() {
        let op = Op::new()
            .with_branch(BlockHash::new([7u8; 32]))
            .with_contents(Operation::Endorsement(Endorsement { level: 1 }))
            .with_contents(transfer())
            .with_limits(&[gas(1000), gas(2000)], 0, 0)
            .unwrap();
        assert_eq!(op.contents[0].limits(), Limits::default());
        assert_eq!(op.contents[1].limits().gas_limit, 2000);
        assert!(op.contents[1].limits().fee > 0);
    }

    #[test]
    fn test_header_charged_to_first_manager_content() {
        let op = Op::new()
            .with_branch(BlockHash::new([7u8; 32]))
            .with_contents(Operation::Endorsement(Endorsement { level: 1 }))
            .with_contents(transfer())
            .with_contents(transfer())
            .with_limits(&[gas(0), gas(1000), gas(1000)], 0, 0)
            .unwrap();
        let (first, _) = calculate_min_fee(&op.contents[1], 1000, true, op.params()).unwrap();
        let (second, _) = calculate_min_fee(&op.contents[2], 1000, false, op.params()).unwrap();
        assert_eq!(op.contents[1].limits().fee, first);
        assert_eq!(op.contents[2].limits().fee, second);
        assert_eq!(op.calculate_min_fee().unwrap(), first + second);
    }

    #[test]
    fn test_missing_limits_entry_keeps_content() {
        let op = envelope()
            .with_contents(transfer())
            .with_limits(&[gas(1000)], 0, 0)
            .unwrap();
        assert_eq!(op.contents[1].limits(), Limits::default());
    }
}
