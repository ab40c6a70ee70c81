//! The operation envelope: branch, ordered contents and signature.
//!
//! Binary encoding, watermarking and signing live in
//! [`crate::codec::envelope`]; this module holds the value and its
//! builder-style setters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::address::Address;
use crate::model::hash::{BlockHash, ChainId};
use crate::model::key::Signature;
use crate::model::op::{Limits, Operation};
use crate::params::{DEFAULT_PARAMS, Params};

/// An operation group as signed and broadcast.
///
/// Equality compares branch, contents and signature only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Op {
    pub branch: BlockHash,
    pub contents: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,

    /// Blocks after `branch` during which the operation stays valid.
    #[serde(skip)]
    pub ttl: i64,
    #[serde(skip)]
    pub params: Option<Arc<Params>>,
    /// Chain id mixed into Tenderbake consensus watermarks.
    #[serde(skip)]
    pub chain_id: Option<ChainId>,
}

impl PartialEq for Op {
    fn eq(&self, other: &Self) -> bool {
        self.branch == other.branch
            && self.contents == other.contents
            && self.signature == other.signature
    }
}

impl Eq for Op {}

impl Op {
    /// Creates an empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters in effect for this envelope.
    pub fn params(&self) -> &Params {
        self.params.as_deref().unwrap_or(&DEFAULT_PARAMS)
    }

    pub fn with_branch(mut self, branch: BlockHash) -> Self {
        self.branch = branch;
        self
    }

    /// Appends a content.
    pub fn with_contents(mut self, op: Operation) -> Self {
        self.contents.push(op);
        self
    }

    /// Prepends a content, e.g. a reveal ahead of a batch.
    pub fn with_contents_front(mut self, op: Operation) -> Self {
        self.contents.insert(0, op);
        self
    }

    /// Sets the TTL, clamped to `1..=max_operations_ttl`.
    pub fn with_ttl(mut self, ttl: i64) -> Self {
        let max = self.params().max_operations_ttl.max(1);
        self.ttl = ttl.clamp(1, max);
        self
    }

    pub fn with_params(mut self, params: Arc<Params>) -> Self {
        if self.chain_id.is_none() {
            self.chain_id = params.chain_id;
        }
        self.params = Some(params);
        self
    }

    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Sets the source of every manager content.
    pub fn with_source(mut self, source: Address) -> Self {
        for op in &mut self.contents {
            op.set_source(source);
        }
        self
    }

    /// Assigns consecutive counters to manager contents, starting at `next`.
    pub fn with_counter(mut self, next: i64) -> Self {
        let mut counter = next;
        for op in &mut self.contents {
            if op.is_manager() {
                op.set_counter(counter);
                counter += 1;
            }
        }
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// True if any content needs a counter.
    pub fn need_counter(&self) -> bool {
        self.contents.iter().any(Operation::is_manager)
    }

    /// Sum of fees and limits over all contents.
    pub fn limits(&self) -> Limits {
        self.contents
            .iter()
            .fold(Limits::default(), |acc, op| acc + op.limits())
    }

    /// True when the envelope can be encoded.
    pub fn is_complete(&self) -> bool {
        !self.branch.is_zero() && !self.contents.is_empty()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some_and(|s| !s.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endorsement, ManagerFields, N, Reveal, Transaction};

    fn source() -> Address {
        "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse().unwrap()
    }

    fn transfer(fee: u64) -> Operation {
        let mut manager = ManagerFields::new(source());
        manager.fee = N::from(fee);
        manager.gas_limit = N::from(1000u64);
        Operation::Transaction(Transaction {
            manager,
            amount: N::from(1u64),
            destination: source(),
            parameters: None,
        })
    }

    #[test]
    fn test_counters_and_limits() {
        let op = Op::new()
            .with_contents(transfer(10))
            .with_contents(Operation::Endorsement(Endorsement { level: 1 }))
            .with_contents(transfer(20))
            .with_counter(100);

        assert!(op.need_counter());
        assert_eq!(op.contents[0].counter(), 100);
        assert_eq!(op.contents[1].counter(), -1);
        assert_eq!(op.contents[2].counter(), 101);

        let limits = op.limits();
        assert_eq!(limits.fee, 30);
        assert_eq!(limits.gas_limit, 2000);
    }

    #[test]
    fn test_contents_front() {
        let key = "sppk7bo7kcRyjajZaAqEfqdtCNx3wgizhJPFqaEuisncbDFMgn6v4iP"
            .parse()
            .unwrap();
        let reveal = Operation::Reveal(Reveal {
            manager: ManagerFields::new(source()),
            public_key: key,
        });
        let op = Op::new()
            .with_contents(transfer(1))
            .with_contents_front(reveal);
        assert_eq!(op.contents[0].kind(), crate::model::OpKind::Reveal);
    }

    #[test]
    fn test_ttl_clamped() {
        let params = Arc::new(Params::default().with_max_operations_ttl(120));
        let op = Op::new().with_params(params).with_ttl(500);
        assert_eq!(op.ttl, 120);
        assert_eq!(op.chain_id, DEFAULT_PARAMS.chain_id);
        assert_eq!(Op::new().with_ttl(0).ttl, 1);
    }

    #[test]
    fn test_completeness() {
        assert!(!Op::new().is_complete());
        assert!(!Op::new().with_contents(transfer(1)).is_complete());
        assert!(
            Op::new()
                .with_branch(BlockHash::new([1u8; 32]))
                .with_contents(transfer(1))
                .is_complete()
        );
    }
}
