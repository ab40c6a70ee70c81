//! Versioned operation tag tables.
//!
//! Tag bytes are not stable across protocol epochs. Each operation tags
//! version owns a table mapping kinds to tags; both directions are built
//! once into hash maps and looked up by `(kind, version)` or
//! `(tag, version)`.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::error::EncodeError;
use crate::model::OpKind;
use crate::params::LATEST_TAGS_VERSION;

/// Protocols before Babylon.
const TAGS_V0: &[(OpKind, u8)] = &[
    (OpKind::Endorsement, 0),
    (OpKind::SeedNonceRevelation, 1),
    (OpKind::DoubleEndorsementEvidence, 2),
    (OpKind::DoubleBakingEvidence, 3),
    (OpKind::ActivateAccount, 4),
    (OpKind::Proposals, 5),
    (OpKind::Ballot, 6),
    (OpKind::Reveal, 7),
    (OpKind::Transaction, 8),
    (OpKind::Origination, 9),
    (OpKind::Delegation, 10),
];

/// Babylon to Hangzhou.
const TAGS_V1: &[(OpKind, u8)] = &[
    (OpKind::Endorsement, 0),
    (OpKind::SeedNonceRevelation, 1),
    (OpKind::DoubleEndorsementEvidence, 2),
    (OpKind::DoubleBakingEvidence, 3),
    (OpKind::ActivateAccount, 4),
    (OpKind::Proposals, 5),
    (OpKind::Ballot, 6),
    (OpKind::EndorsementWithSlot, 10),
    (OpKind::FailingNoop, 17),
    (OpKind::Reveal, 107),
    (OpKind::Transaction, 108),
    (OpKind::Origination, 109),
    (OpKind::Delegation, 110),
    (OpKind::RegisterGlobalConstant, 111),
];

/// Ithaca (Tenderbake) and later.
const TAGS_V2: &[(OpKind, u8)] = &[
    (OpKind::SeedNonceRevelation, 1),
    (OpKind::DoubleEndorsementEvidence, 2),
    (OpKind::DoubleBakingEvidence, 3),
    (OpKind::ActivateAccount, 4),
    (OpKind::Proposals, 5),
    (OpKind::Ballot, 6),
    (OpKind::DoublePreendorsementEvidence, 7),
    (OpKind::VdfRevelation, 8),
    (OpKind::DrainDelegate, 9),
    (OpKind::FailingNoop, 17),
    (OpKind::Preendorsement, 20),
    (OpKind::Endorsement, 21),
    (OpKind::DalAttestation, 22),
    (OpKind::EndorsementWithDal, 23),
    (OpKind::Reveal, 107),
    (OpKind::Transaction, 108),
    (OpKind::Origination, 109),
    (OpKind::Delegation, 110),
    (OpKind::RegisterGlobalConstant, 111),
    (OpKind::SetDepositsLimit, 112),
    (OpKind::IncreasePaidStorage, 113),
    (OpKind::UpdateConsensusKey, 114),
    (OpKind::TransferTicket, 158),
    (OpKind::SmartRollupOriginate, 200),
    (OpKind::SmartRollupAddMessages, 201),
    (OpKind::SmartRollupCement, 202),
    (OpKind::SmartRollupPublish, 203),
    (OpKind::SmartRollupRefute, 204),
    (OpKind::SmartRollupTimeout, 205),
    (OpKind::SmartRollupExecuteOutboxMessage, 206),
    (OpKind::SmartRollupRecoverBond, 207),
    (OpKind::DalPublishCommitment, 230),
];

const TABLES: [&[(OpKind, u8)]; LATEST_TAGS_VERSION as usize + 1] = [TAGS_V0, TAGS_V1, TAGS_V2];

struct TagTable {
    by_kind: FxHashMap<OpKind, u8>,
    by_tag: FxHashMap<u8, OpKind>,
}

impl TagTable {
    fn build(entries: &[(OpKind, u8)]) -> Self {
        Self {
            by_kind: entries.iter().copied().collect(),
            by_tag: entries.iter().map(|&(kind, tag)| (tag, kind)).collect(),
        }
    }
}

lazy_static! {
    static ref REGISTRY: Vec<TagTable> = TABLES.iter().map(|t| TagTable::build(t)).collect();
}

fn table(version: u8) -> &'static TagTable {
    let index = usize::from(version.min(LATEST_TAGS_VERSION));
    &REGISTRY[index]
}

/// Wire tag of `kind` under a tags version, if the kind exists there.
pub fn tag_for(kind: OpKind, version: u8) -> Option<u8> {
    table(version).by_kind.get(&kind).copied()
}

/// Kind identified by a wire tag under a tags version.
pub fn kind_for(tag: u8, version: u8) -> Option<OpKind> {
    table(version).by_tag.get(&tag).copied()
}

/// Like [`tag_for`], failing with `UnsupportedKind` for absent kinds.
pub fn require_tag(kind: OpKind, version: u8) -> Result<u8, EncodeError> {
    tag_for(kind, version).ok_or(EncodeError::UnsupportedKind {
        kind,
        version: version.min(LATEST_TAGS_VERSION),
    })
}

/// True if `kind` can be encoded under a tags version.
pub fn is_supported(kind: OpKind, version: u8) -> bool {
    tag_for(kind, version).is_some()
}

/// Kinds known under a tags version, in tag order.
pub fn kinds(version: u8) -> Vec<OpKind> {
    let mut entries: Vec<(u8, OpKind)> = table(version)
        .by_tag
        .iter()
        .map(|(&tag, &kind)| (tag, kind))
        .collect();
    entries.sort_unstable();
    entries.into_iter().map(|(_, kind)| kind).collect()
}
