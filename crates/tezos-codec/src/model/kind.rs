//! Logical operation kinds.
//!
//! A kind is the stable identity of an operation. Its wire tag depends on
//! the active tags version and is resolved by the codec registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Logical kind of an operation content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    // Consensus
    Endorsement,
    EndorsementWithSlot,
    Preendorsement,
    EndorsementWithDal,
    DalAttestation,

    // Anonymous
    SeedNonceRevelation,
    DoubleEndorsementEvidence,
    DoublePreendorsementEvidence,
    DoubleBakingEvidence,
    ActivateAccount,
    VdfRevelation,
    DrainDelegate,
    FailingNoop,

    // Voting
    Proposals,
    Ballot,

    // Manager
    Reveal,
    Transaction,
    Origination,
    Delegation,
    RegisterGlobalConstant,
    SetDepositsLimit,
    IncreasePaidStorage,
    UpdateConsensusKey,
    TransferTicket,
    SmartRollupOriginate,
    SmartRollupAddMessages,
    SmartRollupCement,
    SmartRollupPublish,
    SmartRollupRefute,
    SmartRollupTimeout,
    SmartRollupExecuteOutboxMessage,
    SmartRollupRecoverBond,
    DalPublishCommitment,
}

impl OpKind {
    /// Every kind, in declaration order.
    pub const ALL: [OpKind; 33] = [
        OpKind::Endorsement,
        OpKind::EndorsementWithSlot,
        OpKind::Preendorsement,
        OpKind::EndorsementWithDal,
        OpKind::DalAttestation,
        OpKind::SeedNonceRevelation,
        OpKind::DoubleEndorsementEvidence,
        OpKind::DoublePreendorsementEvidence,
        OpKind::DoubleBakingEvidence,
        OpKind::ActivateAccount,
        OpKind::VdfRevelation,
        OpKind::DrainDelegate,
        OpKind::FailingNoop,
        OpKind::Proposals,
        OpKind::Ballot,
        OpKind::Reveal,
        OpKind::Transaction,
        OpKind::Origination,
        OpKind::Delegation,
        OpKind::RegisterGlobalConstant,
        OpKind::SetDepositsLimit,
        OpKind::IncreasePaidStorage,
        OpKind::UpdateConsensusKey,
        OpKind::TransferTicket,
        OpKind::SmartRollupOriginate,
        OpKind::SmartRollupAddMessages,
        OpKind::SmartRollupCement,
        OpKind::SmartRollupPublish,
        OpKind::SmartRollupRefute,
        OpKind::SmartRollupTimeout,
        OpKind::SmartRollupExecuteOutboxMessage,
        OpKind::SmartRollupRecoverBond,
        OpKind::DalPublishCommitment,
    ];

    /// Returns the name used by the node RPC.
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Endorsement => "endorsement",
            OpKind::EndorsementWithSlot => "endorsement_with_slot",
            OpKind::Preendorsement => "preendorsement",
            OpKind::EndorsementWithDal => "endorsement_with_dal",
            OpKind::DalAttestation => "dal_attestation",
            OpKind::SeedNonceRevelation => "seed_nonce_revelation",
            OpKind::DoubleEndorsementEvidence => "double_endorsement_evidence",
            OpKind::DoublePreendorsementEvidence => "double_preendorsement_evidence",
            OpKind::DoubleBakingEvidence => "double_baking_evidence",
            OpKind::ActivateAccount => "activate_account",
            OpKind::VdfRevelation => "vdf_revelation",
            OpKind::DrainDelegate => "drain_delegate",
            OpKind::FailingNoop => "failing_noop",
            OpKind::Proposals => "proposals",
            OpKind::Ballot => "ballot",
            OpKind::Reveal => "reveal",
            OpKind::Transaction => "transaction",
            OpKind::Origination => "origination",
            OpKind::Delegation => "delegation",
            OpKind::RegisterGlobalConstant => "register_global_constant",
            OpKind::SetDepositsLimit => "set_deposits_limit",
            OpKind::IncreasePaidStorage => "increase_paid_storage",
            OpKind::UpdateConsensusKey => "update_consensus_key",
            OpKind::TransferTicket => "transfer_ticket",
            OpKind::SmartRollupOriginate => "smart_rollup_originate",
            OpKind::SmartRollupAddMessages => "smart_rollup_add_messages",
            OpKind::SmartRollupCement => "smart_rollup_cement",
            OpKind::SmartRollupPublish => "smart_rollup_publish",
            OpKind::SmartRollupRefute => "smart_rollup_refute",
            OpKind::SmartRollupTimeout => "smart_rollup_timeout",
            OpKind::SmartRollupExecuteOutboxMessage => "smart_rollup_execute_outbox_message",
            OpKind::SmartRollupRecoverBond => "smart_rollup_recover_bond",
            OpKind::DalPublishCommitment => "dal_publish_commitment",
        }
    }

    /// Manager operations pay fees and carry source, counter and limits.
    pub fn is_manager(self) -> bool {
        self >= OpKind::Reveal
    }

    /// Consensus operations are signed with a consensus watermark.
    pub fn is_consensus(self) -> bool {
        matches!(
            self,
            OpKind::Endorsement
                | OpKind::EndorsementWithSlot
                | OpKind::Preendorsement
                | OpKind::EndorsementWithDal
        )
    }

    pub fn is_rollup(self) -> bool {
        matches!(
            self,
            OpKind::SmartRollupOriginate
                | OpKind::SmartRollupAddMessages
                | OpKind::SmartRollupCement
                | OpKind::SmartRollupPublish
                | OpKind::SmartRollupRefute
                | OpKind::SmartRollupTimeout
                | OpKind::SmartRollupExecuteOutboxMessage
                | OpKind::SmartRollupRecoverBond
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ParseError::UnknownKind(s.to_string()))
    }
}
