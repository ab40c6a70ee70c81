//! Operation contents.
//!
//! Each kind has its own payload struct. Manager kinds embed a
//! [`ManagerFields`] value; anonymous, voting and consensus kinds do not.

use std::ops::{Add, AddAssign};

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::address::Address;
use crate::model::block::BlockHeader;
use crate::model::bytes::{ActivationSecret, DalCommitmentProof, HexBytes, SeedNonce, VdfSolution};
use crate::model::hash::{
    BlockHash, DalCommitment, PayloadHash, ProtocolHash, SmartRollupCommitmentHash,
    SmartRollupStateHash,
};
use crate::model::key::{PublicKey, Signature};
use crate::model::kind::OpKind;
use crate::model::number::{N, Z};
use crate::model::script::{Entrypoint, Micheline, Parameters, Script};

/// Counter reported by operations that have none.
pub const NO_COUNTER: i64 = -1;

// =============================================================================
// MANAGER FIELDS AND LIMITS
// =============================================================================

/// Fields shared by every manager operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerFields {
    pub source: Address,
    pub fee: N,
    pub counter: N,
    pub gas_limit: N,
    pub storage_limit: N,
}

impl ManagerFields {
    /// Manager fields with zero fee, counter and limits.
    pub fn new(source: Address) -> Self {
        Self {
            source,
            fee: N::zero(),
            counter: N::zero(),
            gas_limit: N::zero(),
            storage_limit: N::zero(),
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            fee: self.fee.to_i64_saturating(),
            gas_limit: self.gas_limit.to_i64_saturating(),
            storage_limit: self.storage_limit.to_i64_saturating(),
        }
    }

    /// Replaces fee, gas and storage limits. Negative values clamp to zero.
    pub fn set_limits(&mut self, limits: Limits) {
        self.fee = N::from(limits.fee.max(0) as u64);
        self.gas_limit = N::from(limits.gas_limit.max(0) as u64);
        self.storage_limit = N::from(limits.storage_limit.max(0) as u64);
    }
}

/// Fee (mutez), gas and storage limits of one or more operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Limits {
    pub fee: i64,
    pub gas_limit: i64,
    pub storage_limit: i64,
}

impl Add for Limits {
    type Output = Limits;

    fn add(self, rhs: Limits) -> Limits {
        Limits {
            fee: self.fee.saturating_add(rhs.fee),
            gas_limit: self.gas_limit.saturating_add(rhs.gas_limit),
            storage_limit: self.storage_limit.saturating_add(rhs.storage_limit),
        }
    }
}

impl AddAssign for Limits {
    fn add_assign(&mut self, rhs: Limits) {
        *self = *self + rhs;
    }
}

// =============================================================================
// CONSENSUS
// =============================================================================

/// Pre-Tenderbake endorsement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub level: i32,
}

/// Tenderbake (pre)endorsement content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusContent {
    pub slot: u16,
    pub level: i32,
    pub round: i32,
    pub block_payload_hash: PayloadHash,
}

/// Tenderbake endorsement carrying a DAL attestation bitset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementWithDal {
    #[serde(flatten)]
    pub consensus: ConsensusContent,
    pub dal_attestation: Z,
}

/// A fully signed consensus operation embedded in another operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlinedEndorsement {
    pub branch: BlockHash,
    pub operations: Box<Operation>,
    pub signature: Signature,
}

/// Pre-Tenderbake endorsement wrapped with the endorser's slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementWithSlot {
    pub endorsement: InlinedEndorsement,
    pub slot: u16,
}

/// DAL attestation of a delegate for a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DalAttestation {
    pub attestor: Address,
    pub attestation: Z,
    pub level: i32,
}

// =============================================================================
// ANONYMOUS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNonceRevelation {
    pub level: i32,
    pub nonce: SeedNonce,
}

/// Two conflicting endorsements from the same delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleEndorsementEvidence {
    pub op1: InlinedEndorsement,
    pub op2: InlinedEndorsement,
    /// Only present in the Babylon to Hangzhou layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u16>,
}

/// Two conflicting preendorsements from the same delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoublePreendorsementEvidence {
    pub op1: InlinedEndorsement,
    pub op2: InlinedEndorsement,
}

/// Two conflicting block headers from the same baker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleBakingEvidence {
    pub bh1: BlockHeader,
    pub bh2: BlockHeader,
}

/// Activation of a fundraiser account. `pkh` is always a `tz1` address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateAccount {
    pub pkh: Address,
    pub secret: ActivationSecret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdfRevelation {
    pub solution: VdfSolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainDelegate {
    pub consensus_key: Address,
    pub delegate: Address,
    pub destination: Address,
}

/// An operation that always fails, used to sign arbitrary data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingNoop {
    pub arbitrary: HexBytes,
}

// =============================================================================
// VOTING
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposals {
    pub source: Address,
    pub period: i32,
    pub proposals: Vec<ProtocolHash>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotVote {
    Yay,
    Nay,
    Pass,
}

impl BallotVote {
    pub fn to_byte(self) -> u8 {
        match self {
            BallotVote::Yay => 0,
            BallotVote::Nay => 1,
            BallotVote::Pass => 2,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(BallotVote::Yay),
            1 => Some(BallotVote::Nay),
            2 => Some(BallotVote::Pass),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub source: Address,
    pub period: i32,
    pub proposal: ProtocolHash,
    pub ballot: BallotVote,
}

// =============================================================================
// MANAGER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub amount: N,
    pub destination: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origination {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub balance: N,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<Address>,
    pub script: Script,
}

/// Sets or withdraws (`delegate = None`) the delegate of the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    #[serde(flatten)]
    pub manager: ManagerFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterGlobalConstant {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub value: Micheline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDepositsLimit {
    #[serde(flatten)]
    pub manager: ManagerFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<N>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreasePaidStorage {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub amount: Z,
    pub destination: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConsensusKey {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub pk: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTicket {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub ticket_contents: Micheline,
    pub ticket_ty: Micheline,
    pub ticket_ticketer: Address,
    pub ticket_amount: N,
    pub destination: Address,
    pub entrypoint: Entrypoint,
}

// =============================================================================
// SMART ROLLUPS AND DAL
// =============================================================================

/// Proof-generating virtual machine of a smart rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvmKind {
    Arith,
    #[serde(rename = "wasm_2_0_0")]
    Wasm,
    Riscv,
}

impl PvmKind {
    pub fn to_byte(self) -> u8 {
        match self {
            PvmKind::Arith => 0,
            PvmKind::Wasm => 1,
            PvmKind::Riscv => 2,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(PvmKind::Arith),
            1 => Some(PvmKind::Wasm),
            2 => Some(PvmKind::Riscv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupOriginate {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub pvm_kind: PvmKind,
    pub kernel: HexBytes,
    pub parameters_ty: Micheline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<Address>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupAddMessages {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub message: Vec<HexBytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupCement {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub rollup: Address,
}

/// State commitment published by a rollup operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupCommitment {
    pub compressed_state: SmartRollupStateHash,
    pub inbox_level: i32,
    pub predecessor: SmartRollupCommitmentHash,
    pub number_of_ticks: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupPublish {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub rollup: Address,
    pub commitment: SmartRollupCommitment,
}

/// One section of a refutation game dissection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissectionChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SmartRollupStateHash>,
    pub tick: N,
}

/// Step of a refutation move.
///
/// Only dissections have a binary layout here. Proof steps can be built
/// and rendered as JSON, but encoding or decoding them fails with an
/// unsupported-step error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefutationStep {
    Dissection(Vec<DissectionChunk>),
    Proof(HexBytes),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "refutation_kind", rename_all = "snake_case")]
pub enum Refutation {
    Start {
        player_commitment_hash: SmartRollupCommitmentHash,
        opponent_commitment_hash: SmartRollupCommitmentHash,
    },
    Move {
        choice: N,
        step: RefutationStep,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupRefute {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub rollup: Address,
    pub opponent: Address,
    pub refutation: Refutation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupStakers {
    pub alice: Address,
    pub bob: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupTimeout {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub rollup: Address,
    pub stakers: RollupStakers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupExecuteOutboxMessage {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub rollup: Address,
    pub cemented_commitment: SmartRollupCommitmentHash,
    pub output_proof: HexBytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRollupRecoverBond {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub rollup: Address,
    pub staker: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DalSlotHeader {
    pub slot_index: u8,
    pub commitment: DalCommitment,
    pub commitment_proof: DalCommitmentProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DalPublishCommitment {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub slot_header: DalSlotHeader,
}

// =============================================================================
// OPERATION
// =============================================================================

#[derive(Serialize)]
struct Tagged<'a, T> {
    kind: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

macro_rules! define_operation {
    (
        simple { $($svariant:ident($spayload:ty) => $skind:ident),* $(,)? }
        manager { $($mvariant:ident => $mkind:ident),* $(,)? }
    ) => {
        /// One operation content of any kind.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Operation {
            $($svariant($spayload),)*
            $($mvariant($mvariant),)*
        }

        impl Operation {
            /// Logical kind, independent of the wire tag.
            pub fn kind(&self) -> OpKind {
                match self {
                    $(Operation::$svariant(_) => OpKind::$skind,)*
                    $(Operation::$mvariant(_) => OpKind::$mkind,)*
                }
            }

            /// Manager fields, if this is a manager operation.
            pub fn manager(&self) -> Option<&ManagerFields> {
                match self {
                    $(Operation::$mvariant(op) => Some(&op.manager),)*
                    _ => None,
                }
            }

            pub fn manager_mut(&mut self) -> Option<&mut ManagerFields> {
                match self {
                    $(Operation::$mvariant(op) => Some(&mut op.manager),)*
                    _ => None,
                }
            }
        }

        impl Serialize for Operation {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self {
                    $(Operation::$svariant(body) => Tagged { kind: OpKind::$skind.name(), body }.serialize(serializer),)*
                    $(Operation::$mvariant(body) => Tagged { kind: OpKind::$mkind.name(), body }.serialize(serializer),)*
                }
            }
        }

        fn operation_from_json<E: de::Error>(
            kind: OpKind,
            value: serde_json::Value,
        ) -> Result<Operation, E> {
            fn body<T: DeserializeOwned, E: de::Error>(value: serde_json::Value) -> Result<T, E> {
                serde_json::from_value(value).map_err(E::custom)
            }
            // The generated arm for the Tenderbake endorsement is shadowed
            // by the guarded one below.
            #[allow(unreachable_patterns)]
            match kind {
                // Both endorsement layouts share a kind name.
                OpKind::Endorsement if value.get("slot").is_some() => {
                    Ok(Operation::TenderbakeEndorsement(body(value)?))
                }
                $(OpKind::$skind => Ok(Operation::$svariant(body(value)?)),)*
                $(OpKind::$mkind => Ok(Operation::$mvariant(body(value)?)),)*
            }
        }
    };
}

define_operation! {
    simple {
        Endorsement(Endorsement) => Endorsement,
        TenderbakeEndorsement(ConsensusContent) => Endorsement,
        Preendorsement(ConsensusContent) => Preendorsement,
        EndorsementWithDal(EndorsementWithDal) => EndorsementWithDal,
        EndorsementWithSlot(EndorsementWithSlot) => EndorsementWithSlot,
        DalAttestation(DalAttestation) => DalAttestation,
        SeedNonceRevelation(SeedNonceRevelation) => SeedNonceRevelation,
        DoubleEndorsementEvidence(DoubleEndorsementEvidence) => DoubleEndorsementEvidence,
        DoublePreendorsementEvidence(DoublePreendorsementEvidence) => DoublePreendorsementEvidence,
        DoubleBakingEvidence(DoubleBakingEvidence) => DoubleBakingEvidence,
        ActivateAccount(ActivateAccount) => ActivateAccount,
        VdfRevelation(VdfRevelation) => VdfRevelation,
        DrainDelegate(DrainDelegate) => DrainDelegate,
        FailingNoop(FailingNoop) => FailingNoop,
        Proposals(Proposals) => Proposals,
        Ballot(Ballot) => Ballot,
    }
    manager {
        Reveal => Reveal,
        Transaction => Transaction,
        Origination => Origination,
        Delegation => Delegation,
        RegisterGlobalConstant => RegisterGlobalConstant,
        SetDepositsLimit => SetDepositsLimit,
        IncreasePaidStorage => IncreasePaidStorage,
        UpdateConsensusKey => UpdateConsensusKey,
        TransferTicket => TransferTicket,
        SmartRollupOriginate => SmartRollupOriginate,
        SmartRollupAddMessages => SmartRollupAddMessages,
        SmartRollupCement => SmartRollupCement,
        SmartRollupPublish => SmartRollupPublish,
        SmartRollupRefute => SmartRollupRefute,
        SmartRollupTimeout => SmartRollupTimeout,
        SmartRollupExecuteOutboxMessage => SmartRollupExecuteOutboxMessage,
        SmartRollupRecoverBond => SmartRollupRecoverBond,
        DalPublishCommitment => DalPublishCommitment,
    }
}

impl Operation {
    pub fn is_manager(&self) -> bool {
        self.manager().is_some()
    }

    /// Fee and limits, zero for operations without manager fields.
    pub fn limits(&self) -> Limits {
        self.manager().map(ManagerFields::limits).unwrap_or_default()
    }

    /// Replaces fee and limits. No effect on operations without manager fields.
    pub fn set_limits(&mut self, limits: Limits) {
        if let Some(manager) = self.manager_mut() {
            manager.set_limits(limits);
        }
    }

    /// Counter of a manager operation, or [`NO_COUNTER`].
    pub fn counter(&self) -> i64 {
        self.manager()
            .map_or(NO_COUNTER, |m| m.counter.to_i64_saturating())
    }

    /// No effect on operations without manager fields.
    pub fn set_counter(&mut self, counter: i64) {
        if let Some(manager) = self.manager_mut() {
            manager.counter = N::from(counter.max(0) as u64);
        }
    }

    /// Account that signs this operation, when the content names one.
    pub fn source(&self) -> Option<&Address> {
        match self {
            Operation::Proposals(op) => Some(&op.source),
            Operation::Ballot(op) => Some(&op.source),
            _ => self.manager().map(|m| &m.source),
        }
    }

    /// No effect on operations without manager fields.
    pub fn set_source(&mut self, source: Address) {
        if let Some(manager) = self.manager_mut() {
            manager.source = source;
        }
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = serde_json::Value::deserialize(deserializer)?;
        let kind: OpKind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| de::Error::missing_field("kind"))?
            .parse()
            .map_err(de::Error::custom)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("kind");
        }
        operation_from_json(kind, value)
    }
}
