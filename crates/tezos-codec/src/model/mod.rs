//! Data model types for Tezos operations.
//!
//! This module contains the value types the codec reads and writes:
//! - Numbers (`N`, `Z`), hashes, addresses, keys and signatures
//! - Operation payloads and the [`Operation`] enum
//! - Block headers
//! - The [`Op`] envelope and its builder-style setters

pub mod address;
pub mod block;
pub mod bytes;
pub mod envelope;
pub mod hash;
pub mod key;
pub mod kind;
pub mod number;
pub mod op;
pub mod script;

pub use address::{Address, AddressKind};
pub use block::{BlockHeader, FeatureVote};
pub use bytes::{ActivationSecret, DalCommitmentProof, HexBytes, PowNonce, SeedNonce, VdfSolution};
pub use envelope::Op;
pub use hash::{
    BlockHash, ChainId, ContextHash, DalCommitment, NonceHash, OperationHash,
    OperationListListHash, PayloadHash, ProtocolHash, SmartRollupCommitmentHash,
    SmartRollupStateHash, blake2b_160, blake2b_256,
};
pub use key::{KeyKind, PrivateKey, PublicKey, Signature};
pub use kind::OpKind;
pub use number::{N, Z};
pub use op::{
    ActivateAccount, Ballot, BallotVote, ConsensusContent, DalAttestation, DalPublishCommitment,
    DalSlotHeader, Delegation, DissectionChunk, DoubleBakingEvidence, DoubleEndorsementEvidence,
    DoublePreendorsementEvidence, DrainDelegate, Endorsement, EndorsementWithDal,
    EndorsementWithSlot, FailingNoop, IncreasePaidStorage, InlinedEndorsement, Limits,
    ManagerFields, NO_COUNTER, Operation, Origination, Proposals, PvmKind, Refutation,
    RefutationStep, RegisterGlobalConstant, Reveal, RollupStakers, SeedNonceRevelation,
    SetDepositsLimit, SmartRollupAddMessages, SmartRollupCement, SmartRollupCommitment,
    SmartRollupExecuteOutboxMessage, SmartRollupOriginate, SmartRollupPublish,
    SmartRollupRecoverBond, SmartRollupRefute, SmartRollupTimeout, Transaction, TransferTicket,
    UpdateConsensusKey, VdfRevelation,
};
pub use script::{Entrypoint, Micheline, Parameters, Script};
