//! Consensus, anonymous and voting operation encoding/decoding.
//!
//! Consensus layouts change at the Tenderbake tags version: legacy
//! endorsements carry only a level, Tenderbake (pre)endorsements carry
//! slot, level, round and block payload hash. Evidence operations embed
//! fully signed consensus operations behind a length prefix.

use crate::codec::block::{decode_block_header, encode_block_header};
use crate::codec::op::{decode_operation, encode_operation};
use crate::codec::primitives::{Reader, Writer};
use crate::codec::registry;
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_BYTES_LEN;
use crate::model::{
    ActivateAccount, ActivationSecret, Address, AddressKind, Ballot, BallotVote, BlockHash,
    ConsensusContent, DalAttestation, DoubleBakingEvidence, DoubleEndorsementEvidence,
    DoublePreendorsementEvidence, DrainDelegate, Endorsement, EndorsementWithDal,
    EndorsementWithSlot, FailingNoop, InlinedEndorsement, KeyKind, OpKind, Operation, PayloadHash,
    Proposals, ProtocolHash, SeedNonce, SeedNonceRevelation, VdfRevelation, VdfSolution,
};
use crate::params::Params;

/// Tags version whose double endorsement evidence carries a trailing slot.
const EVIDENCE_SLOT_TAGS_VERSION: u8 = 1;

const ENDORSEMENTS: &[OpKind] = &[OpKind::Endorsement, OpKind::EndorsementWithDal];
const PREENDORSEMENTS: &[OpKind] = &[OpKind::Preendorsement];

/// Rejects consensus values whose layout does not exist under the active
/// tags version.
pub(crate) fn check_layout(op: &Operation, params: &Params) -> Result<(), EncodeError> {
    let legacy_only = matches!(op, Operation::Endorsement(_));
    let tenderbake_only = matches!(op, Operation::TenderbakeEndorsement(_));
    if (legacy_only && params.is_tenderbake()) || (tenderbake_only && !params.is_tenderbake()) {
        return Err(EncodeError::UnsupportedKind {
            kind: op.kind(),
            version: params.tags_version(),
        });
    }
    Ok(())
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes the body of a non-manager content. The tag is already written.
pub(crate) fn encode_body(
    writer: &mut Writer,
    op: &Operation,
    params: &Params,
) -> Result<(), EncodeError> {
    match op {
        Operation::Endorsement(op) => writer.write_i32(op.level),
        Operation::TenderbakeEndorsement(content) | Operation::Preendorsement(content) => {
            encode_consensus_content(writer, content)
        }
        Operation::EndorsementWithDal(op) => {
            encode_consensus_content(writer, &op.consensus);
            writer.write_z(&op.dal_attestation);
        }
        Operation::EndorsementWithSlot(op) => {
            encode_inlined(writer, &op.endorsement, params, &[OpKind::Endorsement])?;
            writer.write_u16(op.slot);
        }
        Operation::DalAttestation(op) => {
            writer.write_implicit_address(&op.attestor)?;
            writer.write_z(&op.attestation);
            writer.write_i32(op.level);
        }
        Operation::SeedNonceRevelation(op) => {
            writer.write_i32(op.level);
            writer.write_bytes(op.nonce.as_bytes());
        }
        Operation::DoubleEndorsementEvidence(op) => {
            encode_inlined(writer, &op.op1, params, ENDORSEMENTS)?;
            encode_inlined(writer, &op.op2, params, ENDORSEMENTS)?;
            if params.tags_version() == EVIDENCE_SLOT_TAGS_VERSION {
                writer.write_u16(op.slot.unwrap_or_default());
            }
        }
        Operation::DoublePreendorsementEvidence(op) => {
            encode_inlined(writer, &op.op1, params, PREENDORSEMENTS)?;
            encode_inlined(writer, &op.op2, params, PREENDORSEMENTS)?;
        }
        Operation::DoubleBakingEvidence(op) => {
            for header in [&op.bh1, &op.bh2] {
                writer.write_prefixed_with("block_header", |w| {
                    encode_block_header(w, header, params, true)
                })?;
            }
        }
        Operation::ActivateAccount(op) => {
            if op.pkh.kind() != AddressKind::Implicit(KeyKind::Ed25519) {
                return Err(EncodeError::InvalidAddress {
                    address: op.pkh.to_base58(),
                    form: "tz1 address",
                });
            }
            writer.write_bytes(op.pkh.hash());
            writer.write_bytes(op.secret.as_bytes());
        }
        Operation::VdfRevelation(op) => writer.write_bytes(op.solution.as_bytes()),
        Operation::DrainDelegate(op) => {
            writer.write_implicit_address(&op.consensus_key)?;
            writer.write_implicit_address(&op.delegate)?;
            writer.write_implicit_address(&op.destination)?;
        }
        Operation::FailingNoop(op) => {
            writer.write_bytes_prefixed(op.arbitrary.as_slice(), "arbitrary")?;
        }
        Operation::Proposals(op) => {
            writer.write_implicit_address(&op.source)?;
            writer.write_i32(op.period);
            writer.write_prefixed_with("proposals", |w| {
                for proposal in &op.proposals {
                    w.write_bytes(proposal.as_bytes());
                }
                Ok(())
            })?;
        }
        Operation::Ballot(op) => {
            writer.write_implicit_address(&op.source)?;
            writer.write_i32(op.period);
            writer.write_bytes(op.proposal.as_bytes());
            writer.write_byte(op.ballot.to_byte());
        }
        other => {
            return Err(EncodeError::UnexpectedKind {
                kind: other.kind(),
                context: "consensus codec",
            });
        }
    }
    Ok(())
}

fn encode_consensus_content(writer: &mut Writer, content: &ConsensusContent) {
    writer.write_u16(content.slot);
    writer.write_i32(content.level);
    writer.write_i32(content.round);
    writer.write_bytes(content.block_payload_hash.as_bytes());
}

/// Writes a length-prefixed signed consensus operation.
fn encode_inlined(
    writer: &mut Writer,
    inlined: &InlinedEndorsement,
    params: &Params,
    allowed: &[OpKind],
) -> Result<(), EncodeError> {
    let kind = inlined.operations.kind();
    if !allowed.contains(&kind) {
        return Err(EncodeError::UnexpectedKind {
            kind,
            context: "inlined endorsement",
        });
    }
    writer.write_prefixed_with("inlined endorsement", |w| {
        w.write_bytes(inlined.branch.as_bytes());
        encode_operation(w, &inlined.operations, params)?;
        w.write_signature(&inlined.signature);
        Ok(())
    })
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes the body of a non-manager content. The tag is already consumed.
pub(crate) fn decode_body(
    reader: &mut Reader<'_>,
    kind: OpKind,
    params: &Params,
) -> Result<Operation, DecodeError> {
    Ok(match kind {
        OpKind::Endorsement if params.is_tenderbake() => {
            Operation::TenderbakeEndorsement(decode_consensus_content(reader)?)
        }
        OpKind::Endorsement => Operation::Endorsement(Endorsement {
            level: reader.read_i32("level")?,
        }),
        OpKind::Preendorsement => Operation::Preendorsement(decode_consensus_content(reader)?),
        OpKind::EndorsementWithDal => Operation::EndorsementWithDal(EndorsementWithDal {
            consensus: decode_consensus_content(reader)?,
            dal_attestation: reader.read_z("dal_attestation")?,
        }),
        OpKind::EndorsementWithSlot => Operation::EndorsementWithSlot(EndorsementWithSlot {
            endorsement: decode_inlined(reader, params, &[OpKind::Endorsement])?,
            slot: reader.read_u16("slot")?,
        }),
        OpKind::DalAttestation => Operation::DalAttestation(DalAttestation {
            attestor: reader.read_implicit_address("attestor")?,
            attestation: reader.read_z("attestation")?,
            level: reader.read_i32("level")?,
        }),
        OpKind::SeedNonceRevelation => Operation::SeedNonceRevelation(SeedNonceRevelation {
            level: reader.read_i32("level")?,
            nonce: SeedNonce::new(reader.read_array("nonce")?),
        }),
        OpKind::DoubleEndorsementEvidence => {
            let op1 = decode_inlined(reader, params, ENDORSEMENTS)?;
            let op2 = decode_inlined(reader, params, ENDORSEMENTS)?;
            let slot = if params.tags_version() == EVIDENCE_SLOT_TAGS_VERSION {
                Some(reader.read_u16("slot")?)
            } else {
                None
            };
            Operation::DoubleEndorsementEvidence(DoubleEndorsementEvidence { op1, op2, slot })
        }
        OpKind::DoublePreendorsementEvidence => {
            Operation::DoublePreendorsementEvidence(DoublePreendorsementEvidence {
                op1: decode_inlined(reader, params, PREENDORSEMENTS)?,
                op2: decode_inlined(reader, params, PREENDORSEMENTS)?,
            })
        }
        OpKind::DoubleBakingEvidence => {
            let bh1 = reader.read_prefixed_with("block_header", |r| decode_block_header(r, params))?;
            let bh2 = reader.read_prefixed_with("block_header", |r| decode_block_header(r, params))?;
            Operation::DoubleBakingEvidence(DoubleBakingEvidence { bh1, bh2 })
        }
        OpKind::ActivateAccount => Operation::ActivateAccount(ActivateAccount {
            pkh: Address::new(
                AddressKind::Implicit(KeyKind::Ed25519),
                reader.read_array("pkh")?,
            ),
            secret: ActivationSecret::new(reader.read_array("secret")?),
        }),
        OpKind::VdfRevelation => Operation::VdfRevelation(VdfRevelation {
            solution: VdfSolution::new(reader.read_array("solution")?),
        }),
        OpKind::DrainDelegate => Operation::DrainDelegate(DrainDelegate {
            consensus_key: reader.read_implicit_address("consensus_key")?,
            delegate: reader.read_implicit_address("delegate")?,
            destination: reader.read_implicit_address("destination")?,
        }),
        OpKind::FailingNoop => Operation::FailingNoop(FailingNoop {
            arbitrary: reader.read_bytes_prefixed(MAX_BYTES_LEN, "arbitrary")?.into(),
        }),
        OpKind::Proposals => Operation::Proposals(Proposals {
            source: reader.read_implicit_address("source")?,
            period: reader.read_i32("period")?,
            proposals: reader.read_list_prefixed("proposals", |r| {
                r.read_array("proposals").map(ProtocolHash::new)
            })?,
        }),
        OpKind::Ballot => {
            let source = reader.read_implicit_address("source")?;
            let period = reader.read_i32("period")?;
            let proposal = ProtocolHash::new(reader.read_array("proposal")?);
            let value = reader.read_byte("ballot")?;
            let ballot = BallotVote::from_byte(value).ok_or(DecodeError::InvalidEnumValue {
                field: "ballot",
                value,
            })?;
            Operation::Ballot(Ballot {
                source,
                period,
                proposal,
                ballot,
            })
        }
        other => {
            return Err(DecodeError::UnexpectedKind {
                kind: other,
                context: "consensus codec",
            });
        }
    })
}

fn decode_consensus_content(reader: &mut Reader<'_>) -> Result<ConsensusContent, DecodeError> {
    Ok(ConsensusContent {
        slot: reader.read_u16("slot")?,
        level: reader.read_i32("level")?,
        round: reader.read_i32("round")?,
        block_payload_hash: PayloadHash::new(reader.read_array("block_payload_hash")?),
    })
}

/// Reads a length-prefixed signed consensus operation.
fn decode_inlined(
    reader: &mut Reader<'_>,
    params: &Params,
    allowed: &[OpKind],
) -> Result<InlinedEndorsement, DecodeError> {
    reader.read_prefixed_with("inlined endorsement", |r| {
        let branch = BlockHash::new(r.read_array("branch")?);
        // Checked before decoding so evidence cannot nest inside evidence.
        let version = params.tags_version();
        let tag = r.peek_byte("tag")?;
        let kind =
            registry::kind_for(tag, version).ok_or(DecodeError::UnknownTag { tag, version })?;
        if !allowed.contains(&kind) {
            return Err(DecodeError::UnexpectedKind {
                kind,
                context: "inlined endorsement",
            });
        }
        let operations = decode_operation(r, params)?;
        Ok(InlinedEndorsement {
            branch,
            operations: Box::new(operations),
            signature: r.read_signature("signature")?,
        })
    })
}
