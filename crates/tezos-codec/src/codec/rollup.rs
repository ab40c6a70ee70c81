//! Smart rollup and DAL operation encoding/decoding.
//!
//! Rollup addresses are written as their raw 20-byte hash, without the
//! tag and padding of the contract form.

use crate::codec::manager::{decode_manager, encode_manager};
use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_BYTES_LEN;
use crate::model::{
    DalCommitment, DalCommitmentProof, DalPublishCommitment, DalSlotHeader, DissectionChunk,
    OpKind, Operation, PvmKind, Refutation, RefutationStep, RollupStakers,
    SmartRollupAddMessages, SmartRollupCement, SmartRollupCommitment, SmartRollupCommitmentHash,
    SmartRollupExecuteOutboxMessage, SmartRollupOriginate, SmartRollupPublish,
    SmartRollupRecoverBond, SmartRollupRefute, SmartRollupStateHash, SmartRollupTimeout,
};

// Refutation tags
const REFUTATION_START: u8 = 0;
const REFUTATION_MOVE: u8 = 1;

// Refutation step tags
const STEP_DISSECTION: u8 = 0;
const STEP_PROOF: u8 = 1;

// =============================================================================
// ENCODING
// =============================================================================

pub(crate) fn encode_originate(
    writer: &mut Writer,
    op: &SmartRollupOriginate,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_byte(op.pvm_kind.to_byte());
    writer.write_bytes_prefixed(op.kernel.as_slice(), "kernel")?;
    writer.write_bytes_prefixed(op.parameters_ty.as_slice(), "parameters_ty")?;
    match &op.whitelist {
        Some(whitelist) => {
            writer.write_bool(true);
            writer.write_prefixed_with("whitelist", |w| {
                for address in whitelist {
                    w.write_implicit_address(address)?;
                }
                Ok(())
            })
        }
        None => {
            writer.write_bool(false);
            Ok(())
        }
    }
}

pub(crate) fn encode_add_messages(
    writer: &mut Writer,
    op: &SmartRollupAddMessages,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_prefixed_with("message", |w| {
        for message in &op.message {
            w.write_bytes_prefixed(message.as_slice(), "message")?;
        }
        Ok(())
    })
}

pub(crate) fn encode_cement(writer: &mut Writer, op: &SmartRollupCement) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_rollup_address(&op.rollup)
}

pub(crate) fn encode_publish(writer: &mut Writer, op: &SmartRollupPublish) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_rollup_address(&op.rollup)?;
    let commitment = &op.commitment;
    writer.write_bytes(commitment.compressed_state.as_bytes());
    writer.write_i32(commitment.inbox_level);
    writer.write_bytes(commitment.predecessor.as_bytes());
    writer.write_i64(commitment.number_of_ticks);
    Ok(())
}

pub(crate) fn encode_refute(writer: &mut Writer, op: &SmartRollupRefute) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_rollup_address(&op.rollup)?;
    writer.write_implicit_address(&op.opponent)?;
    match &op.refutation {
        Refutation::Start {
            player_commitment_hash,
            opponent_commitment_hash,
        } => {
            writer.write_byte(REFUTATION_START);
            writer.write_bytes(player_commitment_hash.as_bytes());
            writer.write_bytes(opponent_commitment_hash.as_bytes());
        }
        Refutation::Move { choice, step } => {
            writer.write_byte(REFUTATION_MOVE);
            writer.write_n(choice);
            encode_step(writer, step)?;
        }
    }
    Ok(())
}

fn encode_step(writer: &mut Writer, step: &RefutationStep) -> Result<(), EncodeError> {
    match step {
        RefutationStep::Dissection(chunks) => {
            writer.write_byte(STEP_DISSECTION);
            writer.write_prefixed_with("dissection", |w| {
                for chunk in chunks {
                    match &chunk.state {
                        Some(state) => {
                            w.write_bool(true);
                            w.write_bytes(state.as_bytes());
                        }
                        None => w.write_bool(false),
                    }
                    w.write_n(&chunk.tick);
                }
                Ok(())
            })
        }
        RefutationStep::Proof(_) => Err(EncodeError::UnsupportedRefutationStep),
    }
}

pub(crate) fn encode_timeout(writer: &mut Writer, op: &SmartRollupTimeout) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_rollup_address(&op.rollup)?;
    writer.write_implicit_address(&op.stakers.alice)?;
    writer.write_implicit_address(&op.stakers.bob)
}

pub(crate) fn encode_execute_outbox_message(
    writer: &mut Writer,
    op: &SmartRollupExecuteOutboxMessage,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_rollup_address(&op.rollup)?;
    writer.write_bytes(op.cemented_commitment.as_bytes());
    writer.write_bytes_prefixed(op.output_proof.as_slice(), "output_proof")
}

pub(crate) fn encode_recover_bond(
    writer: &mut Writer,
    op: &SmartRollupRecoverBond,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_rollup_address(&op.rollup)?;
    writer.write_implicit_address(&op.staker)
}

pub(crate) fn encode_dal_publish_commitment(
    writer: &mut Writer,
    op: &DalPublishCommitment,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_byte(op.slot_header.slot_index);
    writer.write_bytes(op.slot_header.commitment.as_bytes());
    writer.write_bytes(op.slot_header.commitment_proof.as_bytes());
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes the body of a smart rollup or DAL manager content. The tag is
/// already consumed.
pub(crate) fn decode_body(reader: &mut Reader<'_>, kind: OpKind) -> Result<Operation, DecodeError> {
    let manager = decode_manager(reader)?;
    Ok(match kind {
        OpKind::SmartRollupOriginate => {
            let value = reader.read_byte("pvm_kind")?;
            let pvm_kind = PvmKind::from_byte(value).ok_or(DecodeError::InvalidEnumValue {
                field: "pvm_kind",
                value,
            })?;
            let kernel = reader.read_bytes_prefixed(MAX_BYTES_LEN, "kernel")?;
            let parameters_ty = reader.read_bytes_prefixed(MAX_BYTES_LEN, "parameters_ty")?;
            let whitelist = if reader.read_bool("whitelist")? {
                Some(reader.read_list_prefixed("whitelist", |r| {
                    r.read_implicit_address("whitelist")
                })?)
            } else {
                None
            };
            Operation::SmartRollupOriginate(SmartRollupOriginate {
                manager,
                pvm_kind,
                kernel: kernel.into(),
                parameters_ty: parameters_ty.into(),
                whitelist,
            })
        }
        OpKind::SmartRollupAddMessages => {
            let message = reader.read_list_prefixed("message", |r| {
                r.read_bytes_prefixed(MAX_BYTES_LEN, "message").map(Into::into)
            })?;
            Operation::SmartRollupAddMessages(SmartRollupAddMessages { manager, message })
        }
        OpKind::SmartRollupCement => Operation::SmartRollupCement(SmartRollupCement {
            manager,
            rollup: reader.read_rollup_address("rollup")?,
        }),
        OpKind::SmartRollupPublish => Operation::SmartRollupPublish(SmartRollupPublish {
            manager,
            rollup: reader.read_rollup_address("rollup")?,
            commitment: SmartRollupCommitment {
                compressed_state: SmartRollupStateHash::new(reader.read_array("compressed_state")?),
                inbox_level: reader.read_i32("inbox_level")?,
                predecessor: SmartRollupCommitmentHash::new(reader.read_array("predecessor")?),
                number_of_ticks: reader.read_i64("number_of_ticks")?,
            },
        }),
        OpKind::SmartRollupRefute => Operation::SmartRollupRefute(SmartRollupRefute {
            manager,
            rollup: reader.read_rollup_address("rollup")?,
            opponent: reader.read_implicit_address("opponent")?,
            refutation: decode_refutation(reader)?,
        }),
        OpKind::SmartRollupTimeout => Operation::SmartRollupTimeout(SmartRollupTimeout {
            manager,
            rollup: reader.read_rollup_address("rollup")?,
            stakers: RollupStakers {
                alice: reader.read_implicit_address("alice")?,
                bob: reader.read_implicit_address("bob")?,
            },
        }),
        OpKind::SmartRollupExecuteOutboxMessage => {
            Operation::SmartRollupExecuteOutboxMessage(SmartRollupExecuteOutboxMessage {
                manager,
                rollup: reader.read_rollup_address("rollup")?,
                cemented_commitment: SmartRollupCommitmentHash::new(
                    reader.read_array("cemented_commitment")?,
                ),
                output_proof: reader
                    .read_bytes_prefixed(MAX_BYTES_LEN, "output_proof")?
                    .into(),
            })
        }
        OpKind::SmartRollupRecoverBond => Operation::SmartRollupRecoverBond(SmartRollupRecoverBond {
            manager,
            rollup: reader.read_rollup_address("rollup")?,
            staker: reader.read_implicit_address("staker")?,
        }),
        OpKind::DalPublishCommitment => Operation::DalPublishCommitment(DalPublishCommitment {
            manager,
            slot_header: DalSlotHeader {
                slot_index: reader.read_byte("slot_index")?,
                commitment: DalCommitment::new(reader.read_array("commitment")?),
                commitment_proof: DalCommitmentProof::new(reader.read_array("commitment_proof")?),
            },
        }),
        other => {
            return Err(DecodeError::UnexpectedKind {
                kind: other,
                context: "rollup codec",
            });
        }
    })
}

fn decode_refutation(reader: &mut Reader<'_>) -> Result<Refutation, DecodeError> {
    match reader.read_byte("refutation")? {
        REFUTATION_START => Ok(Refutation::Start {
            player_commitment_hash: SmartRollupCommitmentHash::new(
                reader.read_array("player_commitment_hash")?,
            ),
            opponent_commitment_hash: SmartRollupCommitmentHash::new(
                reader.read_array("opponent_commitment_hash")?,
            ),
        }),
        REFUTATION_MOVE => {
            let choice = reader.read_n("choice")?;
            let step = match reader.read_byte("step")? {
                STEP_DISSECTION => RefutationStep::Dissection(
                    reader.read_list_prefixed("dissection", decode_chunk)?,
                ),
                STEP_PROOF => return Err(DecodeError::UnsupportedRefutationStep),
                value => {
                    return Err(DecodeError::InvalidEnumValue {
                        field: "refutation step",
                        value,
                    });
                }
            };
            Ok(Refutation::Move { choice, step })
        }
        value => Err(DecodeError::InvalidEnumValue {
            field: "refutation",
            value,
        }),
    }
}

fn decode_chunk(reader: &mut Reader<'_>) -> Result<DissectionChunk, DecodeError> {
    let state = if reader.read_bool("state")? {
        Some(SmartRollupStateHash::new(reader.read_array("state")?))
    } else {
        None
    };
    Ok(DissectionChunk {
        state,
        tick: reader.read_n("tick")?,
    })
}
