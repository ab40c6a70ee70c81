//! Operation content encoding/decoding.
//!
//! Every content starts with a tag byte resolved through the versioned
//! registry. This module dispatches on that tag and implements the core
//! manager kinds; consensus, anonymous and voting kinds live in
//! [`crate::codec::consensus`], smart rollup and DAL kinds in
//! [`crate::codec::rollup`].

use tracing::trace;

use crate::codec::consensus;
use crate::codec::manager::{MIN_MANAGER_LEN, decode_manager, encode_manager};
use crate::codec::primitives::{Reader, Writer};
use crate::codec::registry;
use crate::codec::rollup;
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    ADDRESS_HASH_LEN, CONTRACT_ADDRESS_LEN, DAL_COMMITMENT_LEN, MAX_BYTES_LEN, MAX_ENTRYPOINT_LEN,
    MIN_CONTENT_LEN, VDF_SOLUTION_PART_LEN,
};
use crate::model::script::NAMED_ENTRYPOINT_TAG;
use crate::model::{
    Delegation, Entrypoint, IncreasePaidStorage, OpKind, Operation, Origination, Parameters,
    RegisterGlobalConstant, Reveal, Script, SetDepositsLimit, Transaction, TransferTicket,
    UpdateConsensusKey,
};
use crate::params::Params;

// =============================================================================
// DISPATCH
// =============================================================================

/// Encodes one content: tag byte followed by its fields.
pub fn encode_operation(
    writer: &mut Writer,
    op: &Operation,
    params: &Params,
) -> Result<(), EncodeError> {
    let version = params.tags_version();
    consensus::check_layout(op, params)?;
    writer.write_byte(registry::require_tag(op.kind(), version)?);

    match op {
        Operation::Reveal(op) => encode_reveal(writer, op),
        Operation::Transaction(op) => encode_transaction(writer, op),
        Operation::Origination(op) => encode_origination(writer, op),
        Operation::Delegation(op) => encode_delegation(writer, op),
        Operation::RegisterGlobalConstant(op) => encode_register_global_constant(writer, op),
        Operation::SetDepositsLimit(op) => encode_set_deposits_limit(writer, op),
        Operation::IncreasePaidStorage(op) => encode_increase_paid_storage(writer, op),
        Operation::UpdateConsensusKey(op) => encode_update_consensus_key(writer, op),
        Operation::TransferTicket(op) => encode_transfer_ticket(writer, op),
        Operation::SmartRollupOriginate(op) => rollup::encode_originate(writer, op),
        Operation::SmartRollupAddMessages(op) => rollup::encode_add_messages(writer, op),
        Operation::SmartRollupCement(op) => rollup::encode_cement(writer, op),
        Operation::SmartRollupPublish(op) => rollup::encode_publish(writer, op),
        Operation::SmartRollupRefute(op) => rollup::encode_refute(writer, op),
        Operation::SmartRollupTimeout(op) => rollup::encode_timeout(writer, op),
        Operation::SmartRollupExecuteOutboxMessage(op) => {
            rollup::encode_execute_outbox_message(writer, op)
        }
        Operation::SmartRollupRecoverBond(op) => rollup::encode_recover_bond(writer, op),
        Operation::DalPublishCommitment(op) => rollup::encode_dal_publish_commitment(writer, op),
        other => consensus::encode_body(writer, other, params),
    }
}

/// Encodes one content into a fresh buffer.
pub fn encode_operation_bytes(op: &Operation, params: &Params) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::with_capacity(64);
    encode_operation(&mut writer, op, params)?;
    Ok(writer.into_bytes())
}

/// Encoded size of one content, tag included.
pub fn encoded_len(op: &Operation, params: &Params) -> Result<usize, EncodeError> {
    encode_operation_bytes(op, params).map(|bytes| bytes.len())
}

/// Decodes one content, dispatching on its tag.
///
/// On failure the reader is left where it was, so callers can inspect the
/// unconsumed bytes.
pub fn decode_operation(reader: &mut Reader<'_>, params: &Params) -> Result<Operation, DecodeError> {
    let version = params.tags_version();
    let tag = reader.peek_byte("tag")?;
    let kind = registry::kind_for(tag, version).ok_or(DecodeError::UnknownTag { tag, version })?;
    trace!(tag, %kind, version, "decoding operation");
    decode_tagged(reader, kind, params)
}

/// Decodes one content of a known kind.
///
/// Fails with `TagMismatch` when the next tag belongs to another kind, and
/// with `UnexpectedEof` when fewer bytes remain than the kind's smallest
/// layout. The reader does not advance on failure.
pub fn decode_kind(
    reader: &mut Reader<'_>,
    kind: OpKind,
    params: &Params,
) -> Result<Operation, DecodeError> {
    let version = params.tags_version();
    let expected = registry::tag_for(kind, version).ok_or(DecodeError::UnexpectedKind {
        kind,
        context: "the active tags version",
    })?;
    let found = reader.peek_byte("tag")?;
    if found != expected {
        return Err(DecodeError::TagMismatch {
            kind,
            expected,
            found,
        });
    }
    decode_tagged(reader, kind, params)
}

/// Decodes exactly one content from a byte slice.
pub fn decode_operation_bytes(bytes: &[u8], params: &Params) -> Result<Operation, DecodeError> {
    let mut reader = Reader::new(bytes);
    let op = decode_operation(&mut reader, params)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            count: reader.remaining_len(),
        });
    }
    Ok(op)
}

fn decode_tagged(
    reader: &mut Reader<'_>,
    kind: OpKind,
    params: &Params,
) -> Result<Operation, DecodeError> {
    let start = reader.position();
    let result = reader
        .read_byte("tag")
        .and_then(|_| reader.ensure(min_body_len(kind, params), kind.name()))
        .and_then(|()| decode_body(reader, kind, params));
    if result.is_err() {
        reader.seek(start);
    }
    result
}

fn decode_body(
    reader: &mut Reader<'_>,
    kind: OpKind,
    params: &Params,
) -> Result<Operation, DecodeError> {
    Ok(match kind {
        OpKind::Reveal => Operation::Reveal(decode_reveal(reader)?),
        OpKind::Transaction => Operation::Transaction(decode_transaction(reader)?),
        OpKind::Origination => Operation::Origination(decode_origination(reader)?),
        OpKind::Delegation => Operation::Delegation(decode_delegation(reader)?),
        OpKind::RegisterGlobalConstant => {
            Operation::RegisterGlobalConstant(decode_register_global_constant(reader)?)
        }
        OpKind::SetDepositsLimit => Operation::SetDepositsLimit(decode_set_deposits_limit(reader)?),
        OpKind::IncreasePaidStorage => {
            Operation::IncreasePaidStorage(decode_increase_paid_storage(reader)?)
        }
        OpKind::UpdateConsensusKey => {
            Operation::UpdateConsensusKey(decode_update_consensus_key(reader)?)
        }
        OpKind::TransferTicket => Operation::TransferTicket(decode_transfer_ticket(reader)?),
        kind if kind.is_manager() => rollup::decode_body(reader, kind)?,
        kind => consensus::decode_body(reader, kind, params)?,
    })
}

/// Smallest encoded body of a kind, tag excluded.
pub fn min_body_len(kind: OpKind, params: &Params) -> usize {
    let manager = if kind.is_manager() { MIN_MANAGER_LEN } else { 0 };
    manager
        + match kind {
            OpKind::Endorsement if params.is_tenderbake() => 42,
            OpKind::Endorsement => MIN_CONTENT_LEN - 1,
            OpKind::Preendorsement => 42,
            OpKind::EndorsementWithDal => 43,
            OpKind::EndorsementWithSlot => 6,
            OpKind::DalAttestation => 26,
            OpKind::SeedNonceRevelation => 36,
            OpKind::DoubleEndorsementEvidence if params.tags_version() == 1 => 10,
            OpKind::DoubleEndorsementEvidence => 8,
            OpKind::DoublePreendorsementEvidence => 8,
            OpKind::DoubleBakingEvidence => 8,
            OpKind::ActivateAccount => ADDRESS_HASH_LEN + 20,
            OpKind::VdfRevelation => 2 * VDF_SOLUTION_PART_LEN,
            OpKind::DrainDelegate => 63,
            OpKind::FailingNoop => 4,
            OpKind::Proposals => 29,
            OpKind::Ballot => 58,
            OpKind::Reveal => 33,
            OpKind::Transaction => CONTRACT_ADDRESS_LEN + 2,
            OpKind::Origination => 10,
            OpKind::Delegation => 1,
            OpKind::RegisterGlobalConstant => 4,
            OpKind::SetDepositsLimit => 1,
            OpKind::IncreasePaidStorage => CONTRACT_ADDRESS_LEN + 1,
            OpKind::UpdateConsensusKey => 33,
            OpKind::TransferTicket => 57,
            OpKind::SmartRollupOriginate => 10,
            OpKind::SmartRollupAddMessages => 4,
            OpKind::SmartRollupCement => ADDRESS_HASH_LEN,
            OpKind::SmartRollupPublish => 96,
            OpKind::SmartRollupRefute => 42,
            OpKind::SmartRollupTimeout => 62,
            OpKind::SmartRollupExecuteOutboxMessage => 56,
            OpKind::SmartRollupRecoverBond => 41,
            OpKind::DalPublishCommitment => 2 * DAL_COMMITMENT_LEN + 1,
        }
}

// =============================================================================
// CONTRACT CALL PARAMETERS
// =============================================================================

fn encode_entrypoint(writer: &mut Writer, entrypoint: &Entrypoint) {
    let tag = entrypoint.tag();
    writer.write_byte(tag);
    if tag == NAMED_ENTRYPOINT_TAG {
        let name = entrypoint.as_str().as_bytes();
        writer.write_byte(name.len() as u8);
        writer.write_bytes(name);
    }
}

fn decode_entrypoint(reader: &mut Reader<'_>) -> Result<Entrypoint, DecodeError> {
    let tag = reader.read_byte("entrypoint")?;
    if tag != NAMED_ENTRYPOINT_TAG {
        return Entrypoint::from_tag(tag).ok_or(DecodeError::InvalidEnumValue {
            field: "entrypoint",
            value: tag,
        });
    }
    let len = reader.read_byte("entrypoint")? as usize;
    if len > MAX_ENTRYPOINT_LEN {
        return Err(DecodeError::LengthExceedsLimit {
            field: "entrypoint",
            len,
            max: MAX_ENTRYPOINT_LEN,
        });
    }
    let name = std::str::from_utf8(reader.read_bytes(len, "entrypoint")?)
        .map_err(|_| DecodeError::InvalidUtf8 { field: "entrypoint" })?;
    Entrypoint::new(name).map_err(|_| DecodeError::MalformedEncoding {
        context: "entrypoint",
    })
}

pub(crate) fn encode_parameters(
    writer: &mut Writer,
    parameters: &Parameters,
) -> Result<(), EncodeError> {
    encode_entrypoint(writer, &parameters.entrypoint);
    writer.write_bytes_prefixed(parameters.value.as_slice(), "parameters")
}

pub(crate) fn decode_parameters(reader: &mut Reader<'_>) -> Result<Parameters, DecodeError> {
    let entrypoint = decode_entrypoint(reader)?;
    let value = reader.read_bytes_prefixed(MAX_BYTES_LEN, "parameters")?;
    Ok(Parameters {
        entrypoint,
        value: value.into(),
    })
}

// =============================================================================
// MANAGER KINDS
// =============================================================================

fn encode_reveal(writer: &mut Writer, op: &Reveal) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_public_key(&op.public_key);
    Ok(())
}

fn decode_reveal(reader: &mut Reader<'_>) -> Result<Reveal, DecodeError> {
    Ok(Reveal {
        manager: decode_manager(reader)?,
        public_key: reader.read_public_key("public_key")?,
    })
}

fn encode_transaction(writer: &mut Writer, op: &Transaction) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_n(&op.amount);
    writer.write_contract_address(&op.destination);
    match &op.parameters {
        Some(parameters) => {
            writer.write_bool(true);
            encode_parameters(writer, parameters)
        }
        None => {
            writer.write_bool(false);
            Ok(())
        }
    }
}

fn decode_transaction(reader: &mut Reader<'_>) -> Result<Transaction, DecodeError> {
    let manager = decode_manager(reader)?;
    let amount = reader.read_n("amount")?;
    let destination = reader.read_contract_address("destination")?;
    let parameters = if reader.read_bool("parameters")? {
        Some(decode_parameters(reader)?)
    } else {
        None
    };
    Ok(Transaction {
        manager,
        amount,
        destination,
        parameters,
    })
}

fn encode_origination(writer: &mut Writer, op: &Origination) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_n(&op.balance);
    match &op.delegate {
        Some(delegate) => {
            writer.write_bool(true);
            writer.write_implicit_address(delegate)?;
        }
        None => writer.write_bool(false),
    }
    writer.write_bytes_prefixed(op.script.code.as_slice(), "code")?;
    writer.write_bytes_prefixed(op.script.storage.as_slice(), "storage")
}

fn decode_origination(reader: &mut Reader<'_>) -> Result<Origination, DecodeError> {
    let manager = decode_manager(reader)?;
    let balance = reader.read_n("balance")?;
    let delegate = if reader.read_bool("delegate")? {
        Some(reader.read_implicit_address("delegate")?)
    } else {
        None
    };
    let code = reader.read_bytes_prefixed(MAX_BYTES_LEN, "code")?;
    let storage = reader.read_bytes_prefixed(MAX_BYTES_LEN, "storage")?;
    Ok(Origination {
        manager,
        balance,
        delegate,
        script: Script {
            code: code.into(),
            storage: storage.into(),
        },
    })
}

fn encode_delegation(writer: &mut Writer, op: &Delegation) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    match &op.delegate {
        Some(delegate) => {
            writer.write_bool(true);
            writer.write_implicit_address(delegate)
        }
        None => {
            writer.write_bool(false);
            Ok(())
        }
    }
}

fn decode_delegation(reader: &mut Reader<'_>) -> Result<Delegation, DecodeError> {
    let manager = decode_manager(reader)?;
    let delegate = if reader.read_bool("delegate")? {
        Some(reader.read_implicit_address("delegate")?)
    } else {
        None
    };
    Ok(Delegation { manager, delegate })
}

fn encode_register_global_constant(
    writer: &mut Writer,
    op: &RegisterGlobalConstant,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_bytes_prefixed(op.value.as_slice(), "value")
}

fn decode_register_global_constant(
    reader: &mut Reader<'_>,
) -> Result<RegisterGlobalConstant, DecodeError> {
    Ok(RegisterGlobalConstant {
        manager: decode_manager(reader)?,
        value: reader.read_bytes_prefixed(MAX_BYTES_LEN, "value")?.into(),
    })
}

fn encode_set_deposits_limit(writer: &mut Writer, op: &SetDepositsLimit) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    match &op.limit {
        Some(limit) => {
            writer.write_bool(true);
            writer.write_n(limit);
        }
        None => writer.write_bool(false),
    }
    Ok(())
}

fn decode_set_deposits_limit(reader: &mut Reader<'_>) -> Result<SetDepositsLimit, DecodeError> {
    let manager = decode_manager(reader)?;
    let limit = if reader.read_bool("limit")? {
        Some(reader.read_n("limit")?)
    } else {
        None
    };
    Ok(SetDepositsLimit { manager, limit })
}

fn encode_increase_paid_storage(
    writer: &mut Writer,
    op: &IncreasePaidStorage,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_z(&op.amount);
    writer.write_originated_address(&op.destination)
}

fn decode_increase_paid_storage(
    reader: &mut Reader<'_>,
) -> Result<IncreasePaidStorage, DecodeError> {
    Ok(IncreasePaidStorage {
        manager: decode_manager(reader)?,
        amount: reader.read_z("amount")?,
        destination: reader.read_originated_address("destination")?,
    })
}

fn encode_update_consensus_key(
    writer: &mut Writer,
    op: &UpdateConsensusKey,
) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_public_key(&op.pk);
    Ok(())
}

fn decode_update_consensus_key(reader: &mut Reader<'_>) -> Result<UpdateConsensusKey, DecodeError> {
    Ok(UpdateConsensusKey {
        manager: decode_manager(reader)?,
        pk: reader.read_public_key("pk")?,
    })
}

fn encode_transfer_ticket(writer: &mut Writer, op: &TransferTicket) -> Result<(), EncodeError> {
    encode_manager(writer, &op.manager)?;
    writer.write_bytes_prefixed(op.ticket_contents.as_slice(), "ticket_contents")?;
    writer.write_bytes_prefixed(op.ticket_ty.as_slice(), "ticket_ty")?;
    writer.write_contract_address(&op.ticket_ticketer);
    writer.write_n(&op.ticket_amount);
    writer.write_contract_address(&op.destination);
    writer.write_string_prefixed(op.entrypoint.as_str(), "entrypoint")
}

fn decode_transfer_ticket(reader: &mut Reader<'_>) -> Result<TransferTicket, DecodeError> {
    let manager = decode_manager(reader)?;
    let ticket_contents = reader.read_bytes_prefixed(MAX_BYTES_LEN, "ticket_contents")?;
    let ticket_ty = reader.read_bytes_prefixed(MAX_BYTES_LEN, "ticket_ty")?;
    let ticket_ticketer = reader.read_contract_address("ticket_ticketer")?;
    let ticket_amount = reader.read_n("ticket_amount")?;
    let destination = reader.read_contract_address("destination")?;
    let name = reader.read_string_prefixed(MAX_ENTRYPOINT_LEN, "entrypoint")?;
    let entrypoint = Entrypoint::new(&name).map_err(|_| DecodeError::MalformedEncoding {
        context: "entrypoint",
    })?;
    Ok(TransferTicket {
        manager,
        ticket_contents: ticket_contents.into(),
        ticket_ty: ticket_ty.into(),
        ticket_ticketer,
        ticket_amount,
        destination,
        entrypoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Address, AddressKind, Ballot, BallotVote, ConsensusContent, DalAttestation, DrainDelegate,
        EndorsementWithDal, FailingNoop, HexBytes, KeyKind, ManagerFields, N, PayloadHash,
        PrivateKey, Proposals, ProtocolHash, SeedNonce, SeedNonceRevelation, SmartRollupCement,
        VdfRevelation, VdfSolution, Z,
    };
    use proptest::prelude::*;

    fn params() -> Params {
        Params::default()
    }

    fn manager(source: &str, fee: u64, counter: u64, gas: u64, storage: u64) -> ManagerFields {
        ManagerFields {
            source: source.parse().unwrap(),
            fee: N::from(fee),
            counter: N::from(counter),
            gas_limit: N::from(gas),
            storage_limit: N::from(storage),
        }
    }

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn assert_vector(op: Operation, expected_hex: &str) {
        let bytes = encode_operation_bytes(&op, &params()).unwrap();
        assert_eq!(hex::encode(&bytes), expected_hex);
        let decoded = decode_operation_bytes(&bytes, &params()).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(
            serde_json::to_string(&decoded).unwrap(),
            serde_json::to_string(&op).unwrap()
        );
    }

    #[test]
    fn test_reveal_vector() {
        assert_vector(
            Operation::Reveal(Reveal {
                manager: manager("tz2WU9XW86EdgVQZrbPphjUZiRfXXssY9wEP", 31, 1005, 89, 7),
                public_key: "sppk7bo7kcRyjajZaAqEfqdtCNx3wgizhJPFqaEuisncbDFMgn6v4iP"
                    .parse()
                    .unwrap(),
            }),
            "6b01f3023970264e14502daa1db4324527bc464fe0fd1fed0759070103480fcf4241d5903bd5b9a71db63fc6784dc9e686acf0dac9b4305d54cb642946",
        );
    }

    #[test]
    fn test_transaction_with_named_entrypoint_vector() {
        assert_vector(
            Operation::Transaction(Transaction {
                manager: manager("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", 405, 2, 1380, 0),
                amount: N::from(1_000_000u64),
                destination: addr("KT1EY9XA4Z5tybQN5zmVUL5cntku1zTCBLTv"),
                parameters: Some(Parameters {
                    entrypoint: Entrypoint::new("B").unwrap(),
                    value: "010000000548656c6c6f".parse().unwrap(),
                }),
            }),
            "6c0002298c03ed7d454a101eb7022bc95f7e5f41ac78950302e40a00c0843d014151d57ddff98da8cd49f0f2cbf89465bcf267a400ffff01420000000a010000000548656c6c6f",
        );
    }

    #[test]
    fn test_transfer_vector() {
        assert_vector(
            Operation::Transaction(Transaction {
                manager: manager("tz1gjaF81ZRRvdzjobyfVNsAeSC6PScjfQwN", 987, 456, 0, 1405),
                amount: N::from(10u64),
                destination: addr("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx"),
                parameters: None,
            }),
            "6c00e7670f32038107a59a2b9cfefae36ea21f5aa63cdb07c80300fd0a0a000002298c03ed7d454a101eb7022bc95f7e5f41ac7800",
        );
    }

    #[test]
    fn test_transaction_with_reserved_entrypoint_vector() {
        assert_vector(
            Operation::Transaction(Transaction {
                manager: manager("tz3hqqamVC1G22LACFoMgcJeFKZgoGMFSfSn", 7, 4223, 0, 0),
                amount: N::zero(),
                destination: addr("tz4Uzyxg26DJyM4pc1V2pUvLpdsR5jdyzYsZ"),
                parameters: Some(Parameters {
                    entrypoint: Entrypoint::new("remove_delegate").unwrap(),
                    value: "030b".parse().unwrap(),
                }),
            }),
            "6c02ebfd1371b542831b4be730161d08885c5312e44207ff200000000003db557924e5a295652eff2c1f141d5a5b72b9cc91ff0400000002030b",
        );
    }

    fn roundtrip(op: Operation) {
        let p = params();
        let bytes = encode_operation_bytes(&op, &p).unwrap();
        assert_eq!(encoded_len(&op, &p).unwrap(), bytes.len());
        assert!(bytes.len() > min_body_len(op.kind(), &p));
        let decoded = decode_operation_bytes(&bytes, &p).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn test_manager_kinds_roundtrip() {
        let source = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx";
        let kt1 = addr("KT1EY9XA4Z5tybQN5zmVUL5cntku1zTCBLTv");
        let pk = "sppk7bo7kcRyjajZaAqEfqdtCNx3wgizhJPFqaEuisncbDFMgn6v4iP"
            .parse()
            .unwrap();

        roundtrip(Operation::Origination(Origination {
            manager: manager(source, 1, 2, 3, 4),
            balance: N::from(u64::MAX),
            delegate: Some(addr(source)),
            script: Script {
                code: HexBytes::new(vec![2, 0, 0, 0, 0]),
                storage: HexBytes::new(vec![3, 11]),
            },
        }));
        roundtrip(Operation::Delegation(Delegation {
            manager: manager(source, 1, 2, 3, 4),
            delegate: None,
        }));
        roundtrip(Operation::Delegation(Delegation {
            manager: manager(source, 1, 2, 3, 4),
            delegate: Some(addr(source)),
        }));
        roundtrip(Operation::RegisterGlobalConstant(RegisterGlobalConstant {
            manager: manager(source, 1, 2, 3, 4),
            value: HexBytes::new(vec![1, 0, 0, 0, 1, 0x41]),
        }));
        roundtrip(Operation::SetDepositsLimit(SetDepositsLimit {
            manager: manager(source, 1, 2, 3, 4),
            limit: Some(N::from(1_000_000u64)),
        }));
        roundtrip(Operation::SetDepositsLimit(SetDepositsLimit {
            manager: manager(source, 1, 2, 3, 4),
            limit: None,
        }));
        roundtrip(Operation::IncreasePaidStorage(IncreasePaidStorage {
            manager: manager(source, 1, 2, 3, 4),
            amount: Z::from(-12_345i64),
            destination: kt1,
        }));
        roundtrip(Operation::UpdateConsensusKey(UpdateConsensusKey {
            manager: manager(source, 1, 2, 3, 4),
            pk,
        }));
        roundtrip(Operation::TransferTicket(TransferTicket {
            manager: manager(source, 1, 2, 3, 4),
            ticket_contents: HexBytes::new(vec![1, 0, 0, 0, 0]),
            ticket_ty: HexBytes::new(vec![3, 0x68]),
            ticket_ticketer: kt1,
            ticket_amount: N::from(10u64),
            destination: kt1,
            entrypoint: Entrypoint::new("withdraw").unwrap(),
        }));
    }

    #[test]
    fn test_increase_paid_storage_needs_originated_destination() {
        let op = Operation::IncreasePaidStorage(IncreasePaidStorage {
            manager: manager("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", 1, 2, 3, 4),
            amount: Z::from(1i64),
            destination: addr("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx"),
        });
        assert!(matches!(
            encode_operation_bytes(&op, &params()),
            Err(EncodeError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_decode_kind_tag_mismatch_does_not_advance() {
        let bytes = hex::decode(
            "6c00e7670f32038107a59a2b9cfefae36ea21f5aa63cdb07c80300fd0a0a000002298c03ed7d454a101eb7022bc95f7e5f41ac7800",
        )
        .unwrap();
        let mut reader = Reader::new(&bytes);
        let err = decode_kind(&mut reader, OpKind::Reveal, &params()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TagMismatch {
                kind: OpKind::Reveal,
                expected: 107,
                found: 108
            }
        );
        assert_eq!(reader.position(), 0);
        assert!(decode_kind(&mut reader, OpKind::Transaction, &params()).is_ok());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_short_buffer_rewinds() {
        let bytes = [108u8, 0, 1, 2];
        let mut reader = Reader::new(&bytes);
        let err = decode_operation(&mut reader, &params()).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_unknown_tag() {
        let mut reader = Reader::new(&[250u8, 0, 0]);
        assert_eq!(
            decode_operation(&mut reader, &params()),
            Err(DecodeError::UnknownTag { tag: 250, version: 2 })
        );
    }

    #[test]
    fn test_kind_unsupported_by_version() {
        let op = Operation::SetDepositsLimit(SetDepositsLimit {
            manager: manager("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", 1, 2, 3, 4),
            limit: None,
        });
        let v1 = Params::default().with_operation_tags_version(1);
        assert_eq!(
            encode_operation_bytes(&op, &v1),
            Err(EncodeError::UnsupportedKind {
                kind: OpKind::SetDepositsLimit,
                version: 1
            })
        );
    }

    #[test]
    fn test_manager_tags_follow_version() {
        let op = Operation::Delegation(Delegation {
            manager: manager("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", 1, 2, 3, 4),
            delegate: None,
        });
        let v0 = Params::default().with_operation_tags_version(0);
        let bytes = encode_operation_bytes(&op, &v0).unwrap();
        assert_eq!(bytes[0], 10);
        assert_eq!(decode_operation_bytes(&bytes, &v0).unwrap(), op);
        assert_eq!(encode_operation_bytes(&op, &params()).unwrap()[0], 110);
    }

    #[test]
    fn test_named_entrypoint_too_long_rejected() {
        let mut bytes = vec![NAMED_ENTRYPOINT_TAG, 40];
        bytes.extend_from_slice(&[b'a'; 40]);
        let mut reader = Reader::new(&bytes);
        assert!(matches!(
            decode_parameters(&mut reader),
            Err(DecodeError::LengthExceedsLimit { len: 40, .. })
        ));
    }

    #[test]
    fn test_consensus_json_parity() {
        let op = Operation::TenderbakeEndorsement(ConsensusContent {
            slot: 12,
            level: 4_200_000,
            round: 1,
            block_payload_hash: PayloadHash::new([9u8; 32]),
        });
        let bytes = encode_operation_bytes(&op, &params()).unwrap();
        let decoded = decode_operation_bytes(&bytes, &params()).unwrap();
        let json = serde_json::to_string(&decoded).unwrap();
        assert_eq!(json, serde_json::to_string(&op).unwrap());
        assert_eq!(serde_json::from_str::<Operation>(&json).unwrap(), op);
    }

    #[test]
    fn test_rollup_json_parity() {
        let op = Operation::SmartRollupCement(SmartRollupCement {
            manager: manager("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx", 650, 7, 1_200, 0),
            rollup: Address::new(AddressKind::SmartRollup, [4u8; 20]),
        });
        let bytes = encode_operation_bytes(&op, &params()).unwrap();
        let decoded = decode_operation_bytes(&bytes, &params()).unwrap();
        let json = serde_json::to_string(&decoded).unwrap();
        assert_eq!(json, serde_json::to_string(&op).unwrap());
        assert_eq!(serde_json::from_str::<Operation>(&json).unwrap(), op);
    }

    fn implicit() -> impl Strategy<Value = Address> {
        (0u8..4, any::<[u8; 20]>()).prop_map(|(tag, hash)| {
            let kind = KeyKind::from_tag(tag).unwrap();
            Address::new(AddressKind::Implicit(kind), hash)
        })
    }

    fn originated() -> impl Strategy<Value = Address> {
        any::<[u8; 20]>().prop_map(|hash| Address::new(AddressKind::Originated, hash))
    }

    fn manager_fields() -> impl Strategy<Value = ManagerFields> {
        (implicit(), any::<u64>(), any::<u64>(), any::<u32>(), any::<u32>()).prop_map(
            |(source, fee, counter, gas, storage)| ManagerFields {
                source,
                fee: N::from(fee),
                counter: N::from(counter),
                gas_limit: N::from(u64::from(gas)),
                storage_limit: N::from(u64::from(storage)),
            },
        )
    }

    fn consensus_content() -> impl Strategy<Value = ConsensusContent> {
        (any::<u16>(), any::<i32>(), any::<i32>(), any::<[u8; 32]>()).prop_map(
            |(slot, level, round, hash)| ConsensusContent {
                slot,
                level,
                round,
                block_payload_hash: PayloadHash::new(hash),
            },
        )
    }

    fn manager_operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            (manager_fields(), any::<[u8; 32]>()).prop_map(|(manager, seed)| {
                let public_key = PrivateKey::ed25519_from_seed(seed).public_key().unwrap();
                Operation::Reveal(Reveal { manager, public_key })
            }),
            (manager_fields(), any::<u64>(), prop_oneof![implicit(), originated()]).prop_map(
                |(manager, amount, destination)| Operation::Transaction(Transaction {
                    manager,
                    amount: N::from(amount),
                    destination,
                    parameters: None,
                })
            ),
            (manager_fields(), any::<u64>(), proptest::option::of(implicit())).prop_map(
                |(manager, balance, delegate)| Operation::Origination(Origination {
                    manager,
                    balance: N::from(balance),
                    delegate,
                    script: Script {
                        code: HexBytes::new(vec![2, 0, 0, 0, 0]),
                        storage: HexBytes::new(vec![3, 11]),
                    },
                })
            ),
            (manager_fields(), proptest::option::of(implicit())).prop_map(
                |(manager, delegate)| Operation::Delegation(Delegation { manager, delegate })
            ),
            (manager_fields(), proptest::collection::vec(any::<u8>(), 0..64)).prop_map(
                |(manager, value)| Operation::RegisterGlobalConstant(RegisterGlobalConstant {
                    manager,
                    value: HexBytes::new(value),
                })
            ),
            (manager_fields(), proptest::option::of(any::<u64>())).prop_map(
                |(manager, limit)| Operation::SetDepositsLimit(SetDepositsLimit {
                    manager,
                    limit: limit.map(N::from),
                })
            ),
            (manager_fields(), any::<i64>(), originated()).prop_map(
                |(manager, amount, destination)| Operation::IncreasePaidStorage(
                    IncreasePaidStorage {
                        manager,
                        amount: Z::from(amount),
                        destination,
                    }
                )
            ),
            (manager_fields(), any::<[u8; 20]>()).prop_map(|(manager, hash)| {
                Operation::SmartRollupCement(SmartRollupCement {
                    manager,
                    rollup: Address::new(AddressKind::SmartRollup, hash),
                })
            }),
        ]
    }

    fn consensus_operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            consensus_content().prop_map(Operation::TenderbakeEndorsement),
            consensus_content().prop_map(Operation::Preendorsement),
            (consensus_content(), any::<i64>()).prop_map(|(consensus, bits)| {
                Operation::EndorsementWithDal(EndorsementWithDal {
                    consensus,
                    dal_attestation: Z::from(bits),
                })
            }),
            (implicit(), any::<i64>(), any::<i32>()).prop_map(|(attestor, bits, level)| {
                Operation::DalAttestation(DalAttestation {
                    attestor,
                    attestation: Z::from(bits),
                    level,
                })
            }),
            (any::<i32>(), any::<[u8; 32]>()).prop_map(|(level, nonce)| {
                Operation::SeedNonceRevelation(SeedNonceRevelation {
                    level,
                    nonce: SeedNonce::new(nonce),
                })
            }),
            any::<u8>().prop_map(|fill| Operation::VdfRevelation(VdfRevelation {
                solution: VdfSolution::new([fill; 2 * VDF_SOLUTION_PART_LEN]),
            })),
            (implicit(), implicit(), implicit()).prop_map(|(consensus_key, delegate, destination)| {
                Operation::DrainDelegate(DrainDelegate {
                    consensus_key,
                    delegate,
                    destination,
                })
            }),
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(|bytes| {
                Operation::FailingNoop(FailingNoop {
                    arbitrary: HexBytes::new(bytes),
                })
            }),
            (implicit(), any::<i32>(), proptest::collection::vec(any::<[u8; 32]>(), 0..4)).prop_map(
                |(source, period, hashes)| Operation::Proposals(Proposals {
                    source,
                    period,
                    proposals: hashes.into_iter().map(ProtocolHash::new).collect(),
                })
            ),
            (implicit(), any::<i32>(), any::<[u8; 32]>(), 0u8..3).prop_map(
                |(source, period, proposal, vote)| Operation::Ballot(Ballot {
                    source,
                    period,
                    proposal: ProtocolHash::new(proposal),
                    ballot: BallotVote::from_byte(vote).unwrap(),
                })
            ),
        ]
    }

    proptest! {
        #[test]
        fn prop_manager_operation_roundtrip(op in manager_operation()) {
            let p = params();
            let bytes = encode_operation_bytes(&op, &p).unwrap();
            prop_assert_eq!(encoded_len(&op, &p).unwrap(), bytes.len());
            prop_assert!(bytes.len() > min_body_len(op.kind(), &p));
            prop_assert_eq!(decode_operation_bytes(&bytes, &p).unwrap(), op);
        }

        #[test]
        fn prop_consensus_operation_roundtrip(op in consensus_operation()) {
            let p = params();
            let bytes = encode_operation_bytes(&op, &p).unwrap();
            prop_assert_eq!(encoded_len(&op, &p).unwrap(), bytes.len());
            prop_assert!(bytes.len() > min_body_len(op.kind(), &p));
            prop_assert_eq!(decode_operation_bytes(&bytes, &p).unwrap(), op);
        }
    }
}
