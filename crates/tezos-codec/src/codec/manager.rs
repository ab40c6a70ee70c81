//! Manager fields shared by every fee-paying operation.
//!
//! Layout: 21-byte source, then fee, counter, gas limit and storage limit
//! as zarith naturals. Every field is self-delimiting.

use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::IMPLICIT_ADDRESS_LEN;
use crate::model::ManagerFields;

/// Smallest encoded manager block (source + four one-byte naturals).
pub const MIN_MANAGER_LEN: usize = IMPLICIT_ADDRESS_LEN + 4;

pub fn encode_manager(writer: &mut Writer, manager: &ManagerFields) -> Result<(), EncodeError> {
    writer.write_implicit_address(&manager.source)?;
    writer.write_n(&manager.fee);
    writer.write_n(&manager.counter);
    writer.write_n(&manager.gas_limit);
    writer.write_n(&manager.storage_limit);
    Ok(())
}

pub fn decode_manager(reader: &mut Reader<'_>) -> Result<ManagerFields, DecodeError> {
    Ok(ManagerFields {
        source: reader.read_implicit_address("source")?,
        fee: reader.read_n("fee")?,
        counter: reader.read_n("counter")?,
        gas_limit: reader.read_n("gas_limit")?,
        storage_limit: reader.read_n("storage_limit")?,
    })
}

/// Encoded size of a manager block.
pub fn manager_len(manager: &ManagerFields) -> usize {
    IMPLICIT_ADDRESS_LEN
        + manager.fee.encoded_len()
        + manager.counter.encoded_len()
        + manager.gas_limit.encoded_len()
        + manager.storage_limit.encoded_len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::N;

    #[test]
    fn test_manager_layout() {
        let manager = ManagerFields {
            source: "tz1gjaF81ZRRvdzjobyfVNsAeSC6PScjfQwN".parse().unwrap(),
            fee: N::from(987u64),
            counter: N::from(456u64),
            gas_limit: N::zero(),
            storage_limit: N::from(1405u64),
        };
        let mut w = Writer::new();
        encode_manager(&mut w, &manager).unwrap();
        assert_eq!(
            hex::encode(w.as_bytes()),
            "00e7670f32038107a59a2b9cfefae36ea21f5aa63cdb07c80300fd0a"
        );
        assert_eq!(w.len(), manager_len(&manager));

        let mut r = Reader::new(w.as_bytes());
        assert_eq!(decode_manager(&mut r).unwrap(), manager);
        assert!(r.is_empty());
    }

    #[test]
    fn test_manager_rejects_contract_source() {
        let manager = ManagerFields::new("KT1EY9XA4Z5tybQN5zmVUL5cntku1zTCBLTv".parse().unwrap());
        let mut w = Writer::new();
        assert!(matches!(
            encode_manager(&mut w, &manager),
            Err(EncodeError::InvalidAddress { .. })
        ));
    }
}
