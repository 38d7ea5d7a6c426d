// Copyright 2025 Quentin Diebold
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Binary packing of structured transactions.
//!
//! Only what is needed to recover the serialized bytes and the id of a transaction a
//! signer echoed back without its packed form. Action payloads are expected to be
//! packed already: serializing them would require the contract ABI.

use crate::error::PackError;
use crate::types::{Action, Name, Transaction};
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

const MAX_NAME_LENGTH: usize = 13;

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

pub fn name_to_u64(name: &str) -> Result<u64, PackError> {
    let invalid = |reason: &str| PackError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let bytes = name.as_bytes();
    if bytes.len() > MAX_NAME_LENGTH {
        return Err(invalid("longer than 13 characters"));
    }

    let mut value = 0u64;
    for (index, c) in bytes.iter().enumerate() {
        let symbol = char_to_symbol(*c).ok_or_else(|| invalid("characters must be in .12345a-z"))?;

        if index < MAX_NAME_LENGTH - 1 {
            value |= (symbol & 0x1f) << (64 - 5 * (index + 1));
        } else {
            // the 13th character only has 4 bits left
            if symbol > 0x0f {
                return Err(invalid("13th character must be in .12345a-j"));
            }
            value |= symbol;
        }
    }

    Ok(value)
}

pub fn write_varuint32(buffer: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

fn write_name(buffer: &mut Vec<u8>, name: &Name) -> Result<(), PackError> {
    buffer.extend_from_slice(&name.to_u64()?.to_le_bytes());
    Ok(())
}

fn write_bytes(buffer: &mut Vec<u8>, bytes: &[u8]) {
    write_varuint32(buffer, bytes.len() as u32);
    buffer.extend_from_slice(bytes);
}

/// Seconds since the unix epoch for an `expiration` such as `2020-01-01T00:00:00`.
pub fn parse_expiration(expiration: &str) -> Result<u32, PackError> {
    let invalid = || PackError::InvalidExpiration {
        expiration: expiration.to_string(),
    };

    let trimmed = expiration.trim_end_matches('Z');
    let date_time =
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| invalid())?;

    u32::try_from(date_time.and_utc().timestamp()).map_err(|_| invalid())
}

fn action_data(action: &Action) -> Result<Vec<u8>, PackError> {
    let hex_data = match (&action.data, &action.hex_data) {
        (serde_json::Value::String(data), _) => data.as_str(),
        (_, Some(hex_data)) => hex_data.as_str(),
        (serde_json::Value::Null, None) => "",
        _ => {
            return Err(PackError::UnpackedActionData {
                account: action.account.to_string(),
                name: action.name.to_string(),
            });
        }
    };

    Ok(hex::decode(hex_data)?)
}

fn write_action(buffer: &mut Vec<u8>, action: &Action) -> Result<(), PackError> {
    write_name(buffer, &action.account)?;
    write_name(buffer, &action.name)?;

    write_varuint32(buffer, action.authorization.len() as u32);
    for level in &action.authorization {
        write_name(buffer, &level.actor)?;
        write_name(buffer, &level.permission)?;
    }

    write_bytes(buffer, &action_data(action)?);

    Ok(())
}

fn write_actions(buffer: &mut Vec<u8>, actions: &[Action]) -> Result<(), PackError> {
    write_varuint32(buffer, actions.len() as u32);
    for action in actions {
        write_action(buffer, action)?;
    }

    Ok(())
}

/// Serializes a structured transaction into its on-chain binary form.
pub fn pack_transaction(transaction: &Transaction) -> Result<Vec<u8>, PackError> {
    let missing = |field_name: &str| PackError::MissingHeaderField {
        field_name: field_name.to_string(),
    };

    let expiration = transaction
        .expiration
        .as_deref()
        .ok_or_else(|| missing("expiration"))?;
    let ref_block_num = transaction
        .ref_block_num
        .ok_or_else(|| missing("ref_block_num"))?;
    let ref_block_prefix = transaction
        .ref_block_prefix
        .ok_or_else(|| missing("ref_block_prefix"))?;

    let mut buffer = Vec::new();

    buffer.extend_from_slice(&parse_expiration(expiration)?.to_le_bytes());
    buffer.extend_from_slice(&ref_block_num.to_le_bytes());
    buffer.extend_from_slice(&ref_block_prefix.to_le_bytes());
    write_varuint32(&mut buffer, transaction.max_net_usage_words);
    buffer.push(transaction.max_cpu_usage_ms);
    write_varuint32(&mut buffer, transaction.delay_sec);

    write_actions(&mut buffer, &transaction.context_free_actions)?;
    write_actions(&mut buffer, &transaction.actions)?;

    write_varuint32(&mut buffer, transaction.transaction_extensions.len() as u32);
    for (extension_type, data) in &transaction.transaction_extensions {
        buffer.extend_from_slice(&extension_type.to_le_bytes());
        write_bytes(&mut buffer, &hex::decode(data)?);
    }

    Ok(buffer)
}

/// The transaction id is the sha256 of the packed transaction, hex encoded.
pub fn transaction_id(serialized_transaction: &[u8]) -> String {
    hex::encode(Sha256::digest(serialized_transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PermissionLevel;
    use serde_json::json;

    const TRANSFER_PACKED: &str = "00e10b5ed204efbeadde000000000100a6823403ea3055000000572d3ccdcd010000000000855c3400000000a8ed3232080000000000855c3400";
    const TRANSFER_ID: &str =
        "709c405f89d5fe42bbeac4f4f4b37966e5e6c00c19504c7cae8ef148a40321c6";

    fn transfer() -> Transaction {
        Transaction {
            expiration: Some("2020-01-01T00:00:00".to_string()),
            ref_block_num: Some(1234),
            ref_block_prefix: Some(0xdeadbeef),
            actions: vec![Action {
                account: "eosio.token".into(),
                name: "transfer".into(),
                authorization: vec![PermissionLevel::new("alice", "active")],
                data: json!("0000000000855c34"),
                hex_data: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_name_to_u64() {
        assert_eq!(name_to_u64("eosio").unwrap(), 6138663577826885632);
        assert_eq!(name_to_u64("eosio.token").unwrap(), 6138663591592764928);
        assert_eq!(name_to_u64("active").unwrap(), 3617214756542218240);
        assert_eq!(name_to_u64("").unwrap(), 0);
    }

    #[test]
    fn test_name_to_u64_rejects_invalid_names() {
        assert!(matches!(
            name_to_u64("Alice"),
            Err(PackError::InvalidName { .. })
        ));
        assert!(matches!(
            name_to_u64("abcdefghijklmn"),
            Err(PackError::InvalidName { .. })
        ));
        // 13th character out of the 4 bit range
        assert!(name_to_u64("aaaaaaaaaaaaz").is_err());
        assert!(name_to_u64("aaaaaaaaaaaaj").is_ok());
    }

    #[test]
    fn test_write_varuint32() {
        let mut buffer = vec![];
        write_varuint32(&mut buffer, 300);
        assert_eq!(buffer, vec![0xac, 0x02]);

        let mut buffer = vec![];
        write_varuint32(&mut buffer, 0);
        assert_eq!(buffer, vec![0]);
    }

    #[test]
    fn test_parse_expiration_accepts_fraction_and_zulu() {
        assert_eq!(parse_expiration("2020-01-01T00:00:00").unwrap(), 1577836800);
        assert_eq!(parse_expiration("2020-01-01T00:00:00.000").unwrap(), 1577836800);
        assert_eq!(parse_expiration("2020-01-01T00:00:00Z").unwrap(), 1577836800);
        assert!(parse_expiration("yesterday").is_err());
    }

    #[test]
    fn test_pack_transaction() {
        let packed = pack_transaction(&transfer()).unwrap();

        assert_eq!(hex::encode(&packed), TRANSFER_PACKED);
        assert_eq!(transaction_id(&packed), TRANSFER_ID);
    }

    #[test]
    fn test_pack_transaction_uses_hex_data() {
        let mut transaction = transfer();
        transaction.actions[0].data = json!({ "from": "alice" });
        transaction.actions[0].hex_data = Some("0000000000855c34".to_string());

        assert_eq!(
            hex::encode(pack_transaction(&transaction).unwrap()),
            TRANSFER_PACKED
        );
    }

    #[test]
    fn test_pack_transaction_errors() {
        let mut transaction = transfer();
        transaction.actions[0].data = json!({ "from": "alice" });
        assert_eq!(
            pack_transaction(&transaction),
            Err(PackError::UnpackedActionData {
                account: "eosio.token".to_string(),
                name: "transfer".to_string(),
            })
        );

        let mut transaction = transfer();
        transaction.ref_block_prefix = None;
        assert_eq!(
            pack_transaction(&transaction),
            Err(PackError::MissingHeaderField {
                field_name: "ref_block_prefix".to_string(),
            })
        );

        let mut transaction = transfer();
        transaction.actions[0].data = json!("0000000000855c3");
        assert_eq!(
            pack_transaction(&transaction),
            Err(PackError::HEXDeserialization(hex::FromHexError::OddLength))
        );
    }
}
