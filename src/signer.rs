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

use crate::error::AnchorError;
use crate::options::TransactOptions;
use crate::packing::{pack_transaction, transaction_id};
use crate::session::Session;
use crate::types::Transaction;
use crate::wallet_link::LinkSession;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical outcome of a signing request, whatever the signer answered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransactionResult {
    /// Lowercase hex sha256 of `serialized_transaction`, unless the signer reported
    /// another one.
    pub transaction_id: String,
    pub serialized_transaction: Vec<u8>,
    pub signatures: Vec<String>,
    /// Whether the signer pushed the transaction to the chain.
    pub broadcast: bool,
}

#[derive(Deserialize)]
struct Processed {
    #[serde(default)]
    id: Option<String>,
}

/// Response already wrapped by an authenticator layer.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WrappedResult {
    was_broadcast: bool,
    #[serde(default)]
    transaction_id: Option<String>,
    transaction: Value,
}

/// `push_transaction` request form.
#[derive(Deserialize)]
struct PackedResult {
    signatures: Value,
    #[serde(default)]
    compression: Value,
    packed_trx: String,
    #[serde(default)]
    processed: Option<Processed>,
}

/// What anchor-link and eosjs hand back from `transact`.
#[derive(Deserialize)]
struct SignedResult {
    signatures: Value,
    #[serde(default, rename = "serializedTransaction")]
    serialized_transaction: Option<Value>,
    #[serde(default)]
    transaction: Option<Value>,
    #[serde(default)]
    processed: Option<Processed>,
    #[serde(default, alias = "transactionId")]
    transaction_id: Option<String>,
}

// Order matters: a packed result would also deserialize as a signed one.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSignResult {
    Wrapped(WrappedResult),
    Packed(PackedResult),
    Signed(SignedResult),
}

fn describe_fields(raw: &Value) -> String {
    match raw {
        Value::Object(map) if map.is_empty() => "none".to_string(),
        Value::Object(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(_) => "an array".to_string(),
    }
}

fn byte_from_value(value: &Value) -> Result<u8, AnchorError> {
    value
        .as_u64()
        .and_then(|byte| u8::try_from(byte).ok())
        .ok_or_else(|| AnchorError::signing(format!("Invalid byte {value} in serialized transaction")))
}

/// Serialized transactions show up as hex strings, plain byte arrays, Node buffers
/// (`{"type": "Buffer", "data": [..]}`) or index-keyed objects (`{"0": .., "1": ..}`).
fn bytes_from_value(value: &Value) -> Result<Vec<u8>, AnchorError> {
    let bytes = match value {
        Value::String(hex_string) => hex::decode(hex_string).map_err(|err| {
            AnchorError::signing_caused_by("Invalid hex in serialized transaction", err)
        })?,
        Value::Array(items) => items
            .iter()
            .map(byte_from_value)
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("Buffer") => {
            let data = map.get("data").ok_or_else(|| {
                AnchorError::signing("Serialized transaction buffer has no data")
            })?;
            bytes_from_value(data)?
        }
        Value::Object(map) => {
            let mut indexed = map
                .iter()
                .map(|(index, byte)| {
                    let index = index.parse::<usize>().map_err(|_| {
                        AnchorError::signing(format!(
                            "Invalid index {index} in serialized transaction"
                        ))
                    })?;
                    Ok((index, byte_from_value(byte)?))
                })
                .collect::<Result<Vec<_>, AnchorError>>()?;

            indexed.sort_by_key(|(index, _)| *index);

            if indexed
                .iter()
                .enumerate()
                .any(|(position, (index, _))| position != *index)
            {
                return Err(AnchorError::signing(
                    "Serialized transaction indices are not contiguous",
                ));
            }

            indexed.into_iter().map(|(_, byte)| byte).collect()
        }
        other => {
            return Err(AnchorError::signing(format!(
                "Unexpected serialized transaction {other}"
            )));
        }
    };

    if bytes.is_empty() {
        return Err(AnchorError::signing("Serialized transaction is empty"));
    }

    Ok(bytes)
}

fn flatten_signatures(value: &Value, signatures: &mut Vec<String>) -> Result<(), AnchorError> {
    match value {
        Value::String(signature) => signatures.push(signature.clone()),
        Value::Array(items) => {
            for item in items {
                flatten_signatures(item, signatures)?;
            }
        }
        Value::Object(map) => match map.get("signature").or_else(|| map.get("sig")) {
            Some(Value::String(signature)) => signatures.push(signature.clone()),
            _ => {
                return Err(AnchorError::signing(format!(
                    "Unexpected signature entry {value}"
                )));
            }
        },
        other => {
            return Err(AnchorError::signing(format!(
                "Unexpected signature entry {other}"
            )));
        }
    }

    Ok(())
}

fn signatures_from_value(value: &Value) -> Result<Vec<String>, AnchorError> {
    let mut signatures = vec![];
    flatten_signatures(value, &mut signatures)?;

    if signatures.is_empty() {
        return Err(AnchorError::signing("Signer returned no signature"));
    }

    Ok(signatures)
}

fn resolve_transaction_id(reported: Option<String>, serialized_transaction: &[u8]) -> String {
    let derived = transaction_id(serialized_transaction);

    match reported {
        Some(reported) => {
            let reported = reported.to_ascii_lowercase();
            if reported != derived {
                warn!("signer reported transaction id {reported}, serialized transaction hashes to {derived}");
            }
            reported
        }
        None => derived,
    }
}

fn is_uncompressed(compression: &Value) -> bool {
    match compression {
        Value::Null => true,
        Value::Number(number) => number.as_u64() == Some(0),
        Value::String(name) => name == "none",
        _ => false,
    }
}

fn normalize(raw: Value, allow_wrapped: bool) -> Result<SignedTransactionResult, AnchorError> {
    let fields = describe_fields(&raw);
    let parsed: RawSignResult = serde_json::from_value(raw).map_err(|_| {
        AnchorError::signing(format!("Unrecognized signing response (fields: {fields})"))
    })?;

    match parsed {
        RawSignResult::Wrapped(wrapped) => {
            if !allow_wrapped {
                return Err(AnchorError::signing(
                    "Unrecognized signing response: nested wrapped result",
                ));
            }

            let mut result = normalize(wrapped.transaction, false)?;
            result.broadcast = wrapped.was_broadcast;
            if wrapped.transaction_id.is_some() {
                result.transaction_id =
                    resolve_transaction_id(wrapped.transaction_id, &result.serialized_transaction);
            }

            Ok(result)
        }
        RawSignResult::Packed(packed) => {
            if !is_uncompressed(&packed.compression) {
                return Err(AnchorError::signing(format!(
                    "Compressed transactions are not supported (compression: {})",
                    packed.compression
                )));
            }

            let serialized_transaction = bytes_from_value(&Value::String(packed.packed_trx))?;
            let broadcast = packed.processed.is_some();
            let reported_id = packed.processed.and_then(|processed| processed.id);

            Ok(SignedTransactionResult {
                transaction_id: resolve_transaction_id(reported_id, &serialized_transaction),
                signatures: signatures_from_value(&packed.signatures)?,
                serialized_transaction,
                broadcast,
            })
        }
        RawSignResult::Signed(signed) => {
            let serialized_transaction = match (signed.serialized_transaction, signed.transaction) {
                (Some(serialized), _) => bytes_from_value(&serialized)?,
                (None, Some(transaction)) => {
                    let transaction: Transaction =
                        serde_json::from_value(transaction).map_err(|err| {
                            AnchorError::signing_caused_by("Invalid structured transaction", err)
                        })?;

                    pack_transaction(&transaction).map_err(|err| {
                        AnchorError::signing_caused_by("Unable to pack signed transaction", err)
                    })?
                }
                (None, None) => {
                    return Err(AnchorError::signing(
                        "Signing response carries neither a serialized nor a structured transaction",
                    ));
                }
            };

            let broadcast = signed.processed.is_some();
            let reported_id = signed
                .transaction_id
                .or_else(|| signed.processed.and_then(|processed| processed.id));

            Ok(SignedTransactionResult {
                transaction_id: resolve_transaction_id(reported_id, &serialized_transaction),
                signatures: signatures_from_value(&signed.signatures)?,
                serialized_transaction,
                broadcast,
            })
        }
    }
}

/// Adapts any known signer response into a [`SignedTransactionResult`].
///
/// Accepted shapes, tried in order:
/// - wrapped: `{ wasBroadcast, transactionId?, transaction }` around one of the next two;
/// - packed: `{ signatures, compression, packed_trx, processed? }`;
/// - signed: `{ signatures, serializedTransaction?, transaction?, processed?, transaction_id? }`.
///
/// Anything else is a [`AnchorError::Signing`] naming the fields that were seen.
pub fn normalize_sign_result(raw: Value) -> Result<SignedTransactionResult, AnchorError> {
    normalize(raw, true)
}

/// Signs transactions with one session.
///
/// The signer owns its own [`Session`] handle, so a logout happening while a request
/// is pending does not affect it.
pub struct TransactionSigner<L: LinkSession> {
    session: Session<L>,
}

impl<L: LinkSession> TransactionSigner<L> {
    pub fn new(session: Session<L>) -> Self {
        Self { session }
    }

    pub async fn sign_transaction(
        &self,
        transaction: &Transaction,
        options: &TransactOptions,
    ) -> Result<SignedTransactionResult, AnchorError> {
        debug!(
            "signing transaction with {} actions as {} (broadcast: {})",
            transaction.actions.len(),
            self.session.auth(),
            options.broadcast
        );

        let raw = self
            .session
            .link_session()
            .transact(transaction, options)
            .await
            .map_err(|err| {
                let message = match err.to_string() {
                    message if message.is_empty() => "Unable to sign transaction".to_string(),
                    message => message,
                };
                AnchorError::signing_caused_by(message, err)
            })?;

        let result = normalize_sign_result(raw)?;

        if options.broadcast && !result.broadcast {
            warn!(
                "broadcast was requested but transaction {} was only signed",
                result.transaction_id
            );
        }

        Ok(result)
    }

    pub async fn sign_arbitrary(
        &self,
        _public_key: &str,
        _data: &str,
        _help_text: &str,
    ) -> Result<String, AnchorError> {
        Err(AnchorError::unsupported(
            "Anchor does not currently support signArbitrary",
        ))
    }

    pub async fn verify_key_ownership(&self, _challenge: &str) -> Result<bool, AnchorError> {
        Err(AnchorError::unsupported(
            "Anchor does not currently support verifyKeyOwnership",
        ))
    }
}
