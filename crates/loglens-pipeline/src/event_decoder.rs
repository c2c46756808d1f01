//! Push-envelope decoding for inbound log events.
//!
//! A push delivery wraps the log entry twice: an outer JSON envelope whose
//! `message.data` field holds the base64 of the entry's JSON. Each layer fails
//! with its own [`EventDecodeError`] variant so the boundary can report which
//! one was malformed.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LogRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PushEnvelope {
    message: PushMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscription: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PushMessage {
    #[serde(default)]
    data: String,
    #[serde(default)]
    attributes: Option<BTreeMap<String, String>>,
    #[serde(
        rename = "messageId",
        alias = "message_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// A fully decoded push delivery.
pub struct DecodedPushEvent {
    pub record: LogRecord,
    pub attributes: BTreeMap<String, String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Error)]
/// Enumerates supported `EventDecodeError` values.
pub enum EventDecodeError {
    #[error("invalid push envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),
    #[error("invalid base64 message data: {0}")]
    InvalidBase64(#[source] base64::DecodeError),
    #[error("invalid log record payload: {0}")]
    InvalidLogRecord(#[source] serde_json::Error),
}

impl EventDecodeError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidEnvelope(_) => "invalid_envelope",
            Self::InvalidBase64(_) => "invalid_base64",
            Self::InvalidLogRecord(_) => "invalid_log_record",
        }
    }
}

pub fn decode_push_event(body: &[u8]) -> Result<DecodedPushEvent, EventDecodeError> {
    let envelope: PushEnvelope =
        serde_json::from_slice(body).map_err(EventDecodeError::InvalidEnvelope)?;
    let data = BASE64_STANDARD
        .decode(envelope.message.data.as_bytes())
        .map_err(EventDecodeError::InvalidBase64)?;
    // A JSON `null` entry decodes to an empty record.
    let record = serde_json::from_slice::<Option<LogRecord>>(&data)
        .map_err(EventDecodeError::InvalidLogRecord)?
        .unwrap_or_default();

    Ok(DecodedPushEvent {
        record,
        attributes: envelope.message.attributes.unwrap_or_default(),
        message_id: envelope.message.message_id,
    })
}

/// Wraps `record` the way a push transport delivers it.
pub fn encode_push_event(
    record: &LogRecord,
    attributes: &BTreeMap<String, String>,
) -> Result<Vec<u8>, serde_json::Error> {
    let data = BASE64_STANDARD.encode(serde_json::to_vec(record)?);
    let envelope = PushEnvelope {
        message: PushMessage {
            data,
            attributes: Some(attributes.clone()),
            message_id: None,
        },
        subscription: None,
    };
    serde_json::to_vec(&envelope)
}
