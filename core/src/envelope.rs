//! The backend's `{code, msg, data}` response envelope.
//!
//! Bodies are first read leniently into `RawEnvelope` (every field optional,
//! empty text reads as `{}`) and then decoded strictly into `Envelope`, which
//! rejects a missing `code` instead of carrying it forward.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The only envelope code that means success.
pub const SUCCESS_CODE: i64 = 20001;

/// Envelope fields as found on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub code: Option<i64>,
    /// Anything other than a string reads as no message.
    #[serde(default, deserialize_with = "text_or_none")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

fn text_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

impl RawEnvelope {
    /// Parse body text. Empty or whitespace-only text is an empty object.
    pub fn parse(text: &str) -> Result<Self, DecodeFailure> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| DecodeFailure::Malformed(e.to_string()))
    }
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Failure {
        code: i64,
        msg: Option<String>,
        data: Option<Value>,
    },
}

impl Envelope {
    pub fn decode(raw: RawEnvelope) -> Result<Self, DecodeFailure> {
        match raw.code {
            None => Err(DecodeFailure::MissingCode),
            Some(SUCCESS_CODE) => Ok(Envelope::Success(raw.data.unwrap_or(Value::Null))),
            Some(code) => Ok(Envelope::Failure {
                code,
                msg: raw.msg,
                data: raw.data,
            }),
        }
    }

    pub fn from_text(text: &str) -> Result<Self, DecodeFailure> {
        Self::decode(RawEnvelope::parse(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    #[error("envelope is not valid JSON: {0}")]
    Malformed(String),

    #[error("envelope has no code")]
    MissingCode,
}
