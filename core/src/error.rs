//! Error types for the envelope client.
//!
//! # Design
//! Every failed call produces exactly one `ApiError`. The variant says which
//! path produced it; the shared `ErrorDetail` carries the message, HTTP status,
//! envelope code and optional payload so callers that only care about
//! `http_status()`/`code()` never need to match on the variant.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::RawEnvelope;

/// Code reported for failures that never produced a usable envelope.
pub const TRANSPORT_CODE: i64 = -1;

pub const MSG_CONNECTION_FAILED: &str = "网络请求失败或被中断，请检查后端服务是否已启动";
pub const MSG_NOT_JSON: &str = "响应不是 JSON";
pub const MSG_REQUEST_FAILED: &str = "请求失败";
pub const MSG_BUSINESS_FAILED: &str = "业务失败";
pub const MSG_DOWNLOAD_FAILED: &str = "下载失败";

/// Payload shared by every `ApiError` variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub message: String,
    /// `0` when no response was received.
    pub http_status: u16,
    pub code: i64,
    pub data: Option<Value>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>, http_status: u16, code: i64, data: Option<Value>) -> Self {
        Self {
            message: message.into(),
            http_status,
            code,
            data,
        }
    }
}

/// A failed call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No usable response: the connection failed or the body was not JSON.
    #[error("{}", .0.message)]
    Transport(ErrorDetail),

    /// HTTP status >= 400.
    #[error("{}", .0.message)]
    Http(ErrorDetail),

    /// HTTP success, but the envelope code is not the success sentinel.
    #[error("{}", .0.message)]
    Business(ErrorDetail),

    /// The body claimed to be JSON but did not decode as an envelope, or a
    /// payload could not be (de)serialized.
    #[error("{}", .0.message)]
    Codec(ErrorDetail),
}

impl ApiError {
    /// Connection failure (`status == 0`) or a non-JSON response.
    pub fn transport(http_status: u16, body_text: String) -> Self {
        let message = if http_status == 0 {
            MSG_CONNECTION_FAILED
        } else {
            MSG_NOT_JSON
        };
        let data = (!body_text.is_empty()).then_some(Value::String(body_text));
        ApiError::Transport(ErrorDetail::new(message, http_status, TRANSPORT_CODE, data))
    }

    /// Error status with a JSON body. Missing or zero codes fall back to the
    /// HTTP status, a missing message to `fallback`.
    pub fn http(http_status: u16, envelope: &RawEnvelope, fallback: &str) -> Self {
        let code = envelope
            .code
            .filter(|code| *code != 0)
            .unwrap_or(i64::from(http_status));
        ApiError::Http(ErrorDetail::new(
            non_empty_or(envelope.msg.as_deref(), fallback),
            http_status,
            code,
            envelope.data.clone(),
        ))
    }

    /// The status line arrived but the body could not be read in full.
    pub fn interrupted(http_status: u16) -> Self {
        ApiError::Transport(ErrorDetail::new(MSG_CONNECTION_FAILED, http_status, TRANSPORT_CODE, None))
    }

    /// Error status without a structured payload.
    pub fn http_bare(http_status: u16, message: &str) -> Self {
        ApiError::Http(ErrorDetail::new(message, http_status, i64::from(http_status), None))
    }

    pub fn business(http_status: u16, code: i64, msg: Option<&str>, data: Option<Value>) -> Self {
        ApiError::Business(ErrorDetail::new(
            non_empty_or(msg, MSG_BUSINESS_FAILED),
            http_status,
            code,
            data,
        ))
    }

    pub fn codec(http_status: u16, reason: impl Into<String>) -> Self {
        ApiError::Codec(ErrorDetail::new(reason, http_status, TRANSPORT_CODE, None))
    }

    pub fn detail(&self) -> &ErrorDetail {
        match self {
            ApiError::Transport(detail)
            | ApiError::Http(detail)
            | ApiError::Business(detail)
            | ApiError::Codec(detail) => detail,
        }
    }

    pub fn message(&self) -> &str {
        &self.detail().message
    }

    pub fn http_status(&self) -> u16 {
        self.detail().http_status
    }

    pub fn code(&self) -> i64 {
        self.detail().code
    }

    pub fn data(&self) -> Option<&Value> {
        self.detail().data.as_ref()
    }

    /// Replace a blank message with `fallback`, keeping everything else.
    pub fn with_fallback_message(mut self, fallback: &str) -> Self {
        let detail = match &mut self {
            ApiError::Transport(detail)
            | ApiError::Http(detail)
            | ApiError::Business(detail)
            | ApiError::Codec(detail) => detail,
        };
        if detail.message.trim().is_empty() {
            detail.message = fallback.to_string();
        }
        self
    }

    /// The error's message, or `fallback` when it is blank.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let message = self.message();
        if message.trim().is_empty() {
            fallback
        } else {
            message
        }
    }
}

fn non_empty_or(msg: Option<&str>, fallback: &str) -> String {
    match msg {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => fallback.to_string(),
    }
}

/// Failures of the key/value storage behind the credential store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage contents malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// The transport could not obtain a complete response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure (status {status}): {reason}")]
pub struct TransportFailure {
    /// Status received before the failure, `0` if none arrived.
    pub status: u16,
    pub reason: String,
}

impl TransportFailure {
    /// Nothing came back: refused, reset before headers, DNS, timeout.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            status: 0,
            reason: reason.into(),
        }
    }

    /// Headers arrived, the body did not.
    pub fn interrupted(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_messages_depend_on_status() {
        let err = ApiError::transport(0, String::new());
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.message(), MSG_CONNECTION_FAILED);
        assert_eq!(err.code(), -1);
        assert_eq!(err.data(), None);

        let err = ApiError::transport(502, "<html>bad gateway</html>".to_string());
        assert_eq!(err.message(), MSG_NOT_JSON);
        assert_eq!(err.http_status(), 502);
        assert_eq!(err.data(), Some(&json!("<html>bad gateway</html>")));
    }

    #[test]
    fn interrupted_body_keeps_received_status() {
        let err = ApiError::interrupted(200);
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.http_status(), 200);
        assert_eq!(err.code(), TRANSPORT_CODE);
        assert_eq!(err.message(), MSG_CONNECTION_FAILED);
        assert_eq!(err.data(), None);
    }

    #[test]
    fn http_uses_envelope_fields() {
        let envelope = RawEnvelope {
            code: Some(5),
            msg: Some("bad".to_string()),
            data: Some(json!({"x": 1})),
        };
        let err = ApiError::http(400, &envelope, MSG_REQUEST_FAILED);
        assert_eq!(err.code(), 5);
        assert_eq!(err.message(), "bad");
        assert_eq!(err.data(), Some(&json!({"x": 1})));
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn http_falls_back_to_status() {
        let err = ApiError::http(503, &RawEnvelope::default(), MSG_REQUEST_FAILED);
        assert_eq!(err.code(), 503);
        assert_eq!(err.message(), MSG_REQUEST_FAILED);

        let zero = RawEnvelope {
            code: Some(0),
            msg: Some(String::new()),
            data: None,
        };
        assert_eq!(ApiError::http(404, &zero, MSG_REQUEST_FAILED).code(), 404);
    }

    #[test]
    fn business_keeps_code_and_fallback_message() {
        let err = ApiError::business(200, 40001, None, None);
        assert_eq!(err.code(), 40001);
        assert_eq!(err.http_status(), 200);
        assert_eq!(err.message(), MSG_BUSINESS_FAILED);
    }

    #[test]
    fn message_or_prefers_own_message() {
        let err = ApiError::business(200, 1, Some("用户名或密码错误"), None);
        assert_eq!(err.message_or("登录失败"), "用户名或密码错误");
        let blank = ApiError::Http(ErrorDetail::new(" ", 500, 500, None));
        assert_eq!(blank.message_or("登录失败"), "登录失败");

        let replaced = blank.with_fallback_message("注册失败");
        assert_eq!(replaced.message(), "注册失败");
        assert_eq!(replaced.code(), 500);
    }
}
