//! Response envelope
//!
//! Every API response is wrapped as either
//! `{"success": true, "payload": ...}` or
//! `{"success": false, "error": {"code": ..., "message": ...}}`.

use crate::error::ClientError;
use serde_json::{json, Value};
use thiserror::Error;

/// Code reported when a failure envelope carries no error code
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// Message reported when a failure envelope carries no error message
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// A well-formed response envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success { payload: Value },
    Failure { code: String, message: String },
}

/// Reasons a body is not a well-formed envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("response envelope has no boolean 'success' field")]
    MissingSuccess,

    #[error("success envelope has no 'payload' field")]
    MissingPayload,
}

impl Envelope {
    /// Parse a raw response body
    pub fn parse(raw: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Interpret an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut map) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        match map.get("success").and_then(Value::as_bool) {
            Some(true) => {
                let payload = map.remove("payload").ok_or(EnvelopeError::MissingPayload)?;
                Ok(Envelope::Success { payload })
            }
            Some(false) => {
                let error = map.remove("error").unwrap_or(Value::Null);
                Ok(Envelope::Failure {
                    code: error_code(&error),
                    message: error_message(&error),
                })
            }
            None => Err(EnvelopeError::MissingSuccess),
        }
    }

    /// Serialize back into the wire shape
    pub fn to_value(&self) -> Value {
        match self {
            Envelope::Success { payload } => json!({ "success": true, "payload": payload }),
            Envelope::Failure { code, message } => json!({
                "success": false,
                "error": { "code": code, "message": message },
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// Convert into the caller-facing result
    pub fn into_result(self) -> Result<Value, ClientError> {
        match self {
            Envelope::Success { payload } => Ok(payload),
            Envelope::Failure { code, message } => Err(ClientError::Api { code, message }),
        }
    }
}

impl From<EnvelopeError> for ClientError {
    fn from(err: EnvelopeError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

fn error_code(error: &Value) -> String {
    match error.get("code") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => UNKNOWN_ERROR_CODE.to_string(),
    }
}

fn error_message(error: &Value) -> String {
    match error.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Null) | None => UNKNOWN_ERROR_MESSAGE.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let env = Envelope::parse(br#"{"success": true, "payload": {"id": "abc"}}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Success {
                payload: json!({"id": "abc"})
            }
        );
        assert!(env.is_success());
    }

    #[test]
    fn test_success_with_null_payload_is_kept() {
        let env = Envelope::parse(br#"{"success": true, "payload": null}"#).unwrap();
        assert_eq!(env, Envelope::Success { payload: Value::Null });
    }

    #[test]
    fn test_success_without_payload_is_error() {
        let err = Envelope::parse(br#"{"success": true}"#).unwrap_err();
        assert_eq!(err, EnvelopeError::MissingPayload);
    }

    #[test]
    fn test_failure_envelope() {
        let env = Envelope::parse(
            br#"{"success": false, "error": {"code": "105", "message": "insufficient funds"}}"#,
        )
        .unwrap();
        assert_eq!(
            env,
            Envelope::Failure {
                code: "105".into(),
                message: "insufficient funds".into(),
            }
        );
    }

    #[test]
    fn test_failure_numeric_code_is_stringified() {
        let env =
            Envelope::parse(br#"{"success": false, "error": {"code": 301, "message": "x"}}"#)
                .unwrap();
        assert_eq!(
            env,
            Envelope::Failure {
                code: "301".into(),
                message: "x".into(),
            }
        );
    }

    #[test]
    fn test_failure_defaults() {
        let env = Envelope::parse(br#"{"success": false}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Failure {
                code: UNKNOWN_ERROR_CODE.into(),
                message: UNKNOWN_ERROR_MESSAGE.into(),
            }
        );
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            Envelope::parse(b"<html>bad gateway</html>"),
            Err(EnvelopeError::InvalidJson(_))
        ));
        assert_eq!(Envelope::parse(b"[1, 2]"), Err(EnvelopeError::NotAnObject));
        assert_eq!(
            Envelope::parse(br#"{"payload": {}}"#),
            Err(EnvelopeError::MissingSuccess)
        );
        assert_eq!(
            Envelope::parse(br#"{"success": "yes", "payload": {}}"#),
            Err(EnvelopeError::MissingSuccess)
        );
    }

    #[test]
    fn test_round_trip_payloads() {
        let payloads = [
            json!({"id": "q1", "rate": "123.45", "nested": {"list": [1, 2, 3]}}),
            json!([{"book": "btc_mxn"}, {"book": "eth_mxn"}]),
            json!("plain string"),
            json!(0),
        ];

        for payload in payloads {
            let env = Envelope::Success {
                payload: payload.clone(),
            };
            let raw = serde_json::to_vec(&env.to_value()).unwrap();
            assert_eq!(Envelope::parse(&raw).unwrap(), env);
        }
    }

    #[test]
    fn test_into_result() {
        let ok = Envelope::Success { payload: json!(1) }.into_result().unwrap();
        assert_eq!(ok, json!(1));

        let err = Envelope::Failure {
            code: "105".into(),
            message: "insufficient funds".into(),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.api_code(), Some("105"));
    }

    #[test]
    fn test_envelope_error_converts_to_protocol() {
        let err: ClientError = EnvelopeError::MissingPayload.into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
