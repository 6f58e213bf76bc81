//! Endpoint wrappers
//!
//! Thin request builders over [`BitsoClient`](crate::services::BitsoClient).
//! Each function builds the request path (and JSON body where needed),
//! validates arguments locally and returns the success payload.

pub mod conversions;
pub mod internal;
pub mod onboarding;
pub mod public;

use crate::error::ClientError;

/// Amount side of a conversion quote: how much to spend, or how much to receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteAmount {
    Spend(String),
    Receive(String),
}

impl QuoteAmount {
    /// Pick exactly one of `spend` / `receive`; empty strings count as absent
    pub fn from_options(
        spend: Option<String>,
        receive: Option<String>,
    ) -> Result<Self, ClientError> {
        let spend = spend.filter(|s| !s.trim().is_empty());
        let receive = receive.filter(|s| !s.trim().is_empty());

        match (spend, receive) {
            (Some(spend), None) => Ok(QuoteAmount::Spend(spend)),
            (None, Some(receive)) => Ok(QuoteAmount::Receive(receive)),
            (Some(_), Some(_)) => Err(ClientError::InvalidArgument(
                "spend and receive amounts cannot be used together".to_string(),
            )),
            (None, None) => Err(ClientError::InvalidArgument(
                "either a spend or a receive amount is required".to_string(),
            )),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            QuoteAmount::Spend(v) | QuoteAmount::Receive(v) => v,
        }
    }
}

/// Append `key=value` pairs to `path` as a query string
pub(crate) fn with_query(path: impl Into<String>, params: &[(&str, &str)]) -> String {
    let mut path = path.into();
    if params.is_empty() {
        return path;
    }

    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    path.push('?');
    path.push_str(&query.join("&"));
    path
}

/// Accept only unreserved ASCII (`A-Z a-z 0-9 - . _ ~`), so the value is
/// sent exactly as it was signed
pub(crate) fn path_segment<'a>(name: &str, value: &'a str) -> Result<&'a str, ClientError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::InvalidArgument(format!("{name} is empty")));
    }
    if value == "." || value == ".." {
        return Err(ClientError::InvalidArgument(format!(
            "{name} cannot be a dot segment"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
    {
        return Err(ClientError::InvalidArgument(format!(
            "{name} contains characters outside [A-Za-z0-9._~-]: {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording transport shared by the endpoint tests

    use crate::error::TransportError;
    use crate::services::{
        BitsoClient, Credential, CredentialPool, RawResponse, SignedRequest, Transport,
    };
    use crate::utils::presets;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// Answers every request with the same success payload
    pub struct RecordingTransport {
        payload: Value,
        requests: Mutex<Vec<SignedRequest>>,
    }

    impl RecordingTransport {
        pub fn requests(&self) -> Vec<SignedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn last_body_json(&self) -> Value {
            let requests = self.requests();
            let last = requests.last().unwrap();
            serde_json::from_slice(&last.body).unwrap()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: &SignedRequest) -> Result<RawResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            let body = serde_json::json!({"success": true, "payload": self.payload});
            Ok(RawResponse::new(200, serde_json::to_vec(&body).unwrap()))
        }
    }

    /// Client wired to a recording transport that returns `payload`
    pub fn recording_client(payload: Value) -> (BitsoClient, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport {
            payload,
            requests: Mutex::new(Vec::new()),
        });
        let pool = CredentialPool::single(Credential::new("key", "secret")).unwrap();
        let client = BitsoClient::builder("https://api.test", pool)
            .with_transport(transport.clone())
            .with_retry_policy(presets::single_attempt())
            .build()
            .unwrap();
        (client, transport)
    }
}
