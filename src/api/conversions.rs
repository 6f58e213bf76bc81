//! Currency conversion endpoints (v4)
//!
//! A conversion is two calls: request a quote, then execute it by id.

use crate::api::{path_segment, QuoteAmount};
use crate::error::ClientError;
use crate::services::BitsoClient;
use serde::Serialize;
use serde_json::Value;

pub const CURRENCY_CONVERSIONS_PATH: &str = "/api/v4/currency_conversions";

/// Body of `POST /api/v4/currency_conversions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRequest {
    pub from_currency: String,
    pub to_currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spend_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_amount: Option<String>,
}

impl QuoteRequest {
    pub fn new(
        from_currency: impl Into<String>,
        to_currency: impl Into<String>,
        amount: QuoteAmount,
    ) -> Self {
        let (spend_amount, receive_amount) = match amount {
            QuoteAmount::Spend(v) => (Some(v), None),
            QuoteAmount::Receive(v) => (None, Some(v)),
        };
        Self {
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
            spend_amount,
            receive_amount,
        }
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.from_currency.trim().is_empty() || self.to_currency.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "source and target currencies are required".to_string(),
            ));
        }
        match (&self.spend_amount, &self.receive_amount) {
            (Some(_), Some(_)) => Err(ClientError::InvalidArgument(
                "spend and receive amounts cannot be used together".to_string(),
            )),
            (None, None) => Err(ClientError::InvalidArgument(
                "either a spend or a receive amount is required".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Path that executes quote `quote_id`
pub fn execute_quote_path(quote_id: &str) -> Result<String, ClientError> {
    Ok(format!(
        "{}/{}",
        CURRENCY_CONVERSIONS_PATH,
        path_segment("quote id", quote_id)?
    ))
}

/// `POST /api/v4/currency_conversions`, returning the quote id
pub async fn request_quote_v4(
    client: &BitsoClient,
    request: &QuoteRequest,
) -> Result<String, ClientError> {
    request.validate()?;

    let payload = client.post(CURRENCY_CONVERSIONS_PATH, request).await?;
    let quote_id = match payload.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(ClientError::Protocol(
                "quote response has no id".to_string(),
            ))
        }
    };

    tracing::debug!(quote_id = %quote_id, "Received conversion quote");
    Ok(quote_id)
}

/// `PUT /api/v4/currency_conversions/{quote_id}`
pub async fn execute_quote_v4(client: &BitsoClient, quote_id: &str) -> Result<Value, ClientError> {
    let path = execute_quote_path(quote_id)?;
    client.put::<Value>(&path, None).await
}

/// Request a quote and execute it immediately
pub async fn convert(client: &BitsoClient, request: &QuoteRequest) -> Result<Value, ClientError> {
    let quote_id = request_quote_v4(client, request).await?;
    execute_quote_v4(client, &quote_id).await
}
