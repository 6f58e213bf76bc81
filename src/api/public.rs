//! Account and trading endpoints

use crate::error::ClientError;
use crate::services::BitsoClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACCOUNT_STATUS_PATH: &str = "/api/v3/account_status";
pub const CATALOGUES_PATH: &str = "/api/v3/catalogues";
pub const ORDERS_PATH: &str = "/api/v3/orders";

/// Prefix of the client-generated order id used when none is supplied
pub const DEFAULT_ORIGIN_PREFIX: &str = "filler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Body of `POST /api/v3/orders`
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrder {
    pub book: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub origin_id: String,
}

impl PlaceOrder {
    pub fn new(book: impl Into<String>, side: OrderSide, order_type: OrderType) -> Self {
        Self {
            book: book.into(),
            side,
            order_type,
            major: None,
            minor: None,
            price: None,
            origin_id: default_origin_id(),
        }
    }

    /// Amount in the book's major currency
    pub fn with_major(mut self, major: impl Into<String>) -> Self {
        self.major = non_empty(major.into());
        self
    }

    /// Amount in the book's minor currency
    pub fn with_minor(mut self, minor: impl Into<String>) -> Self {
        self.minor = non_empty(minor.into());
        self
    }

    /// Limit price
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = non_empty(price.into());
        self
    }

    /// Client order id; an empty id keeps the generated default
    pub fn with_origin_id(mut self, origin_id: impl Into<String>) -> Self {
        if let Some(id) = non_empty(origin_id.into()) {
            self.origin_id = id;
        }
        self
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.book.trim().is_empty() {
            return Err(ClientError::InvalidArgument("book is empty".to_string()));
        }
        if self.major.is_none() && self.minor.is_none() {
            return Err(ClientError::InvalidArgument(
                "either major or minor amount is required".to_string(),
            ));
        }
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(ClientError::InvalidArgument(
                "limit orders require a price".to_string(),
            ));
        }
        Ok(())
    }
}

/// `filler<unix millis>`
pub fn default_origin_id() -> String {
    format!(
        "{}{}",
        DEFAULT_ORIGIN_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// `GET /api/v3/account_status`
pub async fn account_status(client: &BitsoClient) -> Result<Value, ClientError> {
    client.get(ACCOUNT_STATUS_PATH).await
}

/// `GET /api/v3/catalogues`
pub async fn catalogues(client: &BitsoClient) -> Result<Value, ClientError> {
    client.get(CATALOGUES_PATH).await
}

/// `POST /api/v3/orders`
pub async fn place_order(client: &BitsoClient, order: &PlaceOrder) -> Result<Value, ClientError> {
    order.validate()?;
    tracing::debug!(book = %order.book, origin_id = %order.origin_id, "Placing order");
    client.post(ORDERS_PATH, order).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::recording_client;
    use crate::services::HttpMethod;
    use serde_json::json;

    #[test]
    fn test_place_order_serialization() {
        let order = PlaceOrder::new("btc_mxn", OrderSide::Buy, OrderType::Limit)
            .with_major("0.01")
            .with_minor("")
            .with_price("500000")
            .with_origin_id("abc");

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(
            value,
            json!({
                "book": "btc_mxn",
                "side": "buy",
                "type": "limit",
                "major": "0.01",
                "price": "500000",
                "origin_id": "abc"
            })
        );
    }

    #[test]
    fn test_default_origin_id() {
        let order = PlaceOrder::new("btc_mxn", OrderSide::Sell, OrderType::Market)
            .with_origin_id("  ");
        assert!(order.origin_id.starts_with(DEFAULT_ORIGIN_PREFIX));
        let millis = &order.origin_id[DEFAULT_ORIGIN_PREFIX.len()..];
        assert!(millis.parse::<u64>().is_ok());
    }

    #[test]
    fn test_validate_order() {
        let order = PlaceOrder::new("btc_mxn", OrderSide::Buy, OrderType::Market);
        assert!(order.validate().is_err());

        let order = order.with_minor("100");
        assert!(order.validate().is_ok());

        let order = PlaceOrder::new("btc_mxn", OrderSide::Buy, OrderType::Limit).with_major("1");
        assert!(order.validate().is_err());
    }

    #[tokio::test]
    async fn test_account_status_request() {
        let (client, transport) = recording_client(json!({"status": "active"}));

        let payload = account_status(&client).await.unwrap();
        assert_eq!(payload["status"], "active");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].path, ACCOUNT_STATUS_PATH);
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_place_order_request() {
        let (client, transport) = recording_client(json!({"oid": "xyz"}));
        let order = PlaceOrder::new("eth_mxn", OrderSide::Sell, OrderType::Market)
            .with_major("0.5")
            .with_origin_id("my-order");

        let payload = place_order(&client, &order).await.unwrap();
        assert_eq!(payload["oid"], "xyz");

        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].path, ORDERS_PATH);
        assert_eq!(transport.last_body_json()["origin_id"], "my-order");
        assert_eq!(transport.last_body_json()["type"], "market");
    }

    #[tokio::test]
    async fn test_invalid_order_not_sent() {
        let (client, transport) = recording_client(json!({}));
        let order = PlaceOrder::new("", OrderSide::Buy, OrderType::Market).with_major("1");

        let err = place_order(&client, &order).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(transport.requests().is_empty());
    }
}
