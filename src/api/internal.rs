//! Quote, balance and funding endpoints

use crate::api::{path_segment, with_query, QuoteAmount};
use crate::error::ClientError;
use crate::services::BitsoClient;
use serde_json::Value;

pub const CONVERSION_QUOTE_PATH: &str = "/api/v3/conversion_quote";
/// Same endpoint routed without the `/api` prefix
pub const CONVERSION_QUOTE_SIMPLE_PATH: &str = "/v3/conversion_quote";
pub const WITHDRAWAL_METHODS_PATH: &str = "/api/v3/withdrawal_methods";
pub const COMBINED_BALANCE_PATH: &str = "/api/v3/combined_balance";

/// Path for a v3 conversion quote
pub fn conversion_quote_path(
    simple_path: bool,
    amount: &QuoteAmount,
    from_currency: &str,
    to_currency: &str,
) -> Result<String, ClientError> {
    let from_currency = path_segment("from currency", from_currency)?;
    let to_currency = path_segment("to currency", to_currency)?;
    let value = path_segment("amount", amount.value())?;

    let base = if simple_path {
        CONVERSION_QUOTE_SIMPLE_PATH
    } else {
        CONVERSION_QUOTE_PATH
    };
    let amount_key = match amount {
        QuoteAmount::Spend(_) => "from_amount",
        QuoteAmount::Receive(_) => "to_amount",
    };

    Ok(with_query(
        base,
        &[
            (amount_key, value),
            ("from_currency", from_currency),
            ("to_currency", to_currency),
        ],
    ))
}

/// Path for withdrawal methods, optionally narrowed to one currency
pub fn withdrawal_methods_path(currency: Option<&str>) -> Result<String, ClientError> {
    match currency.filter(|c| !c.trim().is_empty()) {
        Some(currency) => Ok(format!(
            "{}/{}",
            WITHDRAWAL_METHODS_PATH,
            path_segment("currency", currency)?
        )),
        None => Ok(WITHDRAWAL_METHODS_PATH.to_string()),
    }
}

/// `GET /api/v3/conversion_quote?...`
pub async fn conversion_quote(
    client: &BitsoClient,
    simple_path: bool,
    amount: &QuoteAmount,
    from_currency: &str,
    to_currency: &str,
) -> Result<Value, ClientError> {
    let path = conversion_quote_path(simple_path, amount, from_currency, to_currency)?;
    tracing::debug!(path = %path, "Requesting conversion quote");
    client.get(&path).await
}

/// `GET /api/v3/withdrawal_methods[/{currency}]`
pub async fn withdrawal_methods(
    client: &BitsoClient,
    currency: Option<&str>,
) -> Result<Value, ClientError> {
    let path = withdrawal_methods_path(currency)?;
    client.get(&path).await
}

/// `GET /api/v3/combined_balance`
pub async fn combined_balance(client: &BitsoClient) -> Result<Value, ClientError> {
    client.get(COMBINED_BALANCE_PATH).await
}
