//! HTTP implementation of the exchange client against the CLOB API.

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::{
    ExchangeClient, MarketRecord, OpenOrderRecord, OrderFilter, TradeFilter, TradeRecord,
};
use crate::config::Config;
use crate::error::ExchangeError;
use crate::signing;
use crate::trading::order::{OrderArgs, Side, SignedOrder, TimeInForce};

/// Cap on rejection text kept from upstream bodies.
const BODY_TRUNCATE: usize = 500;

/// CLOB API client.
#[derive(Debug, Clone)]
pub struct ClobClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for the CLOB API.
    clob_base: String,
    /// Wallet private key; absent in alert-only deployments.
    private_key: Option<String>,
}

impl ClobClient {
    /// Create a new client from config with low-latency HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            clob_base: config.clob_base().to_string(),
            private_key: config.pk.clone(),
        }
    }

    fn private_key(&self) -> Result<&str, ExchangeError> {
        self.private_key
            .as_deref()
            .ok_or_else(|| ExchangeError::Auth("PK is required for trading calls".to_string()))
    }

    async fn auth_headers(&self) -> Result<Vec<(String, String)>, ExchangeError> {
        signing::generate_auth_headers(self.private_key()?).await
    }

    async fn get_value(
        &self,
        url: &str,
        query: &[(&str, String)],
        authed: bool,
    ) -> Result<Value, ExchangeError> {
        let mut request = self.http.get(url).query(query);
        if authed {
            for (key, value) in self.auth_headers().await? {
                request = request.header(&key, &value);
            }
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = truncate(&response.text().await.unwrap_or_default());
            return Err(ExchangeError::BadStatus { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ExchangeError::ParseError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ExchangeClient for ClobClient {
    fn address(&self) -> Result<String, ExchangeError> {
        signing::address_from_private_key(self.private_key()?)
    }

    #[instrument(skip(self))]
    async fn get_market(&self, condition_id: &str) -> Result<MarketRecord, ExchangeError> {
        let url = format!("{}/markets/{}", self.clob_base, condition_id);
        let value = self.get_value(&url, &[], false).await?;
        serde_json::from_value(value).map_err(|e| ExchangeError::ParseError(e.to_string()))
    }

    #[instrument(skip(self, args), fields(token = %args.token_id, side = %args.side))]
    async fn create_order(&self, args: &OrderArgs) -> Result<SignedOrder, ExchangeError> {
        args.validate().map_err(ExchangeError::Auth)?;

        let private_key = self.private_key()?;
        let address = signing::address_from_private_key(private_key)?;

        let nonce = chrono::Utc::now().timestamp_millis().to_string();
        let expiration = (chrono::Utc::now().timestamp() + 3600).to_string();

        // token:side:price:size:nonce:expiration, signed as one message
        let message = format!(
            "{}:{}:{}:{}:{}:{}",
            args.token_id, args.side, args.price, args.size, nonce, expiration
        );
        let signature = signing::sign_message(private_key, message.as_bytes()).await?;

        let payload = json!({
            "token_id": args.token_id,
            "side": args.side.to_string(),
            "price": args.price.to_string(),
            "size": args.size.to_string(),
            "fee_rate_bps": "0",
            "nonce": nonce,
            "expiration": expiration,
            "taker": "0x0000000000000000000000000000000000000000",
            "maker": address,
            "signature": format!("0x{}", hex::encode(&signature)),
        });

        debug!(price = %args.price, size = %args.size, "Order created and signed");

        Ok(SignedOrder {
            args: args.clone(),
            payload,
        })
    }

    #[instrument(skip(self, order), fields(token = %order.args.token_id))]
    async fn post_order(
        &self,
        order: &SignedOrder,
        tif: TimeInForce,
    ) -> Result<Value, ExchangeError> {
        let url = format!("{}/order", self.clob_base);

        let mut payload = order.payload.clone();
        payload["order_type"] = Value::String(tif.to_string());

        let mut request = self.http.post(&url).json(&payload);
        for (key, value) in self.auth_headers().await? {
            request = request.header(&key, &value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = truncate(&response.text().await.unwrap_or_default());
            warn!(status = %status, "Order submission rejected");
            return Err(ExchangeError::Rejected {
                reason: format!("HTTP {} - {}", status, body),
            });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| ExchangeError::ParseError(e.to_string()))?;

        if let Some(error) = result.get("error").and_then(|v| v.as_str()) {
            return Err(ExchangeError::Rejected {
                reason: error.to_string(),
            });
        }

        info!(
            token_id = %order.args.token_id,
            price = %order.args.price,
            size = %order.args.size,
            tif = %tif,
            "Order submitted"
        );

        Ok(result)
    }

    #[instrument(skip(self, filter))]
    async fn get_trades(
        &self,
        filter: Option<&TradeFilter>,
    ) -> Result<Vec<TradeRecord>, ExchangeError> {
        let url = format!("{}/trades", self.clob_base);
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = filter {
            if let Some(market) = &filter.market {
                query.push(("market", market.clone()));
            }
            if let Some(maker) = &filter.maker_address {
                query.push(("maker_address", maker.clone()));
            }
        }

        let value = self.get_value(&url, &query, true).await?;
        Ok(records_from_value(value, &["trades", "data"]))
    }

    #[instrument(skip(self, filter))]
    async fn get_open_orders(
        &self,
        filter: Option<&OrderFilter>,
    ) -> Result<Vec<OpenOrderRecord>, ExchangeError> {
        let url = format!("{}/orders", self.clob_base);
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = filter {
            if let Some(market) = &filter.market {
                query.push(("market", market.clone()));
            }
            if let Some(address) = &filter.address {
                query.push(("address", address.clone()));
            }
        }

        let value = self.get_value(&url, &query, true).await?;
        Ok(records_from_value(value, &["orders", "data"]))
    }

    async fn get_last_trade_price(&self, token_id: &str) -> Result<Decimal, ExchangeError> {
        let url = format!("{}/last-trade-price", self.clob_base);
        let value = self
            .get_value(&url, &[("token_id", token_id.to_string())], false)
            .await?;
        price_from_value(&value)
    }

    async fn get_midpoint(&self, token_id: &str) -> Result<Decimal, ExchangeError> {
        let url = format!("{}/midpoint", self.clob_base);
        let value = self
            .get_value(&url, &[("token_id", token_id.to_string())], false)
            .await?;
        price_from_value(&value)
    }

    async fn get_best_price(
        &self,
        token_id: &str,
        side: Side,
    ) -> Result<Decimal, ExchangeError> {
        let url = format!("{}/price", self.clob_base);
        let value = self
            .get_value(
                &url,
                &[
                    ("token_id", token_id.to_string()),
                    ("side", side.to_string()),
                ],
                false,
            )
            .await?;
        price_from_value(&value)
    }
}

fn truncate(body: &str) -> String {
    if body.len() > BODY_TRUNCATE {
        let mut cut = BODY_TRUNCATE;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Parse a record list from either a bare array or a wrapped object,
/// skipping records that fail to parse individually.
fn records_from_value<T: serde::de::DeserializeOwned>(value: Value, keys: &[&str]) -> Vec<T> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|k| map.remove(*k))
            .and_then(|v| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Price quote bodies differ per endpoint; probe the known keys once here.
fn price_from_value(value: &Value) -> Result<Decimal, ExchangeError> {
    for key in ["price", "mid", "midpoint"] {
        if let Some(field) = value.get(key) {
            let parsed = match field {
                Value::String(s) => s.trim().parse().ok(),
                Value::Number(n) => n.to_string().parse().ok(),
                _ => None,
            };
            if let Some(price) = parsed {
                return Ok(price);
            }
        }
    }

    Err(ExchangeError::ParseError(format!(
        "no price field in quote response: {}",
        truncate(&value.to_string())
    )))
}
