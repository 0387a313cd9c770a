//! Remote orderbook client
//!
//! Typed facade over the external encrypted-orderbook HTTP service.
//! One method per capability, one round trip per call, no retries.
//! Transport failures never escape: they come back as
//! `OperationOutcome { ok: false, .. }`.

use crate::config::AgentConfig;
use crate::models::{json_number, ConfigMapping, OperationOutcome, Side};
use crate::Result;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

#[cfg(test)]
pub(crate) mod testing;

pub const OP_LIST_ORDERS: &str = "list_orders";
pub const OP_PLACE_LIMIT_ORDER: &str = "place_limit_order";
pub const OP_MARKET_BUY: &str = "market_buy";
pub const OP_MARKET_SELL: &str = "market_sell";
pub const OP_LIST_FILLS: &str = "list_fills";
pub const OP_GET_CONFIG: &str = "get_config";
pub const OP_UPDATE_CONFIG: &str = "update_config";
pub const OP_GENERATE_KEYS: &str = "generate_keys";
pub const OP_RESET: &str = "reset";

/// The external capabilities the agent can drive.
#[async_trait::async_trait]
pub trait OrderbookApi: Send + Sync {
    async fn list_orders(&self) -> OperationOutcome;
    async fn place_limit_order(
        &self,
        side: Side,
        price: f64,
        quantity: f64,
        user_pubkey: &str,
    ) -> OperationOutcome;
    async fn market_buy(&self, amount: f64, user_pubkey: &str) -> OperationOutcome;
    async fn market_sell(&self, amount: f64, user_pubkey: &str) -> OperationOutcome;
    async fn list_fills(&self) -> OperationOutcome;
    async fn get_config(&self) -> OperationOutcome;
    async fn update_config(&self, mapping: &ConfigMapping) -> OperationOutcome;
    async fn generate_keys(&self) -> OperationOutcome;
    async fn reset(&self) -> OperationOutcome;
}

/// JSON-over-HTTP client for the orderbook service.
#[derive(Clone)]
pub struct HttpOrderbookClient {
    client: Client,
    base_url: String,
}

impl HttpOrderbookClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(&config.orderbook_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, operation: &'static str, path: &str) -> OperationOutcome {
        let request = self.client.get(self.url(path));
        self.send(operation, path, request).await
    }

    async fn post_json(
        &self,
        operation: &'static str,
        path: &str,
        body: Option<&Value>,
    ) -> OperationOutcome {
        let mut request = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        self.send(operation, path, request).await
    }

    async fn send(
        &self,
        operation: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> OperationOutcome {
        info!(operation, path, "Calling orderbook service");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("request to {} timed out", path)
                } else if e.is_connect() {
                    format!("could not connect to the orderbook service at {}", self.base_url)
                } else {
                    format!("request to {} failed: {}", path, e)
                };
                warn!(operation, error = %e, "Orderbook service unavailable");
                return OperationOutcome::unavailable(reason);
            }
        };

        let status = response.status();
        let body = match response.json::<Value>().await {
            Ok(body) => body,
            Err(e) => {
                let reason = if status.is_success() {
                    format!("invalid JSON response from {}: {}", path, e)
                } else {
                    format!("orderbook returned {} for {}", status, path)
                };
                warn!(operation, %status, "Orderbook response could not be decoded");
                return OperationOutcome::unavailable(reason);
            }
        };

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let reason = remote_error_message(&body);
            warn!(operation, %status, error = %reason, "Orderbook rejected request");
            return OperationOutcome::rejected(body, reason);
        }

        if !status.is_success() {
            warn!(operation, %status, "Orderbook returned error status");
            return OperationOutcome::unavailable(format!("orderbook returned {} for {}", status, path));
        }

        OperationOutcome::success(body)
    }
}

fn remote_error_message(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .unwrap_or("the request was not accepted")
        .to_string()
}

fn market_body(amount: f64, user_pubkey: &str) -> Value {
    json!({
        "amount": json_number(amount),
        "quantity": json_number(amount),
        "user_pubkey": user_pubkey,
    })
}

#[async_trait::async_trait]
impl OrderbookApi for HttpOrderbookClient {
    async fn list_orders(&self) -> OperationOutcome {
        self.get_json(OP_LIST_ORDERS, "/orders").await
    }

    async fn place_limit_order(
        &self,
        side: Side,
        price: f64,
        quantity: f64,
        user_pubkey: &str,
    ) -> OperationOutcome {
        let body = json!({
            "price": json_number(price),
            "quantity": json_number(quantity),
            "side": side.as_str(),
            "user_pubkey": user_pubkey,
        });
        self.post_json(OP_PLACE_LIMIT_ORDER, "/orders", Some(&body)).await
    }

    async fn market_buy(&self, amount: f64, user_pubkey: &str) -> OperationOutcome {
        let body = market_body(amount, user_pubkey);
        self.post_json(OP_MARKET_BUY, "/market-buy", Some(&body)).await
    }

    async fn market_sell(&self, amount: f64, user_pubkey: &str) -> OperationOutcome {
        let body = market_body(amount, user_pubkey);
        self.post_json(OP_MARKET_SELL, "/market-sell", Some(&body)).await
    }

    async fn list_fills(&self) -> OperationOutcome {
        self.get_json(OP_LIST_FILLS, "/fills").await
    }

    async fn get_config(&self) -> OperationOutcome {
        self.get_json(OP_GET_CONFIG, "/config").await
    }

    async fn update_config(&self, mapping: &ConfigMapping) -> OperationOutcome {
        let body = mapping.to_json();
        self.post_json(OP_UPDATE_CONFIG, "/config", Some(&body)).await
    }

    async fn generate_keys(&self) -> OperationOutcome {
        self.post_json(OP_GENERATE_KEYS, "/generate-keys", None).await
    }

    async fn reset(&self) -> OperationOutcome {
        self.post_json(OP_RESET, "/reset", None).await
    }
}
