//! Scripted in-process orderbook used by dispatcher and api tests.

use super::*;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub body: Value,
}

/// Answers each operation with a canned outcome and records every call.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<HashMap<&'static str, OperationOutcome>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, operation: &'static str, outcome: OperationOutcome) -> Self {
        self.responses.lock().unwrap().insert(operation, outcome);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, operation: &'static str, body: Value) -> OperationOutcome {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall { operation, body });

        if let Some(outcome) = self.responses.lock().unwrap().get(operation) {
            return outcome.clone();
        }

        OperationOutcome::success(match operation {
            OP_LIST_ORDERS => json!([[], []]),
            OP_LIST_FILLS => json!([]),
            OP_GET_CONFIG => json!({"use_encryption": false, "keys_generated": false}),
            _ => json!({"success": true}),
        })
    }
}

#[async_trait::async_trait]
impl OrderbookApi for ScriptedClient {
    async fn list_orders(&self) -> OperationOutcome {
        self.answer(OP_LIST_ORDERS, Value::Null)
    }

    async fn place_limit_order(
        &self,
        side: Side,
        price: f64,
        quantity: f64,
        user_pubkey: &str,
    ) -> OperationOutcome {
        self.answer(
            OP_PLACE_LIMIT_ORDER,
            json!({
                "side": side.as_str(),
                "price": json_number(price),
                "quantity": json_number(quantity),
                "user_pubkey": user_pubkey,
            }),
        )
    }

    async fn market_buy(&self, amount: f64, user_pubkey: &str) -> OperationOutcome {
        self.answer(OP_MARKET_BUY, market_body(amount, user_pubkey))
    }

    async fn market_sell(&self, amount: f64, user_pubkey: &str) -> OperationOutcome {
        self.answer(OP_MARKET_SELL, market_body(amount, user_pubkey))
    }

    async fn list_fills(&self) -> OperationOutcome {
        self.answer(OP_LIST_FILLS, Value::Null)
    }

    async fn get_config(&self) -> OperationOutcome {
        self.answer(OP_GET_CONFIG, Value::Null)
    }

    async fn update_config(&self, mapping: &ConfigMapping) -> OperationOutcome {
        self.answer(OP_UPDATE_CONFIG, mapping.to_json())
    }

    async fn generate_keys(&self) -> OperationOutcome {
        self.answer(OP_GENERATE_KEYS, Value::Null)
    }

    async fn reset(&self) -> OperationOutcome {
        self.answer(OP_RESET, Value::Null)
    }
}
