//! Core data models for the orderbook agent

use crate::error::{AgentError, FailureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "Buy", alias = "BUY")]
    Buy,
    #[serde(alias = "Sell", alias = "SELL")]
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which kind of remote failure an outcome carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemoteFailure {
    Unavailable,
    Rejected,
}

impl From<RemoteFailure> for FailureKind {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::Unavailable => FailureKind::ServiceUnavailable,
            RemoteFailure::Rejected => FailureKind::RemoteRejected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Completed,
    UnmatchedIntent,
    IncompleteIntent,
    ServiceUnavailable,
    RemoteRejected,
}

impl From<FailureKind> for EnvelopeStatus {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::UnmatchedIntent => EnvelopeStatus::UnmatchedIntent,
            FailureKind::IncompleteIntent => EnvelopeStatus::IncompleteIntent,
            FailureKind::ServiceUnavailable => EnvelopeStatus::ServiceUnavailable,
            FailureKind::RemoteRejected => EnvelopeStatus::RemoteRejected,
        }
    }
}

//
// ================= Command =================
//

/// One user turn. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    pub text: String,
    pub source_session_id: String,
}

impl Command {
    pub fn new(text: impl Into<String>, source_session_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_session_id: source_session_id.into(),
        }
    }
}

//
// ================= Outcome & Envelope =================
//

/// Normalized result of a single remote call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcome {
    pub ok: bool,
    pub payload: Value,
    pub error_message: Option<String>,
    pub failure: Option<RemoteFailure>,
}

impl OperationOutcome {
    pub fn success(payload: Value) -> Self {
        Self {
            ok: true,
            payload,
            error_message: None,
            failure: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: Value::Null,
            error_message: Some(message.into()),
            failure: Some(RemoteFailure::Unavailable),
        }
    }

    pub fn rejected(payload: Value, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload,
            error_message: Some(message.into()),
            failure: Some(RemoteFailure::Rejected),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.ok {
            None
        } else {
            Some(self.failure.unwrap_or(RemoteFailure::Unavailable).into())
        }
    }
}

/// What every dispatch returns, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub rationale: String,
    pub text: String,
    pub action_tag: String,
    pub source_session_id: String,
    pub status: EnvelopeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Completed
    }
}

//
// ================= Config mapping =================
//

/// A config value: numeric when lexically numeric, a flag only when set
/// by the encryption toggle, text otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl ConfigValue {
    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::Number(n) => json_number(*n),
            ConfigValue::Flag(b) => Value::Bool(*b),
            ConfigValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Flag(b) => write!(f, "{}", b),
            ConfigValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Insertion-ordered key/value mapping. A repeated key keeps its first
/// position and takes the latest value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigMapping {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            object.insert(key.clone(), value.to_json());
        }
        Value::Object(object)
    }

    /// `fee=0.1, min_order=0.01`
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

//
// ================= Wire DTOs =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteOrder {
    #[serde(default)]
    pub id: Option<u64>,
    pub price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub user_pubkey: String,
    #[serde(default)]
    pub is_encrypted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FillTimestamp {
    EpochMillis(i64),
    Text(String),
}

impl FillTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FillTimestamp::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms),
            FillTimestamp::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteFill {
    pub price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub timestamp: Option<FillTimestamp>,
    #[serde(default)]
    pub buy_order_id: Option<u64>,
    #[serde(default)]
    pub sell_order_id: Option<u64>,
    #[serde(default)]
    pub buyer_pubkey: String,
    #[serde(default)]
    pub seller_pubkey: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderbookConfig {
    pub use_encryption: bool,
    #[serde(default)]
    pub keys_generated: bool,
}

/// `GET /orders` answers `[buyOrders, sellOrders]`.
pub fn decode_orders(payload: &Value) -> crate::Result<(Vec<RemoteOrder>, Vec<RemoteOrder>)> {
    serde_json::from_value(payload.clone())
        .map_err(|e| AgentError::UnexpectedResponse(format!("orders: {}", e)))
}

pub fn decode_fills(payload: &Value) -> crate::Result<Vec<RemoteFill>> {
    serde_json::from_value(payload.clone())
        .map_err(|e| AgentError::UnexpectedResponse(format!("fills: {}", e)))
}

pub fn decode_config(payload: &Value) -> crate::Result<OrderbookConfig> {
    serde_json::from_value(payload.clone())
        .map_err(|e| AgentError::UnexpectedResponse(format!("config: {}", e)))
}

/// Integral values go on the wire as integers (the service takes `u32`
/// prices and quantities); everything else stays a float.
pub fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_orders_accepts_server_side_casing() {
        let payload = json!([
            [{"id": 1, "price": 100, "quantity": 5, "side": "Buy", "user_pubkey": "abc"}],
            [{"id": 2, "price": 110, "quantity": 3, "side": "sell", "user_pubkey": "def"}]
        ]);

        let (buys, sells) = decode_orders(&payload).unwrap();
        assert_eq!(buys[0].side, Some(Side::Buy));
        assert_eq!(sells[0].side, Some(Side::Sell));
        assert_eq!(sells[0].price, 110.0);
    }

    #[test]
    fn test_decode_orders_rejects_wrong_shape() {
        let err = decode_orders(&json!({"orders": []})).unwrap_err();
        assert!(matches!(err, AgentError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_config_mapping_keeps_first_position() {
        let mut mapping = ConfigMapping::new();
        mapping.insert("fee", ConfigValue::Number(0.1));
        mapping.insert("mode", ConfigValue::Text("fast".into()));
        mapping.insert("fee", ConfigValue::Number(0.2));

        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["fee", "mode"]);
        assert_eq!(mapping.get("fee"), Some(&ConfigValue::Number(0.2)));
        assert_eq!(mapping.summary(), "fee=0.2, mode=fast");
    }

    #[test]
    fn test_json_number_prefers_integers() {
        assert_eq!(json_number(100.0), json!(100));
        assert_eq!(json_number(0.5), json!(0.5));
    }

    #[test]
    fn test_fill_timestamp_epoch_millis() {
        let ts = FillTimestamp::EpochMillis(0);
        assert_eq!(ts.to_datetime().unwrap().timestamp(), 0);
    }
}
