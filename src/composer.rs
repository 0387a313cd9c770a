//! Response composer
//!
//! Builds the uniform envelope for every dispatch outcome. Nothing in
//! here talks to the network or the cache; callers hand over whatever
//! text the cache rendered.

use crate::actions::{ActionDescriptor, ActionKind, ActionRegistry};
use crate::error::{ExtractionFailure, FailureKind};
use crate::extractor::Intent;
use crate::models::{EnvelopeStatus, OperationOutcome, ResponseEnvelope};
use serde_json::Value;

/// Tag used when no descriptor matched.
pub const UNMATCHED_TAG: &str = "NONE";

fn envelope(
    rationale: String,
    text: String,
    action_tag: &str,
    session_id: &str,
    status: EnvelopeStatus,
) -> ResponseEnvelope {
    ResponseEnvelope {
        rationale,
        text,
        action_tag: action_tag.to_string(),
        source_session_id: session_id.to_string(),
        status,
        missing_fields: Vec::new(),
        payload: None,
    }
}

fn pretty(payload: &Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}

fn format_id(payload: &Value) -> Option<String> {
    match payload.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn unmatched(registry: &ActionRegistry, session_id: &str) -> ResponseEnvelope {
    let mut text = String::from(
        "I'm not sure what you'd like to do. I can help with the encrypted orderbook:\n",
    );
    for descriptor in registry.iter() {
        text.push_str(&format!(
            "- {}, e.g. \"{}\"\n",
            descriptor.description, descriptor.example
        ));
    }

    let kind = FailureKind::UnmatchedIntent;
    envelope(
        "No action matched the command".to_string(),
        text,
        UNMATCHED_TAG,
        session_id,
        kind.into(),
    )
}

pub fn incomplete(
    descriptor: &ActionDescriptor,
    failure: &ExtractionFailure,
    session_id: &str,
) -> ResponseEnvelope {
    let text = format!(
        "I need the {} to {}. For example: \"{}\"",
        failure.describe(),
        descriptor.purpose,
        descriptor.example
    );

    let mut env = envelope(
        format!("{} matched but {}", descriptor.name(), failure),
        text,
        descriptor.name(),
        session_id,
        FailureKind::IncompleteIntent.into(),
    );
    env.missing_fields = failure.missing.iter().map(|f| f.to_string()).collect();
    env
}

/// Envelope for a failed remote call. The error is reported, never raised.
pub fn remote_failure(
    descriptor: &ActionDescriptor,
    outcome: &OperationOutcome,
    kind: FailureKind,
    session_id: &str,
) -> ResponseEnvelope {
    let reason = outcome
        .error_message
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());

    let text = match kind {
        FailureKind::RemoteRejected => format!(
            "Sorry, the orderbook rejected the request to {}: {}",
            descriptor.purpose, reason
        ),
        _ => format!(
            "Sorry, I couldn't reach the orderbook service to {}: {}. Please try again in a moment.",
            descriptor.purpose, reason
        ),
    };

    let mut env = envelope(
        format!("{} failed: {}", descriptor.name(), kind),
        text,
        descriptor.name(),
        session_id,
        kind.into(),
    );
    if !outcome.payload.is_null() {
        env.payload = Some(outcome.payload.clone());
    }
    env
}

/// Confirmation for a successful call. `rendered` is the cache's text for
/// read actions that have one.
pub fn success(
    descriptor: &ActionDescriptor,
    intent: &Intent,
    outcome: &OperationOutcome,
    rendered: Option<String>,
    session_id: &str,
) -> ResponseEnvelope {
    let payload = &outcome.payload;

    let text = match (descriptor.kind, intent) {
        (ActionKind::GetOrders | ActionKind::GetFills, _) => {
            rendered.unwrap_or_else(|| pretty(payload))
        }
        (
            ActionKind::AddOrder,
            Intent::LimitOrder {
                side,
                price,
                quantity,
                ..
            },
        ) => {
            let mut out = format!("✅ Successfully placed your {} order!\n\n", side);
            if let Some(id) = format_id(payload) {
                out.push_str(&format!("Order ID: {}\n", id));
            }
            out.push_str(&format!("Price: {}\nQuantity: {}\n", price, quantity));
            out.push_str(&format!("\nResult: {}", pretty(payload)));
            out
        }
        (ActionKind::MarketBuy | ActionKind::MarketSell, Intent::MarketOrder { side, amount, .. }) => {
            format!(
                "I've executed your market {} order for amount {}\nResult: {}",
                side,
                amount,
                pretty(payload)
            )
        }
        (ActionKind::UpdateConfig, Intent::ConfigUpdate(mapping)) => format!(
            "I've updated the orderbook configuration with {}\nResult: {}",
            mapping.summary(),
            pretty(payload)
        ),
        (ActionKind::ToggleEncryption, Intent::EncryptionToggle { enabled }) => {
            if *enabled {
                "🔒 Encryption is now enabled. Order prices and quantities will display encrypted."
                    .to_string()
            } else {
                "🔓 Encryption is now disabled. Order prices and quantities will display in plain text."
                    .to_string()
            }
        }
        (ActionKind::GetConfig, _) => {
            format!("Here is the current orderbook configuration:\n{}", pretty(payload))
        }
        (ActionKind::GenerateKeys, _) => {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("FHE keys generated");
            format!("🔑 {}", message)
        }
        (ActionKind::ResetOrderbook, _) => {
            "The orderbook has been reset. All orders and fills were cleared.".to_string()
        }
        _ => format!("Done.\nResult: {}", pretty(payload)),
    };

    let mut env = envelope(
        format!("Executed {}", descriptor.name()),
        text,
        descriptor.name(),
        session_id,
        EnvelopeStatus::Completed,
    );
    env.payload = Some(payload.clone());
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::create_default_registry;
    use crate::config::BareOrderDefault;
    use crate::extractor::FIELD_PUBLIC_KEY;
    use crate::models::Side;
    use serde_json::json;

    fn registry() -> ActionRegistry {
        create_default_registry(BareOrderDefault::Market)
    }

    #[test]
    fn test_limit_order_confirmation() {
        let registry = registry();
        let descriptor = registry.get(ActionKind::AddOrder).unwrap();
        let intent = Intent::LimitOrder {
            side: Side::Buy,
            price: 100.0,
            quantity: 5.0,
            user_pubkey: "abc123".into(),
        };
        let outcome = OperationOutcome::success(json!({"success": true, "id": 7}));

        let env = success(descriptor, &intent, &outcome, None, "s1");

        assert!(env.is_success());
        assert_eq!(env.action_tag, "ADD_ORDER");
        assert!(env.text.contains("Order ID: 7"));
        assert!(env.text.contains("Price: 100"));
        assert!(env.text.contains("Quantity: 5"));
        assert_eq!(env.payload, Some(json!({"success": true, "id": 7})));
    }

    #[test]
    fn test_incomplete_names_fields_and_example() {
        let registry = registry();
        let descriptor = registry.get(ActionKind::MarketSell).unwrap();
        let failure = ExtractionFailure::new(vec![FIELD_PUBLIC_KEY]);

        let env = incomplete(descriptor, &failure, "s1");

        assert_eq!(env.status, EnvelopeStatus::IncompleteIntent);
        assert_eq!(env.missing_fields, vec!["public key".to_string()]);
        assert!(env.text.contains("public key"));
        assert!(env.text.contains(descriptor.example));
    }

    #[test]
    fn test_unavailable_apologizes_and_suggests_retry() {
        let registry = registry();
        let descriptor = registry.get(ActionKind::GetOrders).unwrap();
        let outcome = OperationOutcome::unavailable("request to /orders timed out");

        let env = remote_failure(descriptor, &outcome, FailureKind::ServiceUnavailable, "s1");

        assert_eq!(env.status, EnvelopeStatus::ServiceUnavailable);
        assert!(env.text.starts_with("Sorry"));
        assert!(env.text.contains("try again"));
        assert!(env.text.contains("timed out"));
        assert_eq!(env.payload, None);
    }

    #[test]
    fn test_unmatched_lists_capabilities() {
        let registry = registry();
        let env = unmatched(&registry, "s1");

        assert_eq!(env.status, EnvelopeStatus::UnmatchedIntent);
        assert_eq!(env.action_tag, UNMATCHED_TAG);
        assert_eq!(env.source_session_id, "s1");
        assert!(env.text.contains("show orders"));
        assert!(env.text.contains("generate keys"));
    }

    #[test]
    fn test_read_actions_use_rendered_text() {
        let registry = registry();
        let descriptor = registry.get(ActionKind::GetFills).unwrap();
        let outcome = OperationOutcome::success(json!([]));

        let env = success(
            descriptor,
            &Intent::Query,
            &outcome,
            Some("There are no fills in the orderbook yet.".into()),
            "s1",
        );
        assert_eq!(env.text, "There are no fills in the orderbook yet.");
    }
}
