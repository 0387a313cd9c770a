//! Dispatcher - turns one command into one envelope
//!
//! TEXT → SELECT → EXTRACT → INVOKE → COMPOSE
//!
//! At most one remote call per dispatch. Every failure is recovered here
//! and returned as an envelope.

use crate::actions::{create_default_registry, ActionDescriptor, ActionKind, ActionRegistry};
use crate::client::{HttpOrderbookClient, OrderbookApi};
use crate::composer;
use crate::config::AgentConfig;
use crate::display::{DisplayCache, FillView, OrderView};
use crate::error::FailureKind;
use crate::extractor::{CommandText, Intent};
use crate::models::{
    decode_config, decode_fills, decode_orders, Command, OperationOutcome, ResponseEnvelope,
    Side,
};
use crate::session::SessionContext;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    registry: ActionRegistry,
    client: Arc<dyn OrderbookApi>,
}

impl Dispatcher {
    pub fn new(registry: ActionRegistry, client: Arc<dyn OrderbookApi>) -> Self {
        Self { registry, client }
    }

    /// Standard registry and an HTTP client, both from config.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let client = HttpOrderbookClient::from_config(config)?;
        info!(
            orderbook_url = %client.base_url(),
            bare_order_default = ?config.bare_order_default,
            "Dispatcher: configured"
        );
        Ok(Self::new(
            create_default_registry(config.bare_order_default),
            Arc::new(client),
        ))
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, session: &mut SessionContext, command: &Command) -> ResponseEnvelope {
        let session_id = command.source_session_id.as_str();
        let text = CommandText::new(&command.text);

        info!(session_id, command = %text.original(), "Dispatcher: command received");

        // === SELECT ===
        let (priority, descriptor) = match self.registry.select(text.lower()) {
            Some(selected) => selected,
            None => {
                debug!(session_id, "No action matched");
                return composer::unmatched(&self.registry, session_id);
            }
        };

        debug!(session_id, action = %descriptor.kind, priority, "Action selected");

        // === EXTRACT ===
        let intent = match descriptor.extract(&text) {
            Ok(intent) => intent,
            Err(failure) => {
                debug!(
                    session_id,
                    action = %descriptor.kind,
                    missing = ?failure.missing,
                    "Incomplete intent"
                );
                return composer::incomplete(descriptor, &failure, session_id);
            }
        };

        // === INVOKE ===
        let outcome = descriptor.invoke(&intent, self.client.as_ref()).await;

        if let Some(kind) = outcome.failure_kind() {
            warn!(
                session_id,
                action = %descriptor.kind,
                status = %kind,
                error = outcome.error_message.as_deref().unwrap_or_default(),
                "Remote operation failed"
            );
            return composer::remote_failure(descriptor, &outcome, kind, session_id);
        }

        // === COMPOSE ===
        let rendered = match apply_outcome(descriptor, &intent, &outcome.payload, &mut session.display) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(
                    session_id,
                    action = %descriptor.kind,
                    error = %e,
                    "Remote response could not be decoded"
                );
                let rejected = OperationOutcome::rejected(outcome.payload.clone(), e.to_string());
                return composer::remote_failure(
                    descriptor,
                    &rejected,
                    FailureKind::RemoteRejected,
                    session_id,
                );
            }
        };

        info!(session_id, action = %descriptor.kind, "Action completed");
        composer::success(descriptor, &intent, &outcome, rendered, session_id)
    }
}

/// Fold a successful outcome into the display cache. Payloads are fully
/// decoded before anything is written, so a bad shape leaves the cache as
/// it was.
fn apply_outcome(
    descriptor: &ActionDescriptor,
    intent: &Intent,
    payload: &Value,
    display: &mut DisplayCache,
) -> Result<Option<String>> {
    match (descriptor.kind, intent) {
        (ActionKind::GetOrders, _) => {
            let (buys, sells) = decode_orders(payload)?;
            display.set_orders(
                buys.iter().map(|o| OrderView::from_remote(o, Side::Buy)).collect(),
                sells.iter().map(|o| OrderView::from_remote(o, Side::Sell)).collect(),
            );
            Ok(Some(display.render_orders_text()))
        }
        (ActionKind::GetFills, _) => {
            let fills = decode_fills(payload)?;
            display.set_fills(fills.iter().map(FillView::from_remote).collect());
            Ok(Some(display.render_fills_text()))
        }
        (ActionKind::GetConfig, _) => {
            let config = decode_config(payload)?;
            display.set_encryption_visible(config.use_encryption);
            Ok(None)
        }
        (ActionKind::ToggleEncryption, Intent::EncryptionToggle { enabled }) => {
            display.set_encryption_visible(*enabled);
            Ok(None)
        }
        _ => Ok(None),
    }
}
