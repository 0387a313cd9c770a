//! Action descriptors and the ordered registry
//!
//! Each descriptor pairs a keyword predicate with an extractor and a
//! handler. The registry is walked in registration order and the first
//! predicate that fires wins, so the order below is part of the contract.

use crate::client::OrderbookApi;
use crate::config::BareOrderDefault;
use crate::extractor::{
    extract_config_update, extract_encryption_toggle, extract_limit_order, extract_market_buy,
    extract_market_sell, extract_query, mentions_buy, mentions_sell, CommandText, Extraction,
    Intent,
};
use crate::models::{ConfigMapping, ConfigValue, OperationOutcome};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    GetOrders,
    GetFills,
    UpdateConfig,
    GetConfig,
    ToggleEncryption,
    GenerateKeys,
    ResetOrderbook,
    AddOrder,
    MarketBuy,
    MarketSell,
}

impl ActionKind {
    /// Machine-readable tag carried on every envelope.
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::GetOrders => "GET_ORDERS",
            ActionKind::GetFills => "GET_FILLS",
            ActionKind::UpdateConfig => "UPDATE_CONFIG",
            ActionKind::GetConfig => "GET_CONFIG",
            ActionKind::ToggleEncryption => "TOGGLE_ENCRYPTION",
            ActionKind::GenerateKeys => "GENERATE_KEYS",
            ActionKind::ResetOrderbook => "RESET_ORDERBOOK",
            ActionKind::AddOrder => "ADD_ORDER",
            ActionKind::MarketBuy => "MARKET_BUY",
            ActionKind::MarketSell => "MARKET_SELL",
        }
    }

    /// Reads refresh the session's display cache; nothing else does.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            ActionKind::GetOrders | ActionKind::GetFills | ActionKind::GetConfig
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

pub type Matcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type Extractor = fn(&CommandText) -> Extraction;

/// One registered candidate operation.
#[derive(Clone)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    pub similes: &'static [&'static str],
    pub description: &'static str,
    /// Example command shown in help and clarification messages.
    pub example: &'static str,
    /// What the user was trying to do, e.g. "place a limit order".
    pub purpose: &'static str,
    matches: Matcher,
    extract: Extractor,
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("kind", &self.kind)
            .field("similes", &self.similes)
            .finish()
    }
}

impl ActionDescriptor {
    pub fn name(&self) -> &'static str {
        self.kind.tag()
    }

    /// `lower` is the trimmed, lower-cased command text.
    pub fn matches(&self, lower: &str) -> bool {
        (self.matches)(lower)
    }

    pub fn extract(&self, text: &CommandText) -> Extraction {
        (self.extract)(text)
    }

    /// Perform exactly one remote operation for `intent`.
    pub async fn invoke(&self, intent: &Intent, client: &dyn OrderbookApi) -> OperationOutcome {
        match (self.kind, intent) {
            (ActionKind::GetOrders, _) => client.list_orders().await,
            (ActionKind::GetFills, _) => client.list_fills().await,
            (ActionKind::GetConfig, _) => client.get_config().await,
            (ActionKind::UpdateConfig, Intent::ConfigUpdate(mapping)) => {
                client.update_config(mapping).await
            }
            (ActionKind::ToggleEncryption, Intent::EncryptionToggle { enabled }) => {
                let mut mapping = ConfigMapping::new();
                mapping.insert("use_encryption", ConfigValue::Flag(*enabled));
                client.update_config(&mapping).await
            }
            (ActionKind::GenerateKeys, _) => client.generate_keys().await,
            (ActionKind::ResetOrderbook, _) => client.reset().await,
            (
                ActionKind::AddOrder,
                Intent::LimitOrder {
                    side,
                    price,
                    quantity,
                    user_pubkey,
                },
            ) => {
                client
                    .place_limit_order(*side, *price, *quantity, user_pubkey)
                    .await
            }
            (ActionKind::MarketBuy, Intent::MarketOrder { amount, user_pubkey, .. }) => {
                client.market_buy(*amount, user_pubkey).await
            }
            (ActionKind::MarketSell, Intent::MarketOrder { amount, user_pubkey, .. }) => {
                client.market_sell(*amount, user_pubkey).await
            }
            (kind, intent) => {
                warn!(action = %kind, ?intent, "Intent does not fit action");
                OperationOutcome::rejected(Value::Null, format!("{} cannot run {:?}", kind, intent))
            }
        }
    }
}

/// Ordered, append-only list of descriptors. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    descriptors: Vec<ActionDescriptor>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor; its priority is its position.
    pub fn register(&mut self, descriptor: ActionDescriptor) -> usize {
        self.descriptors.push(descriptor);
        self.descriptors.len() - 1
    }

    /// First descriptor whose predicate fires, with its priority.
    pub fn select(&self, lower: &str) -> Option<(usize, &ActionDescriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .find(|(_, descriptor)| descriptor.matches(lower))
    }

    pub fn get(&self, kind: ActionKind) -> Option<&ActionDescriptor> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    pub fn list(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

//
// ================= Keyword predicates =================
//

const VIEW_VERBS: &[&str] = &["show", "get", "list", "view", "see", "check", "display", "fetch"];
const UPDATE_VERBS: &[&str] = &["update", "change", "set", "modify"];
const ORDER_VERBS: &[&str] = &["place", "add", "create", "new", "submit", "put"];
const CONFIG_NOUNS: &[&str] = &["config", "configuration", "settings"];
const FILL_NOUNS: &[&str] = &["fills", "fill", "matches", "trades"];
const KEY_NOUNS: &[&str] = &["key", "keys"];

const KEYGEN_PHRASES: &[&str] = &["create keys", "initialize keys", "setup fhe", "set up fhe", "fhe keys"];
const RESET_PHRASES: &[&str] = &["clear orderbook", "clear the orderbook", "start fresh"];

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
}

fn has_word(text: &str, word: &str) -> bool {
    words(text).any(|w| w == word)
}

fn has_any_word(text: &str, candidates: &[&str]) -> bool {
    words(text).any(|w| candidates.contains(&w))
}

fn has_any_phrase(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn is_market(text: &str) -> bool {
    has_word(text, "market")
}

fn is_limit(text: &str) -> bool {
    has_word(text, "limit")
}

fn matches_get_orders(text: &str) -> bool {
    has_any_word(text, VIEW_VERBS)
        && (has_word(text, "orders") || has_word(text, "orderbook") || has_word(text, "book"))
}

fn matches_get_fills(text: &str) -> bool {
    has_any_word(text, VIEW_VERBS) && has_any_word(text, FILL_NOUNS)
}

fn matches_update_config(text: &str) -> bool {
    has_any_word(text, UPDATE_VERBS) && has_any_word(text, CONFIG_NOUNS)
}

fn matches_get_config(text: &str) -> bool {
    has_any_word(text, VIEW_VERBS) && has_any_word(text, CONFIG_NOUNS)
}

fn matches_toggle_encryption(text: &str) -> bool {
    has_word(text, "encryption")
        && (has_any_word(text, &["enable", "disable"]) || has_any_phrase(text, &["turn on", "turn off"]))
}

fn matches_generate_keys(text: &str) -> bool {
    (has_word(text, "generate") && has_any_word(text, KEY_NOUNS)) || has_any_phrase(text, KEYGEN_PHRASES)
}

fn matches_reset(text: &str) -> bool {
    has_word(text, "reset") || has_any_phrase(text, RESET_PHRASES)
}

fn matches_limit_order(text: &str, bare: BareOrderDefault) -> bool {
    if is_market(text) {
        return false;
    }
    let has_side = mentions_buy(text) || mentions_sell(text);
    is_limit(text)
        || (has_any_word(text, ORDER_VERBS) && (has_word(text, "order") || has_side))
        || (bare == BareOrderDefault::Limit && has_side)
}

// A market command without a sell keyword defaults to buy.
fn matches_market_buy(text: &str, bare: BareOrderDefault) -> bool {
    let buy = mentions_buy(text);
    let sell = mentions_sell(text);
    (is_market(text) && !sell)
        || text.contains("buy now")
        || (bare == BareOrderDefault::Market && buy && !sell && !is_limit(text))
}

fn matches_market_sell(text: &str, bare: BareOrderDefault) -> bool {
    let sell = mentions_sell(text);
    (is_market(text) && sell)
        || text.contains("sell now")
        || (bare == BareOrderDefault::Market && sell && !is_limit(text))
}

/// The standard catalogue, in priority order.
pub fn create_default_registry(bare: BareOrderDefault) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register(ActionDescriptor {
        kind: ActionKind::GetOrders,
        similes: &["VIEW_ORDERS", "SHOW_ORDERS", "LIST_ORDERS", "CHECK_ORDERBOOK"],
        description: "Show the current buy and sell orders in the encrypted orderbook",
        example: "show orders",
        purpose: "view the orderbook",
        matches: Arc::new(matches_get_orders),
        extract: extract_query,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::GetFills,
        similes: &["VIEW_FILLS", "SHOW_FILLS", "LIST_MATCHES", "CHECK_TRADES"],
        description: "Show the fills (matched trades) in the orderbook",
        example: "show fills",
        purpose: "view fills",
        matches: Arc::new(matches_get_fills),
        extract: extract_query,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::UpdateConfig,
        similes: &["SET_CONFIG", "CHANGE_SETTINGS", "MODIFY_CONFIG"],
        description: "Update orderbook configuration values",
        example: "update config fee=0.1, min_order=0.01",
        purpose: "update the configuration",
        matches: Arc::new(matches_update_config),
        extract: extract_config_update,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::GetConfig,
        similes: &["VIEW_CONFIG", "SHOW_SETTINGS", "CHECK_CONFIG"],
        description: "Show the orderbook configuration",
        example: "show config",
        purpose: "view the configuration",
        matches: Arc::new(matches_get_config),
        extract: extract_query,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::ToggleEncryption,
        similes: &["ENABLE_ENCRYPTION", "DISABLE_ENCRYPTION", "SET_ENCRYPTION"],
        description: "Turn FHE encryption of orders on or off",
        example: "enable encryption",
        purpose: "change the encryption mode",
        matches: Arc::new(matches_toggle_encryption),
        extract: extract_encryption_toggle,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::GenerateKeys,
        similes: &["CREATE_KEYS", "SETUP_FHE", "INITIALIZE_KEYS"],
        description: "Generate new FHE keys for the orderbook",
        example: "generate keys",
        purpose: "generate FHE keys",
        matches: Arc::new(matches_generate_keys),
        extract: extract_query,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::ResetOrderbook,
        similes: &["CLEAR_ORDERBOOK", "RESET_ORDERS", "START_FRESH"],
        description: "Reset the orderbook, clearing all orders and fills",
        example: "reset orderbook",
        purpose: "reset the orderbook",
        matches: Arc::new(matches_reset),
        extract: extract_query,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::AddOrder,
        similes: &["PLACE_ORDER", "LIMIT_ORDER", "CREATE_ORDER", "SUBMIT_ORDER"],
        description: "Place a limit buy or sell order",
        example: "place a buy order at price 100 with 5 units and key abc123",
        purpose: "place a limit order",
        matches: Arc::new(move |text: &str| matches_limit_order(text, bare)),
        extract: extract_limit_order,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::MarketBuy,
        similes: &["BUY_NOW", "BUY_AT_MARKET", "MARKET_ORDER_BUY"],
        description: "Buy at the best available price",
        example: "market buy amount 5 key abc123",
        purpose: "place a market buy",
        matches: Arc::new(move |text: &str| matches_market_buy(text, bare)),
        extract: extract_market_buy,
    });

    registry.register(ActionDescriptor {
        kind: ActionKind::MarketSell,
        similes: &["SELL_NOW", "SELL_AT_MARKET", "MARKET_ORDER_SELL"],
        description: "Sell at the best available price",
        example: "market sell amount 3 key abc123",
        purpose: "place a market sell",
        matches: Arc::new(move |text: &str| matches_market_sell(text, bare)),
        extract: extract_market_sell,
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedClient;
    use crate::client::{OP_MARKET_SELL, OP_PLACE_LIMIT_ORDER, OP_UPDATE_CONFIG};
    use crate::models::Side;
    use serde_json::json;

    fn selected(registry: &ActionRegistry, text: &str) -> Option<ActionKind> {
        registry
            .select(&text.trim().to_lowercase())
            .map(|(_, d)| d.kind)
    }

    #[test]
    fn test_registration_order_is_priority() {
        let registry = create_default_registry(BareOrderDefault::Market);
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.list()[0], "GET_ORDERS");
        assert_eq!(registry.list()[9], "MARKET_SELL");
    }

    #[test]
    fn test_read_commands() {
        let registry = create_default_registry(BareOrderDefault::Market);
        assert_eq!(selected(&registry, "Show orders"), Some(ActionKind::GetOrders));
        assert_eq!(selected(&registry, "view the orderbook"), Some(ActionKind::GetOrders));
        assert_eq!(selected(&registry, "list fills"), Some(ActionKind::GetFills));
        assert_eq!(selected(&registry, "get config"), Some(ActionKind::GetConfig));
        assert_eq!(selected(&registry, "set config fee=1"), Some(ActionKind::UpdateConfig));
    }

    #[test]
    fn test_maintenance_commands() {
        let registry = create_default_registry(BareOrderDefault::Market);
        assert_eq!(selected(&registry, "generate keys"), Some(ActionKind::GenerateKeys));
        assert_eq!(selected(&registry, "setup FHE"), Some(ActionKind::GenerateKeys));
        assert_eq!(selected(&registry, "reset orderbook"), Some(ActionKind::ResetOrderbook));
        assert_eq!(selected(&registry, "disable encryption"), Some(ActionKind::ToggleEncryption));
    }

    #[test]
    fn test_order_commands() {
        let registry = create_default_registry(BareOrderDefault::Market);
        assert_eq!(
            selected(&registry, "place a buy order at price 100 with 5 units and key abc123"),
            Some(ActionKind::AddOrder)
        );
        assert_eq!(selected(&registry, "limit sell 3 at 110"), Some(ActionKind::AddOrder));
        assert_eq!(selected(&registry, "market sell 3"), Some(ActionKind::MarketSell));
        assert_eq!(selected(&registry, "market buy 2"), Some(ActionKind::MarketBuy));
        assert_eq!(selected(&registry, "buy at market 2"), Some(ActionKind::MarketBuy));
        assert_eq!(selected(&registry, "market order amount 2"), Some(ActionKind::MarketBuy));
    }

    #[test]
    fn test_side_keywords_are_whole_words() {
        let registry = create_default_registry(BareOrderDefault::Market);
        assert_eq!(
            selected(&registry, "market buy from the seller"),
            Some(ActionKind::MarketBuy)
        );
        assert_eq!(
            selected(&registry, "market order for the buyer, sell 2"),
            Some(ActionKind::MarketSell)
        );
    }

    #[test]
    fn test_earliest_registration_wins_on_overlap() {
        let registry = create_default_registry(BareOrderDefault::Market);
        let text = "place a sell order at 110 for 3 key abc";

        let fired: Vec<ActionKind> = registry
            .iter()
            .filter(|d| d.matches(text))
            .map(|d| d.kind)
            .collect();
        assert_eq!(fired, vec![ActionKind::AddOrder, ActionKind::MarketSell]);
        assert_eq!(selected(&registry, text), Some(ActionKind::AddOrder));
    }

    #[test]
    fn test_priority_follows_registration_not_kind() {
        let mut registry = ActionRegistry::new();
        let standard = create_default_registry(BareOrderDefault::Market);
        let sell = standard.get(ActionKind::MarketSell).unwrap().clone();
        let limit = standard.get(ActionKind::AddOrder).unwrap().clone();

        assert_eq!(registry.register(sell), 0);
        assert_eq!(registry.register(limit), 1);

        let (index, descriptor) = registry.select("place a sell order at 110 for 3").unwrap();
        assert_eq!(index, 0);
        assert_eq!(descriptor.kind, ActionKind::MarketSell);
    }

    #[test]
    fn test_bare_order_policy() {
        let market = create_default_registry(BareOrderDefault::Market);
        let limit = create_default_registry(BareOrderDefault::Limit);
        let none = create_default_registry(BareOrderDefault::None);

        assert_eq!(selected(&market, "buy 5 key abc"), Some(ActionKind::MarketBuy));
        assert_eq!(selected(&market, "sell 5 key abc"), Some(ActionKind::MarketSell));
        assert_eq!(selected(&limit, "buy 5 at 100 key abc"), Some(ActionKind::AddOrder));
        assert_eq!(selected(&none, "buy 5 key abc"), None);
        assert_eq!(selected(&none, "market buy 5 key abc"), Some(ActionKind::MarketBuy));
    }

    #[test]
    fn test_unrecognized_text_matches_nothing() {
        let registry = create_default_registry(BareOrderDefault::Market);
        assert_eq!(selected(&registry, "hello there"), None);
        assert_eq!(selected(&registry, "what's the weather"), None);
        // keywords must be whole words
        assert_eq!(selected(&registry, "unsettled listing"), None);
    }

    #[test]
    fn test_read_kinds() {
        assert!(ActionKind::GetOrders.is_read());
        assert!(ActionKind::GetConfig.is_read());
        assert!(!ActionKind::ToggleEncryption.is_read());
        assert!(!ActionKind::AddOrder.is_read());
    }

    #[test]
    fn test_invoke_limit_order_issues_one_call() {
        let registry = create_default_registry(BareOrderDefault::Market);
        let client = ScriptedClient::new();
        let intent = Intent::LimitOrder {
            side: Side::Buy,
            price: 100.0,
            quantity: 5.0,
            user_pubkey: "abc123".into(),
        };

        let descriptor = registry.get(ActionKind::AddOrder).unwrap();
        let outcome = tokio_test::block_on(descriptor.invoke(&intent, &client));

        assert!(outcome.ok);
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, OP_PLACE_LIMIT_ORDER);
        assert_eq!(calls[0].body["price"], json!(100));
    }

    #[test]
    fn test_invoke_toggle_sends_use_encryption_flag() {
        let registry = create_default_registry(BareOrderDefault::Market);
        let client = ScriptedClient::new();
        let descriptor = registry.get(ActionKind::ToggleEncryption).unwrap();

        tokio_test::block_on(descriptor.invoke(&Intent::EncryptionToggle { enabled: true }, &client));

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, OP_UPDATE_CONFIG);
        assert_eq!(calls[0].body, json!({"use_encryption": true}));
    }

    #[test]
    fn test_invoke_market_sell() {
        let registry = create_default_registry(BareOrderDefault::Market);
        let client = ScriptedClient::new();
        let descriptor = registry.get(ActionKind::MarketSell).unwrap();
        let intent = Intent::MarketOrder {
            side: Side::Sell,
            amount: 3.0,
            user_pubkey: "abc".into(),
        };

        tokio_test::block_on(descriptor.invoke(&intent, &client));

        assert_eq!(client.calls()[0].operation, OP_MARKET_SELL);
        assert_eq!(client.calls()[0].body["amount"], json!(3));
    }

    #[test]
    fn test_invoke_mismatched_intent_makes_no_call() {
        let registry = create_default_registry(BareOrderDefault::Market);
        let client = ScriptedClient::new();
        let descriptor = registry.get(ActionKind::AddOrder).unwrap();

        let outcome = tokio_test::block_on(descriptor.invoke(&Intent::Query, &client));

        assert!(!outcome.ok);
        assert_eq!(client.call_count(), 0);
    }
}
