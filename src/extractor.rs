//! Intent extractor
//!
//! Pulls structured trading parameters out of free text. Each field has an
//! ordered list of alternative rules; the first rule that yields a usable
//! value wins. Extraction is pure: no remote calls, same text in, same
//! result out.

use crate::error::ExtractionFailure;
use crate::models::{ConfigMapping, ConfigValue, Side};
use lazy_static::lazy_static;
use regex::Regex;

pub const FIELD_SIDE: &str = "side";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_PUBLIC_KEY: &str = "public key";
pub const FIELD_CONFIG_PAIRS: &str = "key=value pairs";
pub const FIELD_ENCRYPTION_MODE: &str = "enable or disable";

/// Command text, trimmed once, with a lower-cased view for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandText {
    original: String,
    lower: String,
}

impl CommandText {
    pub fn new(raw: &str) -> Self {
        let original = raw.trim().to_string();
        let lower = original.to_lowercase();
        Self { original, lower }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }
}

/// Structured parameters for one matched action.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Read or maintenance actions that take no parameters.
    Query,
    LimitOrder {
        side: Side,
        price: f64,
        quantity: f64,
        user_pubkey: String,
    },
    MarketOrder {
        side: Side,
        amount: f64,
        user_pubkey: String,
    },
    ConfigUpdate(ConfigMapping),
    EncryptionToggle {
        enabled: bool,
    },
}

pub type Extraction = std::result::Result<Intent, ExtractionFailure>;

//
// ================= Rules =================
//

/// One spelling of a numeric field, e.g. "price 100" or "100 price".
pub struct NumericRule {
    pub name: &'static str,
    pattern: Regex,
}

impl NumericRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static extraction rule must compile"),
        }
    }

    /// First capture in `text` that parses as a positive finite number.
    pub fn apply(&self, text: &str) -> Option<f64> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| parse_positive(m.as_str()))
    }
}

/// One spelling of a token field such as the public key.
pub struct TokenRule {
    pub name: &'static str,
    pattern: Regex,
}

impl TokenRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static extraction rule must compile"),
        }
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

const NUM: &str = r"(\d+(?:\.\d+)?)";
// A number must not continue into more digits or a dotted tail; a single
// sentence-ending period is fine.
const NUM_END: &str = r"(?:[^\d.]|\.(?:\D|$)|$)";
const NUM_START: &str = r"(?:^|[^\d.])\b";

lazy_static! {
    pub static ref PRICE_RULES: Vec<NumericRule> = vec![
        NumericRule::new("price <n>", &format!(r"\bprice[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("at <n>", &format!(r"\bat[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("<n> price", &format!(r"{}{}[:\s]+price\b", NUM_START, NUM)),
    ];

    pub static ref QUANTITY_RULES: Vec<NumericRule> = vec![
        NumericRule::new("quantity <n>", &format!(r"\b(?:quantity|qty)[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("<n> units", &format!(r"{}{}\s*units?\b", NUM_START, NUM)),
        NumericRule::new("amount <n>", &format!(r"\bamount[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("<n> amount", &format!(r"{}{}[:\s]+amount\b", NUM_START, NUM)),
        NumericRule::new("buy|sell <n>", &format!(r"\b(?:buy|sell)[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("for <n>", &format!(r"\bfor[:\s]+{}{}", NUM, NUM_END)),
    ];

    pub static ref AMOUNT_RULES: Vec<NumericRule> = vec![
        NumericRule::new("amount <n>", &format!(r"\bamount[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("<n> amount", &format!(r"{}{}[:\s]+amount\b", NUM_START, NUM)),
        NumericRule::new("quantity <n>", &format!(r"\b(?:quantity|qty)[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("<n> units", &format!(r"{}{}\s*units?\b", NUM_START, NUM)),
        NumericRule::new("buy|sell <n>", &format!(r"\b(?:buy|sell)[:\s]+{}{}", NUM, NUM_END)),
        NumericRule::new("for <n>", &format!(r"\bfor[:\s]+{}{}", NUM, NUM_END)),
    ];

    // Run against the original-case text: base58 keys are case sensitive.
    pub static ref PUBLIC_KEY_RULES: Vec<TokenRule> = vec![
        TokenRule::new("user_pubkey=<k>", r"(?i)\buser_pubkey\s*[=:]\s*([A-Za-z0-9]+)"),
        TokenRule::new("public key <k>", r"(?i)\bpub(?:lic)?[\s_-]?key(?:\s+is)?[=:\s]+([A-Za-z0-9]+)"),
        TokenRule::new("key <k>", r"(?i)\bkey(?:\s+is)?[:\s]+([A-Za-z0-9]+)"),
        TokenRule::new("wallet <k>", r"(?i)\bwallet(?:\s+is)?[:\s]+([A-Za-z0-9]+)"),
    ];

    static ref SELL_KEYWORD: Regex = Regex::new(r"\bsell\b").expect("static extraction rule must compile");
    static ref BUY_KEYWORD: Regex = Regex::new(r"\bbuy\b").expect("static extraction rule must compile");

    static ref CONFIG_PAIR: Regex =
        Regex::new(r"([a-z_][a-z0-9_]*)\s*=\s*([^\s,]+)").expect("static extraction rule must compile");

    static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("static extraction rule must compile");
}

fn parse_positive(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Walk `rules` in order; the first one that yields a value wins.
pub fn first_numeric(rules: &[NumericRule], text: &str) -> Option<f64> {
    rules.iter().find_map(|rule| rule.apply(text))
}

pub fn first_token(rules: &[TokenRule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(text))
}

pub fn mentions_sell(lower: &str) -> bool {
    SELL_KEYWORD.is_match(lower)
}

pub fn mentions_buy(lower: &str) -> bool {
    BUY_KEYWORD.is_match(lower)
}

/// "sell" is checked before "buy"; no polarity keyword means no side.
pub fn resolve_side(lower: &str) -> Option<Side> {
    if mentions_sell(lower) {
        Some(Side::Sell)
    } else if mentions_buy(lower) {
        Some(Side::Buy)
    } else {
        None
    }
}

/// Numeric when lexically numeric, otherwise kept as text.
pub fn coerce_config_value(raw: &str) -> ConfigValue {
    if NUMERIC_LITERAL.is_match(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return ConfigValue::Number(n);
        }
    }
    ConfigValue::Text(raw.to_string())
}

//
// ================= Per-action extractors =================
//

pub fn extract_query(_text: &CommandText) -> Extraction {
    Ok(Intent::Query)
}

pub fn extract_limit_order(text: &CommandText) -> Extraction {
    let side = resolve_side(text.lower());
    let price = first_numeric(&PRICE_RULES, text.lower());
    let quantity = first_numeric(&QUANTITY_RULES, text.lower());
    let user_pubkey = first_token(&PUBLIC_KEY_RULES, text.original());

    match (side, price, quantity, user_pubkey) {
        (Some(side), Some(price), Some(quantity), Some(user_pubkey)) => Ok(Intent::LimitOrder {
            side,
            price,
            quantity,
            user_pubkey,
        }),
        (side, price, quantity, user_pubkey) => {
            let mut missing = Vec::new();
            if side.is_none() {
                missing.push(FIELD_SIDE);
            }
            if price.is_none() {
                missing.push(FIELD_PRICE);
            }
            if quantity.is_none() {
                missing.push(FIELD_QUANTITY);
            }
            if user_pubkey.is_none() {
                missing.push(FIELD_PUBLIC_KEY);
            }
            Err(ExtractionFailure::new(missing))
        }
    }
}

fn extract_market_order(text: &CommandText, side: Side) -> Extraction {
    let amount = first_numeric(&AMOUNT_RULES, text.lower());
    let user_pubkey = first_token(&PUBLIC_KEY_RULES, text.original());

    match (amount, user_pubkey) {
        (Some(amount), Some(user_pubkey)) => Ok(Intent::MarketOrder {
            side,
            amount,
            user_pubkey,
        }),
        (amount, user_pubkey) => {
            let mut missing = Vec::new();
            if amount.is_none() {
                missing.push(FIELD_AMOUNT);
            }
            if user_pubkey.is_none() {
                missing.push(FIELD_PUBLIC_KEY);
            }
            Err(ExtractionFailure::new(missing))
        }
    }
}

pub fn extract_market_buy(text: &CommandText) -> Extraction {
    extract_market_order(text, Side::Buy)
}

pub fn extract_market_sell(text: &CommandText) -> Extraction {
    extract_market_order(text, Side::Sell)
}

/// `update config fee=0.1, min_order=0.01` → `{fee: 0.1, min_order: 0.01}`
pub fn extract_config_update(text: &CommandText) -> Extraction {
    let mut mapping = ConfigMapping::new();
    for caps in CONFIG_PAIR.captures_iter(text.lower()) {
        mapping.insert(&caps[1], coerce_config_value(&caps[2]));
    }

    if mapping.is_empty() {
        Err(ExtractionFailure::new(vec![FIELD_CONFIG_PAIRS]))
    } else {
        Ok(Intent::ConfigUpdate(mapping))
    }
}

pub fn extract_encryption_toggle(text: &CommandText) -> Extraction {
    let lower = text.lower();
    if lower.contains("disable") || lower.contains("turn off") {
        Ok(Intent::EncryptionToggle { enabled: false })
    } else if lower.contains("enable") || lower.contains("turn on") {
        Ok(Intent::EncryptionToggle { enabled: true })
    } else {
        Err(ExtractionFailure::new(vec![FIELD_ENCRYPTION_MODE]))
    }
}
