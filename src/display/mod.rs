//! Local display cache
//!
//! Holds the last fetched order/fill snapshot for one session plus the
//! encryption-visibility flag. Numeric values are only ever replaced by a
//! successful fetch; the flag only changes how they are rendered.

use crate::models::{RemoteFill, RemoteOrder, Side};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Width of the obscured representation, in hex characters.
pub const OBSCURED_WIDTH: usize = 6;
const PUBKEY_DISPLAY_LEN: usize = 8;

/// Fixed-width, encrypted-looking stand-in for a value.
///
/// Derived from a hash of the value and its salt, so the same cached value
/// always renders the same way.
pub fn obscure(salt: &str, value: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(value.to_string().as_bytes());
    let mut encoded = hex::encode_upper(hasher.finalize());
    encoded.truncate(OBSCURED_WIDTH);
    encoded
}

pub fn truncate_key(key: &str) -> String {
    if key.chars().count() <= PUBKEY_DISPLAY_LEN {
        key.to_string()
    } else {
        let head: String = key.chars().take(PUBKEY_DISPLAY_LEN).collect();
        format!("{}...", head)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub id: Option<u64>,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub user_pubkey: String,
    obscured_price: String,
    obscured_quantity: String,
}

impl OrderView {
    pub fn new(id: Option<u64>, side: Side, price: f64, quantity: f64, user_pubkey: String) -> Self {
        let salt = format!("order:{}:{}", id.unwrap_or_default(), side);
        Self {
            id,
            side,
            price,
            quantity,
            obscured_price: obscure(&format!("{}:price", salt), price),
            obscured_quantity: obscure(&format!("{}:quantity", salt), quantity),
            user_pubkey,
        }
    }

    /// The service does not always echo the side; the list it came from
    /// decides.
    pub fn from_remote(order: &RemoteOrder, listed_side: Side) -> Self {
        Self::new(
            order.id,
            order.side.unwrap_or(listed_side),
            order.price,
            order.quantity,
            order.user_pubkey.clone(),
        )
    }

    pub fn obscured_price(&self) -> &str {
        &self.obscured_price
    }

    pub fn obscured_quantity(&self) -> &str {
        &self.obscured_quantity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillView {
    pub price: f64,
    pub quantity: f64,
    pub time: Option<String>,
    pub buy_order_id: Option<u64>,
    pub sell_order_id: Option<u64>,
    obscured_price: String,
    obscured_quantity: String,
}

impl FillView {
    pub fn from_remote(fill: &RemoteFill) -> Self {
        let salt = format!(
            "fill:{}:{}",
            fill.buy_order_id.unwrap_or_default(),
            fill.sell_order_id.unwrap_or_default()
        );
        Self {
            price: fill.price,
            quantity: fill.quantity,
            time: fill
                .timestamp
                .as_ref()
                .and_then(|ts| ts.to_datetime())
                .map(|dt| dt.format("%H:%M").to_string()),
            buy_order_id: fill.buy_order_id,
            sell_order_id: fill.sell_order_id,
            obscured_price: obscure(&format!("{}:price", salt), fill.price),
            obscured_quantity: obscure(&format!("{}:quantity", salt), fill.quantity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedOrder {
    pub price: String,
    pub quantity: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedFill {
    pub price: String,
    pub quantity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Read-time projection of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayView {
    pub encryption_visible: bool,
    pub buy_orders: Vec<RenderedOrder>,
    pub sell_orders: Vec<RenderedOrder>,
    pub fills: Vec<RenderedFill>,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayCache {
    buy_orders: Vec<OrderView>,
    sell_orders: Vec<OrderView>,
    fills: Vec<FillView>,
    encryption_visible: bool,
}

impl DisplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything. No merging: the remote service is authoritative.
    pub fn set_snapshot(&mut self, buy_orders: Vec<OrderView>, sell_orders: Vec<OrderView>, fills: Vec<FillView>) {
        self.set_orders(buy_orders, sell_orders);
        self.set_fills(fills);
    }

    pub fn set_orders(&mut self, mut buy_orders: Vec<OrderView>, mut sell_orders: Vec<OrderView>) {
        buy_orders.sort_by(|a, b| b.price.total_cmp(&a.price));
        sell_orders.sort_by(|a, b| a.price.total_cmp(&b.price));
        self.buy_orders = buy_orders;
        self.sell_orders = sell_orders;
    }

    pub fn set_fills(&mut self, fills: Vec<FillView>) {
        self.fills = fills;
    }

    pub fn buy_orders(&self) -> &[OrderView] {
        &self.buy_orders
    }

    pub fn sell_orders(&self) -> &[OrderView] {
        &self.sell_orders
    }

    pub fn fills(&self) -> &[FillView] {
        &self.fills
    }

    pub fn encryption_visible(&self) -> bool {
        self.encryption_visible
    }

    pub fn set_encryption_visible(&mut self, visible: bool) {
        self.encryption_visible = visible;
    }

    /// Flip the flag and return the new value.
    pub fn toggle_visibility(&mut self) -> bool {
        self.encryption_visible = !self.encryption_visible;
        self.encryption_visible
    }

    fn project(&self, plain: f64, obscured: &str) -> String {
        if self.encryption_visible {
            obscured.to_string()
        } else {
            plain.to_string()
        }
    }

    fn render_order(&self, order: &OrderView) -> RenderedOrder {
        RenderedOrder {
            price: self.project(order.price, order.obscured_price()),
            quantity: self.project(order.quantity, order.obscured_quantity()),
            user: truncate_key(&order.user_pubkey),
        }
    }

    pub fn render(&self) -> DisplayView {
        DisplayView {
            encryption_visible: self.encryption_visible,
            buy_orders: self.buy_orders.iter().map(|o| self.render_order(o)).collect(),
            sell_orders: self.sell_orders.iter().map(|o| self.render_order(o)).collect(),
            fills: self
                .fills
                .iter()
                .map(|f| RenderedFill {
                    price: self.project(f.price, &f.obscured_price),
                    quantity: self.project(f.quantity, &f.obscured_quantity),
                    time: f.time.clone(),
                })
                .collect(),
        }
    }

    pub fn render_orders_text(&self) -> String {
        let view = self.render();
        let mut out = String::from("Here are the current orders in the encrypted orderbook:\n");
        if view.encryption_visible {
            out.push_str("🔒 Orders are encrypted with FHE\n");
        }

        for (title, orders, empty) in [
            ("Buy Orders", &view.buy_orders, "- No buy orders currently"),
            ("Sell Orders", &view.sell_orders, "- No sell orders currently"),
        ] {
            out.push_str(&format!("\n{}:\n", title));
            if orders.is_empty() {
                out.push_str(empty);
                out.push('\n');
            }
            for order in orders {
                out.push_str(&format!(
                    "- Price: {}, Quantity: {}, User: {}\n",
                    order.price, order.quantity, order.user
                ));
            }
        }

        out
    }

    pub fn render_fills_text(&self) -> String {
        let view = self.render();
        if view.fills.is_empty() {
            return "There are no fills in the orderbook yet.".to_string();
        }

        let mut out = format!("I found {} fill(s) in the orderbook:\n", view.fills.len());
        for fill in &view.fills {
            out.push_str(&format!("- Price: {}, Quantity: {}", fill.price, fill.quantity));
            if let Some(time) = &fill.time {
                out.push_str(&format!(", Time: {}", time));
            }
            out.push('\n');
        }
        out
    }
}
