//! Session-local cart and its two mutators (§4.2).
//!
//! The Cart is mutated only on the owning Session's event loop (Invariant
//! 2) — it holds no internal locking of its own.

use crate::domain::CartItem;
use crate::price_map;
use tracing::warn;

#[derive(Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Short success token returned by both mutators.
pub const OK: &str = "ok";

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// `add(name, qty, modelPrice, notes)` — replace-on-duplicate semantics.
    ///
    /// `price = PriceMap[name]` if present, else `modelPrice` (logging a
    /// `price_map_miss` warning). If an item with the same name exists its
    /// quantity and price are replaced outright; notes are replaced only
    /// when the supplied notes are non-empty. Never fails on a price-map
    /// miss.
    pub fn add(&mut self, name: &str, qty: i32, model_price_cents: i64, notes: &str) -> &'static str {
        let price_cents = match price_map::lookup(name) {
            Some(p) => p,
            None => {
                warn!(item = name, model_price_cents, "price_map_miss");
                model_price_cents
            }
        };

        if let Some(existing) = self.items.iter_mut().find(|i| i.item_name == name) {
            existing.quantity = qty;
            existing.unit_price_cents = price_cents;
            if !notes.is_empty() {
                existing.notes = notes.to_string();
            }
        } else {
            self.items.push(CartItem {
                item_name: name.to_string(),
                quantity: qty,
                unit_price_cents: price_cents,
                notes: notes.to_string(),
            });
        }
        OK
    }

    /// `remove(name)` — drop every entry whose name equals `name`.
    pub fn remove(&mut self, name: &str) -> &'static str {
        self.items.retain(|i| i.item_name != name);
        OK
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Subtotal in cents, for logging and `completeOrder`.
    pub fn subtotal_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.unit_price_cents * i.quantity as i64)
            .sum()
    }

    /// Drain and discard all items — called once `completeOrder` succeeds.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
