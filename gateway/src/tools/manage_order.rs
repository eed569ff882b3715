//! `manageOrder` (§4.3) — `{action ∈ {add, remove}, itemName, quantity ≥ 1,
//! price ≥ 0, notes?}` → Cart mutation.

use crate::cart::Cart;
use crate::error::GatewayError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    action: Action,
    item_name: String,
    #[serde(default)]
    quantity: Option<i32>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Action {
    Add,
    Remove,
}

pub fn handle(args: &Value, cart: &mut Cart) -> Result<Value, GatewayError> {
    let parsed: Args = serde_json::from_value(args.clone())
        .map_err(|e| GatewayError::InvalidArgument(format!("manageOrder: {e}")))?;

    match parsed.action {
        Action::Add => {
            let quantity = parsed.quantity.ok_or_else(|| {
                GatewayError::InvalidArgument("manageOrder add requires quantity".into())
            })?;
            if quantity < 1 {
                return Err(GatewayError::InvalidArgument(
                    "manageOrder add requires quantity >= 1".into(),
                ));
            }
            let price = parsed.price.ok_or_else(|| {
                GatewayError::InvalidArgument("manageOrder add requires price".into())
            })?;
            if price < 0.0 {
                return Err(GatewayError::InvalidArgument(
                    "manageOrder add requires price >= 0".into(),
                ));
            }
            let model_price_cents = (price * 100.0).round() as i64;
            cart.add(
                &parsed.item_name,
                quantity,
                model_price_cents,
                parsed.notes.as_deref().unwrap_or(""),
            );
        }
        Action::Remove => {
            cart.remove(&parsed.item_name);
        }
    }

    Ok(json!({ "result": "Cart updated successfully." }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_mutates_cart() {
        let mut cart = Cart::new();
        let result = handle(
            &json!({ "action": "add", "itemName": "Masala Dosa", "quantity": 1, "price": 11.49 }),
            &mut cart,
        )
        .unwrap();
        assert_eq!(result["result"], "Cart updated successfully.");
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn remove_mutates_cart() {
        let mut cart = Cart::new();
        cart.add("Masala Dosa", 1, 0, "");
        handle(&json!({ "action": "remove", "itemName": "Masala Dosa" }), &mut cart).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn add_rejects_zero_quantity() {
        let mut cart = Cart::new();
        let err = handle(
            &json!({ "action": "add", "itemName": "Masala Dosa", "quantity": 0, "price": 1.0 }),
            &mut cart,
        );
        assert!(err.is_err());
    }

    #[test]
    fn add_rejects_negative_price() {
        let mut cart = Cart::new();
        let err = handle(
            &json!({ "action": "add", "itemName": "Masala Dosa", "quantity": 1, "price": -1.0 }),
            &mut cart,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_action() {
        let mut cart = Cart::new();
        let err = handle(&json!({ "action": "bogus", "itemName": "x" }), &mut cart);
        assert!(err.is_err());
    }
}
