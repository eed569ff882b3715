//! `completeOrder` (§4.3.1) — async order persistence pipeline, wrapped in
//! a 3-attempt / 1 s retry loop. The cart is cleared only after the final
//! successful attempt; on exhaustion it is preserved for a human callback.

use super::StashedCustomer;
use crate::audio_constants::{ORDER_MAX_ATTEMPTS, ORDER_RETRY_DELAY_MS, TAX_RATE};
use crate::cart::Cart;
use crate::domain::CallId;
use crate::error::GatewayError;
use crate::persistence::{NewOrderItem, PersistenceGateway};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
}

/// Half-away-from-zero rounding to the nearest cent.
fn round_half_away_from_zero(x: f64) -> i64 {
    if x >= 0.0 {
        (x + 0.5).floor() as i64
    } else {
        (x - 0.5).ceil() as i64
    }
}

/// `SB-IRV-<first-six-upper-case-hex-chars of orderId>`.
fn order_number(order_id: i64) -> String {
    let hex = format!("{:06X}", order_id as u64);
    format!("SB-IRV-{}", &hex[..6])
}

async fn attempt<P: PersistenceGateway>(
    persistence: &P,
    restaurant_id: &str,
    call_id: &CallId,
    customer_name: &str,
    phone_number: &str,
    items: &[crate::domain::CartItem],
    total_cents: i64,
) -> Result<Value, GatewayError> {
    let customer = persistence
        .upsert_customer(phone_number, customer_name)
        .await
        .map_err(|e| GatewayError::Transient(e.to_string()))?;

    let order = persistence
        .insert_order(restaurant_id, customer.id, call_id, total_cents)
        .await
        .map_err(|e| GatewayError::Transient(e.to_string()))?;

    let new_items: Vec<NewOrderItem> = items
        .iter()
        .map(|i| {
            let mut customizations = std::collections::HashMap::new();
            if !i.notes.is_empty() {
                customizations.insert("notes".to_string(), i.notes.clone());
            }
            NewOrderItem {
                item_name: i.item_name.clone(),
                quantity: i.quantity,
                unit_price_cents: i.unit_price_cents,
                customizations,
            }
        })
        .collect();

    persistence
        .insert_order_items(order.id, &new_items)
        .await
        .map_err(|e| GatewayError::Transient(e.to_string()))?;

    Ok(json!({
        "result": "Order confirmed, thank you!",
        "orderId": order.id,
        "orderNumber": order_number(order.id),
        "total": total_cents as f64 / 100.0,
    }))
}

pub async fn handle<P: PersistenceGateway>(
    args: &Value,
    cart: &mut Cart,
    stash: &mut StashedCustomer,
    restaurant_id: &str,
    call_id: &CallId,
    persistence: &P,
) -> Result<Value, GatewayError> {
    let parsed: Args = serde_json::from_value(args.clone())
        .map_err(|e| GatewayError::InvalidArgument(format!("completeOrder: {e}")))?;

    if cart.is_empty() {
        return Ok(json!({ "result": "Error: cart is empty", "orderId": Value::Null }));
    }

    let customer_name = parsed
        .customer_name
        .or_else(|| stash.name.clone())
        .ok_or_else(|| GatewayError::InvalidArgument("completeOrder: missing customerName".into()))?;
    let phone_number = parsed
        .phone_number
        .or_else(|| stash.phone_number.clone())
        .ok_or_else(|| GatewayError::InvalidArgument("completeOrder: missing phoneNumber".into()))?;

    let subtotal_cents = cart.subtotal_cents();
    let total_cents = round_half_away_from_zero(subtotal_cents as f64 * (1.0 + TAX_RATE));
    let items: Vec<_> = cart.items().to_vec();

    let mut last_err = None;
    for attempt_no in 1..=ORDER_MAX_ATTEMPTS {
        match attempt(
            persistence,
            restaurant_id,
            call_id,
            &customer_name,
            &phone_number,
            &items,
            total_cents,
        )
        .await
        {
            Ok(result) => {
                cart.clear();
                return Ok(result);
            }
            Err(e) => {
                warn!(attempt = attempt_no, error = %e, "completeOrder attempt failed");
                last_err = Some(e);
                if attempt_no < ORDER_MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(ORDER_RETRY_DELAY_MS)).await;
                }
            }
        }
    }

    warn!(error = ?last_err, "completeOrder exhausted retries");
    Ok(json!({
        "result": "Sorry, we could not complete your order right now. Someone will follow up with you shortly.",
        "orderId": Value::Null,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{CreatedCall, InsertedOrder, PersistenceError, UpsertedCustomer};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGateway {
        fail_n_times: AtomicU32,
        insert_order_calls: Mutex<u32>,
    }

    #[async_trait]
    impl PersistenceGateway for FakeGateway {
        async fn create_call(
            &self,
            _call_id: &CallId,
            _stream_id: &str,
            _caller_phone: &str,
            _restaurant_phone: &str,
        ) -> Result<CreatedCall, PersistenceError> {
            unimplemented!()
        }
        async fn complete_call(
            &self,
            _call_id: &CallId,
            _started_at: DateTime<Utc>,
        ) -> Result<(), PersistenceError> {
            unimplemented!()
        }
        async fn escalate_call(&self, _call_id: &CallId) -> Result<(), PersistenceError> {
            unimplemented!()
        }
        async fn fail_call(
            &self,
            _call_id: &CallId,
            _reason: Option<&str>,
        ) -> Result<(), PersistenceError> {
            unimplemented!()
        }
        async fn upsert_customer(
            &self,
            _phone_number: &str,
            _name: &str,
        ) -> Result<UpsertedCustomer, PersistenceError> {
            Ok(UpsertedCustomer { id: 1 })
        }
        async fn insert_order(
            &self,
            _restaurant_id: &str,
            _customer_id: i64,
            _call_id: &CallId,
            _total_cents: i64,
        ) -> Result<InsertedOrder, PersistenceError> {
            *self.insert_order_calls.lock().unwrap() += 1;
            if self.fail_n_times.load(Ordering::SeqCst) > 0 {
                self.fail_n_times.fetch_sub(1, Ordering::SeqCst);
                return Err(PersistenceError::Transient("simulated".into()));
            }
            Ok(InsertedOrder { id: 0xABCDEF })
        }
        async fn insert_order_items(
            &self,
            _order_id: i64,
            _items: &[NewOrderItem],
        ) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_cart_returns_error_without_writing() {
        let gateway = FakeGateway::default();
        let mut cart = Cart::new();
        let mut stash = StashedCustomer::default();
        let result = handle(
            &json!({ "customerName": "Ada", "phoneNumber": "5551234567" }),
            &mut cart,
            &mut stash,
            "restaurant-1",
            &"call-1".to_string(),
            &gateway,
        )
        .await
        .unwrap();
        assert_eq!(result["result"], "Error: cart is empty");
        assert_eq!(result["orderId"], Value::Null);
        assert_eq!(*gateway.insert_order_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn happy_path_two_items() {
        let gateway = FakeGateway::default();
        let mut cart = Cart::new();
        cart.add("Masala Dosa", 1, 0, "");
        cart.add("Mango Lassi", 1, 0, "");
        let mut stash = StashedCustomer::default();

        let result = handle(
            &json!({ "customerName": "Ada", "phoneNumber": "5551234567" }),
            &mut cart,
            &mut stash,
            "restaurant-1",
            &"call-1".to_string(),
            &gateway,
        )
        .await
        .unwrap();

        assert_eq!(result["total"], 19.47);
        let order_number = result["orderNumber"].as_str().unwrap();
        assert!(order_number.starts_with("SB-IRV-"));
        assert_eq!(order_number.len(), "SB-IRV-".len() + 6);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let gateway = FakeGateway {
            fail_n_times: AtomicU32::new(2),
            ..Default::default()
        };
        let mut cart = Cart::new();
        cart.add("Masala Dosa", 1, 0, "");
        let mut stash = StashedCustomer::default();

        let result = handle(
            &json!({ "customerName": "Ada", "phoneNumber": "5551234567" }),
            &mut cart,
            &mut stash,
            "restaurant-1",
            &"call-1".to_string(),
            &gateway,
        )
        .await
        .unwrap();

        assert!(result["orderId"].is_number());
        assert_eq!(*gateway.insert_order_calls.lock().unwrap(), 3);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn exhausts_retries_and_preserves_cart() {
        let gateway = FakeGateway {
            fail_n_times: AtomicU32::new(10),
            ..Default::default()
        };
        let mut cart = Cart::new();
        cart.add("Masala Dosa", 1, 0, "");
        let mut stash = StashedCustomer::default();

        let result = handle(
            &json!({ "customerName": "Ada", "phoneNumber": "5551234567" }),
            &mut cart,
            &mut stash,
            "restaurant-1",
            &"call-1".to_string(),
            &gateway,
        )
        .await
        .unwrap();

        assert_eq!(result["orderId"], Value::Null);
        assert!(!cart.is_empty());
        assert_eq!(*gateway.insert_order_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn falls_back_to_stashed_customer_details() {
        let gateway = FakeGateway::default();
        let mut cart = Cart::new();
        cart.add("Masala Dosa", 1, 0, "");
        let mut stash = StashedCustomer {
            name: Some("Stashed Name".into()),
            phone_number: Some("5550000000".into()),
        };

        let result = handle(&json!({}), &mut cart, &mut stash, "restaurant-1", &"call-1".to_string(), &gateway)
            .await
            .unwrap();
        assert!(result["orderId"].is_number());
    }
}
