//! End-to-end tool-dispatch scenarios against the public `ToolRouter`
//! surface, using an in-memory fake in place of Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use voice_gateway_core::cart::Cart;
use voice_gateway_core::domain::CallId;
use voice_gateway_core::persistence::{
    CreatedCall, InsertedOrder, NewOrderItem, PersistenceError, PersistenceGateway,
    UpsertedCustomer,
};
use voice_gateway_core::tools::{StashedCustomer, ToolCallRequest, ToolRouter};

#[derive(Default)]
struct RecordingGateway {
    next_order_id: AtomicI64,
    orders: Mutex<Vec<(i64, i64)>>, // (customer_id, total_cents)
    items: Mutex<Vec<NewOrderItem>>,
}

#[async_trait]
impl PersistenceGateway for RecordingGateway {
    async fn create_call(
        &self,
        _call_id: &CallId,
        _stream_id: &str,
        _caller_phone: &str,
        _restaurant_phone: &str,
    ) -> Result<CreatedCall, PersistenceError> {
        Ok(CreatedCall {
            id: 1,
            started_at: Utc::now(),
        })
    }

    async fn complete_call(&self, _call_id: &CallId, _started_at: DateTime<Utc>) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn escalate_call(&self, _call_id: &CallId) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn fail_call(&self, _call_id: &CallId, _reason: Option<&str>) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn upsert_customer(&self, _phone_number: &str, _name: &str) -> Result<UpsertedCustomer, PersistenceError> {
        Ok(UpsertedCustomer { id: 42 })
    }

    async fn insert_order(
        &self,
        _restaurant_id: &str,
        customer_id: i64,
        _call_id: &CallId,
        total_cents: i64,
    ) -> Result<InsertedOrder, PersistenceError> {
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.lock().unwrap().push((customer_id, total_cents));
        Ok(InsertedOrder { id })
    }

    async fn insert_order_items(&self, _order_id: i64, items: &[NewOrderItem]) -> Result<(), PersistenceError> {
        self.items.lock().unwrap().extend_from_slice(items);
        Ok(())
    }
}

#[tokio::test]
async fn add_two_items_then_complete_order_persists_and_clears_cart() {
    let gateway = Arc::new(RecordingGateway::default());
    let router = ToolRouter::new(gateway.clone(), "restaurant-1".to_string());
    let mut cart = Cart::new();
    let mut stash = StashedCustomer::default();
    let call_id = "call-s1".to_string();

    router
        .dispatch(
            ToolCallRequest {
                id: "1".into(),
                name: "manageOrder".into(),
                args: json!({ "action": "add", "itemName": "Masala Dosa", "quantity": 1, "price": 11.49 }),
            },
            &mut cart,
            &call_id,
            &mut stash,
        )
        .await;
    router
        .dispatch(
            ToolCallRequest {
                id: "2".into(),
                name: "manageOrder".into(),
                args: json!({ "action": "add", "itemName": "Mango Lassi", "quantity": 1, "price": 6.49 }),
            },
            &mut cart,
            &call_id,
            &mut stash,
        )
        .await;
    let response = router
        .dispatch(
            ToolCallRequest {
                id: "3".into(),
                name: "completeOrder".into(),
                args: json!({ "customerName": "Ada", "phoneNumber": "5551234567" }),
            },
            &mut cart,
            &call_id,
            &mut stash,
        )
        .await;

    assert_eq!(response.response["total"], 19.47);
    let order_number = response.response["orderNumber"].as_str().unwrap();
    assert!(order_number.starts_with("SB-IRV-"));
    assert!(cart.is_empty());
    assert_eq!(gateway.orders.lock().unwrap().len(), 1);
    assert_eq!(gateway.items.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn manage_order_uses_price_map_over_model_supplied_price() {
    let gateway = Arc::new(RecordingGateway::default());
    let router = ToolRouter::new(gateway, "restaurant-1".to_string());
    let mut cart = Cart::new();
    let mut stash = StashedCustomer::default();

    router
        .dispatch(
            ToolCallRequest {
                id: "1".into(),
                name: "manageOrder".into(),
                args: json!({ "action": "add", "itemName": "Masala Dosa", "quantity": 2, "price": 9.99 }),
            },
            &mut cart,
            &"call-s2".to_string(),
            &mut stash,
        )
        .await;

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].unit_price_cents, 1149);
    assert_eq!(cart.items()[0].quantity, 2);
}

#[tokio::test]
async fn duplicate_add_replaces_quantity_and_notes() {
    let gateway = Arc::new(RecordingGateway::default());
    let router = ToolRouter::new(gateway, "restaurant-1".to_string());
    let mut cart = Cart::new();
    let mut stash = StashedCustomer::default();
    let call_id = "call-s3".to_string();

    router
        .dispatch(
            ToolCallRequest {
                id: "1".into(),
                name: "manageOrder".into(),
                args: json!({ "action": "add", "itemName": "Plain Dosa", "quantity": 1, "price": 9.99 }),
            },
            &mut cart,
            &call_id,
            &mut stash,
        )
        .await;
    router
        .dispatch(
            ToolCallRequest {
                id: "2".into(),
                name: "manageOrder".into(),
                args: json!({ "action": "add", "itemName": "Plain Dosa", "quantity": 3, "price": 9.99, "notes": "extra crispy" }),
            },
            &mut cart,
            &call_id,
            &mut stash,
        )
        .await;

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].quantity, 3);
    assert_eq!(cart.items()[0].notes, "extra crispy");
}

#[tokio::test]
async fn unknown_tool_name_returns_apology_without_panicking() {
    let gateway = Arc::new(RecordingGateway::default());
    let router = ToolRouter::new(gateway, "restaurant-1".to_string());
    let mut cart = Cart::new();
    let mut stash = StashedCustomer::default();

    let response = router
        .dispatch(
            ToolCallRequest {
                id: "1".into(),
                name: "bogusTool".into(),
                args: json!({}),
            },
            &mut cart,
            &"call-unknown".to_string(),
            &mut stash,
        )
        .await;

    assert!(response.response["result"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("error"));
}
