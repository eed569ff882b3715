//! Thin, typed wrapper over the four relational tables (§4.4): `calls`,
//! `customers`, `orders`, `order_items`.

pub mod migration;
pub mod postgres;

use crate::domain::{CallId, Customizations};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use postgres::PostgresGateway;

/// Error kinds a [`PersistenceGateway`] method can throw. The `completeOrder`
/// retry loop (§4.3.1) treats any of these as retryable; callers of the
/// call-lifecycle methods treat all of them as non-fatal and log-and-swallow.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

#[derive(Debug, Clone)]
pub struct CreatedCall {
    pub id: i64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpsertedCustomer {
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct InsertedOrder {
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub item_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub customizations: Customizations,
}

/// Object-safe persistence boundary — one production implementation
/// ([`PostgresGateway`]), swappable for a fake in tests.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn create_call(
        &self,
        call_id: &CallId,
        stream_id: &str,
        caller_phone: &str,
        restaurant_phone: &str,
    ) -> Result<CreatedCall, PersistenceError>;

    async fn complete_call(
        &self,
        call_id: &CallId,
        started_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    async fn escalate_call(&self, call_id: &CallId) -> Result<(), PersistenceError>;

    async fn fail_call(
        &self,
        call_id: &CallId,
        reason: Option<&str>,
    ) -> Result<(), PersistenceError>;

    async fn upsert_customer(
        &self,
        phone_number: &str,
        name: &str,
    ) -> Result<UpsertedCustomer, PersistenceError>;

    async fn insert_order(
        &self,
        restaurant_id: &str,
        customer_id: i64,
        call_id: &CallId,
        total_cents: i64,
    ) -> Result<InsertedOrder, PersistenceError>;

    async fn insert_order_items(
        &self,
        order_id: i64,
        items: &[NewOrderItem],
    ) -> Result<(), PersistenceError>;
}
