//! PostgreSQL implementation of [`super::PersistenceGateway`].
//!
//! Uses `deadpool-postgres` for async connection pooling — natively async,
//! `$1`/`$2`/... parameter placeholders, JSONB for the free-form
//! `customizations` bag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde_json::json;
use tokio_postgres::NoTls;

use super::{
    CreatedCall, InsertedOrder, NewOrderItem, PersistenceError, PersistenceGateway,
    UpsertedCustomer,
};
use crate::domain::{CallId, CallStatus};

pub struct PostgresGateway {
    pool: Pool,
}

impl PostgresGateway {
    /// Build a connection pool from a `postgres://…` URL.
    pub fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let mut cfg = Config::new();
        cfg.url = Some(database_url.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| PersistenceError::Permanent(format!("pool configuration: {e}")))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

fn map_pg_error(e: tokio_postgres::Error) -> PersistenceError {
    if let Some(db) = e.as_db_error() {
        if db.code() == &tokio_postgres::error::SqlState::UNIQUE_VIOLATION {
            return PersistenceError::Conflict(db.message().to_string());
        }
    }
    PersistenceError::Transient(e.to_string())
}

fn map_pool_error(e: deadpool_postgres::PoolError) -> PersistenceError {
    PersistenceError::Transient(e.to_string())
}

#[async_trait]
impl PersistenceGateway for PostgresGateway {
    async fn create_call(
        &self,
        call_id: &CallId,
        stream_id: &str,
        caller_phone: &str,
        restaurant_phone: &str,
    ) -> Result<CreatedCall, PersistenceError> {
        if call_id.is_empty() || stream_id.is_empty() {
            return Err(PersistenceError::NotFound(
                "call_id/stream_id required".into(),
            ));
        }
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let row = client
            .query_one(
                "INSERT INTO calls (call_id, stream_id, caller_phone, restaurant_phone, status, started_at)
                 VALUES ($1, $2, $3, $4, $5, now())
                 RETURNING id, started_at",
                &[
                    &call_id,
                    &stream_id,
                    &caller_phone,
                    &restaurant_phone,
                    &CallStatus::InProgress.as_sql_text(),
                ],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(CreatedCall {
            id: row.get("id"),
            started_at: row.get("started_at"),
        })
    }

    async fn complete_call(
        &self,
        call_id: &CallId,
        started_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let duration = (Utc::now() - started_at).num_seconds();
        client
            .execute(
                "UPDATE calls SET status = $1, ended_at = now(), duration_seconds = $2 WHERE call_id = $3",
                &[&CallStatus::Completed.as_sql_text(), &duration, &call_id],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(())
    }

    async fn escalate_call(&self, call_id: &CallId) -> Result<(), PersistenceError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        client
            .execute(
                "UPDATE calls SET status = $1, ended_at = now() WHERE call_id = $2",
                &[&CallStatus::Escalated.as_sql_text(), &call_id],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(())
    }

    async fn fail_call(
        &self,
        call_id: &CallId,
        reason: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        client
            .execute(
                "UPDATE calls SET status = $1, ended_at = now(), failure_reason = $2 WHERE call_id = $3",
                &[&CallStatus::Failed.as_sql_text(), &reason, &call_id],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(())
    }

    async fn upsert_customer(
        &self,
        phone_number: &str,
        name: &str,
    ) -> Result<UpsertedCustomer, PersistenceError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let row = client
            .query_one(
                "INSERT INTO customers (phone_number, name)
                 VALUES ($1, $2)
                 ON CONFLICT (phone_number) DO UPDATE SET name = EXCLUDED.name
                 RETURNING id",
                &[&phone_number, &name],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(UpsertedCustomer { id: row.get("id") })
    }

    async fn insert_order(
        &self,
        restaurant_id: &str,
        customer_id: i64,
        call_id: &CallId,
        total_cents: i64,
    ) -> Result<InsertedOrder, PersistenceError> {
        let client = self.pool.get().await.map_err(map_pool_error)?;
        let row = client
            .query_one(
                "INSERT INTO orders (restaurant_id, customer_id, call_id, status, total_cents)
                 VALUES ($1, $2, $3, 'confirmed', $4)
                 RETURNING id",
                &[&restaurant_id, &customer_id, &call_id, &total_cents],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(InsertedOrder { id: row.get("id") })
    }

    async fn insert_order_items(
        &self,
        order_id: i64,
        items: &[NewOrderItem],
    ) -> Result<(), PersistenceError> {
        let mut client = self.pool.get().await.map_err(map_pool_error)?;
        let txn = client
            .transaction()
            .await
            .map_err(map_pg_error)?;
        for item in items {
            // `item.customizations` is already shaped as `{notes: …}` (or
            // empty) by the completeOrder pipeline — serialize as-is.
            let customizations = json!(item.customizations);
            txn.execute(
                "INSERT INTO order_items (order_id, item_name, quantity, unit_price_cents, customizations)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &order_id,
                    &item.item_name,
                    &item.quantity,
                    &item.unit_price_cents,
                    &customizations,
                ],
            )
            .await
            .map_err(map_pg_error)?;
        }
        txn.commit().await.map_err(map_pg_error)?;
        Ok(())
    }
}
