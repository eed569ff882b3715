//! Idempotent schema creation — `CREATE TABLE IF NOT EXISTS` for the four
//! tables this gateway owns. Run once at startup; safe to run repeatedly.

use deadpool_postgres::Pool;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS calls (
    id               BIGSERIAL PRIMARY KEY,
    call_id          TEXT NOT NULL UNIQUE,
    stream_id        TEXT NOT NULL,
    caller_phone     TEXT NOT NULL,
    restaurant_phone TEXT NOT NULL,
    status           TEXT NOT NULL,
    started_at       TIMESTAMPTZ NOT NULL,
    ended_at         TIMESTAMPTZ,
    duration_seconds BIGINT,
    failure_reason   TEXT
);

CREATE TABLE IF NOT EXISTS customers (
    id            BIGSERIAL PRIMARY KEY,
    phone_number  TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id            BIGSERIAL PRIMARY KEY,
    restaurant_id TEXT NOT NULL,
    customer_id   BIGINT NOT NULL REFERENCES customers(id),
    call_id       TEXT NOT NULL,
    status        TEXT NOT NULL,
    total_cents   BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_items (
    id               BIGSERIAL PRIMARY KEY,
    order_id         BIGINT NOT NULL REFERENCES orders(id),
    item_name        TEXT NOT NULL,
    quantity         INTEGER NOT NULL,
    unit_price_cents BIGINT NOT NULL,
    customizations   JSONB NOT NULL DEFAULT '{}'::jsonb
);
";

/// Create the four tables if they do not already exist.
pub async fn ensure_schema(pool: &Pool) -> Result<(), deadpool_postgres::PoolError> {
    let client = pool.get().await?;
    for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        client
            .batch_execute(statement)
            .await
            .map_err(deadpool_postgres::PoolError::Backend)?;
    }
    Ok(())
}
