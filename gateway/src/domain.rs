//! Core data model (§3) — entities shared across components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Telephony provider's identifier for a call. Opaque, globally unique.
pub type CallId = String;

/// Telephony provider's identifier for the media stream.
pub type StreamId = String;

/// Closed set of terminal (and non-terminal) call statuses.
///
/// Transitions monotonically from `InProgress` to exactly one terminal
/// value (Invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    InProgress,
    Completed,
    Escalated,
    Failed,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CallStatus::InProgress)
    }

    pub fn as_sql_text(self) -> &'static str {
        match self {
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Escalated => "escalated",
            CallStatus::Failed => "failed",
        }
    }

    pub fn from_sql_text(s: &str) -> Option<Self> {
        Some(match s {
            "in_progress" => CallStatus::InProgress,
            "completed" => CallStatus::Completed,
            "escalated" => CallStatus::Escalated,
            "failed" => CallStatus::Failed,
            _ => return None,
        })
    }
}

/// Persisted row for a call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: i64,
    pub call_id: CallId,
    pub stream_id: StreamId,
    pub caller_phone: String,
    pub restaurant_phone: String,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub failure_reason: Option<String>,
}

/// Persisted row keyed by phone number.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: i64,
    pub phone_number: String,
    pub name: String,
}

/// Persisted order header row.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub restaurant_id: String,
    pub customer_id: i64,
    pub call_id: CallId,
    pub status: String,
    /// Total amount in cents (integer money to avoid float rounding drift).
    pub total_cents: i64,
}

/// Free-form notes bag attached to an order line item.
pub type Customizations = HashMap<String, String>;

/// A single persisted order line item.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub order_id: i64,
    pub item_name: String,
    pub quantity: i32,
    /// Unit price in cents.
    pub unit_price_cents: i64,
    pub customizations: Customizations,
}

/// A session-local cart entry (§4.2). `unit_price_cents` is authoritative —
/// it is either the [`crate::price_map`] lookup or, on miss, the
/// model-supplied price at the moment of `add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub item_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub notes: String,
}
