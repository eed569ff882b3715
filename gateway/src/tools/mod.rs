//! Dispatcher from model-issued tool calls to cart and persistence
//! operations (§4.3). Argument validation happens once at this boundary;
//! individual handlers see only well-typed values. No handler is allowed
//! to raise into the session loop — every path returns a shape-compliant
//! `ToolCallResponse`.

pub mod collect_customer_details;
pub mod complete_order;
pub mod manage_order;
pub mod search_menu;

use crate::cart::Cart;
use crate::domain::CallId;
use crate::persistence::PersistenceGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// A model-issued tool call, as received in a `toolCall.functionCalls[*]`
/// batch (§4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// A single reply in the `sendToolResponse` batch (§4.6).
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

const APOLOGY: &str = "Sorry, there was a brief error. Please try again.";

fn apology(id: &str, name: &str) -> ToolCallResponse {
    ToolCallResponse {
        id: id.to_string(),
        name: name.to_string(),
        response: serde_json::json!({ "result": APOLOGY }),
    }
}

/// In-memory stash of customer details collected via `collectCustomerDetails`,
/// consulted as a fallback by `completeOrder` when the model omits them.
#[derive(Debug, Clone, Default)]
pub struct StashedCustomer {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

/// Stateless dispatcher — holds only the shared collaborators every call
/// needs. Each invocation is owned by exactly one session and does not
/// escape it (the caller passes in that session's mutable [`Cart`] and
/// stash by reference).
pub struct ToolRouter<P: PersistenceGateway> {
    persistence: Arc<P>,
    restaurant_id: String,
}

impl<P: PersistenceGateway> ToolRouter<P> {
    pub fn new(persistence: Arc<P>, restaurant_id: String) -> Self {
        Self {
            persistence,
            restaurant_id,
        }
    }

    pub async fn dispatch(
        &self,
        call: ToolCallRequest,
        cart: &mut Cart,
        call_id: &CallId,
        stash: &mut StashedCustomer,
    ) -> ToolCallResponse {
        let result = match call.name.as_str() {
            "searchMenu" => search_menu::handle(&call.args),
            "manageOrder" => manage_order::handle(&call.args, cart),
            "collectCustomerDetails" => {
                collect_customer_details::handle(&call.args, stash)
            }
            "completeOrder" => {
                return match complete_order::handle(
                    &call.args,
                    cart,
                    stash,
                    &self.restaurant_id,
                    call_id,
                    self.persistence.as_ref(),
                )
                .await
                {
                    Ok(v) => ToolCallResponse {
                        id: call.id,
                        name: call.name,
                        response: v,
                    },
                    Err(e) => {
                        warn!(error = %e, tool = "completeOrder", "tool handler failed");
                        apology(&call.id, &call.name)
                    }
                };
            }
            other => {
                warn!(tool = other, "unknown tool name");
                Err(crate::error::GatewayError::InvalidArgument(format!(
                    "unknown tool: {other}"
                )))
            }
        };

        match result {
            Ok(v) => ToolCallResponse {
                id: call.id,
                name: call.name,
                response: v,
            },
            Err(e) => {
                warn!(error = %e, tool = %call.name, "tool handler failed");
                apology(&call.id, &call.name)
            }
        }
    }
}
