//! `collectCustomerDetails` (optional tool, §4.3) — in-memory stash of
//! validated details, used as a fallback by `completeOrder`.

use super::StashedCustomer;
use crate::error::GatewayError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    customer_name: String,
    phone_number: String,
}

pub fn handle(args: &Value, stash: &mut StashedCustomer) -> Result<Value, GatewayError> {
    let parsed: Args = serde_json::from_value(args.clone())
        .map_err(|e| GatewayError::InvalidArgument(format!("collectCustomerDetails: {e}")))?;

    stash.name = Some(parsed.customer_name);
    stash.phone_number = Some(parsed.phone_number);

    Ok(json!({ "result": "Got it, thanks." }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stashes_details() {
        let mut stash = StashedCustomer::default();
        handle(
            &json!({ "customerName": "Ada", "phoneNumber": "5551234567" }),
            &mut stash,
        )
        .unwrap();
        assert_eq!(stash.name.as_deref(), Some("Ada"));
        assert_eq!(stash.phone_number.as_deref(), Some("5551234567"));
    }

    #[test]
    fn rejects_missing_field() {
        let mut stash = StashedCustomer::default();
        assert!(handle(&json!({ "customerName": "Ada" }), &mut stash).is_err());
    }
}
