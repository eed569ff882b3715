//! `searchMenu` (optional tool, §4.3, §9) — lookup in the [`crate::price_map`]
//! returning `{itemName, price}` or a not-found payload.

use crate::error::GatewayError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
}

pub fn handle(args: &Value) -> Result<Value, GatewayError> {
    let parsed: Args = serde_json::from_value(args.clone())
        .map_err(|e| GatewayError::InvalidArgument(format!("searchMenu: {e}")))?;

    Ok(match crate::price_map::search(&parsed.query) {
        Some((name, price_cents)) => json!({
            "itemName": name,
            "price": price_cents as f64 / 100.0,
        }),
        None => json!({
            "found": false,
            "result": format!("No menu item matching \"{}\" was found.", parsed.query),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_item() {
        let result = handle(&json!({ "query": "Masala Dosa" })).unwrap();
        assert_eq!(result["itemName"], "Masala Dosa");
    }

    #[test]
    fn reports_not_found() {
        let result = handle(&json!({ "query": "nonexistent xyz" })).unwrap();
        assert_eq!(result["found"], false);
    }

    #[test]
    fn rejects_missing_query() {
        assert!(handle(&json!({})).is_err());
    }
}
