//! Static, process-lifetime authoritative menu price table (§4.2).
//!
//! Item names are compared as exact strings — case, whitespace, and
//! punctuation are all significant. Prices are stored in integer cents.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// `(menu name, price in cents)`. Extend here when the menu changes —
/// this table is the single source of truth the dialogue agent cannot
/// override (see Invariant 3).
static PRICE_TABLE: &[(&str, i64)] = &[
    ("Masala Dosa", 1149),
    ("Plain Dosa", 999),
    ("Mysore Masala Dosa", 1249),
    ("Rava Dosa", 1299),
    ("Idli (2 pc)", 699),
    ("Medu Vada (2 pc)", 749),
    ("Uttapam", 1099),
    ("Samosa Chaat", 849),
    ("Paneer Tikka", 1399),
    ("Chicken 65", 1499),
    ("Vegetable Biryani", 1599),
    ("Chicken Biryani", 1799),
    ("Butter Naan", 399),
    ("Garlic Naan", 449),
    ("Mango Lassi", 649),
    ("Sweet Lassi", 599),
    ("Masala Chai", 349),
    ("Gulab Jamun (2 pc)", 549),
];

static PRICE_MAP: Lazy<HashMap<&'static str, i64>> =
    Lazy::new(|| PRICE_TABLE.iter().copied().collect());

/// Look up the authoritative unit price (in cents) for an exact menu name.
pub fn lookup(item_name: &str) -> Option<i64> {
    PRICE_MAP.get(item_name).copied()
}

/// `searchMenu` tool support: find a menu entry by exact or case-insensitive
/// substring match, returning the canonical name and price.
pub fn search(query: &str) -> Option<(&'static str, i64)> {
    if let Some(exact) = PRICE_TABLE.iter().find(|(name, _)| *name == query) {
        return Some(*exact);
    }
    let needle = query.to_lowercase();
    PRICE_TABLE
        .iter()
        .find(|(name, _)| name.to_lowercase().contains(&needle))
        .copied()
}
