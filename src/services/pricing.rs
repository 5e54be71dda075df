//! Money handling shared by the cart, order intake and catalog views.
//!
//! Prices arrive from storefront scripts as numbers or as human-typed text
//! ("1 234,50"). Parsing never fails: anything unreadable becomes zero so a
//! garbled price cannot abort a cart update.

use rust_decimal::prelude::*;
use serde_json::Value;
use std::str::FromStr;

/// Number of fraction digits kept for every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Parses a client-supplied price into a non-negative amount with cent precision.
///
/// Text input has ASCII and non-breaking spaces removed and `,` treated as the
/// decimal separator. Empty, malformed, non-finite or negative input yields `0.00`.
pub fn parse_price(input: &Value) -> Decimal {
    let parsed = match input {
        Value::Number(n) => decimal_from_text(&n.to_string()),
        Value::String(s) => parse_price_text(s),
        _ => None,
    };
    normalize(parsed.unwrap_or(Decimal::ZERO))
}

/// Text-only variant of [`parse_price`], used for prices stored in the session.
pub fn parse_price_str(input: &str) -> Decimal {
    normalize(parse_price_text(input).unwrap_or(Decimal::ZERO))
}

fn parse_price_text(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    decimal_from_text(&cleaned)
}

fn decimal_from_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn normalize(amount: Decimal) -> Decimal {
    if amount.is_sign_negative() {
        return to_money(Decimal::ZERO);
    }
    to_money(amount)
}

/// Rounds half-to-even to cents and fixes the scale at two digits.
pub fn to_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp(MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Renders an amount with exactly two fraction digits, e.g. `3703.50`.
pub fn format_money(amount: Decimal) -> String {
    to_money(amount).to_string()
}

/// Price the customer pays: the special price when one is set.
pub fn effective_price(base: Decimal, special: Option<Decimal>) -> Decimal {
    special.unwrap_or(base)
}

/// Reference price for display: the retail price when one is set.
pub fn effective_retail_price(base: Decimal, retail: Option<Decimal>) -> Decimal {
    retail.unwrap_or(base)
}

/// Coerces a client-supplied quantity to an integer.
///
/// Accepts integers, numeric strings and floats (truncated toward zero).
/// Returns `None` when the value cannot be read as a whole number.
pub fn coerce_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
