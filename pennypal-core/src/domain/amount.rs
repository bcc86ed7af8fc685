//! Serde helpers for monetary amounts
//!
//! The backend sends amounts as JSON numbers, occasionally as strings.
//! Outgoing payloads always use numbers.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value as JsonValue;

/// Interpret a JSON value as a decimal amount
pub fn decimal_from_json(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()
        }
        JsonValue::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

/// Deserialize an amount that can be number or string
pub fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    decimal_from_json(&value)
        .ok_or_else(|| D::Error::custom("expected number or numeric string for amount"))
}

/// Deserialize an optional amount that can be number, string or null
pub fn deserialize_optional_amount<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_json))
}

/// Serialize an amount as a JSON number
pub fn serialize_amount<S>(amount: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::Error;
    let value = amount
        .to_f64()
        .ok_or_else(|| S::Error::custom("amount out of range"))?;
    serializer.serialize_f64(value)
}

/// Serialize an optional amount as a JSON number or null
pub fn serialize_optional_amount<S>(
    amount: &Option<Decimal>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match amount {
        Some(a) => serialize_amount(a, serializer),
        None => serializer.serialize_none(),
    }
}
