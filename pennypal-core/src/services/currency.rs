//! Currency service - conversion, exchange rates and the display preference
//!
//! Conversions go to `/currency/convert` first. When the backend cannot
//! answer, the built-in rate table (overlaid with the last rates fetched
//! in this process) is used instead and the result says so.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::adapters::http::{ApiArea, ApiClient};
use crate::domain::amount::{decimal_from_json, serialize_amount, serialize_optional_amount};
use crate::domain::result::{Error, Result};
use crate::domain::{ApiEnvelope, Currency, RateTable};

/// Where a converted amount came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Remote,
    Local,
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateSource::Remote => write!(f, "live rate"),
            RateSource::Local => write!(f, "offline rate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
    pub from: Currency,
    pub to: Currency,
    #[serde(serialize_with = "serialize_amount")]
    pub converted: Decimal,
    #[serde(serialize_with = "serialize_optional_amount")]
    pub rate: Option<Decimal>,
    pub source: RateSource,
}

/// Rates reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateSnapshot {
    pub base: Option<Currency>,
    pub rates: BTreeMap<String, Decimal>,
    /// Codes the backend accepts, when it lists them
    pub currencies: Vec<String>,
}

impl RateSnapshot {
    /// Read any of the shapes `/currency/valid` and `/currency/refresh`
    /// answer with: `{ base, rates: {..} }`, a flat code map, or a list
    /// of `{ code, rate }` entries. A plain list of codes fills only
    /// `currencies`.
    pub fn from_json(data: &JsonValue) -> Self {
        let base = data
            .get("base")
            .and_then(JsonValue::as_str)
            .and_then(|b| b.parse().ok());
        let source = data.get("rates").unwrap_or(data);

        let mut currencies: Vec<String> = data
            .get("currencies")
            .unwrap_or(source)
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_uppercase)
                    .collect()
            })
            .unwrap_or_default();

        let mut rates = BTreeMap::new();
        match source {
            JsonValue::Object(map) => {
                for (code, value) in map {
                    if let Some(rate) = decimal_from_json(value) {
                        rates.insert(code.to_uppercase(), rate);
                    }
                }
            }
            JsonValue::Array(entries) => {
                for entry in entries {
                    let code = entry
                        .get("code")
                        .or_else(|| entry.get("currency"))
                        .and_then(JsonValue::as_str);
                    let rate = entry.get("rate").and_then(decimal_from_json);
                    if let (Some(code), Some(rate)) = (code, rate) {
                        rates.insert(code.to_uppercase(), rate);
                    }
                }
            }
            _ => {}
        }

        if currencies.is_empty() {
            currencies = rates.keys().cloned().collect();
        }
        Self {
            base,
            rates,
            currencies,
        }
    }
}

pub struct CurrencyService {
    api: Arc<ApiClient>,
    fetched: Mutex<Option<(Currency, HashMap<String, Decimal>)>>,
    base_override: Option<Currency>,
}

impl CurrencyService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            fetched: Mutex::new(None),
            base_override: None,
        }
    }

    /// Display currency forced by configuration, ahead of the stored preference
    pub fn with_base_override(mut self, base: Option<Currency>) -> Self {
        self.base_override = base;
        self
    }

    /// Convert with the backend, falling back to the local table
    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Conversion> {
        if from == to {
            return Ok(Conversion {
                amount,
                from,
                to,
                converted: amount,
                rate: Some(Decimal::ONE),
                source: RateSource::Local,
            });
        }

        match self.convert_remote(amount, from, to) {
            Ok(conversion) => Ok(conversion),
            Err(e) if e.is_unauthorized() => Err(e),
            Err(_) => self.convert_local(amount, from, to),
        }
    }

    fn convert_remote(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Conversion> {
        let body = self.api.post(
            "/currency/convert",
            &json!({
                "amount": amount.to_f64(),
                "fromCurrency": from.code(),
                "toCurrency": to.code(),
            }),
            ApiArea::Default,
            "Currency conversion failed",
        )?;
        let envelope = ApiEnvelope::from_body(body)?;
        let data = envelope.data.unwrap_or(JsonValue::Null);

        let converted = ["convertedAmount", "result", "converted"]
            .iter()
            .find_map(|k| data.get(*k).and_then(decimal_from_json))
            .or_else(|| decimal_from_json(&data))
            .ok_or_else(|| Error::Other("Conversion response had no amount".to_string()))?;
        let rate = ["rate", "exchangeRate"]
            .iter()
            .find_map(|k| data.get(*k).and_then(decimal_from_json));

        Ok(Conversion {
            amount,
            from,
            to,
            converted,
            rate,
            source: RateSource::Remote,
        })
    }

    /// Convert with the local table only
    pub fn convert_local(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Conversion> {
        let table = self.local_table();
        Ok(Conversion {
            amount,
            from,
            to,
            converted: table.convert(amount, from, to)?,
            rate: Some(table.rate(from, to)?),
            source: RateSource::Local,
        })
    }

    /// Current rates from `/currency/valid`
    pub fn rates(&self) -> Result<RateSnapshot> {
        let body = self
            .api
            .get("/currency/valid", ApiArea::Default, "Failed to load currency rates")?;
        let snapshot = snapshot_from_body(body)?;
        self.remember(&snapshot);
        Ok(snapshot)
    }

    /// Ask the backend to refetch rates against USD
    pub fn refresh(&self) -> Result<(String, RateSnapshot)> {
        let body = self.api.post(
            "/currency/refresh",
            &json!({ "base": "USD" }),
            ApiArea::Default,
            "Failed to refresh currency rates",
        )?;
        let envelope = ApiEnvelope::from_body(body)?;
        let message = envelope.message_or("Currency rates refreshed");
        let snapshot = envelope
            .data
            .as_ref()
            .map(RateSnapshot::from_json)
            .unwrap_or_default();
        self.remember(&snapshot);
        Ok((message, snapshot))
    }

    fn remember(&self, snapshot: &RateSnapshot) {
        if snapshot.rates.is_empty() {
            return;
        }
        if let Ok(mut fetched) = self.fetched.lock() {
            let rates = snapshot
                .rates
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            *fetched = Some((snapshot.base.unwrap_or(Currency::Usd), rates));
        }
    }

    /// Built-in table overlaid with the last rates fetched
    pub fn local_table(&self) -> RateTable {
        let table = RateTable::builtin();
        match self.fetched.lock().ok().and_then(|f| f.clone()) {
            Some((base, rates)) => table.with_rates(base, &rates),
            None => table,
        }
    }

    pub fn base_currency(&self) -> Currency {
        self.base_override
            .unwrap_or_else(|| self.api.session().base_currency())
    }

    pub fn base_override(&self) -> Option<Currency> {
        self.base_override
    }

    pub fn set_base_currency(&self, currency: Currency) -> Result<()> {
        self.api.session().set_base_currency(currency)
    }
}

fn snapshot_from_body(body: JsonValue) -> Result<RateSnapshot> {
    let envelope = ApiEnvelope::from_body(body)?;
    Ok(envelope
        .data
        .as_ref()
        .map(RateSnapshot::from_json)
        .unwrap_or_default())
}
