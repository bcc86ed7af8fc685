//! Currency codes, the static exchange-rate table and amount formatting
//!
//! Rates are expressed as "units of currency per one unit of the base
//! currency". Direct pair overrides may be registered on top of the base
//! rates; they are not required to be reciprocal, so converting A → B → A
//! is not guaranteed to return the original amount.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Currencies the client knows how to display and convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Idr,
    Usd,
    Eur,
    Jpy,
    Sgd,
    Myr,
    Aud,
    Gbp,
    Chf,
    Cad,
    Krw,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::Idr,
        Currency::Usd,
        Currency::Eur,
        Currency::Jpy,
        Currency::Sgd,
        Currency::Myr,
        Currency::Aud,
        Currency::Gbp,
        Currency::Chf,
        Currency::Cad,
        Currency::Krw,
    ];

    /// ISO 4217 code
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Idr => "IDR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Jpy => "JPY",
            Currency::Sgd => "SGD",
            Currency::Myr => "MYR",
            Currency::Aud => "AUD",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Cad => "CAD",
            Currency::Krw => "KRW",
        }
    }

    /// Display symbol used in front of formatted amounts
    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Idr => "Rp",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Jpy => "¥",
            Currency::Sgd => "S$",
            Currency::Myr => "RM",
            Currency::Aud => "A$",
            Currency::Gbp => "£",
            Currency::Chf => "CHF",
            Currency::Cad => "C$",
            Currency::Krw => "₩",
        }
    }

    /// Digits shown after the decimal point
    pub const fn fraction_digits(self) -> u32 {
        match self {
            Currency::Idr | Currency::Krw | Currency::Jpy => 0,
            _ => 2,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Idr
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_uppercase();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .ok_or_else(|| Error::validation(format!("Unsupported currency: {}", s.trim())))
    }
}

/// Exchange rates relative to a base currency, plus direct pair overrides
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: Currency,
    rates: HashMap<Currency, Decimal>,
    pairs: HashMap<(Currency, Currency), Decimal>,
}

impl RateTable {
    /// The built-in static table (USD base)
    pub fn builtin() -> Self {
        let rates = HashMap::from([
            (Currency::Usd, Decimal::ONE),
            (Currency::Idr, Decimal::new(15_750, 0)),
            (Currency::Eur, Decimal::new(92, 2)),
            (Currency::Jpy, Decimal::new(14_950, 2)),
            (Currency::Sgd, Decimal::new(135, 2)),
            (Currency::Myr, Decimal::new(470, 2)),
            (Currency::Aud, Decimal::new(152, 2)),
            (Currency::Gbp, Decimal::new(79, 2)),
            (Currency::Chf, Decimal::new(88, 2)),
            (Currency::Cad, Decimal::new(136, 2)),
            (Currency::Krw, Decimal::new(1_330, 0)),
        ]);

        Self {
            base: Currency::Usd,
            rates,
            pairs: HashMap::new(),
        }
    }

    /// Base currency the rates are expressed against
    pub fn base(&self) -> Currency {
        self.base
    }

    /// Replace the base rates with rates fetched from the backend.
    ///
    /// The builtin table is rebased onto `base` first so currencies the
    /// backend omits still convert. Unknown codes and non-positive rates
    /// are ignored.
    pub fn with_rates(mut self, base: Currency, fetched: &HashMap<String, Decimal>) -> Self {
        if base != self.base {
            if let Some(base_rate) = self.rates.get(&base).copied().filter(|r| !r.is_zero()) {
                for rate in self.rates.values_mut() {
                    *rate /= base_rate;
                }
            }
            self.base = base;
        }

        for (code, rate) in fetched {
            if *rate <= Decimal::ZERO {
                continue;
            }
            if let Ok(currency) = code.parse::<Currency>() {
                self.rates.insert(currency, *rate);
            }
        }
        self.rates.insert(base, Decimal::ONE);
        self
    }

    /// Register a direct rate for one direction of a pair
    pub fn set_pair(&mut self, from: Currency, to: Currency, rate: Decimal) {
        self.pairs.insert((from, to), rate);
    }

    /// Units of `to` per one unit of `from`
    pub fn rate(&self, from: Currency, to: Currency) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.pairs.get(&(from, to)) {
            return Ok(*rate);
        }

        let from_rate = self.rates.get(&from).filter(|r| !r.is_zero());
        let to_rate = self.rates.get(&to);
        match (from_rate, to_rate) {
            (Some(f), Some(t)) => Ok(*t / *f),
            _ => Err(Error::validation(format!(
                "No exchange rate available for {} to {}",
                from, to
            ))),
        }
    }

    /// Convert an amount, rounded to the target currency's precision
    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.rate(from, to)?;
        Ok(round_for(amount * rate, to))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Round half away from zero to the currency's display precision
pub fn round_for(amount: Decimal, currency: Currency) -> Decimal {
    amount.round_dp_with_strategy(
        currency.fraction_digits(),
        RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Format an amount for display, e.g. `Rp 1,500,000` or `$ 1,234.50`
pub fn format_amount(amount: Decimal, currency: Currency) -> String {
    let rounded = round_for(amount, currency);
    let digits = currency.fraction_digits() as usize;
    let plain = format!("{:.*}", digits, rounded.abs());

    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut grouped = group_thousands(int_part);
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{}{} {}", sign, currency.symbol(), grouped)
}

/// Parse an amount produced by [`format_amount`] (symbol and grouping optional)
pub fn parse_amount(text: &str, currency: Currency) -> Result<Decimal> {
    let trimmed = text.trim();
    let negative = trimmed.starts_with('-');
    let body = trimmed.trim_start_matches('-').trim();

    let body = body
        .strip_prefix(currency.symbol())
        .or_else(|| body.strip_prefix(currency.code()))
        .unwrap_or(body);
    let body = body.strip_suffix(currency.code()).unwrap_or(body);

    let cleaned: String = body
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    let value = Decimal::from_str(&cleaned)
        .map_err(|_| Error::validation(format!("Invalid amount: {}", text.trim())))?;

    Ok(if negative { -value } else { value })
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
