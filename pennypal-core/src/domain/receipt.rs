//! Receipt field extraction from OCR text
//!
//! The OCR engine lives on the backend; this module only applies text
//! heuristics to whatever it returns. Every field is best effort.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::{serialize_amount, serialize_optional_amount};
use super::currency::Currency;
use super::result::{Error, Result};
use super::transaction::{NewTransaction, TransactionType};

/// Amount token, optionally prefixed by a currency marker
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?:Rp|IDR|USD|US\$|S\$|A\$|C\$|RM|\$|€|£|¥|₩)\.?\s?)?(\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?)",
    )
    .unwrap()
});

static DATE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static DATE_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})\b").unwrap());

static DATE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+([a-z]{3})[a-z]*\.?,?\s+(\d{4})\b").unwrap()
});

static TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}(?::\d{2})?\b").unwrap());

/// `<name> <amount>` with the amount at the end of the line
static LINE_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.*?[A-Za-z].*?)\s+(?:\d+\s*[xX@]\s*)?(?P<amount>(?:Rp\.?\s?|\$|€|£|¥|₩|RM\s?)?\d[\d.,]*\d)$",
    )
    .unwrap()
});

static CURRENCY_MARKERS: LazyLock<Vec<(Regex, Currency)>> = LazyLock::new(|| {
    [
        (r"(?i:\bidr\b)|\bRp\b|\bRp\.?\s?\d", Currency::Idr),
        (r"(?i:\bsgd\b)|\bS\$", Currency::Sgd),
        (r"(?i:\baud\b)|\bA\$", Currency::Aud),
        (r"(?i:\bcad\b)|\bC\$", Currency::Cad),
        (r"(?i:\busd\b)|\bUS\$", Currency::Usd),
        (r"(?i:\beur\b)|€", Currency::Eur),
        (r"(?i:\bgbp\b)|£", Currency::Gbp),
        (r"(?i:\bjpy\b)|¥", Currency::Jpy),
        (r"(?i:\bmyr\b)|\bRM\s?\d", Currency::Myr),
        (r"(?i:\bkrw\b)|₩", Currency::Krw),
        (r"(?i:\bchf\b)", Currency::Chf),
        (r"\$", Currency::Usd),
    ]
    .into_iter()
    .map(|(pattern, currency)| (Regex::new(pattern).unwrap(), currency))
    .collect()
});

const TOTAL_KEYWORDS: &[&str] = &[
    "grand total",
    "total bayar",
    "amount due",
    "balance due",
    "jumlah",
    "total",
];

const NOT_TOTAL_KEYWORDS: &[&str] = &["subtotal", "sub total", "total items", "total item", "total qty"];

const HEADINGS: &[&str] = &["tax invoice", "receipt", "struk", "invoice", "nota"];

/// Lines that carry amounts but are not purchased items
const NON_ITEM_KEYWORDS: &[&str] = &[
    "tax", "ppn", "pajak", "service", "discount", "diskon", "change", "kembali", "cash", "tunai",
    "card", "debit", "credit", "qty",
];

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Food",
        &[
            "restaurant", "resto", "cafe", "coffee", "kopi", "makan", "food", "bakery", "pizza",
            "burger", "warung", "mcdonald", "kfc", "starbucks", "nasi", "ayam", "noodle",
        ],
    ),
    (
        "Transportation",
        &[
            "grab", "gojek", "taxi", "fuel", "bensin", "pertamina", "shell", "parking", "parkir",
            "toll", "uber", "train", "kereta", "bus",
        ],
    ),
    (
        "Shopping",
        &[
            "indomaret", "alfamart", "supermarket", "minimarket", "store", "shop", "mall", "toko",
            "market", "department", "fashion",
        ],
    ),
    (
        "Bills & Utilities",
        &[
            "pln", "electricity", "listrik", "pdam", "water", "internet", "telkom", "pulsa", "tagihan",
            "utility", "bill",
        ],
    ),
    (
        "Entertainment",
        &[
            "cinema", "bioskop", "xxi", "cgv", "movie", "netflix", "spotify", "game", "concert",
            "karaoke", "ticket",
        ],
    ),
    (
        "Health",
        &[
            "pharmacy", "apotek", "kimia farma", "clinic", "klinik", "hospital", "rumah sakit",
            "doctor", "dokter", "medical",
        ],
    ),
];

/// One purchased item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
}

/// Fields recovered from receipt text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptFields {
    pub merchant: Option<String>,
    #[serde(serialize_with = "serialize_optional_amount")]
    pub total: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub currency: Option<Currency>,
    pub suggested_category: Option<String>,
    pub line_items: Vec<LineItem>,
}

impl ReceiptFields {
    /// Fill fields missing here from `other`
    pub fn merge(mut self, other: ReceiptFields) -> Self {
        self.merchant = self.merchant.or(other.merchant);
        self.total = self.total.or(other.total);
        self.date = self.date.or(other.date);
        self.currency = self.currency.or(other.currency);
        self.suggested_category = self.suggested_category.or(other.suggested_category);
        if self.line_items.is_empty() {
            self.line_items = other.line_items;
        }
        self
    }

    /// Build an expense draft; fails when no total was found
    pub fn into_draft(self, default_currency: Currency) -> Result<NewTransaction> {
        let total = self
            .total
            .filter(|t| *t > Decimal::ZERO)
            .ok_or_else(|| Error::validation("No total amount found on the receipt"))?;

        let title = self
            .merchant
            .unwrap_or_else(|| "Receipt".to_string())
            .chars()
            .take(super::transaction::MAX_TITLE_LEN)
            .collect::<String>();

        let mut draft = NewTransaction::new(title, total, TransactionType::Expense)
            .with_currency(self.currency.unwrap_or(default_currency))
            .with_tags(&["receipt".to_string()]);
        if let Some(category) = self.suggested_category {
            draft = draft.with_category(category);
        }
        if let Some(timestamp) = self.date.and_then(date_to_timestamp) {
            draft = draft.with_timestamp(timestamp);
        }
        Ok(draft)
    }
}

fn date_to_timestamp(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(12, 0, 0).map(|dt| dt.and_utc())
}

/// Extract receipt fields from OCR text
pub fn extract_fields(text: &str) -> ReceiptFields {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let total_line = lines.iter().rposition(|l| is_total_line(l) && last_amount(l).is_some());
    let total = total_line
        .and_then(|i| last_amount(lines[i]))
        .or_else(|| largest_amount(&lines));

    let merchant_line = lines.iter().position(|l| is_merchant_candidate(l));
    let merchant = merchant_line.map(|i| clean_merchant(lines[i]));

    let item_start = merchant_line.map(|i| i + 1).unwrap_or(0);
    let item_end = total_line.unwrap_or(lines.len());
    let line_items = if item_start < item_end {
        lines[item_start..item_end]
            .iter()
            .filter_map(|l| parse_line_item(l))
            .collect()
    } else {
        Vec::new()
    };

    ReceiptFields {
        merchant,
        total,
        date: lines.iter().find_map(|l| parse_date(l)),
        currency: detect_currency(text),
        suggested_category: suggest_category(text),
        line_items,
    }
}

/// Parse a number written with either grouping convention
pub fn parse_receipt_number(raw: &str) -> Option<Decimal> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let dots = digits.matches('.').count();
    let commas = digits.matches(',').count();

    let normalized = if dots > 0 && commas > 0 {
        let decimal_sep = if digits.rfind('.') > digits.rfind(',') { '.' } else { ',' };
        let group_sep = if decimal_sep == '.' { ',' } else { '.' };
        digits.replace(group_sep, "").replace(decimal_sep, ".")
    } else if dots + commas == 0 {
        digits
    } else {
        let sep = if dots > 0 { '.' } else { ',' };
        let count = dots + commas;
        let after = digits.rsplit(sep).next().map(str::len).unwrap_or(0);
        if count > 1 || after == 3 {
            digits.replace(sep, "")
        } else {
            digits.replace(sep, ".")
        }
    };

    Decimal::from_str(&normalized).ok()
}

fn amounts(line: &str) -> Vec<Decimal> {
    let without_dates = strip_dates_and_times(line);
    AMOUNT
        .captures_iter(&without_dates)
        .filter_map(|c| c.get(1))
        .filter_map(|m| parse_receipt_number(m.as_str()))
        .collect()
}

fn last_amount(line: &str) -> Option<Decimal> {
    amounts(line).into_iter().last()
}

fn largest_amount(lines: &[&str]) -> Option<Decimal> {
    lines
        .iter()
        .filter(|l| !is_excluded_from_total(l))
        .flat_map(|l| amounts(l))
        .filter(|a| *a > Decimal::ZERO)
        .max()
}

fn strip_dates_and_times(line: &str) -> String {
    let s = DATE_ISO.replace_all(line, " ");
    let s = DATE_DMY.replace_all(&s, " ");
    let s = DATE_TEXT.replace_all(&s, " ");
    TIME.replace_all(&s, " ").into_owned()
}

fn is_total_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    TOTAL_KEYWORDS.iter().any(|k| lower.contains(k))
        && !NOT_TOTAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Change and tendered cash are often larger than the total
fn is_excluded_from_total(line: &str) -> bool {
    let lower = line.to_lowercase();
    ["change", "kembali", "cash", "tunai", "card no", "telp", "phone", "npwp"]
        .iter()
        .any(|k| lower.contains(k))
}

fn is_heading(line: &str) -> bool {
    let lower = line.to_lowercase();
    let stripped = lower.trim_matches(|c: char| !c.is_alphanumeric() && c != ' ');
    HEADINGS.iter().any(|h| stripped == *h || stripped.starts_with(&format!("{} ", h)))
}

fn is_merchant_candidate(line: &str) -> bool {
    line.chars().any(|c| c.is_alphabetic())
        && !is_heading(line)
        && parse_date(line).is_none()
        && !is_total_line(line)
        && !LINE_ITEM.is_match(line)
}

fn clean_merchant(line: &str) -> String {
    line.trim_matches(|c: char| !c.is_alphanumeric() && c != ')' && c != '.')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_line_item(line: &str) -> Option<LineItem> {
    let lower = line.to_lowercase();
    if is_heading(line)
        || is_total_line(line)
        || NOT_TOTAL_KEYWORDS.iter().any(|k| lower.contains(k))
        || NON_ITEM_KEYWORDS
            .iter()
            .any(|k| lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == *k))
        || parse_date(line).is_some()
    {
        return None;
    }

    let caps = LINE_ITEM.captures(line)?;
    let name = caps.name("name")?.as_str().trim().trim_end_matches(['.', ':']).trim();
    let amount = parse_receipt_number(caps.name("amount")?.as_str())?;
    if name.is_empty() || amount <= Decimal::ZERO {
        return None;
    }
    Some(LineItem {
        name: name.to_string(),
        amount,
    })
}

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    let month = match abbrev.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" | "mei" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" | "agu" | "agt" => 8,
        "sep" => 9,
        "oct" | "okt" => 10,
        "nov" => 11,
        "dec" | "des" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse the first date found in a line
pub fn parse_date(line: &str) -> Option<NaiveDate> {
    if let Some(c) = DATE_ISO.captures(line) {
        let date = NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
        if date.is_some() {
            return date;
        }
    }
    if let Some(c) = DATE_DMY.captures(line) {
        let mut year: i32 = c[3].parse().ok()?;
        if c[3].len() == 2 {
            year += 2000;
        }
        let date = NaiveDate::from_ymd_opt(year, c[2].parse().ok()?, c[1].parse().ok()?);
        if date.is_some() {
            return date;
        }
    }
    let c = DATE_TEXT.captures(line)?;
    NaiveDate::from_ymd_opt(c[3].parse().ok()?, month_from_abbrev(&c[2])?, c[1].parse().ok()?)
}

/// Currency implied by markers in the text
pub fn detect_currency(text: &str) -> Option<Currency> {
    CURRENCY_MARKERS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, currency)| *currency)
}

/// Category whose keywords appear most often; earlier categories win ties
pub fn suggest_category(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for (category, keywords) in CATEGORY_KEYWORDS {
        let hits = keywords.iter().filter(|k| lower.contains(*k)).count();
        if hits > 0 && best.map_or(true, |(_, h)| hits > h) {
            best = Some((*category, hits));
        }
    }

    best.map(|(category, _)| category.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDOMARET: &str = "\
STRUK
INDOMARET SUDIRMAN
Jl. Jend. Sudirman No. 5
12/03/2024 14:22
Indomie Goreng 3.500
Teh Botol 2 x 4.000
Roti Tawar 15.500
Subtotal 27.000
PPN 2.970
TOTAL Rp 29.970
Tunai 50.000
Kembali 20.030
";

    const CAFE: &str = "\
Receipt
Blue Bottle Coffee
2024-05-01
Latte $5.50
Croissant $4.25
Tax $0.78
Total $10.53
Card $10.53
";

    #[test]
    fn test_indonesian_receipt() {
        let fields = extract_fields(INDOMARET);
        assert_eq!(fields.merchant.as_deref(), Some("INDOMARET SUDIRMAN"));
        assert_eq!(fields.total, Some(Decimal::new(29_970, 0)));
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 3, 12));
        assert_eq!(fields.currency, Some(Currency::Idr));
        assert_eq!(fields.suggested_category.as_deref(), Some("Shopping"));

        let names: Vec<_> = fields.line_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Indomie Goreng", "Teh Botol", "Roti Tawar"]);
        assert_eq!(fields.line_items[1].amount, Decimal::new(4_000, 0));
    }

    #[test]
    fn test_dollar_receipt() {
        let fields = extract_fields(CAFE);
        assert_eq!(fields.merchant.as_deref(), Some("Blue Bottle Coffee"));
        assert_eq!(fields.total, Some(Decimal::new(1053, 2)));
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(fields.currency, Some(Currency::Usd));
        assert_eq!(fields.suggested_category.as_deref(), Some("Food"));
        assert_eq!(fields.line_items.len(), 2);
    }

    #[test]
    fn test_total_falls_back_to_largest_amount() {
        let fields = extract_fields("Warung Bu Sri\nNasi Campur 25.000\nEs Teh 5.000\n");
        assert_eq!(fields.total, Some(Decimal::new(25_000, 0)));
        assert_eq!(fields.suggested_category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_number_conventions() {
        assert_eq!(parse_receipt_number("1.234.567"), Some(Decimal::new(1_234_567, 0)));
        assert_eq!(parse_receipt_number("1,234.56"), Some(Decimal::new(123_456, 2)));
        assert_eq!(parse_receipt_number("1.234,56"), Some(Decimal::new(123_456, 2)));
        assert_eq!(parse_receipt_number("25.000"), Some(Decimal::new(25_000, 0)));
        assert_eq!(parse_receipt_number("Rp25.000"), Some(Decimal::new(25_000, 0)));
        assert_eq!(parse_receipt_number("$12.50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_receipt_number("abc"), None);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("Tgl 05-01-2024"), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(parse_date("05/01/24"), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(parse_date("12 Jan 2024"), NaiveDate::from_ymd_opt(2024, 1, 12));
        assert_eq!(parse_date("3 Agustus 2023"), NaiveDate::from_ymd_opt(2023, 8, 3));
        assert_eq!(parse_date("no date here"), None);
    }

    #[test]
    fn test_currency_markers() {
        assert_eq!(detect_currency("TOTAL US$ 12.00"), Some(Currency::Usd));
        assert_eq!(detect_currency("Total S$ 8.50"), Some(Currency::Sgd));
        assert_eq!(detect_currency("Jumlah RM 20.00"), Some(Currency::Myr));
        assert_eq!(detect_currency("合計 ¥1,200"), Some(Currency::Jpy));
        assert_eq!(detect_currency("Total 12.00"), None);
    }

    #[test]
    fn test_subtotal_is_not_total() {
        let fields = extract_fields("Shop\nItem A 10.00\nSubtotal 10.00\nGrand Total 11.00\n");
        assert_eq!(fields.total, Some(Decimal::new(1100, 2)));
    }

    #[test]
    fn test_into_draft() {
        let draft = extract_fields(INDOMARET).into_draft(Currency::Usd).unwrap();
        assert_eq!(draft.title, "INDOMARET SUDIRMAN");
        assert_eq!(draft.kind, TransactionType::Expense);
        assert_eq!(draft.currency, Currency::Idr);
        assert_eq!(draft.tags, vec!["receipt"]);
        assert!(draft.timestamp.is_some());

        let empty = ReceiptFields::default().into_draft(Currency::Idr);
        assert!(empty.is_err());
    }

    #[test]
    fn test_merge_prefers_self() {
        let backend = ReceiptFields {
            merchant: Some("Backend Name".into()),
            ..Default::default()
        };
        let local = ReceiptFields {
            merchant: Some("Local".into()),
            total: Some(Decimal::ONE),
            ..Default::default()
        };
        let merged = backend.merge(local);
        assert_eq!(merged.merchant.as_deref(), Some("Backend Name"));
        assert_eq!(merged.total, Some(Decimal::ONE));
    }
}
