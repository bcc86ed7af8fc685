//! Local analytics over fetched transactions
//!
//! Every function here is pure: it takes the transactions the backend
//! returned and aggregates them in memory. Amounts are taken as absolute
//! values, so spending and income totals are never negative.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::amount::serialize_amount;
use super::currency::{format_amount, Currency};
use super::result::{Error, Result};
use super::transaction::Transaction;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const WEEK_LABELS: [&str; 4] = ["Week 1", "Week 2", "Week 3", "Week 4"];

/// Expenses sent to the AI analysis endpoint
pub const EXPENSE_PAYLOAD_LIMIT: usize = 20;

const MAX_KEYWORDS: usize = 8;

/// Converted amount when present and non-zero, else the raw amount; always absolute
pub fn effective_amount(tx: &Transaction) -> Decimal {
    tx.converted_amount
        .filter(|a| !a.is_zero())
        .unwrap_or(tx.amount)
        .abs()
}

/// Income, expense and balance totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    #[serde(serialize_with = "serialize_amount")]
    pub income: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub expense: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub balance: Decimal,
    pub count: usize,
}

pub fn overview(txs: &[Transaction]) -> Overview {
    let mut result = Overview::default();
    for tx in txs {
        if tx.is_expense() {
            result.expense += effective_amount(tx);
        } else {
            result.income += effective_amount(tx);
        }
    }
    result.balance = result.income - result.expense;
    result.count = txs.len();
    result
}

/// Expense total for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    #[serde(serialize_with = "serialize_amount")]
    pub total: Decimal,
    pub count: usize,
}

/// Expense totals by category, largest first, ties by name
pub fn category_totals(txs: &[Transaction], limit: Option<usize>) -> Vec<CategoryTotal> {
    let mut by_category: HashMap<&str, (Decimal, usize)> = HashMap::new();
    for tx in txs.iter().filter(|t| t.is_expense()) {
        let entry = by_category
            .entry(tx.category_or_default())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += effective_amount(tx);
        entry.1 += 1;
    }

    let mut totals: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.to_string(),
            total,
            count,
        })
        .collect();

    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    if let Some(limit) = limit {
        totals.truncate(limit);
    }
    totals
}

/// A category's share of total spending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    #[serde(serialize_with = "serialize_amount")]
    pub total: Decimal,
    pub percentage: u32,
}

/// Category totals with whole-number percentages of total spending
pub fn category_share(txs: &[Transaction]) -> Vec<CategoryShare> {
    let totals = category_totals(txs, None);
    let sum: Decimal = totals.iter().map(|t| t.total).sum();

    totals
        .into_iter()
        .map(|t| {
            let percentage = if sum.is_zero() {
                0
            } else {
                (t.total / sum * Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_u32()
                    .unwrap_or(0)
            };
            CategoryShare {
                category: t.category,
                total: t.total,
                percentage,
            }
        })
        .collect()
}

/// Income and expense per month of a year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub labels: Vec<String>,
    pub income: Vec<Decimal>,
    pub expense: Vec<Decimal>,
}

pub fn monthly_trend(txs: &[Transaction], year: i32) -> MonthlyTrend {
    let mut income = vec![Decimal::ZERO; 12];
    let mut expense = vec![Decimal::ZERO; 12];

    for tx in txs {
        let Some(ts) = tx.timestamp else { continue };
        if ts.year() != year {
            continue;
        }
        let month = ts.month0() as usize;
        if tx.is_expense() {
            expense[month] += effective_amount(tx);
        } else {
            income[month] += effective_amount(tx);
        }
    }

    MonthlyTrend {
        year,
        labels: MONTH_LABELS.iter().map(|l| l.to_string()).collect(),
        income,
        expense,
    }
}

/// Income and expense per week of a month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub labels: Vec<String>,
    pub income: Vec<Decimal>,
    pub expense: Vec<Decimal>,
}

/// Four buckets: days 1-7, 8-14, 15-21 and 22 to month end
pub fn weekly_trend(txs: &[Transaction], year: i32, month: u32) -> WeeklyTrend {
    let mut income = vec![Decimal::ZERO; 4];
    let mut expense = vec![Decimal::ZERO; 4];

    for tx in txs {
        let Some(ts) = tx.timestamp else { continue };
        if ts.year() != year || ts.month() != month {
            continue;
        }
        let bucket = ((ts.day() - 1) / 7).min(3) as usize;
        if tx.is_expense() {
            expense[bucket] += effective_amount(tx);
        } else {
            income[bucket] += effective_amount(tx);
        }
    }

    WeeklyTrend {
        labels: WEEK_LABELS.iter().map(|l| l.to_string()).collect(),
        income,
        expense,
    }
}

/// Net flow per month as a percentage of income; 0 when there was no income
pub fn net_flow_percent(trend: &MonthlyTrend) -> Vec<Decimal> {
    trend
        .income
        .iter()
        .zip(&trend.expense)
        .map(|(income, expense)| {
            if income.is_zero() {
                Decimal::ZERO
            } else {
                ((income - expense) / income * Decimal::ONE_HUNDRED).round_dp(2)
            }
        })
        .collect()
}

/// Percent change from `previous` to `current`; `None` when previous is zero
pub fn period_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous.abs() * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Dashboard period selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::Week => "This Week",
            Period::Month => "This Month",
            Period::Quarter => "This Quarter",
            Period::Year => "This Year",
        }
    }

    /// Half-open date range `[start, end)` of the period containing `today`.
    /// Weeks start on Monday.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Week => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(7))
            }
            Period::Month => {
                let start = first_of_month(today.year(), today.month());
                (start, add_months(start, 1))
            }
            Period::Quarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                let start = first_of_month(today.year(), first_month);
                (start, add_months(start, 3))
            }
            Period::Year => {
                let start = first_of_month(today.year(), 1);
                (start, add_months(start, 12))
            }
        }
    }

    /// Range of the period just before the one containing `today`
    pub fn previous_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let (start, _) = self.range(today);
        self.range(start - Duration::days(1))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let normalized = normalized.strip_prefix("this ").unwrap_or(&normalized);
        match normalized {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            _ => Err(Error::validation(format!(
                "Unknown period '{}'. Use week, month, quarter or year",
                s.trim()
            ))),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.month0() + months;
    first_of_month(date.year() + (total / 12) as i32, total % 12 + 1)
}

/// Transactions whose timestamp falls within `[start, end)`
pub fn filter_range(txs: &[Transaction], start: NaiveDate, end: NaiveDate) -> Vec<Transaction> {
    txs.iter()
        .filter(|t| {
            t.timestamp
                .map(|ts| {
                    let day = ts.date_naive();
                    day >= start && day < end
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Transactions in the period containing `today`
pub fn filter_period(txs: &[Transaction], period: Period, today: NaiveDate) -> Vec<Transaction> {
    let (start, end) = period.range(today);
    filter_range(txs, start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Classify by average expense size
    pub fn from_average(average: Decimal) -> Self {
        if average > Decimal::new(100_000, 0) {
            Sentiment::Negative
        } else if average > Decimal::new(50_000, 0) {
            Sentiment::Neutral
        } else {
            Sentiment::Positive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Concerning",
        }
    }
}

/// Locally generated spending insights
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub summary: String,
    pub keywords: Vec<String>,
    pub sentiment: Sentiment,
    pub top_category: String,
    #[serde(serialize_with = "serialize_amount")]
    pub average_amount: Decimal,
}

pub fn local_insights(txs: &[Transaction], base: Currency) -> Result<Insights> {
    if txs.is_empty() {
        return Err(Error::Insight("No transactions available for analysis".to_string()));
    }

    let expenses: Vec<&Transaction> = txs.iter().filter(|t| t.is_expense()).collect();
    if expenses.is_empty() {
        return Err(Error::Insight(
            "No expense transactions found for analysis".to_string(),
        ));
    }

    // Categories in first-seen order so ties go to the earliest one
    let mut frequency: Vec<(&str, usize)> = Vec::new();
    let mut keywords: Vec<String> = Vec::new();
    let mut seen_keywords = HashSet::new();
    let mut total = Decimal::ZERO;

    for tx in &expenses {
        let category = tx.category_or_default();
        match frequency.iter_mut().find(|(c, _)| *c == category) {
            Some((_, count)) => *count += 1,
            None => frequency.push((category, 1)),
        }
        total += effective_amount(tx);

        for word in tx.title.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.chars().count() > 3 && seen_keywords.insert(word.to_string()) {
                keywords.push(word.to_string());
            }
        }
    }

    let top_category = frequency
        .iter()
        .fold(None::<(&str, usize)>, |best, &(category, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((category, count)),
        })
        .map(|(category, _)| category.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let average = total / Decimal::from(expenses.len());
    keywords.truncate(MAX_KEYWORDS);

    Ok(Insights {
        summary: format!(
            "You have {} expense transactions with an average of {}. Your top spending category is {}.",
            expenses.len(),
            format_amount(average, base),
            top_category
        ),
        keywords,
        sentiment: Sentiment::from_average(average),
        top_category,
        average_amount: average,
    })
}

/// Expense summary sent for AI analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub description: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
    pub category: String,
    pub date: Option<NaiveDate>,
}

/// First expenses, in the order given, for the AI analysis endpoint
pub fn expense_payload(txs: &[Transaction]) -> Vec<ExpenseSummary> {
    txs.iter()
        .filter(|t| t.is_expense())
        .take(EXPENSE_PAYLOAD_LIMIT)
        .map(|t| ExpenseSummary {
            description: t.title.clone(),
            amount: effective_amount(t),
            category: t.category_or_default().to_string(),
            date: t.timestamp.map(|ts| ts.date_naive()),
        })
        .collect()
}

/// Case-insensitive match on title, category and tags
pub fn search<'a>(txs: &'a [Transaction], query: &str) -> Vec<&'a Transaction> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return txs.iter().collect();
    }
    txs.iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.category
                    .as_deref()
                    .map_or(false, |c| c.to_lowercase().contains(&needle))
                || t.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionType;
    use chrono::{TimeZone, Utc};

    fn tx(title: &str, amount: i64, kind: TransactionType, category: Option<&str>, date: (i32, u32, u32)) -> Transaction {
        let mut t = Transaction::new(title, title, Decimal::new(amount, 0), kind);
        t.category = category.map(String::from);
        t.timestamp = Some(Utc.with_ymd_and_hms(date.0, date.1, date.2, 10, 0, 0).unwrap());
        t
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("Monthly salary", 10_000_000, TransactionType::Income, Some("Salary"), (2024, 1, 1)),
            tx("Groceries weekly", 400_000, TransactionType::Expense, Some("Food"), (2024, 1, 3)),
            tx("Train ticket", 50_000, TransactionType::Expense, Some("Transportation"), (2024, 1, 9)),
            tx("Dinner with friends", 300_000, TransactionType::Expense, Some("Food"), (2024, 1, 25)),
            tx("Electricity bill", 600_000, TransactionType::Expense, None, (2024, 2, 2)),
            tx("Freelance", 2_000_000, TransactionType::Income, None, (2024, 2, 14)),
        ]
    }

    #[test]
    fn test_overview_totals() {
        let o = overview(&sample());
        assert_eq!(o.income, Decimal::new(12_000_000, 0));
        assert_eq!(o.expense, Decimal::new(1_350_000, 0));
        assert_eq!(o.balance, Decimal::new(10_650_000, 0));
        assert_eq!(o.count, 6);
    }

    #[test]
    fn test_spending_is_never_negative() {
        let mut refund = tx("Refund", 1, TransactionType::Expense, None, (2024, 1, 1));
        refund.amount = Decimal::new(-250, 0);
        let o = overview(&[refund]);
        assert!(o.expense >= Decimal::ZERO);
        assert_eq!(o.expense, Decimal::new(250, 0));
    }

    #[test]
    fn test_converted_amount_preferred() {
        let mut t = tx("Coffee", 5, TransactionType::Expense, None, (2024, 1, 1));
        t.converted_amount = Some(Decimal::new(78_750, 0));
        assert_eq!(effective_amount(&t), Decimal::new(78_750, 0));
        t.converted_amount = Some(Decimal::ZERO);
        assert_eq!(effective_amount(&t), Decimal::new(5, 0));
    }

    #[test]
    fn test_category_totals_order_and_default() {
        let totals = category_totals(&sample(), Some(5));
        let names: Vec<_> = totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(names, vec!["Food", "Other", "Transportation"]);
        assert_eq!(totals[0].total, Decimal::new(700_000, 0));
        assert_eq!(totals[0].count, 2);

        let top1 = category_totals(&sample(), Some(1));
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn test_category_share_percentages() {
        let shares = category_share(&sample());
        let total: u32 = shares.iter().map(|s| s.percentage).sum();
        assert_eq!(shares[0].percentage, 52);
        assert!((99..=101).contains(&total));
    }

    #[test]
    fn test_monthly_trend_and_net_flow() {
        let trend = monthly_trend(&sample(), 2024);
        assert_eq!(trend.labels[0], "Jan");
        assert_eq!(trend.income[0], Decimal::new(10_000_000, 0));
        assert_eq!(trend.expense[0], Decimal::new(750_000, 0));
        assert_eq!(trend.expense[1], Decimal::new(600_000, 0));

        let net = net_flow_percent(&trend);
        assert_eq!(net[0], Decimal::new(9250, 2));
        assert_eq!(net[1], Decimal::new(70, 0));
        assert_eq!(net[2], Decimal::ZERO);

        let other_year = monthly_trend(&sample(), 2023);
        assert!(other_year.income.iter().all(|v| v.is_zero()));
    }

    #[test]
    fn test_weekly_buckets() {
        let trend = weekly_trend(&sample(), 2024, 1);
        assert_eq!(trend.expense[0], Decimal::new(400_000, 0));
        assert_eq!(trend.expense[1], Decimal::new(50_000, 0));
        assert_eq!(trend.expense[2], Decimal::ZERO);
        assert_eq!(trend.expense[3], Decimal::new(300_000, 0));
    }

    #[test]
    fn test_period_change() {
        assert_eq!(
            period_change(Decimal::new(150, 0), Decimal::new(100, 0)),
            Some(Decimal::new(50, 0))
        );
        assert_eq!(
            period_change(Decimal::new(50, 0), Decimal::new(200, 0)),
            Some(Decimal::new(-75, 0))
        );
        assert_eq!(period_change(Decimal::ONE, Decimal::ZERO), None);
    }

    #[test]
    fn test_period_ranges() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(); // Wednesday
        assert_eq!(
            Period::Week.range(today),
            (
                NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
            )
        );
        assert_eq!(
            Period::Quarter.range(today).0,
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );
        assert_eq!(
            Period::Month.previous_range(today),
            (
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
            )
        );
        let december = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(
            Period::Month.range(december).1,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!("This Quarter".parse::<Period>().unwrap(), Period::Quarter);
        assert!("decade".parse::<Period>().is_err());
    }

    #[test]
    fn test_filter_period() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
        let feb = filter_period(&sample(), Period::Month, today);
        assert_eq!(feb.len(), 2);
    }

    #[test]
    fn test_sentiment_thresholds() {
        assert_eq!(Sentiment::from_average(Decimal::new(100_001, 0)), Sentiment::Negative);
        assert_eq!(Sentiment::from_average(Decimal::new(100_000, 0)), Sentiment::Neutral);
        assert_eq!(Sentiment::from_average(Decimal::new(50_000, 0)), Sentiment::Positive);
    }

    #[test]
    fn test_local_insights() {
        let insights = local_insights(&sample(), Currency::Idr).unwrap();
        assert_eq!(insights.top_category, "Food");
        assert_eq!(insights.average_amount, Decimal::new(337_500, 0));
        assert_eq!(insights.sentiment, Sentiment::Negative);
        assert_eq!(
            insights.keywords,
            vec!["groceries", "weekly", "train", "ticket", "dinner", "with", "friends", "electricity"]
        );
        assert_eq!(
            insights.summary,
            "You have 4 expense transactions with an average of Rp 337,500. Your top spending category is Food."
        );
    }

    #[test]
    fn test_insights_errors() {
        let err = local_insights(&[], Currency::Idr).unwrap_err();
        assert_eq!(err.user_message(), "No transactions available for analysis");

        let income_only = vec![tx("Salary", 1, TransactionType::Income, None, (2024, 1, 1))];
        let err = local_insights(&income_only, Currency::Idr).unwrap_err();
        assert_eq!(err.user_message(), "No expense transactions found for analysis");
    }

    #[test]
    fn test_top_category_tie_goes_to_first_seen() {
        let txs = vec![
            tx("a", 1, TransactionType::Expense, Some("Transport"), (2024, 1, 1)),
            tx("b", 1, TransactionType::Expense, Some("Food"), (2024, 1, 1)),
        ];
        assert_eq!(local_insights(&txs, Currency::Usd).unwrap().top_category, "Transport");
    }

    #[test]
    fn test_expense_payload_limit() {
        let txs: Vec<_> = (0..30)
            .map(|i| tx(&format!("item {}", i), 1_000, TransactionType::Expense, None, (2024, 1, 1)))
            .collect();
        let payload = expense_payload(&txs);
        assert_eq!(payload.len(), 20);
        assert_eq!(payload[0].category, "Other");
        assert_eq!(payload[0].date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_search() {
        let mut txs = sample();
        txs[2].tags = vec!["commute".to_string()];
        assert_eq!(search(&txs, "FOOD").len(), 2);
        assert_eq!(search(&txs, "commute").len(), 1);
        assert_eq!(search(&txs, "  ").len(), 6);
    }
}
