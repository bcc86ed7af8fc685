//! Analytics service - dashboard and yearly report
//!
//! Transactions are fetched once, converted into the user's base currency
//! with the local rate table, and aggregated in memory.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::analytics::{
    category_share, filter_period, filter_range, local_insights, monthly_trend, net_flow_percent,
    overview, period_change, weekly_trend, CategoryShare, Insights, MonthlyTrend, Overview, Period,
    WeeklyTrend,
};
use crate::domain::result::Result;
use crate::domain::{Currency, RateTable, Transaction, TransactionQuery};

use super::currency::CurrencyService;
use super::transaction::TransactionService;

/// Categories shown on the dashboard
pub const DASHBOARD_CATEGORIES: usize = 5;

/// Recent transactions shown on the dashboard
pub const DASHBOARD_RECENT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub period: Period,
    pub label: String,
    pub base_currency: Currency,
    pub overview: Overview,
    pub previous: Overview,
    /// Percent change against the previous period; `None` when it was zero
    pub income_change: Option<Decimal>,
    pub expense_change: Option<Decimal>,
    pub categories: Vec<CategoryShare>,
    pub recent: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyReport {
    pub year: i32,
    pub base_currency: Currency,
    pub overview: Overview,
    pub trend: MonthlyTrend,
    pub net_flow: Vec<Decimal>,
    pub categories: Vec<CategoryShare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly: Option<WeeklyTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

pub struct AnalyticsService {
    transactions: Arc<TransactionService>,
    currency: Arc<CurrencyService>,
}

impl AnalyticsService {
    pub fn new(transactions: Arc<TransactionService>, currency: Arc<CurrencyService>) -> Self {
        Self {
            transactions,
            currency,
        }
    }

    /// All transactions with `converted_amount` set in the base currency
    pub fn fetch_in_base(&self) -> Result<(Currency, Vec<Transaction>)> {
        let base = self.currency.base_currency();
        let txs = self.transactions.list_all(&TransactionQuery::default())?;
        Ok((base, in_base_currency(txs, &self.currency.local_table(), base)))
    }

    pub fn dashboard(&self, period: Period, today: NaiveDate) -> Result<Dashboard> {
        let (base, txs) = self.fetch_in_base()?;
        Ok(build_dashboard(&txs, base, period, today))
    }

    /// Monthly trend for `year`; weekly buckets too when `month` is given
    pub fn yearly_report(&self, year: i32, month: Option<u32>) -> Result<YearlyReport> {
        let (base, txs) = self.fetch_in_base()?;
        Ok(build_yearly_report(&txs, base, year, month))
    }
}

/// Convert each transaction into `base` with the rate table.
///
/// Transactions already in `base` keep their amount; unknown currency
/// codes are left unconverted.
pub fn in_base_currency(txs: Vec<Transaction>, table: &RateTable, base: Currency) -> Vec<Transaction> {
    txs.into_iter()
        .map(|mut tx| {
            tx.converted_amount = match tx.currency() {
                Ok(currency) if currency == base => None,
                Ok(currency) => table.convert(tx.amount, currency, base).ok(),
                Err(_) => tx.converted_amount,
            };
            tx
        })
        .collect()
}

pub fn build_dashboard(
    txs: &[Transaction],
    base: Currency,
    period: Period,
    today: NaiveDate,
) -> Dashboard {
    let current = filter_period(txs, period, today);
    let (prev_start, prev_end) = period.previous_range(today);
    let previous = overview(&filter_range(txs, prev_start, prev_end));
    let current_overview = overview(&current);

    let mut categories = category_share(&current);
    categories.truncate(DASHBOARD_CATEGORIES);

    let mut recent = txs.to_vec();
    // Newest first; undated transactions last
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(DASHBOARD_RECENT);

    Dashboard {
        period,
        label: period.label().to_string(),
        base_currency: base,
        income_change: period_change(current_overview.income, previous.income),
        expense_change: period_change(current_overview.expense, previous.expense),
        overview: current_overview,
        previous,
        categories,
        recent,
    }
}

pub fn build_yearly_report(
    txs: &[Transaction],
    base: Currency,
    year: i32,
    month: Option<u32>,
) -> YearlyReport {
    let in_year: Vec<Transaction> = txs
        .iter()
        .filter(|t| t.timestamp.is_some_and(|ts| ts.year() == year))
        .cloned()
        .collect();
    let trend = monthly_trend(&in_year, year);

    YearlyReport {
        year,
        base_currency: base,
        overview: overview(&in_year),
        net_flow: net_flow_percent(&trend),
        trend,
        categories: category_share(&in_year),
        weekly: month.map(|m| weekly_trend(&in_year, year, m)),
        insights: local_insights(&in_year, base).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::ApiClient;
    use crate::adapters::mock_backend::MockBackend;
    use crate::adapters::session::MemorySessionStore;
    use crate::domain::TransactionType;
    use crate::ports::SessionStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn tx(id: &str, kind: TransactionType, amount: i64, date: (i32, u32, u32)) -> Transaction {
        let mut t = Transaction::new(id, format!("Item {}", id), Decimal::from(amount), kind);
        t.timestamp = Some(Utc.with_ymd_and_hms(date.0, date.1, date.2, 9, 0, 0).unwrap());
        t
    }

    #[test]
    fn test_dashboard_compares_with_previous_month() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let txs = vec![
            tx("1", TransactionType::Income, 1_000_000, (2024, 5, 1)),
            tx("2", TransactionType::Expense, 300_000, (2024, 5, 3)),
            tx("3", TransactionType::Expense, 200_000, (2024, 4, 10)),
            tx("4", TransactionType::Income, 500_000, (2024, 4, 1)),
        ];

        let dash = build_dashboard(&txs, Currency::Idr, Period::Month, today);

        assert_eq!(dash.label, "This Month");
        assert_eq!(dash.overview.income, Decimal::from(1_000_000));
        assert_eq!(dash.overview.expense, Decimal::from(300_000));
        assert_eq!(dash.previous.expense, Decimal::from(200_000));
        assert_eq!(dash.expense_change, Some(Decimal::from(50)));
        assert_eq!(dash.income_change, Some(Decimal::from(100)));
        assert_eq!(dash.recent.first().map(|t| t.id.as_str()), Some("2"));
        assert_eq!(dash.categories.len(), 1);
        assert_eq!(dash.categories[0].percentage, 100);
    }

    #[test]
    fn test_in_base_currency() {
        let mut usd = Transaction::new("1", "Hotel", Decimal::from(10), TransactionType::Expense);
        usd.currency = "USD".to_string();
        let idr = Transaction::new("2", "Bakso", Decimal::from(20_000), TransactionType::Expense);
        let mut odd = Transaction::new("3", "Odd", Decimal::from(5), TransactionType::Expense);
        odd.currency = "XYZ".to_string();

        let converted = in_base_currency(vec![usd, idr, odd], &RateTable::builtin(), Currency::Idr);

        assert_eq!(converted[0].converted_amount, Some(Decimal::from(157_500)));
        assert_eq!(converted[1].converted_amount, None);
        assert_eq!(converted[2].converted_amount, None);
        assert_eq!(overview(&converted).expense, Decimal::from(177_505));
    }

    #[test]
    fn test_yearly_report() {
        let txs = vec![
            tx("1", TransactionType::Income, 2_000_000, (2024, 1, 5)),
            tx("2", TransactionType::Expense, 500_000, (2024, 1, 20)),
            tx("3", TransactionType::Expense, 100_000, (2023, 12, 31)),
        ];

        let report = build_yearly_report(&txs, Currency::Idr, 2024, Some(1));

        assert_eq!(report.overview.count, 2);
        assert_eq!(report.net_flow[0], Decimal::from(75));
        assert_eq!(report.net_flow[1], Decimal::ZERO);
        let weekly = report.weekly.unwrap();
        assert_eq!(weekly.income[0], Decimal::from(2_000_000));
        assert_eq!(weekly.expense[2], Decimal::from(500_000));
        assert!(report.insights.is_some());
    }

    #[test]
    fn test_dashboard_fetches_and_converts() {
        let server = MockBackend::start().unwrap();
        server.on(
            "GET",
            "/transaction",
            200,
            json!([
                {"_id": "a", "title": "Flight", "amount": 100, "type": "expense", "currency": "USD", "timestamp": "2024-05-02T10:00:00Z"},
                {"_id": "b", "title": "Salary", "amount": 5000000, "type": "income", "timestamp": "2024-05-01T10:00:00Z"}
            ]),
        );
        let session = Arc::new(MemorySessionStore::with_token("jwt"));
        session.set_base_currency(Currency::Idr).unwrap();
        let api = Arc::new(ApiClient::new(&server.base_url(), session).unwrap());
        let service = AnalyticsService::new(
            Arc::new(TransactionService::new(api.clone())),
            Arc::new(CurrencyService::new(api)),
        );

        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let dash = service.dashboard(Period::Month, today).unwrap();

        assert_eq!(dash.base_currency, Currency::Idr);
        assert_eq!(dash.overview.expense, Decimal::from(1_575_000));
        assert_eq!(dash.overview.balance, Decimal::from(3_425_000));
    }
}
