//! Transaction service - CRUD against `/transaction` and CSV export

use std::io::Write;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::adapters::http::{ApiArea, ApiClient};
use crate::domain::result::{Error, Result};
use crate::domain::{ApiEnvelope, NewTransaction, Transaction, TransactionPage, TransactionQuery};

/// Page size used when walking every page
pub const LIST_ALL_PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched by `list_all`
const MAX_PAGES: u32 = 500;

const CSV_HEADER: [&str; 9] = [
    "id", "date", "title", "type", "category", "amount", "currency", "converted_amount", "tags",
];

pub struct TransactionService {
    api: Arc<ApiClient>,
}

impl TransactionService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn list(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        let body = self.api.get_with_query(
            "/transaction",
            query,
            ApiArea::Default,
            "Failed to load transactions",
        )?;
        TransactionPage::from_json(body)
    }

    /// Fetch every page matching the filters
    pub fn list_all(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let mut query = query.clone();
        query.limit = Some(query.limit.unwrap_or(LIST_ALL_PAGE_SIZE));
        let mut page_number = query.page.unwrap_or(1).max(1);
        let mut all = Vec::new();

        loop {
            query.page = Some(page_number);
            let page = self.list(&query)?;
            let fetched = page.transactions.len() + page.skipped;
            all.extend(page.transactions);

            // Bare-array responses report a single page
            if fetched == 0 || page_number >= page.total_pages || page_number >= MAX_PAGES {
                break;
            }
            page_number += 1;
        }

        Ok(all)
    }

    pub fn create(&self, mut draft: NewTransaction) -> Result<Transaction> {
        draft.validate()?;
        let body = self.api.post(
            "/transaction",
            &draft,
            ApiArea::Default,
            "Failed to create transaction",
        )?;
        transaction_from_body(body)
    }

    pub fn update(&self, id: &str, mut draft: NewTransaction) -> Result<Transaction> {
        let id = require_id(id)?;
        draft.validate()?;
        let body = self.api.put(
            &format!("/transaction/{}", id),
            &draft,
            ApiArea::Default,
            "Failed to update transaction",
        )?;
        transaction_from_body(body)
    }

    pub fn delete(&self, id: &str) -> Result<String> {
        let id = require_id(id)?;
        let body = self.api.delete(
            &format!("/transaction/{}", id),
            ApiArea::Default,
            "Failed to delete transaction",
        )?;
        Ok(ApiEnvelope::from_body(body)?.message_or("Transaction deleted"))
    }

    /// Server-side analytics; returns the envelope's `data` when present
    pub fn remote_analytics(&self, params: &[(&str, &str)]) -> Result<JsonValue> {
        let body = self.api.get_with_query(
            "/transaction/analytics",
            params,
            ApiArea::Default,
            "Failed to load analytics",
        )?;
        let envelope = ApiEnvelope::from_body(body)?;
        Ok(envelope.data.unwrap_or(JsonValue::Null))
    }

    /// Write transactions as CSV; returns the number of rows written
    pub fn export_csv<W: Write>(&self, txs: &[Transaction], writer: W) -> Result<usize> {
        write_csv(txs, writer)
    }
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::validation("Transaction id is required"));
    }
    Ok(id)
}

/// The created or updated transaction, wherever the backend put it
fn transaction_from_body(body: JsonValue) -> Result<Transaction> {
    let mut candidate = body;
    for key in ["data", "transaction"] {
        if let Some(inner) = candidate.get(key).filter(|v| v.is_object()) {
            candidate = inner.clone();
        }
    }
    serde_json::from_value(candidate).map_err(|e| {
        Error::Other(format!("Unexpected transaction in response: {}", e))
    })
}

pub fn write_csv<W: Write>(txs: &[Transaction], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(CSV_HEADER)
        .map_err(std::io::Error::from)?;

    for tx in txs {
        let date = tx
            .timestamp
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let converted = tx
            .converted_amount
            .map(|a| a.to_string())
            .unwrap_or_default();
        csv_writer
            .write_record([
                tx.id.as_str(),
                date.as_str(),
                tx.title.as_str(),
                tx.kind.as_str(),
                tx.category_or_default(),
                tx.amount.to_string().as_str(),
                tx.currency.as_str(),
                converted.as_str(),
                tx.tags.join(";").as_str(),
            ])
            .map_err(std::io::Error::from)?;
    }

    csv_writer.flush()?;
    Ok(txs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_backend::MockBackend;
    use crate::adapters::session::MemorySessionStore;
    use crate::domain::TransactionType;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn service(server: &MockBackend) -> TransactionService {
        let session = Arc::new(MemorySessionStore::with_token("jwt"));
        let api = ApiClient::new(&server.base_url(), session).unwrap();
        TransactionService::new(Arc::new(api))
    }

    fn tx_json(id: &str, title: &str, amount: u32) -> JsonValue {
        json!({"_id": id, "title": title, "amount": amount, "type": "expense", "category": "Food"})
    }

    #[test]
    fn test_list_sends_filters() {
        let server = MockBackend::start().unwrap();
        server.on(
            "GET",
            "/transaction",
            200,
            json!({"data": [tx_json("1", "Lunch", 25000)], "pagination": {"currentPage": 2, "totalPages": 3, "totalRecords": 41}}),
        );
        let txs = service(&server);

        let query = TransactionQuery {
            page: Some(2),
            kind: Some(TransactionType::Expense),
            ..Default::default()
        };
        let page = txs.list(&query).unwrap();

        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.total_records, 41);
        assert!(page.has_more());
        assert_eq!(
            server.last_request().unwrap().query.as_deref(),
            Some("page=2&type=expense")
        );
    }

    #[test]
    fn test_list_all_stops_after_single_page_array() {
        let server = MockBackend::start().unwrap();
        server.on(
            "GET",
            "/transaction",
            200,
            json!([tx_json("1", "Lunch", 25000), tx_json("2", "Taxi", 40000)]),
        );
        let txs = service(&server);

        let all = txs.list_all(&TransactionQuery::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(server.requests_to("/transaction").len(), 1);
        assert_eq!(
            server.last_request().unwrap().query.as_deref(),
            Some("page=1&limit=100")
        );
    }

    #[test]
    fn test_list_all_keeps_readable_rows() {
        let server = MockBackend::start().unwrap();
        server.on(
            "GET",
            "/transaction",
            200,
            json!([
                tx_json("1", "Lunch", 25000),
                {"id": "2", "title": "Move", "amount": 100, "type": "transfer"},
                tx_json("3", "Taxi", 40000)
            ]),
        );
        let txs = service(&server);

        let page = txs.list(&TransactionQuery::default()).unwrap();
        assert_eq!(page.skipped, 1);

        let all = txs.list_all(&TransactionQuery::default()).unwrap();
        let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_create_validates_before_sending() {
        let server = MockBackend::start().unwrap();
        let txs = service(&server);

        let draft = NewTransaction::new("  ", Decimal::from(10), TransactionType::Expense);
        let err = txs.create(draft).unwrap_err();

        assert_eq!(err.user_message(), "Title is required");
        assert!(server.requests().is_empty());
    }

    #[test]
    fn test_create_reads_envelope_data() {
        let server = MockBackend::start().unwrap();
        server.on(
            "POST",
            "/transaction",
            201,
            json!({"success": true, "data": tx_json("9", "Coffee", 18000)}),
        );
        let txs = service(&server);

        let draft = NewTransaction::new("Coffee", Decimal::from(18000), TransactionType::Expense)
            .with_category("Food")
            .with_tags(&[" cafe ".to_string(), "cafe".to_string()]);
        let created = txs.create(draft).unwrap();

        assert_eq!(created.id, "9");
        let body = server.last_request().unwrap().body;
        assert_eq!(body["type"], "expense");
        assert_eq!(body["currency"], "IDR");
        assert_eq!(body["tags"], json!(["cafe"]));
    }

    #[test]
    fn test_update_and_delete_paths() {
        let server = MockBackend::start().unwrap();
        server.on("PUT", "/transaction/7", 200, json!({"transaction": tx_json("7", "Dinner", 90000)}));
        server.on("DELETE", "/transaction/7", 200, json!({"message": "Transaction removed"}));
        let txs = service(&server);

        let draft = NewTransaction::new("Dinner", Decimal::from(90000), TransactionType::Expense);
        assert_eq!(txs.update("7", draft).unwrap().title, "Dinner");
        assert_eq!(txs.delete("7").unwrap(), "Transaction removed");
        assert!(txs.delete(" ").is_err());
    }

    #[test]
    fn test_delete_missing_maps_to_not_found() {
        let server = MockBackend::start().unwrap();
        let txs = service(&server);

        let err = txs.delete("404").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_remote_analytics_returns_data() {
        let server = MockBackend::start().unwrap();
        server.on(
            "GET",
            "/transaction/analytics",
            200,
            json!({"success": true, "data": {"totalExpense": 1200}}),
        );
        let txs = service(&server);

        let data = txs.remote_analytics(&[("period", "month")]).unwrap();
        assert_eq!(data["totalExpense"], 1200);
        assert_eq!(server.last_request().unwrap().query.as_deref(), Some("period=month"));
    }

    #[test]
    fn test_write_csv() {
        let mut tx = Transaction::new("1", "Lunch, rice", Decimal::from(25000), TransactionType::Expense);
        tx.tags = vec!["work".to_string(), "food".to_string()];
        let mut out = Vec::new();

        let rows = write_csv(&[tx], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(rows, 1);
        assert_eq!(
            lines[0],
            "id,date,title,type,category,amount,currency,converted_amount,tags"
        );
        assert_eq!(lines[1], "1,,\"Lunch, rice\",expense,Other,25000,IDR,,work;food");
    }
}
