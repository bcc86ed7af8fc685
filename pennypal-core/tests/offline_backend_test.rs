//! Behaviour with an unreachable backend
//!
//! Nothing listens on port 9 of the loopback interface, so every request
//! fails with a connection error. Services with an offline path must still
//! answer; the rest must surface a transport error without touching the
//! stored session.
//!
//! Run with: cargo test --test offline_backend_test -- --nocapture

use std::sync::Arc;

use rust_decimal::Decimal;
use pennypal_core::adapters::session::MemorySessionStore;
use pennypal_core::config::Config;
use pennypal_core::ports::SessionStore;
use pennypal_core::services::{RateSource, FALLBACK_REPLY};
use pennypal_core::{Currency, Error, NewTransaction, PennypalContext, TransactionType};

const DEAD_BACKEND: &str = "http://127.0.0.1:9";

fn offline_context(session: Arc<MemorySessionStore>) -> PennypalContext {
    let config = Config {
        backend_url: DEAD_BACKEND.to_string(),
        base_currency: None,
        request_timeout_secs: 2,
    };
    PennypalContext::with_session(config, session).unwrap()
}

// ============================================================================
// Offline Fallbacks
// ============================================================================

#[test]
fn test_conversion_falls_back_to_static_rates() {
    let ctx = offline_context(Arc::new(MemorySessionStore::with_token("jwt")));

    let conversion = ctx
        .currency_service
        .convert(Decimal::from(10), Currency::Usd, Currency::Idr)
        .unwrap();

    assert_eq!(conversion.source, RateSource::Local);
    assert_eq!(conversion.converted, Decimal::from(157_500));
    assert_eq!(conversion.source.to_string(), "offline rate");
}

#[test]
fn test_chat_replies_with_fallback() {
    let ctx = offline_context(Arc::new(MemorySessionStore::with_token("jwt")));

    let reply = ctx.assistant_service.chat("How much did I spend?", "").unwrap();

    assert!(reply.fallback);
    assert_eq!(reply.message, FALLBACK_REPLY);
}

// ============================================================================
// Transport Errors
// ============================================================================

#[test]
fn test_transaction_list_reports_transport_error() {
    let session = Arc::new(MemorySessionStore::with_token("jwt"));
    let ctx = offline_context(Arc::clone(&session));

    let err = ctx
        .transaction_service
        .list(&Default::default())
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "got {:?}", err);
    assert!(err.to_string().contains("Unable to connect"));
    // Only a 401 signs the user out
    assert_eq!(session.token().as_deref(), Some("jwt"));
}

#[test]
fn test_invalid_draft_fails_before_any_request() {
    let ctx = offline_context(Arc::new(MemorySessionStore::with_token("jwt")));

    let draft = NewTransaction::new("   ", Decimal::from(1000), TransactionType::Expense);
    let err = ctx.transaction_service.create(draft).unwrap_err();

    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
}

#[test]
fn test_signout_clears_session_even_when_offline() {
    let session = Arc::new(MemorySessionStore::with_token("jwt"));
    session.set_base_currency(Currency::Sgd).unwrap();
    let ctx = offline_context(Arc::clone(&session));

    ctx.auth_service.signout().unwrap();

    assert!(!session.is_authenticated());
    assert_eq!(session.base_currency(), Currency::Sgd);
}
