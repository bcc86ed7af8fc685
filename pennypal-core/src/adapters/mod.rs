//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - JSON file and in-memory stores for the SessionStore port
//! - reqwest blocking client for the PennyPal backend

pub mod http;
pub mod session;

#[cfg(test)]
pub mod mock_backend;
