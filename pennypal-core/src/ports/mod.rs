//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on concrete implementations.

mod session;

pub use session::{SessionStore, BASE_CURRENCY_KEY, TOKEN_KEY, USER_KEY};
