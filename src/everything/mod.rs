//! Everything search module
//!
//! Contains types, query construction, and the HTTP client for the Everything
//! (voidtools) search server.

pub mod client;
pub mod query;
pub mod types;
pub mod utils;
