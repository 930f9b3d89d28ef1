//! MCP (Model Context Protocol) module
//!
//! Implements the JSON-RPC stdio server: transport, message classification,
//! method dispatch, lifecycle, and the Everything search tools.

pub mod classify;
pub mod dispatch;
pub mod lifecycle;
pub mod methods;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;
