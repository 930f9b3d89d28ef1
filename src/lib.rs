//! Everything MCP Server Library
//!
//! A Model Context Protocol (MCP) server for the Everything (voidtools) file
//! search engine. Exposes Everything's HTTP search API as MCP tools over a
//! line-delimited JSON-RPC stdio transport.

pub mod config;
pub mod error;
pub mod everything;
pub mod mcp;

pub use config::Config;
pub use error::{EverythingMcpError, Result};
