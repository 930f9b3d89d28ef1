//! MCP method handlers
//!
//! `initialize`, `ping`, `tools/list`, and `tools/call`, registered on a
//! [`Dispatcher`] for the production server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::mcp::dispatch::{Dispatcher, HandlerError, MethodHandler, RequestContext};
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP Server info
pub const SERVER_NAME: &str = "everything-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version answered for a client-requested version
pub fn negotiate_protocol_version(requested: &str) -> &str {
    if requested.is_empty() || requested == "1.0" {
        MCP_VERSION
    } else {
        requested
    }
}

/// Handles `initialize`
pub struct InitializeHandler;

#[async_trait]
impl MethodHandler for InitializeHandler {
    async fn handle(&self, _ctx: &RequestContext, params: Value) -> std::result::Result<Value, HandlerError> {
        let params: InitializeParams = serde_json::from_value(params)
            .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;

        if let Some(client) = &params.client_info {
            info!(client = %client.name, version = %client.version, "Client connected");
        }

        let result = InitializeResult {
            protocol_version: negotiate_protocol_version(&params.protocol_version).to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: true }),
            },
        };

        Ok(serde_json::to_value(result)?)
    }
}

/// Handles `ping`
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(&self, _ctx: &RequestContext, _params: Value) -> std::result::Result<Value, HandlerError> {
        Ok(json!({}))
    }
}

/// Handles `tools/list`
pub struct ListToolsHandler {
    tools: Arc<ToolHandler>,
}

impl ListToolsHandler {
    pub fn new(tools: Arc<ToolHandler>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl MethodHandler for ListToolsHandler {
    async fn handle(&self, _ctx: &RequestContext, _params: Value) -> std::result::Result<Value, HandlerError> {
        let result = ListToolsResult {
            tools: self.tools.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }
}

/// Handles `tools/call`
pub struct CallToolHandler {
    tools: Arc<ToolHandler>,
}

impl CallToolHandler {
    pub fn new(tools: Arc<ToolHandler>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl MethodHandler for CallToolHandler {
    async fn handle(&self, ctx: &RequestContext, params: Value) -> std::result::Result<Value, HandlerError> {
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;

        debug!(tool = %params.name, "Calling tool");
        // Dropping the tool future aborts its in-flight search request
        let result = tokio::select! {
            biased;
            _ = ctx.cancel_token().cancelled() => {
                debug!(tool = %params.name, "Tool call cancelled");
                return Err(HandlerError::Internal(format!("{} cancelled", params.name)));
            }
            result = self.tools.call_tool(&params.name, params.arguments) => result,
        };
        if result.is_error {
            debug!(tool = %params.name, "Tool reported an error");
        }

        Ok(serde_json::to_value(result)?)
    }
}

/// Dispatcher with every MCP method the server answers
pub fn everything_dispatcher(tools: Arc<ToolHandler>) -> Result<Dispatcher> {
    let dispatcher = Dispatcher::builder()
        .register(methods::INITIALIZE, InitializeHandler)?
        .register(methods::PING, PingHandler)?
        .register(methods::LIST_TOOLS, ListToolsHandler::new(tools.clone()))?
        .register(methods::CALL_TOOL, CallToolHandler::new(tools))?
        .build();
    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::everything::client::Searcher;
    use crate::everything::types::SearchResult;
    use crate::mcp::dispatch::DispatchError;
    use crate::mcp::lifecycle::CancelHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct NoResults;

    #[async_trait]
    impl Searcher for NoResults {
        async fn search(&self, _query: &str, _max_results: u32) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    fn dispatcher() -> Dispatcher {
        everything_dispatcher(Arc::new(ToolHandler::new(Arc::new(NoResults)))).unwrap()
    }

    fn ctx(method: &str) -> RequestContext {
        RequestContext::new(RequestId::from(1), method, CancelHandle::new().token())
    }

    #[test]
    fn test_negotiate_protocol_version() {
        assert_eq!(negotiate_protocol_version(""), MCP_VERSION);
        assert_eq!(negotiate_protocol_version("1.0"), MCP_VERSION);
        assert_eq!(negotiate_protocol_version("2025-03-26"), "2025-03-26");
    }

    #[test]
    fn test_registered_methods() {
        assert_eq!(
            dispatcher().methods(),
            vec!["initialize", "ping", "tools/call", "tools/list"]
        );
    }

    #[tokio::test]
    async fn test_initialize_echoes_version() {
        let result = dispatcher()
            .dispatch(
                &ctx(methods::INITIALIZE),
                json!({"protocolVersion": "2025-03-26", "clientInfo": {"name": "t", "version": "1"}}),
            )
            .await
            .unwrap();

        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
    }

    #[tokio::test]
    async fn test_initialize_without_params_uses_default_version() {
        let result = dispatcher()
            .dispatch(&ctx(methods::INITIALIZE), Value::Null)
            .await
            .unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
    }

    #[tokio::test]
    async fn test_ping_returns_empty_object() {
        let result = dispatcher().dispatch(&ctx(methods::PING), json!({})).await.unwrap();
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn test_list_tools() {
        let result = dispatcher()
            .dispatch(&ctx(methods::LIST_TOOLS), json!({}))
            .await
            .unwrap();
        assert_eq!(result["tools"].as_array().unwrap().len(), 14);
        assert!(result["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_call_tool_missing_name_is_invalid_params() {
        let err = dispatcher()
            .dispatch(&ctx(methods::CALL_TOOL), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_rpc_error().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_call_unknown_tool_is_tool_error() {
        let result = dispatcher()
            .dispatch(&ctx(methods::CALL_TOOL), json!({"name": "nope"}))
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["type"], "text");
    }

    /// Counts calls, then never answers
    struct StalledSearch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Searcher for StalledSearch {
        async fn search(&self, _query: &str, _max_results: u32) -> Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_running_tool_call() {
        let searcher = Arc::new(StalledSearch {
            calls: AtomicUsize::new(0),
        });
        let dispatcher =
            everything_dispatcher(Arc::new(ToolHandler::new(searcher.clone()))).unwrap();

        let cancel = CancelHandle::new();
        let ctx = RequestContext::new(RequestId::from(1), methods::CALL_TOOL, cancel.token());
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = dispatcher
            .dispatch(&ctx, json!({"name": "search_files", "arguments": {"query": "x"}}))
            .await
            .unwrap_err();

        assert_eq!(searcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_rpc_error().code, codes::INTERNAL_ERROR);
        assert!(err.to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let err = dispatcher()
            .dispatch(&ctx("resources/list"), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotFound(_)));
    }
}
