//! MCP Server implementation
//!
//! Drives the read → classify → dispatch → respond loop over a line-delimited
//! stream, racing each read against cancellation and the shutdown signal.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::error::{McpError, Result};
use crate::mcp::classify::{classify, Message};
use crate::mcp::dispatch::{Dispatcher, RequestContext};
use crate::mcp::lifecycle::{shutdown_signal, CancelHandle, CancelToken, RunState, StopReason};
use crate::mcp::transport::{transport_error, LineReader, ReadLine, ResponseWriter};
use crate::mcp::types::*;

/// What a single cycle asks of the loop
enum Cycle {
    Continue,
    Cancelled,
    Signalled,
}

/// MCP Server for Everything search
pub struct McpServer {
    /// Method table, fixed for the lifetime of the server
    dispatcher: Dispatcher,

    /// Current lifecycle state
    state: RunState,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,

    /// Upper bound on a single handler call
    handler_timeout: Option<Duration>,

    cancel: CancelHandle,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            state: RunState::Running,
            initialized: false,
            handler_timeout: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Bound every handler call; a timed out call is answered with an
    /// internal error.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Handle that stops the loop from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio until EOF, cancellation, or SIGINT/SIGTERM
    pub async fn run_stdio(&mut self) -> Result<StopReason> {
        info!("Everything MCP server listening on stdio");
        self.run(tokio::io::stdin(), tokio::io::stdout(), shutdown_signal())
            .await
    }

    /// Serve `input`/`output` until the stream ends, the cancel handle fires,
    /// or `shutdown` resolves.
    ///
    /// Returns a transport error when reading or writing fails. A stopped
    /// server cannot be run again.
    pub async fn run<R, W, S>(&mut self, input: R, output: W, shutdown: S) -> Result<StopReason>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        if self.state == RunState::Stopped {
            return Err(McpError::ProtocolError {
                message: "server already stopped".to_string(),
            }
            .into());
        }

        let result = self
            .serve(LineReader::new(input), ResponseWriter::new(output), shutdown)
            .await;
        self.state = RunState::Stopped;

        match &result {
            Ok(reason) => info!(?reason, "Server stopped"),
            Err(e) => warn!(error = %e, "Server stopped with error"),
        }
        result
    }

    async fn serve<R, W, S>(
        &mut self,
        mut reader: LineReader<R>,
        mut writer: ResponseWriter<W>,
        shutdown: S,
    ) -> Result<StopReason>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let token = self.cancel.token();
        tokio::pin!(shutdown);

        loop {
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(self.stop(StopReason::Cancelled)),
                _ = &mut shutdown => return Ok(self.stop(StopReason::Signalled)),
                read = reader.next_line() => read,
            };

            match read {
                Ok(ReadLine::Line(line)) => {
                    let cycle = self
                        .process_line(&line, &mut writer, &token, shutdown.as_mut())
                        .await?;
                    match cycle {
                        Cycle::Continue => {}
                        Cycle::Cancelled => return Ok(self.stop(StopReason::Cancelled)),
                        Cycle::Signalled => return Ok(self.stop(StopReason::Signalled)),
                    }
                }
                Ok(ReadLine::Eof) => {
                    debug!("Input stream closed");
                    return Ok(self.stop(StopReason::EndOfStream));
                }
                Err(e) => {
                    self.state = RunState::ShuttingDown;
                    return Err(transport_error("read", e).into());
                }
            }
        }
    }

    /// Enter `ShuttingDown`; a signal also cancels the token handlers observe.
    fn stop(&mut self, reason: StopReason) -> StopReason {
        if reason == StopReason::Signalled {
            self.cancel.cancel();
        }
        self.state = RunState::ShuttingDown;
        reason
    }

    /// One classify → dispatch → respond cycle
    async fn process_line<W, S>(
        &mut self,
        line: &str,
        writer: &mut ResponseWriter<W>,
        token: &CancelToken,
        shutdown: Pin<&mut S>,
    ) -> Result<Cycle>
    where
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        if line.trim().is_empty() {
            return Ok(Cycle::Continue);
        }

        match classify(line) {
            Message::Notification { method, .. } => {
                self.handle_notification(&method);
                Ok(Cycle::Continue)
            }
            Message::Malformed { id: None, reason } => {
                warn!(%reason, "Dropping malformed message");
                Ok(Cycle::Continue)
            }
            Message::Malformed { id: Some(id), reason } => {
                warn!(%reason, ?id, "Rejecting malformed message");
                writer
                    .write_response(&JsonRpcResponse::error(id, reason.to_rpc_error()))
                    .await?;
                Ok(Cycle::Continue)
            }
            Message::Request { id, method, params } => {
                debug!(%method, ?id, "Handling request");
                let ctx = RequestContext::new(id.clone(), method, token.clone());

                // The abandoned handler is dropped and nothing is written
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Ok(Cycle::Cancelled),
                    _ = shutdown => return Ok(Cycle::Signalled),
                    outcome = self.call(&ctx, params) => outcome,
                };

                let response = match outcome {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(error) => {
                        debug!(method = %ctx.method, code = error.code, message = %error.message, "Request failed");
                        JsonRpcResponse::error(id, error)
                    }
                };
                writer.write_response(&response).await?;
                Ok(Cycle::Continue)
            }
        }
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, JsonRpcError> {
        let dispatch = self.dispatcher.dispatch(ctx, params);
        let outcome = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, dispatch).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(method = %ctx.method, ?limit, "Handler timed out");
                    return Err(JsonRpcError::internal_error(format!(
                        "Handler for {} timed out after {:?}",
                        ctx.method, limit
                    )));
                }
            },
            None => dispatch.await,
        };
        outcome.map_err(|e| e.to_rpc_error())
    }

    fn handle_notification(&mut self, method: &str) {
        if method == methods::INITIALIZED {
            self.initialized = true;
            info!("Client initialization complete");
        } else {
            debug!(%method, "Ignoring notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::dispatch::{handler_fn, HandlerError};
    use serde_json::{json, Value};

    fn ping_server() -> McpServer {
        let dispatcher = Dispatcher::builder()
            .register("ping", handler_fn(|_ctx, _params| async { Ok::<_, HandlerError>(json!("pong")) }))
            .unwrap()
            .build();
        McpServer::new(dispatcher)
    }

    #[tokio::test]
    async fn test_initialized_notification_sets_flag() {
        let mut server = ping_server();
        let input = b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n".to_vec();
        let mut output = Vec::new();

        let reason = server
            .run(std::io::Cursor::new(input), &mut output, std::future::pending())
            .await
            .unwrap();

        assert_eq!(reason, StopReason::EndOfStream);
        assert!(server.is_initialized());
        assert!(output.is_empty());
        assert_eq!(server.run_state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn test_stopped_server_cannot_rerun() {
        let mut server = ping_server();
        server
            .run(std::io::Cursor::new(Vec::new()), Vec::new(), std::future::pending())
            .await
            .unwrap();

        let err = server
            .run(std::io::Cursor::new(Vec::new()), Vec::new(), std::future::pending())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already stopped"));
    }

    #[tokio::test]
    async fn test_malformed_with_id_gets_invalid_request() {
        let mut server = ping_server();
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":9}\n".to_vec();
        let mut output = Vec::new();

        server
            .run(std::io::Cursor::new(input), &mut output, std::future::pending())
            .await
            .unwrap();

        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_timeout_is_internal_error() {
        let dispatcher = Dispatcher::builder()
            .register(
                "slow",
                handler_fn(|_ctx, _params| async {
                    tokio::time::sleep(Duration::from_secs(120)).await;
                    Ok::<_, HandlerError>(Value::Null)
                }),
            )
            .unwrap()
            .build();
        let mut server = McpServer::new(dispatcher).with_handler_timeout(Duration::from_secs(1));

        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"slow\"}\n".to_vec();
        let mut output = Vec::new();
        server
            .run(std::io::Cursor::new(input), &mut output, std::future::pending())
            .await
            .unwrap();

        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["error"]["code"], codes::INTERNAL_ERROR);
    }
}
