//! Method dispatch
//!
//! A [`Dispatcher`] is an immutable table from method name to
//! [`MethodHandler`], built once with [`DispatcherBuilder`] before the server
//! loop starts.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::{EverythingMcpError, McpError};
use crate::mcp::lifecycle::CancelToken;
use crate::mcp::types::{JsonRpcError, RequestId};

/// Per-request context handed to a handler
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: RequestId,
    pub method: String,
    cancel: CancelToken,
}

impl RequestContext {
    pub fn new(id: RequestId, method: impl Into<String>, cancel: CancelToken) -> Self {
        Self {
            id,
            method: method.into(),
            cancel,
        }
    }

    /// Cancellation of the server loop running this request
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// Failure reported by a handler
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),

    /// Already a structured protocol error; sent as-is
    #[error("{}", .0.message)]
    Rpc(JsonRpcError),
}

impl HandlerError {
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            HandlerError::InvalidParams(_) => JsonRpcError::invalid_params(self.to_string()),
            HandlerError::Internal(message) => JsonRpcError::internal_error(message.clone()),
            HandlerError::Rpc(error) => error.clone(),
        }
    }
}

impl From<EverythingMcpError> for HandlerError {
    fn from(err: EverythingMcpError) -> Self {
        HandlerError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Internal(err.to_string())
    }
}

/// Outcome of a failed dispatch
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            DispatchError::MethodNotFound(method) => JsonRpcError::method_not_found(method),
            DispatchError::Handler(err) => err.to_rpc_error(),
        }
    }
}

/// Capability invoked for one method name
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, ctx: &RequestContext, params: Value) -> Result<Value, HandlerError>;
}

/// Adapts an async closure into a [`MethodHandler`]
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> MethodHandler for FnHandler<F>
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send,
{
    async fn handle(&self, ctx: &RequestContext, params: Value) -> Result<Value, HandlerError> {
        (self.0)(ctx.clone(), params).await
    }
}

/// Collects handlers; rejects a second registration under the same name
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(mut self, method: impl Into<String>, handler: H) -> Result<Self, McpError>
    where
        H: MethodHandler + 'static,
    {
        let method = method.into();
        if self.handlers.contains_key(&method) {
            return Err(McpError::DuplicateMethod { method });
        }
        self.handlers.insert(method, Arc::new(handler));
        Ok(self)
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            handlers: self.handlers,
        }
    }
}

/// Immutable method table
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke the handler registered for `ctx.method`
    pub async fn dispatch(&self, ctx: &RequestContext, params: Value) -> Result<Value, DispatchError> {
        let handler = self
            .handlers
            .get(&ctx.method)
            .ok_or_else(|| DispatchError::MethodNotFound(ctx.method.clone()))?;

        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };

        Ok(handler.handle(ctx, params).await?)
    }
}
