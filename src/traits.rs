// src/traits.rs

use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// One outbound call: method, path relative to the base address, query
/// pairs, optional JSON body and per-request headers.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(&'static str, String)>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// A response as seen by the connector: status code plus decoded body.
///
/// Non-JSON bodies arrive as `Value::String`, empty bodies as `Value::Null`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body for 2xx responses, otherwise a `Status` error carrying
    /// the server's `message` field when there is one.
    pub fn into_success(self) -> Result<Value, TransportError> {
        if self.is_success() {
            return Ok(self.body);
        }
        let message = self
            .body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        Err(TransportError::Status {
            status: self.status,
            message,
        })
    }
}

/// Outbound HTTP seam used by the connectors.
/// Implementations must be shareable across tasks; tests plug in a scripted fake.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues one request. Any status code is returned as `Ok`; only
    /// transport failures are `Err`.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// GET for `path` (relative to the transport's base address).
    async fn get(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<TransportResponse, TransportError> {
        self.send(TransportRequest::get(path).query(query.to_vec()))
            .await
    }

    /// Base address requests are resolved against (for logging).
    fn base_address(&self) -> &str;
}

pub type SharedTransport = Arc<dyn HttpTransport>;
