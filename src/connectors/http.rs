// src/connectors/http.rs
//
// reqwest-backed transport. One client per base address, default headers
// fixed at construction.

use crate::error::TransportError;
use crate::models::ConnectionCredentials;
use crate::traits::{HttpTransport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

pub struct ReqwestTransport {
    base_address: String,
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport sending `headers` on every request.
    pub fn new(base_address: &str, headers: HeaderMap) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_address: base_address.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Transport for the accounting API. Adds the bearer header only when the
    /// credentials call for one (direct mode with a key).
    pub fn for_credentials(credentials: &ConnectionCredentials) -> Result<Self, TransportError> {
        let mut headers = json_headers();
        if let Some(auth) = credentials.authorization_header() {
            headers.insert(AUTHORIZATION, header_value(&auth)?);
        }
        Self::new(&credentials.base_address, headers)
    }

    /// Transport with extra named headers on top of the JSON content type.
    pub fn with_headers(base_address: &str, extra: &[(&str, String)]) -> Result<Self, TransportError> {
        let mut headers = json_headers();
        for (name, value) in extra {
            headers.insert(header_name(name)?, header_value(value)?);
        }
        Self::new(base_address, headers)
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn header_name(name: &str) -> Result<HeaderName, TransportError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| TransportError::Network(format!("Invalid header name {:?}: {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| TransportError::Network(format!("Invalid header value: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Decodes a response body: JSON when it parses, the raw text otherwise,
/// `Null` when empty.
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_address, request.path);
        debug!("ReqwestTransport: {} {} {:?}", request.method, url, request.query);

        let mut builder = self
            .http_client
            .request(request.method, &url)
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(header_name(name)?, header_value(value)?);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(TransportResponse::new(status, decode_body(&text)))
    }

    fn base_address(&self) -> &str {
        &self.base_address
    }
}
