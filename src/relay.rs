// src/relay.rs
//
// Local relay for proxied mode: rewrites `/pennylane/<path>` onto the
// accounting API and attaches the bearer token server-side, so clients
// never hold the key.

use crate::error::TransportError;
use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode};
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

/// Path prefix the relay is mounted under.
pub const RELAY_PREFIX: &str = "/pennylane";

/// What the upstream answered, ready to hand back to the caller.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

pub struct Relay {
    upstream: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl Relay {
    pub fn new(upstream: &str, api_key: Option<String>) -> Self {
        Self {
            upstream: upstream.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Upstream URL for a path below the prefix, query string preserved.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.upstream, path.trim_start_matches('/'));
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        url
    }

    /// Forwards one request. Method and body pass through unchanged.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Bytes,
    ) -> Result<RelayResponse, TransportError> {
        let url = self.target_url(path, query);
        debug!("Relay: {} {}", method, url);

        let mut request = self.http_client.request(method, &url).body(body);
        if let Some(key) = &self.api_key {
            request = request
                .header(AUTHORIZATION, format!("Bearer {}", key))
                .header(CONTENT_TYPE, "application/json");
        }

        let response = request.send().await.map_err(|e| {
            warn!("Relay: upstream request to {} failed: {}", url, e);
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(RelayResponse {
            status,
            content_type,
            body,
        })
    }
}
