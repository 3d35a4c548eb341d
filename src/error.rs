// src/error.rs

use thiserror::Error;

/// Reason text used when a failure carries no readable message at all.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Everything that can go wrong between a connector and a remote API.
///
/// The accounting connector never hands these to its callers; it folds them
/// into a `ConnectionResult` or an empty list. The display text doubles as the
/// human-readable failure reason shown in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request never produced a response (DNS, refused, timeout, TLS...).
    #[error("{0}")]
    Network(String),

    /// Response arrived with a status outside [200, 300).
    #[error("{}", status_reason(.status, .message))]
    Status { status: u16, message: Option<String> },

    /// Response arrived but its shape is not what we can map.
    #[error("Unexpected response shape: {0}")]
    Malformed(String),

    /// A write matched no row.
    #[error("{0} not found")]
    NotFound(String),

    /// The service address needed for this call is missing from the config.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl TransportError {
    /// Human-readable reason, never empty.
    pub fn reason(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            text
        }
    }
}

fn status_reason(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.clone(),
        _ => format!("Request failed with status code {}", status),
    }
}
