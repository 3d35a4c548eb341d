// src/connectors/backend.rs
//
// Hosted backend access: the shared authenticated transport and the
// read-only checks behind the settings page.

use super::http::ReqwestTransport;
use crate::config::{BackendConfig, Config};
use crate::error::TransportError;
use crate::models::{ConnectionMode, ConnectionResult};
use crate::traits::SharedTransport;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const AUTH_SETTINGS_PATH: &str = "/auth/v1/settings";

/// Checklist of what is configured, without revealing any value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettingsReport {
    pub accounting_key_present: bool,
    pub accounting_mode: ConnectionMode,
    pub backend_url_present: bool,
    pub backend_anon_key_present: bool,
    pub oauth_provider: String,
}

impl SettingsReport {
    pub fn from_config(config: &Config) -> Self {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        Self {
            accounting_key_present: present(&config.accounting.api_key),
            accounting_mode: if config.accounting.use_proxy {
                ConnectionMode::Proxied
            } else {
                ConnectionMode::Direct
            },
            backend_url_present: present(&config.backend.url),
            backend_anon_key_present: present(&config.backend.anon_key),
            oauth_provider: config.backend.oauth_provider.clone(),
        }
    }
}

/// Transport for the backend's REST and auth endpoints, sending the anon key
/// both as `apikey` and as a bearer token. `None` when no URL is configured.
pub fn backend_transport(config: &BackendConfig) -> Result<Option<SharedTransport>, TransportError> {
    let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let key = config.anon_key.clone().unwrap_or_default();
    let transport = ReqwestTransport::with_headers(
        url,
        &[("apikey", key.clone()), ("authorization", format!("Bearer {}", key))],
    )?;
    Ok(Some(Arc::new(transport)))
}

pub struct BackendProbe {
    transport: Option<SharedTransport>,
    provider: String,
}

impl BackendProbe {
    /// Builds the probe. Without a backend URL every check reports a failure.
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        Ok(Self {
            transport: backend_transport(config)?,
            provider: config.oauth_provider.clone(),
        })
    }

    pub fn with_transport(transport: Option<SharedTransport>, provider: impl Into<String>) -> Self {
        Self {
            transport,
            provider: provider.into(),
        }
    }

    /// Whether sign-in through the configured OAuth provider is enabled.
    /// Never fails; problems end up in the summary.
    pub async fn check_oauth_provider(&self) -> ConnectionResult {
        let Some(transport) = &self.transport else {
            return ConnectionResult::Failed {
                summary: TransportError::NotConfigured("backend URL").reason(),
            };
        };

        let body = match transport.get(AUTH_SETTINGS_PATH, &[]).await {
            Ok(response) => response.into_success(),
            Err(e) => Err(e),
        };

        match body {
            Ok(settings) => {
                let enabled = settings
                    .get("external")
                    .and_then(|e| e.get(&self.provider))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if enabled {
                    info!("BackendProbe: {} sign-in is enabled", self.provider);
                    ConnectionResult::Ok
                } else {
                    warn!("BackendProbe: {} sign-in is not enabled", self.provider);
                    ConnectionResult::Failed {
                        summary: format!("{} sign-in is not enabled", self.provider),
                    }
                }
            }
            Err(e) => {
                warn!("BackendProbe: settings lookup failed: {}", e.reason());
                ConnectionResult::Failed { summary: e.reason() }
            }
        }
    }
}
