// src/config.rs
//
// Configuration file parsing plus environment overrides.
// Every section has defaults, so an empty file is a valid config.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use url::Url;

/// Public accounting API base address.
pub const DEFAULT_ACCOUNTING_API_URL: &str = "https://app.pennylane.com/api/external/v1";

/// Where proxied connectors send their requests: the relay mounted by our
/// own server on the default port.
pub const RELAY_ADDRESS: &str = "http://127.0.0.1:8080/pennylane";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OAUTH_PROVIDER: &str = "google";

// =============================================================================
// Configuration Types
// =============================================================================

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub accounting: AccountingConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Accounting connector settings. Read once when the connector is built.
#[derive(Clone, Deserialize)]
pub struct AccountingConfig {
    /// Route through the local relay instead of calling the API directly.
    #[serde(default)]
    pub use_proxy: bool,
    /// Base address used in direct mode.
    #[serde(default = "default_accounting_api_url")]
    pub api_url: String,
    /// Bearer token for direct mode.
    pub api_key: Option<String>,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            use_proxy: false,
            api_url: DEFAULT_ACCOUNTING_API_URL.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for AccountingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountingConfig")
            .field("use_proxy", &self.use_proxy)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_accounting_api_url() -> String {
    DEFAULT_ACCOUNTING_API_URL.to_string()
}

/// Local relay that forwards `/pennylane/*` to the accounting API with the key attached.
#[derive(Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_accounting_api_url")]
    pub upstream: String,
    /// Key injected by the relay. Falls back to `accounting.api_key`.
    pub api_key: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            upstream: DEFAULT_ACCOUNTING_API_URL.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("enabled", &self.enabled)
            .field("upstream", &self.upstream)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_true() -> bool {
    true
}

/// Hosted auth/persistence backend: settings checks and restaurant storage.
#[derive(Clone, Debug, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    #[serde(default = "default_oauth_provider")]
    pub oauth_provider: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            oauth_provider: DEFAULT_OAUTH_PROVIDER.to_string(),
        }
    }
}

fn default_oauth_provider() -> String {
    DEFAULT_OAUTH_PROVIDER.to_string()
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`. Empty values are ignored.
    ///
    /// `PENNYLANE_USE_PROXY` enables proxy mode only for `"true"` (any case).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PENNYLANE_USE_PROXY") {
            self.accounting.use_proxy = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("PENNYLANE_API_URL") {
            self.accounting.api_url = v;
        }
        if let Some(v) = get("PENNYLANE_API_KEY") {
            self.accounting.api_key = Some(v);
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.backend.url = Some(v);
        }
        if let Some(v) = get("SUPABASE_ANON_KEY") {
            self.backend.anon_key = Some(v);
        }
    }

    /// Checks that every configured address is a valid absolute URL.
    pub fn validate(&self) -> Result<(), String> {
        check_url("accounting.api_url", &self.accounting.api_url)?;
        check_url("relay.upstream", &self.relay.upstream)?;
        if let Some(url) = &self.backend.url {
            check_url("backend.url", url)?;
        }
        Ok(())
    }

    /// Key the relay injects: its own, else the accounting one.
    pub fn relay_api_key(&self) -> Option<String> {
        self.relay
            .api_key
            .clone()
            .or_else(|| self.accounting.api_key.clone())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), String> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| format!("Invalid {} '{}': {}", field, value, e))
}

// =============================================================================
// Default Configuration
// =============================================================================

/// Returns a default configuration string for documentation.
pub fn default_config_template() -> &'static str {
    r#"# RestoPilot Configuration
#
# Environment variables override the file:
#   PENNYLANE_USE_PROXY, PENNYLANE_API_URL, PENNYLANE_API_KEY,
#   SUPABASE_URL, SUPABASE_ANON_KEY

[server]
port = 8080

[accounting]
# true: go through the local relay (/pennylane), which attaches the key.
# false: call api_url directly with the key as a bearer token.
use_proxy = false
api_url = "https://app.pennylane.com/api/external/v1"
# api_key = "..."

[relay]
enabled = true
upstream = "https://app.pennylane.com/api/external/v1"
# api_key = "..."   # defaults to accounting.api_key

[backend]
# url = "https://<project>.supabase.co"
# anon_key = "..."
oauth_provider = "google"
"#
}

// =============================================================================
// Tests
// =============================================================================
