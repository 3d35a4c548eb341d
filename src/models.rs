// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How many collected failure reasons make it into a `Failed` summary.
///
/// Later failures are dropped to keep the message short.
pub const MAX_SUMMARY_FAILURES: usize = 2;

/// Separator between failure reasons in a summary.
pub const SUMMARY_SEPARATOR: &str = "; ";

// =============================================================================
// Credentials
// =============================================================================

/// Where requests go and who attaches the API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Straight to the accounting API; we attach the bearer token.
    Direct,
    /// Through the local relay, which injects the token itself.
    Proxied,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Direct => write!(f, "direct"),
            ConnectionMode::Proxied => write!(f, "proxied"),
        }
    }
}

/// Resolved connection settings, fixed for the lifetime of a connector.
///
/// In `Proxied` mode `api_key` is always `None`: the key stays with the relay.
/// A missing key in `Direct` mode is allowed here; authenticated calls will
/// simply fail later.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionCredentials {
    pub mode: ConnectionMode,
    pub base_address: String,
    pub api_key: Option<String>,
}

impl ConnectionCredentials {
    pub fn direct(base_address: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            mode: ConnectionMode::Direct,
            base_address: base_address.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn proxied(relay_address: impl Into<String>) -> Self {
        Self {
            mode: ConnectionMode::Proxied,
            base_address: relay_address.into(),
            api_key: None,
        }
    }

    /// Value for the `Authorization` header, if this mode sends one.
    pub fn authorization_header(&self) -> Option<String> {
        match self.mode {
            ConnectionMode::Proxied => None,
            ConnectionMode::Direct => self.api_key.as_ref().map(|k| format!("Bearer {}", k)),
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for ConnectionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredentials")
            .field("mode", &self.mode)
            .field("base_address", &self.base_address)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// =============================================================================
// Probing
// =============================================================================

/// One endpoint in a fixed-priority fallback list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EndpointCandidate {
    pub path: &'static str,
    pub label: &'static str,
}

impl EndpointCandidate {
    pub const fn new(path: &'static str, label: &'static str) -> Self {
        Self { path, label }
    }
}

/// Outcome of a connectivity check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionResult {
    Ok,
    Failed { summary: String },
}

impl ConnectionResult {
    /// Builds a `Failed` from collected reasons, keeping only the first
    /// `MAX_SUMMARY_FAILURES` of them.
    pub fn from_failures<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let summary = reasons
            .into_iter()
            .take(MAX_SUMMARY_FAILURES)
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(SUMMARY_SEPARATOR);
        ConnectionResult::Failed { summary }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ConnectionResult::Ok)
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            ConnectionResult::Ok => None,
            ConnectionResult::Failed { summary } => Some(summary),
        }
    }
}

// =============================================================================
// Accounting Records
// =============================================================================

/// An organization (restaurant entity) as exposed by the accounting API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedOrganization {
    pub id: String,
    pub name: String,
}

/// An invoice exactly as the accounting API returned it.
///
/// No field is normalized; the accessors below only read well-known keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Invoice(pub Value);

impl Invoice {
    /// Invoice id as text, whatever its JSON type.
    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(id_text)
    }

    /// Amount as a number. Numeric strings (`"12.50"`) are accepted since
    /// some tenants serialize decimals that way.
    pub fn amount(&self) -> Option<f64> {
        match self.0.get("amount")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Text form of a JSON id: strings as-is, other scalars and structures via
/// their JSON rendering (`1`, `true`). `null` has no id.
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Optional filters forwarded verbatim as query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilters {
    pub organization_id: Option<String>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl InvoiceFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(org) = &self.organization_id {
            query.push(("organization_id", org.clone()));
        }
        if let Some(per_page) = self.per_page {
            query.push(("per_page", per_page.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        query
    }
}

/// One line of the management account statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManagementAccountEntry {
    pub id: String,
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

// =============================================================================
// Restaurants
// =============================================================================

/// A restaurant row as stored in the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Owner account details plus the editable fields of a new restaurant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Editable fields of an existing restaurant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantUpdate {
    pub name: String,
    pub address: String,
    pub phone: String,
}
