// src/connectors/accounting.rs
//
// Accounting API connector: connectivity probing with endpoint fallback,
// organization and invoice listing with envelope unwrapping.
// Nothing here returns an error to the caller.

use super::http::ReqwestTransport;
use crate::config::{AccountingConfig, RELAY_ADDRESS};
use crate::error::TransportError;
use crate::models::{
    id_text, ConnectionCredentials, ConnectionResult, EndpointCandidate, Invoice, InvoiceFilters,
    NormalizedOrganization,
};
use crate::probe::first_success;
use crate::traits::SharedTransport;
use futures::FutureExt;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;

/// Probe order for `test_connection`, most likely to work first.
pub const PROBE_CANDIDATES: [EndpointCandidate; 4] = [
    EndpointCandidate::new("/invoices", "invoices"),
    EndpointCandidate::new("/customers", "customers"),
    EndpointCandidate::new("/customer_invoices", "customer_invoices"),
    EndpointCandidate::new("/supplier_invoices", "supplier_invoices"),
];

pub const ORGANIZATIONS_ENDPOINT: EndpointCandidate =
    EndpointCandidate::new("/organizations", "organizations");
/// Some tenants expose their restaurants as entities instead.
pub const ENTITIES_ENDPOINT: EndpointCandidate = EndpointCandidate::new("/entities", "entities");

pub const INVOICES_ENDPOINT: EndpointCandidate = EndpointCandidate::new("/invoices", "invoices");
pub const CUSTOMER_INVOICES_ENDPOINT: EndpointCandidate =
    EndpointCandidate::new("/customer_invoices", "customer_invoices");

pub const DEFAULT_ORGANIZATION_NAME: &str = "Organisation";
pub const DEFAULT_ENTITY_NAME: &str = "Entité";

/// Probes ask for at most one record.
const PROBE_PAGE_SIZE: &str = "1";

/// Field some responses wrap their list in.
const ENVELOPE_FIELD: &str = "data";

pub struct AccountingConnector {
    credentials: ConnectionCredentials,
    transport: SharedTransport,
}

impl AccountingConnector {
    /// Resolves credentials from config and builds the HTTP transport.
    ///
    /// Proxied mode targets the local relay and sends no key; direct mode
    /// targets `api_url` and sends the key as a bearer token when present.
    pub fn new(config: &AccountingConfig) -> Result<Self, TransportError> {
        let credentials = if config.use_proxy {
            ConnectionCredentials::proxied(RELAY_ADDRESS)
        } else {
            ConnectionCredentials::direct(config.api_url.clone(), config.api_key.clone())
        };
        let transport = ReqwestTransport::for_credentials(&credentials)?;

        info!(
            "AccountingConnector: {} mode, base address {}",
            credentials.mode, credentials.base_address
        );
        Ok(Self::with_transport(credentials, Arc::new(transport)))
    }

    pub fn with_transport(credentials: ConnectionCredentials, transport: SharedTransport) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub fn credentials(&self) -> &ConnectionCredentials {
        &self.credentials
    }

    /// Checks connectivity and credentials by probing each candidate in
    /// order. The first 2xx wins; if all fail, the summary holds the first
    /// two failure reasons.
    pub async fn test_connection(&self) -> ConnectionResult {
        let query = [("per_page", PROBE_PAGE_SIZE.to_string())];

        let outcome = first_success(&PROBE_CANDIDATES, |candidate| {
            debug!(
                "AccountingConnector: probing {} at {}{}",
                candidate.label,
                self.transport.base_address(),
                candidate.path
            );
            self.fetch(candidate.path, &query).boxed()
        })
        .await;

        match outcome {
            Ok((candidate, _)) => {
                info!("AccountingConnector: connected via {}", candidate.label);
                ConnectionResult::Ok
            }
            Err(failures) => {
                error!(
                    "AccountingConnector: all {} endpoints failed: {:?}",
                    failures.len(),
                    failures.iter().map(|f| f.to_string()).collect::<Vec<_>>()
                );
                ConnectionResult::from_failures(failures)
            }
        }
    }

    /// Lists organizations, falling back to entities. Empty on double failure.
    pub async fn get_organizations(&self) -> Vec<NormalizedOrganization> {
        let candidates = [ORGANIZATIONS_ENDPOINT, ENTITIES_ENDPOINT];

        let outcome = first_success(&candidates, |candidate| {
            let default_name = default_organization_name(candidate);
            async move {
                let items = unwrap_envelope(self.fetch(candidate.path, &[]).await?)?;
                Ok::<_, TransportError>(
                    items
                        .iter()
                        .filter_map(|item| normalize_organization(item, default_name))
                        .collect::<Vec<_>>(),
                )
            }
            .boxed()
        })
        .await;

        match outcome {
            Ok((_, organizations)) => organizations,
            Err(_) => {
                warn!("AccountingConnector: organizations/entities endpoints not available, check the API base address");
                Vec::new()
            }
        }
    }

    /// Lists invoices, falling back to customer invoices with the same
    /// filters. Invoices are passed through untouched. Empty on double failure.
    pub async fn get_invoices(&self, filters: &InvoiceFilters) -> Vec<Invoice> {
        let candidates = [INVOICES_ENDPOINT, CUSTOMER_INVOICES_ENDPOINT];
        let query = filters.to_query();

        let outcome = first_success(&candidates, |candidate| {
            let query = &query;
            async move {
                let items = unwrap_envelope(self.fetch(candidate.path, query).await?)?;
                Ok::<_, TransportError>(items.into_iter().map(Invoice).collect::<Vec<_>>())
            }
            .boxed()
        })
        .await;

        match outcome {
            Ok((_, invoices)) => invoices,
            Err(failures) => {
                error!(
                    "AccountingConnector: failed to fetch invoices: {}",
                    failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
                );
                Vec::new()
            }
        }
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, TransportError> {
        self.transport.get(path, query).await?.into_success()
    }
}

fn default_organization_name(candidate: &EndpointCandidate) -> &'static str {
    if *candidate == ENTITIES_ENDPOINT {
        DEFAULT_ENTITY_NAME
    } else {
        DEFAULT_ORGANIZATION_NAME
    }
}

/// Extracts the list from a response body.
///
/// A non-null `data` field wins; otherwise the body itself must be the list.
/// A `null` body is an empty list.
pub fn unwrap_envelope(body: Value) -> Result<Vec<Value>, TransportError> {
    let list = match body {
        Value::Object(mut map) => match map.remove(ENVELOPE_FIELD) {
            Some(inner) if !inner.is_null() => inner,
            _ => Value::Object(map),
        },
        other => other,
    };

    match list {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Err(TransportError::Malformed("expected a list, got an object".to_string())),
        other => Err(TransportError::Malformed(format!("expected a list, got {}", other))),
    }
}

/// Maps one raw item to an organization. The id is stringified whatever its
/// JSON type; the name falls back to `label`, then to `default_name`.
/// Items without an id are skipped.
pub fn normalize_organization(item: &Value, default_name: &str) -> Option<NormalizedOrganization> {
    let Some(id) = item.get("id").and_then(id_text) else {
        debug!("AccountingConnector: skipping organization without id: {}", item);
        return None;
    };

    let name = ["name", "label"]
        .iter()
        .filter_map(|field| item.get(field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or(default_name)
        .to_string();

    Some(NormalizedOrganization { id, name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{HttpTransport, TransportRequest, TransportResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    type Scripted = Result<TransportResponse, TransportError>;

    /// Fake transport answering from a per-path script and recording calls.
    #[derive(Default)]
    struct FakeTransport {
        responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
        calls: Mutex<Vec<(String, Vec<(&'static str, String)>)>>,
    }

    impl FakeTransport {
        fn on(self, path: &str, response: Scripted) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default()
                .push_back(response);
            self
        }

        fn paths(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
        }

        fn queries(&self) -> Vec<Vec<(&'static str, String)>> {
            self.calls.lock().unwrap().iter().map(|(_, q)| q.clone()).collect()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.path.clone(), request.query.clone()));
            self.responses
                .lock()
                .unwrap()
                .get_mut(&request.path)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| Ok(TransportResponse::new(404, json!({"message": "Not Found"}))))
        }

        fn base_address(&self) -> &str {
            "fake://accounting"
        }
    }

    fn ok(body: Value) -> Scripted {
        Ok(TransportResponse::new(200, body))
    }

    fn status(code: u16, message: &str) -> Scripted {
        Ok(TransportResponse::new(code, json!({ "message": message })))
    }

    fn make_connector(transport: FakeTransport) -> (AccountingConnector, Arc<FakeTransport>) {
        let transport = Arc::new(transport);
        let connector = AccountingConnector::with_transport(
            ConnectionCredentials::direct("fake://accounting", Some("key".to_string())),
            transport.clone(),
        );
        (connector, transport)
    }

    // --- test_connection ---

    #[tokio::test]
    async fn test_all_candidates_fail_summary_has_first_two() {
        let fake = FakeTransport::default()
            .on("/invoices", status(401, "Unauthorized"))
            .on("/customers", Err(TransportError::Network("connection reset".to_string())))
            .on("/customer_invoices", status(404, "Not Found"))
            .on("/supplier_invoices", status(500, "Server Error"));
        let (connector, transport) = make_connector(fake);

        let result = connector.test_connection().await;

        assert_eq!(
            result,
            ConnectionResult::Failed {
                summary: "invoices: Unauthorized; customers: connection reset".to_string()
            }
        );
        assert_eq!(transport.paths().len(), 4);
    }

    #[tokio::test]
    async fn test_success_at_each_position_short_circuits() {
        for k in 0..PROBE_CANDIDATES.len() {
            let mut fake = FakeTransport::default();
            for (i, candidate) in PROBE_CANDIDATES.iter().enumerate() {
                let response = if i == k { ok(json!([])) } else { status(403, "Forbidden") };
                fake = fake.on(candidate.path, response);
            }
            let (connector, transport) = make_connector(fake);

            assert_eq!(connector.test_connection().await, ConnectionResult::Ok);

            let expected: Vec<String> = PROBE_CANDIDATES[..=k]
                .iter()
                .map(|c| c.path.to_string())
                .collect();
            assert_eq!(transport.paths(), expected, "success at candidate {}", k + 1);
        }
    }

    #[tokio::test]
    async fn test_probe_requests_one_record() {
        let (connector, transport) = make_connector(FakeTransport::default().on("/invoices", ok(json!([]))));
        connector.test_connection().await;
        assert_eq!(transport.queries(), vec![vec![("per_page", "1".to_string())]]);
    }

    #[tokio::test]
    async fn test_failure_reason_without_message() {
        let fake = FakeTransport::default()
            .on("/invoices", Ok(TransportResponse::new(502, Value::String("Bad Gateway".into()))))
            .on("/customers", Err(TransportError::Network(String::new())));
        let (connector, _) = make_connector(fake);

        let result = connector.test_connection().await;
        assert_eq!(
            result.summary(),
            Some("invoices: Request failed with status code 502; customers: Unknown error")
        );
    }

    // --- get_organizations ---

    #[tokio::test]
    async fn test_organizations_name_resolution() {
        let fake = FakeTransport::default().on(
            "/organizations",
            ok(json!({ "data": [
                { "id": 1, "name": "Le Bistrot", "label": "ignored" },
                { "id": "2", "label": "Chez Paul" },
                { "id": 3 },
                { "id": 4, "name": "", "label": "" },
            ]})),
        );
        let (connector, transport) = make_connector(fake);

        let orgs = connector.get_organizations().await;

        assert_eq!(
            orgs,
            vec![
                NormalizedOrganization { id: "1".into(), name: "Le Bistrot".into() },
                NormalizedOrganization { id: "2".into(), name: "Chez Paul".into() },
                NormalizedOrganization { id: "3".into(), name: "Organisation".into() },
                NormalizedOrganization { id: "4".into(), name: "Organisation".into() },
            ]
        );
        assert_eq!(transport.paths(), vec!["/organizations"]);
    }

    #[tokio::test]
    async fn test_organizations_fall_back_to_entities() {
        let fake = FakeTransport::default()
            .on("/organizations", status(404, "Not Found"))
            .on("/entities", ok(json!([{ "id": 7 }, { "id": 8, "label": "Brasserie" }])));
        let (connector, transport) = make_connector(fake);

        let orgs = connector.get_organizations().await;

        assert_eq!(
            orgs,
            vec![
                NormalizedOrganization { id: "7".into(), name: "Entité".into() },
                NormalizedOrganization { id: "8".into(), name: "Brasserie".into() },
            ]
        );
        assert_eq!(transport.paths(), vec!["/organizations", "/entities"]);
    }

    #[tokio::test]
    async fn test_organizations_malformed_primary_falls_back() {
        let fake = FakeTransport::default()
            .on("/organizations", ok(json!({ "error": "nope" })))
            .on("/entities", ok(json!({ "data": [{ "id": "e1", "name": "Cantine" }] })));
        let (connector, _) = make_connector(fake);

        let orgs = connector.get_organizations().await;
        assert_eq!(orgs, vec![NormalizedOrganization { id: "e1".into(), name: "Cantine".into() }]);
    }

    #[tokio::test]
    async fn test_organizations_mixed_id_types_stay_on_primary() {
        let fake = FakeTransport::default().on(
            "/organizations",
            ok(json!([
                { "id": 1, "name": "A" },
                { "name": "B" },
                { "id": true },
                { "id": null, "name": "C" },
                { "id": "x9", "label": "D" },
            ])),
        );
        let (connector, transport) = make_connector(fake);

        let orgs = connector.get_organizations().await;

        assert_eq!(
            orgs,
            vec![
                NormalizedOrganization { id: "1".into(), name: "A".into() },
                NormalizedOrganization { id: "true".into(), name: "Organisation".into() },
                NormalizedOrganization { id: "x9".into(), name: "D".into() },
            ]
        );
        assert_eq!(transport.paths(), vec!["/organizations"]);
    }

    #[tokio::test]
    async fn test_organizations_both_fail_is_empty() {
        let fake = FakeTransport::default()
            .on("/organizations", Err(TransportError::Network("timeout".to_string())))
            .on("/entities", status(500, "boom"));
        let (connector, transport) = make_connector(fake);

        assert!(connector.get_organizations().await.is_empty());
        assert_eq!(transport.paths(), vec!["/organizations", "/entities"]);
    }

    // --- get_invoices ---

    #[tokio::test]
    async fn test_invoices_forward_filters_and_fall_back() {
        let fake = FakeTransport::default()
            .on("/invoices", status(404, "Not Found"))
            .on("/customer_invoices", ok(json!({ "data": [{ "id": "inv1", "amount": 12.5 }] })));
        let (connector, transport) = make_connector(fake);

        let filters = InvoiceFilters {
            organization_id: Some("r1".to_string()),
            per_page: Some(1),
            page: None,
        };
        let invoices = connector.get_invoices(&filters).await;

        assert_eq!(invoices, vec![Invoice(json!({ "id": "inv1", "amount": 12.5 }))]);
        assert_eq!(transport.paths(), vec!["/invoices", "/customer_invoices"]);
        let expected = vec![("organization_id", "r1".to_string()), ("per_page", "1".to_string())];
        assert_eq!(transport.queries(), vec![expected.clone(), expected]);
    }

    #[tokio::test]
    async fn test_invoices_pass_through_untouched() {
        let raw = json!({ "id": 99, "label": "Facture", "custom": { "nested": true } });
        let fake = FakeTransport::default().on("/invoices", ok(json!([raw.clone()])));
        let (connector, transport) = make_connector(fake);

        let invoices = connector.get_invoices(&InvoiceFilters::default()).await;
        assert_eq!(invoices, vec![Invoice(raw)]);
        assert_eq!(transport.paths(), vec!["/invoices"]);
    }

    #[tokio::test]
    async fn test_invoices_both_fail_is_empty() {
        let fake = FakeTransport::default()
            .on("/invoices", status(401, "Unauthorized"))
            .on("/customer_invoices", status(401, "Unauthorized"));
        let (connector, _) = make_connector(fake);

        assert!(connector.get_invoices(&InvoiceFilters::default()).await.is_empty());
    }

    // --- envelope ---

    #[test]
    fn test_envelope_and_bare_list_map_identically() {
        let items = json!([{ "id": 1, "name": "A" }, { "id": "b" }]);
        let wrapped = unwrap_envelope(json!({ "data": items.clone() })).unwrap();
        let bare = unwrap_envelope(items).unwrap();
        assert_eq!(wrapped, bare);

        let map = |v: &[Value]| {
            v.iter()
                .map(|i| normalize_organization(i, DEFAULT_ORGANIZATION_NAME).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(map(&wrapped), map(&bare));
    }

    #[test]
    fn test_envelope_null_data_uses_body() {
        assert!(unwrap_envelope(json!({ "data": null })).is_err());
        assert_eq!(unwrap_envelope(Value::Null).unwrap(), Vec::<Value>::new());
        assert!(unwrap_envelope(json!("text")).is_err());
        assert!(unwrap_envelope(json!({ "data": { "id": 1 } })).is_err());
    }

    #[test]
    fn test_organization_without_id_is_skipped() {
        assert_eq!(normalize_organization(&json!({ "name": "x" }), DEFAULT_ORGANIZATION_NAME), None);
        assert_eq!(normalize_organization(&json!(42), DEFAULT_ORGANIZATION_NAME), None);
    }
}
