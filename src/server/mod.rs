// src/server/mod.rs

//! HTTP API for the back-office front end.
//!
//! - Settings checklist and connectivity checks (accounting API, OAuth provider)
//! - Organizations, invoices and the management account statement
//! - Restaurant records (list, read, create, update, delete)
//! - The `/pennylane/*` relay used by proxied connectors

use crate::connectors::{AccountingConnector, BackendProbe, RestaurantStore, SettingsReport};
use crate::error::TransportError;
use crate::models::{
    ConnectionResult, Invoice, InvoiceFilters, ManagementAccountEntry, NewRestaurant,
    NormalizedOrganization, Restaurant, RestaurantUpdate,
};
use crate::relay::{Relay, RELAY_PREFIX};
use crate::statement::build_statement;
use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use log::info;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Everything the handlers need. Built once by the caller and shared.
pub struct ServerState {
    pub connector: AccountingConnector,
    pub backend: BackendProbe,
    pub restaurants: RestaurantStore,
    pub settings: SettingsReport,
    pub relay: Option<Relay>,
}

pub struct Server {
    state: Arc<ServerState>,
    port: u16,
}

impl Server {
    pub fn new(state: ServerState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Starts the web server. Runs until shut down.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = router(self.state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Builds the full router. The relay routes exist only when a relay is configured.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/api/health", get(health))
        .route("/api/settings", get(settings))
        .route("/api/accounting/status", get(accounting_status))
        .route("/api/accounting/organizations", get(organizations))
        .route("/api/accounting/invoices", get(invoices))
        .route("/api/accounting/statement", get(statement))
        .route("/api/backend/oauth", get(oauth_status))
        .route("/api/restaurants", get(list_restaurants).post(create_restaurant))
        .route(
            "/api/restaurants/{id}",
            get(get_restaurant).put(update_restaurant).delete(delete_restaurant),
        );

    if state.relay.is_some() {
        app = app.route(&format!("{}/{{*path}}", RELAY_PREFIX), any(relay));
    }

    app.layer(cors).with_state(state)
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/settings - What is configured (never the values)
async fn settings(State(state): State<Arc<ServerState>>) -> Json<SettingsReport> {
    Json(state.settings.clone())
}

/// GET /api/accounting/status - Probes the accounting API
async fn accounting_status(State(state): State<Arc<ServerState>>) -> Json<ConnectionResult> {
    Json(state.connector.test_connection().await)
}

/// GET /api/accounting/organizations
async fn organizations(State(state): State<Arc<ServerState>>) -> Json<Vec<NormalizedOrganization>> {
    Json(state.connector.get_organizations().await)
}

/// GET /api/accounting/invoices?organization_id=&per_page=&page=
async fn invoices(
    State(state): State<Arc<ServerState>>,
    Query(filters): Query<InvoiceFilters>,
) -> Json<Vec<Invoice>> {
    Json(state.connector.get_invoices(&filters).await)
}

#[derive(Debug, Deserialize)]
struct StatementParams {
    organization_id: Option<String>,
}

/// GET /api/accounting/statement?organization_id=
async fn statement(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<StatementParams>,
) -> Json<Vec<ManagementAccountEntry>> {
    let filters = InvoiceFilters {
        organization_id: params.organization_id,
        ..InvoiceFilters::default()
    };
    let invoices = state.connector.get_invoices(&filters).await;
    Json(build_statement(&invoices))
}

/// GET /api/backend/oauth - Checks the configured OAuth provider
async fn oauth_status(State(state): State<Arc<ServerState>>) -> Json<ConnectionResult> {
    Json(state.backend.check_oauth_provider().await)
}

/// Maps a backend failure onto an HTTP status with a `message` body.
fn error_response(e: &TransportError) -> Response {
    let status = match e {
        TransportError::NotFound(_) => StatusCode::NOT_FOUND,
        TransportError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "message": e.reason() }))).into_response()
}

#[derive(Debug, Deserialize)]
struct OwnerParams {
    owner_id: String,
}

/// GET /api/restaurants?owner_id= - Newest first
async fn list_restaurants(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<OwnerParams>,
) -> Json<Vec<Restaurant>> {
    Json(state.restaurants.list(&params.owner_id).await)
}

/// GET /api/restaurants/{id}
async fn get_restaurant(State(state): State<Arc<ServerState>>, Path(id): Path<String>) -> Response {
    match state.restaurants.get(&id).await {
        Some(restaurant) => Json(restaurant).into_response(),
        None => error_response(&TransportError::NotFound(format!("restaurant {}", id))),
    }
}

/// POST /api/restaurants - Creates the owner's user row if needed
async fn create_restaurant(
    State(state): State<Arc<ServerState>>,
    Json(new): Json<NewRestaurant>,
) -> Response {
    match state.restaurants.create(&new).await {
        Ok(restaurant) => (StatusCode::CREATED, Json(restaurant)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT /api/restaurants/{id}
async fn update_restaurant(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(changes): Json<RestaurantUpdate>,
) -> Response {
    match state.restaurants.update(&id, &changes).await {
        Ok(restaurant) => Json(restaurant).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/restaurants/{id}
async fn delete_restaurant(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    Json(json!({ "deleted": state.restaurants.delete(&id).await }))
}

/// ANY /pennylane/{*path} - Forwards to the accounting API with the key attached
async fn relay(
    State(state): State<Arc<ServerState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let Some(relay) = &state.relay else {
        return (StatusCode::NOT_FOUND, "Relay not enabled").into_response();
    };

    match relay.forward(method, &path, query.as_deref(), body).await {
        Ok(upstream) => {
            let mut response = (upstream.status, upstream.body).into_response();
            if let Some(content_type) = upstream.content_type {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            response
        }
        Err(e) => error_response(&e),
    }
}
