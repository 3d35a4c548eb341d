// src/connectors/restaurants.rs
//
// Restaurant records kept in the hosted backend's REST API.
// Reads degrade to empty results; writes hand their error back.

use super::backend::backend_transport;
use crate::config::BackendConfig;
use crate::error::TransportError;
use crate::models::{NewRestaurant, Restaurant, RestaurantUpdate};
use crate::traits::{HttpTransport, SharedTransport, TransportRequest};
use chrono::Utc;
use log::{error, info, warn};
use reqwest::Method;
use serde_json::{json, Value};

const RESTAURANTS_PATH: &str = "/rest/v1/restaurants";
const USERS_PATH: &str = "/rest/v1/users";

/// Role given to the owner row created alongside a first restaurant.
const OWNER_ROLE: &str = "admin";
const DEFAULT_FULL_NAME: &str = "User";

const PREFER: &str = "prefer";
const RETURN_ROWS: &str = "return=representation";
const UPSERT: &str = "resolution=merge-duplicates";

/// Row filter in the backend's query syntax.
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

pub struct RestaurantStore {
    transport: Option<SharedTransport>,
}

impl RestaurantStore {
    /// Builds the store. Without a backend URL, reads are empty and writes fail.
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(backend_transport(config)?))
    }

    pub fn with_transport(transport: Option<SharedTransport>) -> Self {
        Self { transport }
    }

    /// Restaurants owned by `owner_id`, newest first. Empty on failure.
    pub async fn list(&self, owner_id: &str) -> Vec<Restaurant> {
        let request = TransportRequest::get(RESTAURANTS_PATH).query(vec![
            ("select", "*".to_string()),
            ("owner_id", eq(owner_id)),
            ("order", "created_at.desc".to_string()),
        ]);

        match self.rows(request).await {
            Ok(restaurants) => restaurants,
            Err(e) => {
                error!("RestaurantStore: failed to list restaurants of {}: {}", owner_id, e.reason());
                Vec::new()
            }
        }
    }

    /// One restaurant by id. `None` when missing or on failure.
    pub async fn get(&self, restaurant_id: &str) -> Option<Restaurant> {
        let request = TransportRequest::get(RESTAURANTS_PATH).query(vec![
            ("select", "*".to_string()),
            ("id", eq(restaurant_id)),
            ("limit", "1".to_string()),
        ]);

        match self.rows(request).await {
            Ok(restaurants) => restaurants.into_iter().next(),
            Err(e) => {
                error!("RestaurantStore: failed to fetch restaurant {}: {}", restaurant_id, e.reason());
                None
            }
        }
    }

    /// Upserts the owner's user row, then inserts the restaurant.
    ///
    /// A failed upsert is only logged since the user usually exists already.
    pub async fn create(&self, new: &NewRestaurant) -> Result<Restaurant, TransportError> {
        let full_name = new
            .full_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FULL_NAME);
        let owner = TransportRequest::new(Method::POST, USERS_PATH)
            .json(json!([{
                "id": new.user_id,
                "email": new.email,
                "full_name": full_name,
                "role": OWNER_ROLE,
            }]))
            .header(PREFER, UPSERT);
        if let Err(e) = self.execute(owner).await {
            warn!("RestaurantStore: user upsert for {} failed (may already exist): {}", new.user_id, e.reason());
        }

        let insert = TransportRequest::new(Method::POST, RESTAURANTS_PATH)
            .json(json!([{
                "owner_id": new.user_id,
                "name": new.name,
                "address": new.address,
                "phone": new.phone,
            }]))
            .header(PREFER, RETURN_ROWS);

        let created = self
            .rows(insert)
            .await
            .and_then(|rows| {
                rows.into_iter()
                    .next()
                    .ok_or_else(|| TransportError::Malformed("insert returned no row".to_string()))
            })
            .inspect_err(|e| error!("RestaurantStore: failed to create {}: {}", new.name, e.reason()))?;

        info!("RestaurantStore: created restaurant {} for {}", created.id, new.user_id);
        Ok(created)
    }

    /// Replaces the editable fields and stamps `updated_at`.
    pub async fn update(
        &self,
        restaurant_id: &str,
        changes: &RestaurantUpdate,
    ) -> Result<Restaurant, TransportError> {
        let request = TransportRequest::new(Method::PATCH, RESTAURANTS_PATH)
            .query(vec![("id", eq(restaurant_id))])
            .json(json!({
                "name": changes.name,
                "address": changes.address,
                "phone": changes.phone,
                "updated_at": Utc::now().to_rfc3339(),
            }))
            .header(PREFER, RETURN_ROWS);

        self.rows(request)
            .await
            .and_then(|rows| {
                rows.into_iter()
                    .next()
                    .ok_or_else(|| TransportError::NotFound(format!("restaurant {}", restaurant_id)))
            })
            .inspect_err(|e| error!("RestaurantStore: failed to update {}: {}", restaurant_id, e.reason()))
    }

    /// Deletes by id. `false` on failure.
    pub async fn delete(&self, restaurant_id: &str) -> bool {
        let request =
            TransportRequest::new(Method::DELETE, RESTAURANTS_PATH).query(vec![("id", eq(restaurant_id))]);

        match self.execute(request).await {
            Ok(_) => {
                info!("RestaurantStore: deleted restaurant {}", restaurant_id);
                true
            }
            Err(e) => {
                error!("RestaurantStore: failed to delete {}: {}", restaurant_id, e.reason());
                false
            }
        }
    }

    async fn execute(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(TransportError::NotConfigured("backend URL"))?;
        transport.send(request).await?.into_success()
    }

    async fn rows(&self, request: TransportRequest) -> Result<Vec<Restaurant>, TransportError> {
        parse_rows(self.execute(request).await?)
    }
}

/// Decodes a list of restaurant rows. An empty body is no rows.
fn parse_rows(body: Value) -> Result<Vec<Restaurant>, TransportError> {
    match body {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map_err(|e| TransportError::Malformed(e.to_string())),
    }
}
