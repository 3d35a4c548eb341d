// src/connectors/mod.rs

pub mod accounting;
pub mod backend;
pub mod http;
pub mod restaurants;

pub use accounting::AccountingConnector;
pub use backend::{BackendProbe, SettingsReport};
pub use http::ReqwestTransport;
pub use restaurants::RestaurantStore;
