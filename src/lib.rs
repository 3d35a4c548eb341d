// src/lib.rs

// 1. Data Structures
pub mod models;
pub mod error;

// 2. Interfaces (the transport seam)
pub mod traits;

// 3. Ordered endpoint fallback
pub mod probe;

// 4. Adapters (accounting API, hosted backend: auth settings and restaurants)
pub mod connectors;

// 5. Business Logic
pub mod statement;

// 6. Serving: config, relay, HTTP API
pub mod config;
pub mod relay;
pub mod server;
