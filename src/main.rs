// src/main.rs
//
// RestoPilot back-office service.
// Builds the connectors once from config and either serves the HTTP API
// or runs a single accounting command and prints JSON.

use clap::Parser;
use log::warn;
use restopilot::config::{default_config_template, Config, DEFAULT_PORT};
use restopilot::connectors::{AccountingConnector, BackendProbe, RestaurantStore, SettingsReport};
use restopilot::models::{ConnectionMode, ConnectionResult, InvoiceFilters};
use restopilot::relay::Relay;
use restopilot::server::{Server, ServerState};
use restopilot::statement::build_statement;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "restopilot")]
#[command(about = "Restaurant back-office service with accounting API integration")]
struct Args {
    /// Mode of operation: serve, test-connection, organizations, invoices, statement, restaurants
    #[arg(long, default_value = "serve")]
    mode: String,

    /// Path to configuration file (TOML)
    #[arg(long, short)]
    config: Option<String>,

    /// Override the server port
    #[arg(long)]
    port: Option<u16>,

    /// Organization filter for invoices/statement
    #[arg(long)]
    organization_id: Option<String>,

    /// Page size for invoices
    #[arg(long)]
    per_page: Option<u32>,

    /// Page number for invoices
    #[arg(long)]
    page: Option<u32>,

    /// Owner whose restaurants to list
    #[arg(long)]
    owner_id: Option<String>,

    /// Print a default configuration file
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.generate_config {
        println!("{}", default_config_template());
        return;
    }

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            eprintln!("Use --generate-config to create a template.");
            std::process::exit(1);
        }
    };

    // Composition root: the connector is built here and handed down.
    let connector = match AccountingConnector::new(&config.accounting) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create accounting connector: {}", e);
            std::process::exit(1);
        }
    };

    let filters = InvoiceFilters {
        organization_id: args.organization_id.clone(),
        per_page: args.per_page,
        page: args.page,
    };

    match args.mode.as_str() {
        "serve" => run_server(config, connector).await,
        "test-connection" => {
            let result = connector.test_connection().await;
            print_json(&result);
            if let ConnectionResult::Failed { .. } = result {
                std::process::exit(1);
            }
        }
        "organizations" => print_json(&connector.get_organizations().await),
        "invoices" => print_json(&connector.get_invoices(&filters).await),
        "statement" => {
            let invoices = connector.get_invoices(&filters).await;
            print_json(&build_statement(&invoices));
        }
        "restaurants" => {
            let Some(owner_id) = &args.owner_id else {
                eprintln!("--owner-id is required for restaurants mode");
                std::process::exit(1);
            };
            let store = match RestaurantStore::new(&config.backend) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Failed to create restaurant store: {}", e);
                    std::process::exit(1);
                }
            };
            print_json(&store.list(owner_id).await);
        }
        _ => {
            eprintln!(
                "Unknown mode: {}. Use: serve, test-connection, organizations, invoices, statement, restaurants",
                args.mode
            );
            std::process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;
    Ok(config)
}

async fn run_server(config: Config, connector: AccountingConnector) {
    let backend = match BackendProbe::new(&config.backend) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to create backend probe: {}", e);
            std::process::exit(1);
        }
    };

    let restaurants = match RestaurantStore::new(&config.backend) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to create restaurant store: {}", e);
            std::process::exit(1);
        }
    };

    let relay = if config.relay.enabled {
        let relay = Relay::new(&config.relay.upstream, config.relay_api_key());
        if !relay.has_key() {
            warn!("Relay enabled without an API key; upstream calls will be unauthenticated");
        }
        Some(relay)
    } else {
        None
    };

    println!("Starting RestoPilot server on port {}...", config.server.port);
    if connector.credentials().mode == ConnectionMode::Proxied && config.server.port != DEFAULT_PORT {
        warn!("Proxied mode targets the relay on port {}, but this server listens on {}", DEFAULT_PORT, config.server.port);
    }

    let state = ServerState {
        connector,
        backend,
        restaurants,
        settings: SettingsReport::from_config(&config),
        relay,
    };

    if let Err(e) = Server::new(state, config.server.port).run().await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
