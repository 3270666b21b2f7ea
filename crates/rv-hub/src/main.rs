//! # rv-hub — RANGEVIEW telemetry service
//!
//! REST facade over the training telemetry stored in Elasticsearch:
//! event listings and aggregations, sandbox console commands, and
//! per-phase statistics of adaptive runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use clap::Parser;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rv_core::{FieldNames, IndexRoots};
use rv_search::{CommandsDao, EsClient, EventsDao, StatisticsDao};

mod api;
mod error;
mod services;

use services::{CommandsService, EventsService, StatisticsService};

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "rv-hub", version, about = "RANGEVIEW telemetry service")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "rv-hub.toml")]
    config: PathBuf,

    /// Elasticsearch base URL (overrides the config file)
    #[arg(long)]
    elasticsearch: Option<String>,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone)]
struct Config {
    #[serde(default)]
    elasticsearch: ElasticConfig,
    #[serde(default)]
    indices: IndexRoots,
    #[serde(default)]
    fields: FieldNames,
}

#[derive(Deserialize, Clone)]
struct ElasticConfig {
    #[serde(default = "default_es_url")]
    url: String,
    /// Per-request ceiling; searches also carry it as the backend timeout.
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_max_result_window")]
    max_result_window: usize,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: default_es_url(),
            timeout_secs: default_timeout_secs(),
            max_result_window: default_max_result_window(),
        }
    }
}

fn default_es_url() -> String {
    "http://localhost:9200".into()
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_max_result_window() -> usize {
    10_000
}

// =============================================================================
// Application State
// =============================================================================

pub struct AppState {
    pub events: EventsService,
    pub commands: CommandsService,
    pub statistics: StatisticsService,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rv_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load config
    let mut config: Config = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config).unwrap_or_default();
        toml::from_str(&content).unwrap_or_default()
    } else {
        Config::default()
    };
    if let Some(url) = args.elasticsearch {
        config.elasticsearch.url = url;
    }

    let client = match EsClient::new(
        &config.elasticsearch.url,
        Duration::from_secs(config.elasticsearch.timeout_secs),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("failed to build the Elasticsearch client: {}", e);
            std::process::exit(1);
        }
    };

    let window = config.elasticsearch.max_result_window;
    let events_dao = EventsDao::new(
        client.clone(),
        config.fields.clone(),
        config.indices.clone(),
        window,
    );
    let commands_dao = CommandsDao::new(client.clone(), config.fields.clone(), window);
    let statistics_dao = StatisticsDao::new(
        client.clone(),
        config.fields.clone(),
        config.indices.clone(),
        window,
    );

    let state = Arc::new(AppState {
        events: EventsService::new(events_dao, config.fields.clone()),
        commands: CommandsService::new(commands_dao, config.indices.clone()),
        statistics: StatisticsService::new(
            statistics_dao,
            config.indices.clone(),
            config.fields.clone(),
        ),
    });

    let events = Router::new()
        .route(
            "/training-definitions/:definition_id",
            get(api::events_by_definition),
        )
        .route(
            "/training-definitions/:definition_id/training-instances/:instance_id",
            get(api::events_by_definition_and_instance),
        )
        .route(
            "/training-definitions/:definition_id/training-instances/:instance_id/training-runs/:run_id",
            get(api::events_by_run),
        )
        .route(
            "/training-instances/:instance_id/levels/:level_id",
            get(api::events_by_instance_and_level),
        )
        .route(
            "/training-instances/:instance_id/aggregated/training-runs/levels",
            get(api::events_aggregated_runs_levels),
        )
        .route(
            "/training-instances/:instance_id/aggregated/levels/training-runs",
            get(api::events_aggregated_levels_runs),
        )
        .route(
            "/training-definitions/:definition_id/training-instances/:instance_id/aggregated",
            get(api::events_aggregated_users_levels),
        )
        .route(
            "/training-instances/:instance_id",
            delete(api::delete_events_by_instance),
        )
        .route(
            "/training-instances/:instance_id/training-runs/:run_id",
            delete(api::delete_events_by_run),
        );

    let commands = Router::new()
        .route(
            "/pools/:pool_id",
            get(api::commands_by_pool).delete(api::delete_commands_by_pool),
        )
        .route(
            "/sandboxes/:sandbox_id",
            get(api::commands_by_sandbox).delete(api::delete_commands_by_sandbox),
        )
        .route(
            "/access-tokens/:access_token",
            get(api::commands_by_access_token).delete(api::delete_commands_by_access_token),
        )
        .route(
            "/access-tokens/:access_token/users/:user_id",
            get(api::commands_by_access_token_and_user)
                .delete(api::delete_commands_by_access_token_and_user),
        )
        .route(
            "/sandboxes/:sandbox_id/ranges",
            get(api::commands_by_sandbox_in_range),
        )
        .route(
            "/access-tokens/:access_token/users/:user_id/ranges",
            get(api::commands_by_user_in_range),
        );

    let statistics = Router::new()
        .route("/commands", post(api::stats_commands))
        .route("/events/time", get(api::stats_phase_time))
        .route("/events/solutions", get(api::stats_solutions))
        .route("/events/wrong-answers", get(api::stats_wrong_answers))
        .route("/overall", post(api::stats_overall));

    let app = Router::new()
        .route("/health", get(api::health))
        .nest("/training-platform-events", events)
        .nest("/training-platform-commands", commands)
        .nest("/training-statistics/training-runs/:run_id/phases", statistics)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = args.bind.parse().expect("Invalid bind address");
    tracing::info!("rv-hub listening on http://{}", addr);
    tracing::info!("  elasticsearch: {}", config.elasticsearch.url);
    tracing::info!("  events root:   {}", config.indices.events);
    tracing::info!("  commands root: {}", config.indices.console_commands);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Bind failed");
    axum::serve(listener, app).await.expect("Server failed");
}
