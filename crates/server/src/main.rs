use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use shared::protocol::{GraphqlRequest, GraphqlResponse};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod subscriptions;

use app_state::AppState;
use config::{load_settings, with_port, Settings};

const MAX_GRAPHQL_BODY_BYTES: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(about = "GraphQL server for the todo and command demos")]
struct Args {
    /// TCP port, overriding the configured bind address's port.
    #[arg(short, long)]
    port: Option<u16>,
    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
    #[arg(long, default_value = "server.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut settings = load_settings(&args.config)?;
    if let Some(port) = args.port {
        settings.server_bind = with_port(&settings.server_bind, port);
    }

    let state = AppState::from_settings(&settings);
    let app = build_router(Arc::new(state), &settings)?;

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server shut down");
    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for ctrl-c");
    }
}

fn build_router(state: Arc<AppState>, settings: &Settings) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/graphql",
            post(graphql).layer(RequestBodyLimitLayer::new(MAX_GRAPHQL_BODY_BYTES)),
        )
        .route("/subscriptions", get(subscriptions::ws_handler))
        .with_state(state);

    let router = match settings.allow_origin.as_deref() {
        None => router,
        Some("*") => router.layer(CorsLayer::permissive()),
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .with_context(|| format!("invalid allow_origin '{origin}'"))?;
            router.layer(
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
                    .allow_credentials(settings.allow_credentials),
            )
        }
    };
    Ok(router)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn graphql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GraphqlRequest>,
) -> (StatusCode, Json<GraphqlResponse>) {
    match server_api::execute(&state.api, &req).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => {
            warn!(error = %err, "graphql: request failed");
            (
                StatusCode::BAD_REQUEST,
                Json(GraphqlResponse::errors(vec![err])),
            )
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
