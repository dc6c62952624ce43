mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use keepsake_api::{AppState, AppStateInner};
use keepsake_gateway::connection::{self, GatewayContext};
use keepsake_gateway::dispatcher::Dispatcher;
use keepsake_gateway::store::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keepsake=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;
    info!(
        "{} allowed accounts, days counted in {}",
        config.policy.len(),
        config.clock.tz()
    );

    // Init database
    let db = Arc::new(keepsake_db::Database::open(&PathBuf::from(&config.db_path))?);

    // Shared state
    let store = Store::new(db.clone(), Dispatcher::new());
    let policy = Arc::new(config.policy);

    let gateway = GatewayContext {
        store: store.clone(),
        policy: policy.clone(),
        clock: config.clock,
        jwt_secret: config.jwt_secret.clone(),
    };

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        store,
        policy,
        clock: config.clock,
        jwt_secret: config.jwt_secret,
    });

    // Routes
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(gateway);

    let app = keepsake_api::router(app_state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Keepsake server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(ctx): State<GatewayContext>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, ctx))
}
