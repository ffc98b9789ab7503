use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use mimalloc::MiMalloc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zapdrive::config::AppConfig;
use zapdrive::engine::ZapClient;
use zapdrive::services::store::PgScanStore;
use zapdrive::{db, routes, AppState};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zapdrive=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let engine = ZapClient::from_config(&config)?;
    tracing::info!(engine_url = %config.zap_base_url, "Engine client configured");

    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
        store: Arc::new(PgScanStore::new(pool)),
        engine: Arc::new(engine),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health/live", get(routes::health::live))
        .route("/health/ready", get(routes::health::ready))
        .route(
            "/api/v1/scans",
            get(routes::scans::list).post(routes::scans::create),
        )
        .route("/api/v1/scans/{id}", get(routes::scans::get_by_id))
        .route(
            "/api/v1/probes/verify-connection",
            post(routes::probes::verify_connection),
        )
        .route(
            "/api/v1/probes/spider-scan",
            post(routes::probes::spider_scan),
        )
        .route(
            "/api/v1/probes/ajax-spider-scan",
            post(routes::probes::ajax_spider_scan),
        )
        .route(
            "/api/v1/probes/active-scan",
            post(routes::probes::active_scan),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(host = %addr, "Starting ZapDrive API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
