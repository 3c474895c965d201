use clap::Parser;
use funnelboard::campaigns::SqliteCampaignDirectory;
use funnelboard::config::AppConfig;
use funnelboard::metrics::cache::MetricsCache;
use funnelboard::metrics::facade::MetricsFacade;
use funnelboard::metrics::handler::{self, MetricsState};
use funnelboard::store::sqlite::{self, SqliteEventStore};
use axum::routing::get;
use axum::Router;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Parser)]
#[command(name = "funnelboard", about = "Self-hosted ad-funnel metrics service")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funnelboard=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    if let Err(msg) = config.validate() {
        eprintln!("Configuration error: {msg}");
        return Err(msg.into());
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        db = %config.database.path.display(),
        "starting funnelboard"
    );

    // Setup SQLite pool
    let pool = sqlite::create_pool(&config.database)?;
    sqlite::init_pool(&pool).await?;
    tracing::info!("database initialized");

    // Wire the engine: store + campaign directory injected into the facade
    let store = Arc::new(SqliteEventStore::new(pool.clone()));
    let campaigns = Arc::new(SqliteCampaignDirectory::new(pool.clone()));
    let facade = MetricsFacade::new(store, campaigns);

    let default_period =
        funnelboard::metrics::period::PeriodToken::from_str(&config.metrics.default_period)?;

    let state = Arc::new(MetricsState {
        facade,
        cache: MetricsCache::new(config.metrics.cache_ttl_secs),
        pool,
        default_period,
    });

    // Dashboards are read-only consumers; allow any origin for GETs
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handler::health))
        .route("/v1/metrics/overview", get(handler::overview))
        .route("/v1/metrics/funnel", get(handler::funnel))
        .route("/v1/metrics/daily", get(handler::daily_series))
        .route("/v1/metrics/hourly", get(handler::hourly_series))
        .route("/v1/metrics/segments", get(handler::segment_breakdown))
        .route("/v1/metrics/dashboard", get(handler::dashboard))
        .with_state(state)
        .layer(cors);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    tracing::info!("shutting down...");
}
