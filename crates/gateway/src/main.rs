//! Newsdesk API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Headline, search and preference endpoints
//! - Anonymous sessions and caller identity
//! - CORS, request ids and method checks
//! - Observability (logging, metrics)

mod handlers;
mod middleware;
mod respond;

use anyhow::Context;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use newsdesk_common::{
    activity::{ActivityLogger, ActivitySink, MemoryActivity},
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics,
    news::{create_news_source, NewsSource},
    preferences::{MemoryPreferences, PreferenceRepository, PreferenceStore},
    validation::InputValidator,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal, sync::oneshot};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub news: Arc<dyn NewsSource>,
    pub preferences: Arc<PreferenceStore>,
    pub activity: ActivityLogger,
    pub validator: Arc<InputValidator>,
    pub db: Option<DbPool>,
}

impl AppState {
    /// Connect storage and pick the news source described by `config`
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let url = config
            .database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        let db = match url {
            Some(url) => {
                let pool = DbPool::new(&config.database, url).await?;
                if config.database.auto_migrate {
                    pool.ensure_schema().await?;
                }
                Some(pool)
            }
            None => {
                warn!("No database configured, preferences and activity are kept in memory");
                None
            }
        };

        let (preferences, activity): (Arc<dyn PreferenceRepository>, Arc<dyn ActivitySink>) =
            match &db {
                Some(pool) => {
                    let repository = Arc::new(Repository::new(pool.clone()));
                    (repository.clone(), repository)
                }
                None => (
                    Arc::new(MemoryPreferences::new()),
                    Arc::new(MemoryActivity::new()),
                ),
            };

        let news = create_news_source(&config.upstream)?;
        info!(source = news.name(), "News source selected");

        Ok(Self::assemble(config, news, preferences, activity, db))
    }

    pub fn assemble(
        config: AppConfig,
        news: Arc<dyn NewsSource>,
        preferences: Arc<dyn PreferenceRepository>,
        activity: Arc<dyn ActivitySink>,
        db: Option<DbPool>,
    ) -> Self {
        let validator = InputValidator::new(&config.pagination, &config.upstream);
        let preferences = PreferenceStore::new(preferences, config.session.lifetime());
        let activity = ActivityLogger::new(activity, config.activity.search_update_window());

        Self {
            config: Arc::new(config),
            news,
            preferences: Arc::new(preferences),
            activity,
            validator: Arc::new(validator),
            db,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!("Starting Newsdesk API Gateway v{}", newsdesk_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()
            .context("Failed to install Prometheus exporter")?;
        metrics::register_metrics();
        info!("Metrics listening on {}", metrics_addr);
    }

    if config.rate_limit.enabled {
        warn!(
            requests_per_hour = config.rate_limit.requests_per_hour,
            "Rate limiting is configured but not enforced"
        );
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = config.shutdown_timeout();
    let state = AppState::from_config(config).await?;

    // Build the router
    let app = create_router(state);

    // Start the server
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    serve_until(listener, app, shutdown_signal(), grace).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve until `signal` fires, then give in-flight requests `grace` to finish
async fn serve_until<S>(
    listener: TcpListener,
    app: Router,
    signal: S,
    grace: Duration,
) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (draining_tx, draining_rx) = oneshot::channel::<()>();

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                let _ = draining_tx.send(());
            })
            .await
    });

    let deadline = async move {
        match draining_rx.await {
            Ok(()) => tokio::time::sleep(grace).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        joined = &mut server => {
            joined??;
        }
        _ = deadline => {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Shutdown timeout elapsed, dropping open connections"
            );
            server.abort();
        }
    }

    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    use handlers::{headlines, health, method_not_allowed, preferences, preflight, search};

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut app = Router::new()
        .route(
            "/headlines",
            get(headlines::headlines)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/search",
            get(search::search)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/preferences",
            get(preferences::get_preferences)
                .post(preferences::save_preferences)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session::ensure_session,
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = middleware::cors::cors_layer(&state.config.cors) {
        app = app.layer(cors);
    }

    app.layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
