//! CardForge API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Owner resolution (bearer tokens from the identity provider)
//! - Rate limiting of AI generation
//! - Request routing
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::{FromRef, Request},
    middleware::{from_fn, Next},
    routing::{get, post},
    Router,
};
use cardforge_common::{
    ai::{create_generator, TextGenerator, UsageMetrics},
    auth::JwtManager,
    config::{AppConfig, DatabaseConfig, ObservabilityConfig},
    db::{DbPool, FlashcardStore, InMemoryStore, Repository, SystemLogSink},
    flashcards::{ApprovalService, FlashcardService, GenerationService},
    metrics,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn FlashcardStore>,
    pub system_log: Arc<dyn SystemLogSink>,
    pub generation: Arc<GenerationService>,
    pub approval: Arc<ApprovalService>,
    pub flashcards: Arc<FlashcardService>,
    pub usage: Arc<UsageMetrics>,
    pub jwt: Arc<JwtManager>,
    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn FlashcardStore>,
        system_log: Arc<dyn SystemLogSink>,
        generator: Arc<dyn TextGenerator>,
        usage: Arc<UsageMetrics>,
    ) -> Self {
        Self {
            generation: Arc::new(GenerationService::new(generator, &config.ai)),
            approval: Arc::new(ApprovalService::new(store.clone())),
            flashcards: Arc::new(FlashcardService::new(store.clone())),
            jwt: Arc::new(JwtManager::new(&config.auth)),
            shutdown: CancellationToken::new(),
            config,
            store,
            system_log,
            usage,
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting CardForge API Gateway v{}", cardforge_common::VERSION);

    config.validate().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    install_metrics_exporter(&config.observability)?;
    metrics::register_metrics();

    let (store, system_log) = build_stores(&config.database).await?;

    let usage = Arc::new(UsageMetrics::new());
    let generator = create_generator(&config.ai, usage.clone())?;

    let state = AppState::new(config.clone(), store, system_log, generator, usage);
    let shutdown = state.shutdown.clone();

    // Build the router
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .into_future();

    let grace_period = config.shutdown_timeout();
    tokio::select! {
        result = server => result?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace_period).await;
        } => tracing::warn!(?grace_period, "Graceful shutdown timed out, dropping open connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Prometheus exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_generation_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::GENERATION_BUCKETS,
        )?
        .install()?;

    info!(port = config.metrics_port, "Prometheus exporter listening");
    Ok(())
}

/// Pick the record store named by the database url
async fn build_stores(
    config: &DatabaseConfig,
) -> cardforge_common::Result<(Arc<dyn FlashcardStore>, Arc<dyn SystemLogSink>)> {
    if config.is_memory() {
        tracing::warn!("Using the in-memory store, data is lost on restart");
        let memory = Arc::new(InMemoryStore::new());
        let store: Arc<dyn FlashcardStore> = memory.clone();
        let system_log: Arc<dyn SystemLogSink> = memory;
        return Ok((store, system_log));
    }

    let repository = Arc::new(Repository::new(DbPool::new(config).await?));
    let store: Arc<dyn FlashcardStore> = repository.clone();
    let system_log: Arc<dyn SystemLogSink> = repository;
    Ok((store, system_log))
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut generate = post(handlers::generate::generate);
    if state.config.rate_limit.enabled {
        let limiter = create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        generate = generate.route_layer(from_fn(move |request: Request, next: Next| {
            rate_limit_middleware(request, next, limiter.clone())
        }));
    }

    // API routes. Generation is bounded by the AI timeout instead of the
    // request timeout.
    let api_routes = Router::new()
        .route("/flashcards/approve", post(handlers::flashcards::approve))
        .route(
            "/flashcards",
            get(handlers::flashcards::list).post(handlers::flashcards::create),
        )
        .route(
            "/flashcards/{id}",
            get(handlers::flashcards::get_flashcard)
                .put(handlers::flashcards::update_flashcard)
                .delete(handlers::flashcards::delete_flashcard),
        )
        .route("/ai/usage", get(handlers::usage::usage))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .route("/flashcards/generate", generate);

    // Compose the app
    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(from_fn(middleware::metrics::track_metrics))
        .layer(from_fn(middleware::request_id::scope_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    // Abort in-flight AI generations
    shutdown.cancel();
}
