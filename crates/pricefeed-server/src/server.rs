use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use pricefeed_chain::ContractOracle;
use pricefeed_core::SignerIdentity;
use pricefeed_storage::{DynCacheTier, DynOracleReader, DynOracleWriter, DynRoundStore};
use pricefeed_tiered::{LivenessProber, TieredReader, WriteCoordinator};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, ServerConfig, StorageBackend, StorageConfig};
use crate::{create_cache_backend, handlers, middleware as app_middleware};

/// The tier implementations the coordinators run against.
pub struct Collaborators {
    pub cache: DynCacheTier,
    pub store: DynRoundStore,
    pub reader: DynOracleReader,
    pub writer: DynOracleWriter,
    /// Identity mutations are submitted as
    pub signer: SignerIdentity,
}

/// Shared handler state. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<TieredReader>,
    pub writer: Arc<WriteCoordinator>,
    pub prober: Arc<LivenessProber>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(parts: Collaborators, cfg: &AppConfig) -> Self {
        let policy = cfg.retry.to_policy();

        let reader = TieredReader::new(
            parts.cache.clone(),
            parts.store.clone(),
            parts.reader.clone(),
        )
        .with_cache_ttl(cfg.cache.ttl())
        .with_retry_policy(policy.clone());

        let writer = WriteCoordinator::new(
            parts.writer,
            parts.reader.clone(),
            parts.cache.clone(),
            parts.store.clone(),
            parts.signer,
        )
        .with_retry_policy(policy);

        let prober = LivenessProber::new(parts.reader, parts.cache, parts.store);

        Self {
            reader: Arc::new(reader),
            writer: Arc::new(writer),
            prober: Arc::new(prober),
            request_timeout: cfg.request_timeout(),
        }
    }
}

pub struct PricefeedServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/latestPrice", get(handlers::latest_price))
        .route("/round/{id}", get(handlers::round_by_id))
        .route("/updatePrice", post(handlers::update_price))
        .route("/health", get(handlers::health))
        .with_state(state);

    // Innermost first: the rate limit sees only authenticated traffic
    if let Some(per_second) = NonZeroU32::new(cfg.rate_limit_per_second) {
        router = router.layer(middleware::from_fn_with_state(
            app_middleware::rate_limiter(per_second),
            app_middleware::rate_limit,
        ));
    }
    if let Some(key) = cfg.api_key.as_deref() {
        router = router.layer(middleware::from_fn_with_state(
            Arc::<str>::from(key),
            app_middleware::api_key,
        ));
    }

    // Outermost first: request id -> access trace -> cors -> body limit
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(app_middleware::request_id))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &axum::http::Request<_>| {
                        use tracing::field::Empty;
                        let req_id = req
                            .headers()
                            .get(app_middleware::REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        tracing::info_span!(
                            "http.request",
                            http.method = %req.method(),
                            http.target = %req.uri(),
                            http.status_code = Empty,
                            request_id = %req_id
                        )
                    })
                    .on_response(
                        |res: &axum::http::Response<_>,
                         latency: Duration,
                         span: &tracing::Span| {
                            span.record(
                                "http.status_code",
                                tracing::field::display(res.status().as_u16()),
                            );
                            tracing::info!(
                                http.status = %res.status().as_u16(),
                                elapsed_ms = %latency.as_millis(),
                                "request handled"
                            );
                        },
                    ),
            )
            .layer(CorsLayer::permissive())
            .layer(axum::extract::DefaultBodyLimit::max(cfg.body_limit_bytes)),
    )
}

async fn create_round_store(cfg: &StorageConfig) -> anyhow::Result<DynRoundStore> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory round storage; rounds are lost on restart");
            Ok(pricefeed_db_memory::create_round_store())
        }
        StorageBackend::Postgres => {
            let store =
                pricefeed_db_postgres::create_round_store(cfg.postgres.to_postgres_config())
                    .await
                    .context("failed to initialize PostgreSQL storage")?;
            Ok(store)
        }
    }
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects every tier and assembles the router.
    ///
    /// Redis falls back to a local cache when unreachable. The durable store
    /// and the oracle client are required.
    pub async fn build(self) -> anyhow::Result<PricefeedServer> {
        let cfg = self.config;

        let oracle = Arc::new(
            ContractOracle::new(&cfg.chain).context("failed to configure oracle client")?,
        );
        match oracle.chain_id().await {
            Ok(chain_id) => tracing::info!(chain_id, "Connected to JSON-RPC node"),
            Err(e) => tracing::warn!(error = %e, "JSON-RPC node unreachable at startup"),
        }

        let cache = create_cache_backend(&cfg.redis).await;
        tracing::info!(mode = %cache.stats().mode, "Cache backend ready");

        let store = create_round_store(&cfg.storage).await?;
        tracing::info!(backend = %store.backend_name(), "Round storage ready");

        let parts = Collaborators {
            cache: Arc::new(cache),
            store,
            reader: oracle.clone(),
            signer: oracle.signer().clone(),
            writer: oracle,
        };
        let app = build_app(AppState::new(parts, &cfg), &cfg.server);

        Ok(PricefeedServer {
            addr: self.addr,
            app,
        })
    }
}

impl PricefeedServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
