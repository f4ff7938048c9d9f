use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use studio_auth::{
    AesGcmTokenCipher, AuthState, AuthStores, GithubIdentityProvider, InMemoryAuthStorage,
    JwtService, OAuthService, SessionStore,
};
use studio_auth::http::GITHUB_LOGIN_PATH;
use studio_auth_postgres::PostgresAuthStorage;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::bootstrap::{bootstrap_clients, load_signing_key};
use crate::config::{AppConfig, StorageBackend};
use crate::sweep::spawn_sweeper;

pub struct StudioAuthServer {
    addr: SocketAddr,
    app: Router,
    sweeper: JoinHandle<()>,
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn build_app(cfg: &AppConfig, state: AuthState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .merge(studio_auth::router(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    // Query strings carry codes and state; log the path only
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
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
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// Storage handles picked by `storage.backend`.
struct Backend {
    stores: AuthStores,
    sessions: Arc<dyn SessionStore>,
}

async fn open_backend(cfg: &AppConfig) -> anyhow::Result<Backend> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; all clients, users and tokens are lost on restart");
            let storage = Arc::new(InMemoryAuthStorage::new());
            Ok(Backend {
                stores: AuthStores::from_backend(storage.clone()),
                sessions: storage,
            })
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres is required for the postgres backend")?;
            let storage = PostgresAuthStorage::connect(&pg.url, pg.pool_size)
                .await
                .context("connecting to PostgreSQL")?;
            storage
                .ensure_schema()
                .await
                .context("creating auth tables")?;
            tracing::info!(pool_size = pg.pool_size, "PostgreSQL storage ready");
            let storage = Arc::new(storage);
            Ok(Backend {
                stores: AuthStores::from_backend(storage.clone()),
                sessions: storage,
            })
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

    /// Opens storage, loads the signing key, bootstraps clients and starts
    /// the expiry sweeper.
    pub async fn build(self) -> anyhow::Result<StudioAuthServer> {
        let cfg = self.config;
        let backend = open_backend(&cfg).await?;

        let signing_key = load_signing_key(&cfg.auth.signing)?;
        let jwt = Arc::new(JwtService::new(signing_key, cfg.auth.issuer()));
        let cipher = Arc::new(AesGcmTokenCipher::new(&cfg.auth.encryption.password));
        let github = GithubIdentityProvider::new(
            &cfg.auth.github,
            cfg.auth.endpoint(GITHUB_LOGIN_PATH),
        )
        .context("configuring GitHub login")?;

        bootstrap_clients(&cfg.clients, backend.stores.clients.as_ref()).await?;

        let service = OAuthService::new(cfg.auth.clone(), backend.stores, jwt, cipher);
        let sweeper = spawn_sweeper(
            service.clone(),
            backend.sessions.clone(),
            cfg.auth.oauth.sweep_interval,
        );

        let state = AuthState::new(service, backend.sessions, Arc::new(github));
        let app = build_app(&cfg, state);

        tracing::info!(issuer = %cfg.auth.issuer(), "Authorization server initialized");

        Ok(StudioAuthServer {
            addr: self.addr,
            app,
            sweeper,
        })
    }
}

impl StudioAuthServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        self.sweeper.abort();
        result?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
