use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::IdentityGateway;
use crate::config::AppConfig;
use crate::http::build_client;
use crate::models::ErrorPayload;
use crate::pipeline::RoutePipeline;
use crate::session::{CookieSigner, SessionManager, SessionStore};
use crate::{api, auth, views};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<RoutePipeline>,
    pub identity: Option<Arc<IdentityGateway>>,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let pipeline =
            RoutePipeline::from_config(&config).context("Failed to set up route pipeline")?;
        let identity = IdentityGateway::from_config(
            &config.identity,
            &config.server.public_url,
            build_client(&config.http)?,
        )
        .context("Failed to set up identity provider")?;
        if identity.is_none() {
            info!("Identity provider not configured, login is disabled");
        }

        let signer = CookieSigner::new(config.session.secret_key.as_deref());
        let secure = config.server.public_url.starts_with("https://");

        Ok(Self {
            pipeline: Arc::new(pipeline),
            identity: identity.map(Arc::new),
            sessions: SessionManager::new(store, signer, secure),
            config: Arc::new(config),
        })
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Handler error rendered as a 500 with a flat `{"error": ...}` body
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorPayload::new(self.0.to_string())),
        )
            .into_response()
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .merge(views::router())
        .merge(auth::router())
        .merge(api::router())
        .fallback_service(static_dir)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

/// Run the server until Ctrl-C
pub async fn serve(state: AppState) -> Result<()> {
    let server = state.config.server.clone();
    let app = router(state);
    let addr = format!("0.0.0.0:{}", server.port);

    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&server.tls_cert_path, &server.tls_key_path) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .context("Failed to load TLS certificate or key")?;
        let socket_addr: std::net::SocketAddr = addr.parse().context("Invalid listen address")?;

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        info!("Web server running at https://localhost:{}", server.port);
        axum_server::bind_rustls(socket_addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("Server error")?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://localhost:{}", server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}
