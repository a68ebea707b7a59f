//! HTTP API server for the Hanuman gateway

pub mod health;
pub mod logs;
pub mod ui;
pub mod upload;

use std::any::Any;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::assistant::Assistant;
use crate::events::LogBus;
use crate::session::SessionStore;
use crate::speech::AUDIO_ROUTE;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
    pub sessions: SessionStore,
    pub log_bus: LogBus,
}

impl ApiState {
    /// State with fresh sessions and log bus
    #[must_use]
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant: Arc::new(assistant),
            sessions: SessionStore::new(),
            log_bus: LogBus::new(),
        }
    }

    /// Replace the session registry
    #[must_use]
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }
}

/// Build the router with all routes
pub fn app(state: ApiState) -> Router {
    let audio_dir = state.assistant.synthesizer().cache().dir().to_path_buf();

    // CORS layer for cross-origin requests from frontend
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .merge(ui::router())
        .merge(health::router())
        .merge(logs::router(state.log_bus.clone()))
        .merge(upload::router(state))
        .nest_service(AUDIO_ROUTE, ServeDir::new(audio_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CatchPanicLayer::custom(panic_response)),
        )
}

/// Render a handler panic as the upload error shape
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "status": "error",
            "error": "internal server error",
            "logs": [],
        })),
    )
        .into_response()
}

/// API server
pub struct ApiServer {
    state: ApiState,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: ApiState, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            crate::Error::Config(format!("failed to bind {addr}: {e}"))
        })?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, app(self.state))
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutting down");
                }
            })
            .await?;

        Ok(())
    }
}
