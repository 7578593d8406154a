//! HTTP API.
//!
//! - `GET /` answers `{"ping":"pong"}`
//! - `POST /extract` runs one URL (`url`) or a batch (`urls`) through the
//!   escalator and wraps the outcome in a `{time, msg, data}` envelope

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::app::{AppContext, ExtractError, Result};
use crate::domain::{CleanOptions, FetchOutcome, FetchRequest, StrategyId};
use crate::fetcher::EscalationPolicy;

/// Body of `POST /extract`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractBody {
    pub url: Option<String>,
    pub urls: Option<Vec<String>>,
    pub adapters: Vec<StrategyId>,
    pub xhr: bool,
    pub clean: CleanOptions,
    /// Overrides the configured policy for this call
    pub policy: Option<EscalationPolicy>,
}

impl ExtractBody {
    /// Build one request per URL. The flag is true for a batch.
    pub fn into_requests(self) -> Result<(Vec<FetchRequest>, bool)> {
        let (urls, batch) = match (self.url, self.urls) {
            (Some(url), None) => (vec![url], false),
            (None, Some(urls)) if !urls.is_empty() => (urls, true),
            (None, Some(_)) => {
                return Err(ExtractError::InvalidRequest("'urls' is empty".to_string()))
            }
            (None, None) => {
                return Err(ExtractError::InvalidRequest(
                    "missing 'url' or 'urls'".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ExtractError::InvalidRequest(
                    "send either 'url' or 'urls', not both".to_string(),
                ))
            }
        };

        let requests = urls
            .into_iter()
            .map(|url| -> Result<FetchRequest> {
                url::Url::parse(&url)?;
                Ok(FetchRequest::new(url)
                    .with_strategies(self.adapters.iter().copied())
                    .with_xhr(self.xhr)
                    .with_clean(self.clean))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((requests, batch))
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T> {
    time: f64,
    msg: &'static str,
    data: T,
}

impl<T: Serialize> Envelope<T> {
    fn new(started: Instant, success: bool, data: T) -> Self {
        Self {
            time: (started.elapsed().as_secs_f64() * 100.0).round() / 100.0,
            msg: if success { "success" } else { "failed" },
            data,
        }
    }
}

/// Maps library errors to `{"error": ...}` responses.
pub struct ApiError(ExtractError);

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() || matches!(self.0, ExtractError::Config(_)) {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "Extraction request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ping))
        .route("/extract", post(extract))
        .layer(cors)
        .with_state(ctx)
}

/// Bind the configured address and serve until `shutdown` resolves, then
/// close every backend.
pub async fn serve<F>(ctx: Arc<AppContext>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = ctx.config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, policy = %ctx.escalator.policy(), "Listening");

    let served = axum::serve(listener, router(ctx.clone()))
        .with_graceful_shutdown(shutdown)
        .await;

    info!("Server stopped, closing backends");
    ctx.shutdown().await;
    served.map_err(ExtractError::from)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "ping": "pong" }))
}

async fn extract(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ExtractBody>,
) -> std::result::Result<Response, ApiError> {
    let started = Instant::now();
    let policy = body.policy.unwrap_or_else(|| ctx.escalator.policy());
    let (requests, batch) = body.into_requests()?;

    if batch {
        let outcomes: Vec<FetchOutcome> = ctx.escalator.extract_all(&requests, policy).await?;
        let success = outcomes.iter().all(|o| o.succeeded);
        return Ok(Json(Envelope::new(started, success, outcomes)).into_response());
    }

    let outcome = ctx.escalator.extract_with(&requests[0], policy).await?;
    Ok(Json(Envelope::new(started, outcome.succeeded, outcome)).into_response())
}
