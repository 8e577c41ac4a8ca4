//! Gateway HTTP server: Axum router, handlers and graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use socialgen_core::{
    GenerationError, InputError, Platform, ProviderManager, build_prompt,
    normalize_video_duration, parse_response, prepare_transcript,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::protocol::{ErrorBody, GenerateRequest, GenerateResponse};

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<ProviderManager>,
    pub start_time: Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, manager: Arc<ProviderManager>) -> Self {
        let state = GatewayState {
            manager,
            start_time: Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/generate", post(generate_handler))
            .route("/api/status", get(status_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
        let router = self.router();
        info!("Gateway listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

const INVALID_JSON_MESSAGE: &str = "Ungültige JSON-Anfrage";

/// Handler failure mapped onto an HTTP status and JSON body
#[derive(Debug)]
enum ApiError {
    InvalidJson,
    Input(InputError),
    Generation(GenerationError),
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidJson => (StatusCode::BAD_REQUEST, ErrorBody::new(INVALID_JSON_MESSAGE)),
            ApiError::Input(e) => (StatusCode::BAD_REQUEST, ErrorBody::new(e.to_string())),
            ApiError::Generation(e @ GenerationError::AllProvidersFailed { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: e.to_string(),
                    details: e.failures().to_vec(),
                },
            ),
            ApiError::Generation(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(e.to_string()),
            ),
        };
        (status, axum::Json(body)).into_response()
    }
}

// ── HTTP Handlers ──

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    axum::Json(serde_json::json!({
        "status": "ok",
        "providers": state.manager.provider_names(),
        "uptime_secs": uptime,
    }))
}

async fn generate_handler(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<axum::Json<GenerateResponse>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("generate", %request_id, client = %addr);

    async move {
        let req: GenerateRequest = serde_json::from_slice(&body).map_err(|e| {
            debug!("Rejecting malformed request body: {}", e);
            ApiError::InvalidJson
        })?;

        let response = generate(&state.manager, &req).await;
        match &response {
            Ok(resp) => info!("Generated {} content with {}", req.content_type, resp.model_used),
            Err(ApiError::Generation(e)) => error!("Generation failed: {}", e),
            Err(e) => warn!("Rejected request: {:?}", e),
        }
        response.map(axum::Json)
    }
    .instrument(span)
    .await
}

/// Validate, prompt, generate, parse
async fn generate(
    manager: &ProviderManager,
    req: &GenerateRequest,
) -> Result<GenerateResponse, ApiError> {
    let platform: Platform = req.content_type.parse()?;
    let prepared = prepare_transcript(&req.transcript)?;
    let duration = normalize_video_duration(req.video_duration.as_deref())?;

    let prompt = build_prompt(platform, &prepared.text, &req.prompt_options(duration));
    let generation = manager
        .generate_content(&prompt)
        .await
        .map_err(ApiError::Generation)?;

    if !generation.failures().is_empty() {
        debug!(
            "Served after {} failed provider(s)",
            generation.failures().len()
        );
    }

    let result = generation.into_result();
    Ok(GenerateResponse {
        content: parse_response(platform, &result.text),
        transcript_cleaned: prepared.cleaned,
        model_used: result.model,
    })
}
