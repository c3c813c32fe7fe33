//! HTTP server for notes extraction.

use crate::config::ServerConfig;
use crate::engine::{BatchResponse, EngineSlot, NotesResponse, ServiceError};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use notes_ocr::notes::{DEFAULT_DPI, ExtractOptions, ExtractionResult};
use notes_ocr::prelude::NotesError;
use notes_ocr::utils::is_pdf_bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Largest accepted document.
const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
/// Largest accepted request body, sized for a handful of documents per batch.
const MAX_BODY_SIZE: usize = 4 * MAX_FILE_SIZE;
const MAX_DPI: u32 = 600;
const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Application state shared across handlers
struct AppState {
    engine: EngineSlot,
    /// Wall-clock budget for one document
    timeout: Duration,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    device: String,
    version: &'static str,
}

/// Query parameters accepted by the extraction endpoints.
#[derive(Debug, Default, Deserialize)]
struct ExtractQuery {
    page: Option<usize>,
    dpi: Option<u32>,
    include_preview: Option<bool>,
}

impl ExtractQuery {
    fn to_options(&self) -> Result<ExtractOptions, ServiceError> {
        let dpi = self.dpi.unwrap_or(DEFAULT_DPI);
        if dpi == 0 || dpi > MAX_DPI {
            return Err(ServiceError::BadRequest(format!(
                "dpi must be between 1 and {MAX_DPI}, got {dpi}"
            )));
        }
        Ok(ExtractOptions {
            page_index: self.page.unwrap_or(0),
            dpi,
            include_preview: self.include_preview.unwrap_or(true),
        })
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Notes(NotesError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

/// An uploaded document held in memory until it is validated.
struct Upload {
    filename: String,
    bytes: Bytes,
}

impl Upload {
    /// Checks size and type, returning the extension used for the temp file.
    fn validate(&self) -> Result<&'static str, ServiceError> {
        if self.bytes.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "{} is empty",
                self.filename
            )));
        }
        if self.bytes.len() > MAX_FILE_SIZE {
            return Err(ServiceError::BadRequest(format!(
                "{} is too large (max {}MB)",
                self.filename,
                MAX_FILE_SIZE / (1024 * 1024)
            )));
        }
        if is_pdf_bytes(&self.bytes) {
            return Ok("pdf");
        }

        let extension = Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        SUPPORTED_EXTENSIONS
            .iter()
            .copied()
            .find(|&ext| ext == extension && ext != "pdf")
            .ok_or_else(|| {
                ServiceError::BadRequest(format!(
                    "{}: unsupported file type (expected PDF or {})",
                    self.filename,
                    SUPPORTED_EXTENSIONS[1..].join("/")
                ))
            })
    }

    /// Writes the bytes to a temp file removed when the handle drops.
    fn persist(&self, extension: &str) -> Result<NamedTempFile, ServiceError> {
        let mut file = tempfile::Builder::new()
            .prefix("notes-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        file.write_all(&self.bytes)?;
        file.flush()?;
        Ok(file)
    }
}

/// Run the HTTP server
pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = Arc::new(AppState {
        engine: EngineSlot::new(config.ocr.clone()),
        timeout: Duration::from_secs(config.timeout_secs),
    });

    info!("Loading OCR models...");
    match state.engine.get().await {
        Ok(_) => info!("OCR models loaded successfully"),
        Err(e) => warn!(error = %e, "Starting without models; loading will be retried on first request"),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/notes", post(notes_handler))
        .route("/api/notes/batch", post(batch_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    info!("Server listening on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /                - Service description");
    info!("  GET  /api/health      - Health check");
    info!("  POST /api/notes       - Extract notes from one document");
    info!("  POST /api/notes/batch - Extract notes from several documents");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "Notes OCR API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "notes": "/api/notes",
            "batch": "/api/notes/batch",
            "health": "/api/health",
        },
    }))
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.engine.is_loaded(),
        device: state.engine.device().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Single-document extraction endpoint
async fn notes_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExtractQuery>,
    multipart: Multipart,
) -> Result<Json<NotesResponse>, ServiceError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let options = query.to_options()?;

    let upload = read_uploads(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::BadRequest("missing multipart field 'file'".to_string()))?;
    info!(
        request_id = %request_id,
        filename = %upload.filename,
        size = upload.bytes.len(),
        "Processing notes request"
    );

    let response = process_upload(&state, &upload, options)
        .await
        .inspect_err(|e| error!(request_id = %request_id, error = %e, "Notes extraction failed"))?;

    info!(
        request_id = %request_id,
        success = response.result.success,
        total_ms = response.processing_time * 1000.0,
        "Notes extraction completed"
    );
    Ok(Json(response))
}

/// Multi-document extraction endpoint
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExtractQuery>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ServiceError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let options = query.to_options()?;

    let uploads = read_uploads(multipart).await?;
    if uploads.is_empty() {
        return Err(ServiceError::BadRequest(
            "missing multipart field 'file'".to_string(),
        ));
    }
    info!(request_id = %request_id, files = uploads.len(), "Processing batch request");

    let batch = process_batch(&state, &uploads, options).await;
    info!(
        request_id = %request_id,
        succeeded = batch.succeeded,
        total = batch.total,
        "Batch request completed"
    );
    Ok(Json(batch))
}

/// Processes each upload in turn; a failed item is reported, not propagated.
async fn process_batch(state: &AppState, uploads: &[Upload], options: ExtractOptions) -> BatchResponse {
    let start = Instant::now();
    let mut results = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let item_start = Instant::now();
        let response = match process_upload(state, upload, options).await {
            Ok(response) => response,
            Err(e) => {
                warn!(filename = %upload.filename, error = %e, "Batch item failed");
                NotesResponse {
                    result: ExtractionResult::failure(e.to_string()),
                    filename: upload.filename.clone(),
                    file_size: upload.bytes.len(),
                    processing_time: item_start.elapsed().as_secs_f64(),
                }
            }
        };
        results.push(response);
    }
    BatchResponse::new(results, start.elapsed().as_secs_f64())
}

/// Collects every `file` field of the request.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<Upload>, ServiceError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("failed to read {filename}: {e}")))?;
        uploads.push(Upload { filename, bytes });
    }
    Ok(uploads)
}

/// Validates, stores and extracts one upload under the configured timeout.
async fn process_upload(
    state: &AppState,
    upload: &Upload,
    options: ExtractOptions,
) -> Result<NotesResponse, ServiceError> {
    let start = Instant::now();
    let extension = upload.validate()?;
    let engine = state.engine.get().await?;
    // Owned by the blocking task, so it is removed whenever extraction ends.
    let file = upload.persist(extension)?;

    let task = tokio::task::spawn_blocking(move || {
        let result = engine.process(file.path(), &options);
        drop(file);
        result
    });

    let result = match tokio::time::timeout(state.timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            return Err(ServiceError::Internal(format!(
                "extraction task failed: {e}"
            )));
        }
        Err(_) => {
            return Err(NotesError::Timeout {
                seconds: state.timeout.as_secs(),
            }
            .into());
        }
    };

    Ok(NotesResponse {
        result,
        filename: upload.filename.clone(),
        file_size: upload.bytes.len(),
        processing_time: start.elapsed().as_secs_f64(),
    })
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
