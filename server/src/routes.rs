use std::path::Path;
use std::time::{Duration, Instant};

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use visage_audio::{normalize_file, write_wav, Waveform};
use visage_engine::{AnimationResult, EngineError};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/blendshape-names", get(names))
        .route("/status", get(status))
        .route("/process-audio", post(process_audio))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Display name of a model: the directory of a `model.json`, otherwise the
/// file stem.
fn model_name(path: &Path) -> String {
    let dir_name = path
        .parent()
        .and_then(Path::file_name)
        .filter(|_| path.file_name().is_some_and(|f| f == "model.json"));
    dir_name
        .or_else(|| path.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let verdict = state.readiness.verdict();
    let ready = state.engine.is_initialized();
    Json(json!({
        "message": "Visage blendshape API",
        "status": if ready { "ready" } else { "error" },
        "model": model_name(&state.config.engine.model_path),
        "healthy": verdict.healthy,
        "checks": {
            "passed": verdict.passed,
            "failed": verdict.failed,
            "warnings": verdict.warnings,
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let loaded = state.engine.is_initialized();
    Json(json!({
        "status": if loaded { "healthy" } else { "unhealthy" },
        "sdk_loaded": loaded,
    }))
}

async fn names(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let names = state
        .engine
        .blendshape_names()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "blendshape_names": names })))
}

#[derive(Debug, Default, Deserialize)]
struct StatusQuery {
    #[serde(default)]
    refresh: bool,
}

async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>, ApiError> {
    let verdict = if query.refresh {
        let readiness = state.readiness.clone();
        tokio::task::spawn_blocking(move || readiness.refresh())
            .await
            .map_err(|e| ApiError::Internal(format!("readiness task: {e}")))?
    } else {
        state.readiness.verdict()
    };
    Ok(Json(json!({
        "readiness": verdict,
        "bring_up": state.bring_up.as_ref(),
        "engine": state.engine.info(),
    })))
}

#[derive(Debug, Serialize)]
struct ProcessResponse {
    success: bool,
    data: AnimationData,
    metadata: Metadata,
}

#[derive(Debug, Serialize)]
struct AnimationData {
    blendshapes: Vec<Vec<f32>>,
    timestamps: Vec<f64>,
    fps: u32,
    duration: f64,
    num_frames: usize,
    blendshape_count: usize,
}

impl From<AnimationResult> for AnimationData {
    fn from(result: AnimationResult) -> Self {
        Self {
            timestamps: result.timestamps(),
            fps: result.fps().round() as u32,
            duration: result.duration(),
            num_frames: result.num_frames(),
            blendshape_count: result.blendshape_count(),
            blendshapes: result.frames().iter().map(|f| f.weights.clone()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Metadata {
    request_id: String,
    original_filename: String,
    audio_duration: f64,
    sample_rate: u32,
    source_sample_rate: u32,
    source_channels: usize,
}

struct Upload {
    filename: String,
    extension: String,
    data: Vec<u8>,
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
    }
}

/// Reads the `file` field, rejecting unsupported extensions before the body
/// of the field is read.
async fn read_upload(state: &AppState, multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let extension = extension_of(&filename)
            .filter(|e| state.config.accepts(e))
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Only audio files supported ({})",
                    state.config.accepted_extensions.join(", ")
                ))
            })?;
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();
        return Ok(Upload {
            filename,
            extension,
            data,
        });
    }
    Err(ApiError::BadRequest("missing multipart field 'file'".into()))
}

async fn process_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    if !state.engine.is_initialized() {
        return Err(ApiError::ServiceUnavailable("engine not initialized".into()));
    }
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_upload(&state, &mut multipart).await?;

    let ctx = RequestContext::new(&state.config.temp_dir);
    let id = ctx.id();
    info!(request_id = %id, file = %upload.filename, bytes = upload.data.len(), "processing upload");

    let result = run_pipeline(&state, ctx, upload).await;
    if let Err(e) = &result {
        warn!(request_id = %id, error = %e, status = %e.status(), "request failed");
    }
    result
}

async fn run_pipeline(
    state: &AppState,
    ctx: RequestContext,
    upload: Upload,
) -> Result<Json<ProcessResponse>, ApiError> {
    let id = ctx.id();
    let Upload {
        filename,
        extension,
        data,
    } = upload;

    // The context travels with the blocking task so its files are removed
    // only after the task is done with them, even if this request is dropped.
    let (ctx, normalized) = tokio::task::spawn_blocking(move || {
        let mut ctx = ctx;
        let result = prepare(&mut ctx, &extension, &data);
        (ctx, result)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("normalize task: {e}")))?;
    let waveform = normalized?;

    // A task still waiting for the engine when the request times out gives
    // up at the same deadline instead of running for nobody.
    let engine = state.engine.clone();
    let seconds = state.config.infer_timeout_secs;
    let budget = Duration::from_secs(seconds);
    let deadline = Instant::now() + budget;
    let task = tokio::task::spawn_blocking(move || {
        let result = engine.infer_before(&waveform, deadline);
        (waveform, result)
    });
    let (waveform, inferred) = match tokio::time::timeout(budget, task).await {
        Ok(joined) => joined.map_err(|e| ApiError::Internal(format!("inference task: {e}")))?,
        Err(_) => return Err(ApiError::InferenceTimeout(seconds)),
    };
    let animation = match inferred {
        Err(EngineError::Busy) => return Err(ApiError::InferenceTimeout(seconds)),
        other => other?,
    };
    drop(ctx);

    info!(
        request_id = %id,
        frames = animation.num_frames(),
        fps = animation.fps(),
        "processed"
    );

    Ok(Json(ProcessResponse {
        success: true,
        metadata: Metadata {
            request_id: id.to_string(),
            original_filename: filename,
            audio_duration: waveform.duration_secs(),
            sample_rate: waveform.sample_rate(),
            source_sample_rate: waveform.source_rate(),
            source_channels: waveform.source_channels(),
        },
        data: animation.into(),
    }))
}

/// Writes the upload, normalizes it and keeps the processed copy next to it.
fn prepare(ctx: &mut RequestContext, extension: &str, data: &[u8]) -> Result<Waveform, ApiError> {
    let input = ctx.input_path(extension);
    let processed = ctx.processed_path();
    std::fs::write(&input, data)?;
    let waveform = normalize_file(&input)?;
    write_wav(&processed, &waveform)?;
    Ok(waveform)
}
