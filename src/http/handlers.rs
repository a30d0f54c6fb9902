use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::error::PipelineError;
use crate::services::{self, SessionLogEntry};
use crate::session::SessionSnapshot;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetTokenRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub session_name: String,
    pub audio_link: String,
    pub summary_link: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn pipeline_error_response(e: &PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        PipelineError::Permission(_) => StatusCode::FORBIDDEN,
        PipelineError::AlreadyRecording | PipelineError::NoRecording => StatusCode::CONFLICT,
        PipelineError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::ModelLoad(_) | PipelineError::WorkerGone => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /auth/token
/// Store the bearer credential obtained from sign-in.
pub async fn set_token(
    State(state): State<AppState>,
    Json(req): Json<SetTokenRequest>,
) -> impl IntoResponse {
    match state.tokens.set(req.access_token) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to persist token: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "failed to persist token".into(),
                }),
            )
                .into_response()
        }
    }
}

/// DELETE /auth/token
pub async fn clear_token(State(state): State<AppState>) -> impl IntoResponse {
    match state.tokens.clear() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to clear token: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "failed to clear token".into(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /record/start
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.start_recording().await {
        Ok(()) => Json(StatusResponse {
            status: "recording".into(),
            message: "Recording started".into(),
        })
        .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            pipeline_error_response(&e).into_response()
        }
    }
}

/// POST /record/stop
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.session.stop_recording().await {
        error!("Failed to stop recording: {}", e);
        return pipeline_error_response(&e).into_response();
    }
    Json(state.session.snapshot().await).into_response()
}

/// GET /session/status
pub async fn session_status(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

/// POST /session/transcribe
/// Decode the finalized recording and run one transcription pass.
pub async fn transcribe(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.transcribe().await {
        Ok(transcript) => Json(TranscribeResponse { transcript }).into_response(),
        Err(e) => {
            error!("Transcription failed: {}", e);
            pipeline_error_response(&e).into_response()
        }
    }
}

/// POST /session/process
/// Publish the session: upload → summarize → create-doc → log-row.
/// Each step gates on the previous one; the first failure aborts the rest.
pub async fn process_session(State(state): State<AppState>) -> impl IntoResponse {
    let Some(token) = state.tokens.token() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "not signed in".into(),
            }),
        )
            .into_response();
    };

    let Some(audio) = state.session.encoded_audio().await else {
        return pipeline_error_response(&PipelineError::NoRecording).into_response();
    };

    let transcript = state.transcriber.transcript();
    if transcript.is_empty() {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "no transcript available; transcribe the recording first".into(),
            }),
        )
            .into_response();
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string();
    let session_name = format!("Session {timestamp}");

    let step_failed = |step: &str, e: anyhow::Error| {
        error!("{} failed: {:#}", step, e);
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: format!("{step} failed: {e:#}"),
            }),
        )
            .into_response()
    };

    // 1. Upload audio
    info!("Uploading audio to Drive...");
    let extension = audio.codec.extension().unwrap_or("bin");
    let filename = format!("Audio - {session_name}.{extension}");
    let drive_file = match services::upload_audio(
        &state.client,
        &token,
        &audio,
        &filename,
        &state.google.folder_name,
    )
    .await
    {
        Ok(file) => file,
        Err(e) => return step_failed("Uploading audio to Drive", e),
    };

    // 2. Summarize
    info!("Generating summary...");
    let summary = match services::summarize_transcript(&state.client, &token, &transcript).await {
        Ok(summary) => summary,
        Err(e) => return step_failed("Generating summary", e),
    };

    // 3. Create summary doc
    info!("Creating summary document...");
    let doc = match services::create_summary_doc(
        &state.client,
        &token,
        &format!("Summary - {session_name}"),
        &summary,
    )
    .await
    {
        Ok(doc) => doc,
        Err(e) => return step_failed("Creating summary document", e),
    };

    // 4. Log to the session sheet
    info!("Logging session to sheet...");
    let entry = SessionLogEntry {
        date: timestamp,
        session_name: session_name.clone(),
        summary_link: doc.web_view_link.clone(),
        audio_link: drive_file.web_view_link.clone(),
    };
    if let Err(e) = services::append_session_log(
        &state.client,
        &token,
        &state.google.spreadsheet_title,
        &entry,
    )
    .await
    {
        return step_failed("Logging session to sheet", e);
    }

    Json(ProcessResponse {
        session_name,
        audio_link: drive_file.web_view_link,
        summary_link: doc.web_view_link,
        status: "done".into(),
    })
    .into_response()
}

/// GET /history
pub async fn history(State(state): State<AppState>) -> impl IntoResponse {
    let Some(token) = state.tokens.token() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "not signed in".into(),
            }),
        )
            .into_response();
    };

    match services::fetch_history(&state.client, &token, &state.google.spreadsheet_title).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            error!("History fetch failed: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("history fetch failed: {e:#}"),
                }),
            )
                .into_response()
        }
    }
}
