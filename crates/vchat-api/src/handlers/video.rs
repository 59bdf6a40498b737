//! Inline-protocol analyze and chat handlers.
//!
//! These endpoints carry the stored video bytes inside each generation
//! request; provider request-size limits bound the usable video size well
//! below the local upload ceiling.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use vchat_gemini::GenerationConfig;
use vchat_models::{ChatMessage, EventMessage};
use vchat_session::AnalysisProtocol;

use crate::error::ApiResult;
use crate::handlers::ensure_attached;
use crate::metrics;
use crate::state::AppState;

/// Request to analyze an uploaded video.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeVideoRequest {
    pub filename: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub struct AnalyzeVideoResponse {
    pub success: bool,
    pub analysis: AnalysisBody,
}

#[derive(Serialize)]
pub struct AnalysisBody {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Run the initial analysis over a stored video (inline protocol).
pub async fn analyze_video(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeVideoRequest>,
) -> ApiResult<Json<AnalyzeVideoResponse>> {
    let gemini = state.gemini()?;
    let mut session = state.session.write().await;

    ensure_attached(&state, &mut session, &request.filename).await?;

    let start = Instant::now();
    let result = session
        .analyze(
            &gemini,
            &state.store,
            request.prompt.as_deref(),
            AnalysisProtocol::Inline,
            request.generation_config.as_ref(),
        )
        .await;
    metrics::record_provider_call("analyze", result.is_ok(), start.elapsed().as_secs_f64());

    let analysis = result?;
    info!(filename = %request.filename, "Video analyzed");

    state.broadcast(EventMessage::from(&analysis));

    Ok(Json(AnalyzeVideoResponse {
        success: true,
        analysis: AnalysisBody {
            text: analysis.text,
            timestamp: analysis.timestamp,
        },
    }))
}

/// Request to chat about an uploaded video.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatVideoRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub video_uri: Option<String>,
    pub question: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub struct ChatVideoResponse {
    pub success: bool,
    pub response: ChatBody,
}

#[derive(Serialize)]
pub struct ChatBody {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Answer one chat question about the video.
///
/// The client sends its full message log; the provider receives the bounded
/// reduction of it.
pub async fn chat_video(
    State(state): State<AppState>,
    Json(request): Json<ChatVideoRequest>,
) -> ApiResult<Json<ChatVideoResponse>> {
    let gemini = state.gemini()?;
    let mut session = state.session.write().await;

    if let Some(filename) = &request.filename {
        ensure_attached(&state, &mut session, filename).await?;
    }
    if let Some(uri) = &request.video_uri {
        session.set_remote_uri(uri);
    }

    // A bare URI means the conversation refers to a provider-side file.
    let protocol = if request.filename.is_none() && request.video_uri.is_some() {
        AnalysisProtocol::RemoteFile
    } else {
        AnalysisProtocol::Inline
    };

    let start = Instant::now();
    let result = session
        .chat(
            &gemini,
            &state.store,
            &request.question,
            &request.chat_history,
            protocol,
            request.generation_config.as_ref(),
        )
        .await;
    metrics::record_provider_call("chat", result.is_ok(), start.elapsed().as_secs_f64());

    let reply = result?;

    state.broadcast(EventMessage::from(&reply));

    Ok(Json(ChatVideoResponse {
        success: true,
        response: ChatBody {
            text: reply.text,
            timestamp: reply.timestamp,
        },
    }))
}
