//! Remote-protocol analyze and chat handlers.
//!
//! These endpoints upload the video to the provider's file store, poll its
//! processing state until it is usable, and reference it by URI in
//! generation requests.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vchat_gemini::GenerationConfig;
use vchat_models::{AnalysisResult, ChatMessage, ChatTurnResult, EventMessage};
use vchat_session::AnalysisProtocol;

use crate::error::ApiResult;
use crate::handlers::ensure_attached;
use crate::metrics;
use crate::state::AppState;

/// Request to analyze a stored video via the provider file store.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalyzeRequest {
    /// Path of the uploaded video as returned by the upload endpoint
    pub video_path: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub struct AiAnalyzeResponse {
    pub success: bool,
    pub analysis: AnalysisResult,
}

/// Run the initial analysis end-to-end over the remote-file protocol.
pub async fn ai_analyze(
    State(state): State<AppState>,
    Json(request): Json<AiAnalyzeRequest>,
) -> ApiResult<Json<AiAnalyzeResponse>> {
    let gemini = state.gemini()?;
    let filename = basename(&request.video_path);

    let mut session = state.session.write().await;
    ensure_attached(&state, &mut session, filename).await?;

    let start = Instant::now();
    let result = session
        .analyze(
            &gemini,
            &state.store,
            request.prompt.as_deref(),
            AnalysisProtocol::RemoteFile,
            request.generation_config.as_ref(),
        )
        .await;
    metrics::record_provider_call("ai_analyze", result.is_ok(), start.elapsed().as_secs_f64());

    let analysis = result?;
    info!(filename = %filename, "Video analyzed via provider file store");

    state.broadcast(EventMessage::from(&analysis));

    Ok(Json(AiAnalyzeResponse {
        success: true,
        analysis,
    }))
}

/// Request to chat referencing a provider-side file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiChatRequest {
    pub question: String,
    #[serde(default)]
    pub video_uri: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub struct AiChatResponse {
    pub success: bool,
    pub response: ChatTurnResult,
}

/// Answer one chat question referencing the remote file handle.
pub async fn ai_chat(
    State(state): State<AppState>,
    Json(request): Json<AiChatRequest>,
) -> ApiResult<Json<AiChatResponse>> {
    let gemini = state.gemini()?;
    let mut session = state.session.write().await;

    if let Some(uri) = &request.video_uri {
        session.set_remote_uri(uri);
    }

    let start = Instant::now();
    let result = session
        .chat(
            &gemini,
            &state.store,
            &request.question,
            &request.chat_history,
            AnalysisProtocol::RemoteFile,
            request.generation_config.as_ref(),
        )
        .await;
    metrics::record_provider_call("ai_chat", result.is_ok(), start.elapsed().as_secs_f64());

    let reply = result?;

    state.broadcast(EventMessage::from(&reply));

    Ok(Json(AiChatResponse {
        success: true,
        response: reply,
    }))
}

/// Last path component of a client-supplied upload path.
fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
