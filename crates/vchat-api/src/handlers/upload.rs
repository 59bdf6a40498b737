//! Video upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use vchat_models::MediaAsset;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Upload response.
#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file: UploadedFile,
}

#[derive(Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub mimetype: String,
}

/// Store a multipart video upload and attach it to the session.
///
/// Expects the video under the multipart field `video`. A new upload resets
/// any prior analysis and chat state.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut asset: Option<MediaAsset> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let mime = field.content_type().unwrap_or_default().to_string();
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        asset = Some(state.store.store(&data, &mime, &original_name).await?);
        break;
    }

    let asset = asset.ok_or_else(|| {
        ApiError::validation("No video file provided: expected a multipart field named 'video'")
    })?;

    metrics::record_upload(asset.size_bytes);

    state.session.write().await.attach(asset.clone());

    Ok(Json(UploadResponse {
        success: true,
        file: UploadedFile {
            path: format!("/uploads/{}", asset.filename),
            size: asset.size_bytes,
            mimetype: asset.mime.as_mime().to_string(),
            filename: asset.filename,
        },
    }))
}
