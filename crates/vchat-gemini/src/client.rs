//! Gemini API client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use vchat_models::{ContextEntry, ProcessingState, RemoteFileHandle, Role};

use crate::error::{GeminiError, GeminiResult};
use crate::types::{
    Content, FileUploadResponse, FileObject, GenerateRequest, GenerateResponse, GenerationConfig,
    MediaRef, Part,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Interval between file-state polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum number of file-state polls before giving up (~60 seconds).
pub const POLL_MAX_ATTEMPTS: u32 = 30;

/// Gemini API client.
///
/// Constructed once at startup and shared; calls are never retried, so a
/// failed generation may still have incurred provider-side cost.
pub struct GeminiClient {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    poll_interval: Duration,
}

impl GeminiClient {
    /// Create a new client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> GeminiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| GeminiError::MissingApiKey)?;
        if api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }
        Ok(Self::new(api_key))
    }

    /// Override the API endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the file-state poll interval (used by tests).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Issue a single generateContent call and return the response text.
    ///
    /// `history` entries become leading role-tagged turns; the final user
    /// turn carries the media part (if any) followed by the prompt text.
    /// `config` is forwarded verbatim.
    pub async fn generate(
        &self,
        media: Option<&MediaRef>,
        prompt: &str,
        history: &[ContextEntry],
        config: Option<&GenerationConfig>,
    ) -> GeminiResult<String> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|entry| Content {
                role: match entry.role {
                    Role::User => "user",
                    Role::Model => "model",
                },
                parts: vec![Part::text(&entry.text)],
            })
            .collect();

        let mut parts = Vec::new();
        if let Some(media) = media {
            parts.push(Part::media(media));
        }
        parts.push(Part::text(prompt));
        contents.push(Content {
            role: "user",
            parts,
        });

        let request = GenerateRequest {
            contents,
            generation_config: config.cloned(),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!(model = %self.model, history_len = history.len(), "Calling generateContent");

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Provider { status, body });
        }

        let generate_response: GenerateResponse = response.json().await?;

        let text = generate_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.text.as_deref())
            .ok_or(GeminiError::EmptyResponse)?;

        Ok(text.to_string())
    }

    /// Upload raw bytes to the Files API and return the new handle.
    ///
    /// Uses the resumable protocol: a start request yields an upload URL,
    /// then a single upload-and-finalize request carries the bytes.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> GeminiResult<RemoteFileHandle> {
        let start_url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);

        let start_response = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;

        if !start_response.status().is_success() {
            let status = start_response.status().as_u16();
            let body = start_response.text().await.unwrap_or_default();
            return Err(GeminiError::Provider { status, body });
        }

        let upload_url = start_response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| GeminiError::malformed("upload start response missing upload URL"))?;

        let size = bytes.len();
        let finalize_response = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        if !finalize_response.status().is_success() {
            let status = finalize_response.status().as_u16();
            let body = finalize_response.text().await.unwrap_or_default();
            return Err(GeminiError::Provider { status, body });
        }

        let upload: FileUploadResponse = finalize_response.json().await?;
        let handle = handle_from_file(upload.file);

        info!(
            name = %handle.name,
            state = %handle.state,
            size,
            "Uploaded file to provider"
        );

        Ok(handle)
    }

    /// Fetch the current state of a provider file.
    pub async fn get_file(&self, name: &str) -> GeminiResult<RemoteFileHandle> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Provider { status, body });
        }

        let file: FileObject = response.json().await?;
        Ok(handle_from_file(file))
    }

    /// Poll a file until it leaves `PROCESSING`.
    ///
    /// One attempt is one state fetch; attempts are spaced by the configured
    /// poll interval. `ACTIVE` succeeds; any other terminal state fails
    /// immediately; exhausting the attempt budget fails with the last
    /// observed state.
    pub async fn wait_for_active(
        &self,
        handle: &RemoteFileHandle,
    ) -> GeminiResult<RemoteFileHandle> {
        let mut last_state = handle.state.clone();

        for attempt in 1..=POLL_MAX_ATTEMPTS {
            let current = self.get_file(&handle.name).await?;

            match current.state {
                ProcessingState::Active => {
                    debug!(name = %handle.name, attempt, "File is active");
                    return Ok(current);
                }
                ProcessingState::Processing => {
                    last_state = current.state;
                }
                state => {
                    return Err(GeminiError::ProcessingFailed {
                        state: state.to_string(),
                    });
                }
            }

            if attempt < POLL_MAX_ATTEMPTS {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(GeminiError::ProcessingTimeout {
            last_state: last_state.to_string(),
            attempts: POLL_MAX_ATTEMPTS,
        })
    }

    /// Delete a provider file.
    ///
    /// Callers treat failures here as best-effort cleanup: log and move on.
    pub async fn delete_file(&self, name: &str) -> GeminiResult<()> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);

        let response = self.client.delete(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(name = %name, status, "Failed to delete provider file");
            return Err(GeminiError::Provider { status, body });
        }

        debug!(name = %name, "Deleted provider file");
        Ok(())
    }
}

fn handle_from_file(file: FileObject) -> RemoteFileHandle {
    RemoteFileHandle {
        name: file.name,
        uri: file.uri,
        state: ProcessingState::from(file.state),
        mime_type: file.mime_type,
    }
}
