//! Analysis lifecycle state machine.
//!
//! Orders the upload → analyze → chat flow and threads the media asset, the
//! initial analysis and the accumulating chat log through each step. Failed
//! steps leave the machine exactly where it was.

use std::str::FromStr;

use tracing::{info, warn};

use vchat_gemini::{GeminiClient, GenerationConfig, MediaRef};
use vchat_models::{reduce_history, AnalysisResult, ChatMessage, ChatTurnResult, MediaAsset};
use vchat_store::MediaStore;

use crate::error::{SessionError, SessionResult};

/// Prompt used for the initial analysis when the caller supplies none.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this video in detail. Describe the key scenes, \
people and objects, any spoken or on-screen text, and the overall narrative.";

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Nothing uploaded yet
    #[default]
    Empty,
    /// A video is stored and ready for analysis
    Uploaded,
    /// The initial analysis has been produced
    Analyzed,
    /// At least one chat turn has completed (chat self-loops here)
    Chatting,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Empty => "empty",
            SessionPhase::Uploaded => "uploaded",
            SessionPhase::Analyzed => "analyzed",
            SessionPhase::Chatting => "chatting",
        }
    }
}

/// Which of the two provider protocols an operation uses.
///
/// The two paths are never merged: only `RemoteFile` uploads to the provider
/// and polls its processing state; `Inline` carries the bytes in the
/// generation request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisProtocol {
    /// Base64 payload inside a single synchronous generate call
    #[default]
    Inline,
    /// Provider-side upload, state poll, then generate by file reference
    RemoteFile,
}

impl FromStr for AnalysisProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(AnalysisProtocol::Inline),
            "remote" | "remote_file" | "file" => Ok(AnalysisProtocol::RemoteFile),
            other => Err(format!("Unknown analysis protocol: {other}")),
        }
    }
}

/// One upload-analyze-chat lifecycle.
///
/// Holds at most one active media asset; attaching a new one discards all
/// prior state. No internal locking: callers decide how requests interleave.
#[derive(Debug, Default)]
pub struct Session {
    phase: SessionPhase,
    asset: Option<MediaAsset>,
    video_uri: Option<String>,
    analysis: Option<AnalysisResult>,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    pub fn video_uri(&self) -> Option<&str> {
        self.video_uri.as_deref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Attach a freshly stored asset, resetting the machine.
    ///
    /// Legal in every phase: re-uploading discards the prior analysis and
    /// chat log without confirmation.
    pub fn attach(&mut self, asset: MediaAsset) {
        info!(filename = %asset.filename, "Attaching media asset, resetting session");
        self.asset = Some(asset);
        self.video_uri = None;
        self.analysis = None;
        self.history.clear();
        self.phase = SessionPhase::Uploaded;
    }

    /// Record the provider URI the conversation refers to.
    ///
    /// Used when a client resumes a remote-file conversation by sending the
    /// URI it received from a previous analyze step.
    pub fn set_remote_uri(&mut self, uri: impl Into<String>) {
        self.video_uri = Some(uri.into());
    }

    /// Run the initial analysis over the attached asset.
    ///
    /// On success the result is recorded and appended to the chat log as an
    /// AI entry; on failure the machine stays in its current phase and the
    /// asset remains usable for a retry.
    pub async fn analyze(
        &mut self,
        gemini: &GeminiClient,
        store: &MediaStore,
        prompt: Option<&str>,
        protocol: AnalysisProtocol,
        config: Option<&GenerationConfig>,
    ) -> SessionResult<AnalysisResult> {
        let asset = self.asset.clone().ok_or(SessionError::NoMedia)?;

        let prompt = match prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => DEFAULT_ANALYSIS_PROMPT,
        };

        let result = match protocol {
            AnalysisProtocol::Inline => {
                let bytes = store.read(&asset.filename).await?;
                let media = MediaRef::inline_bytes(asset.mime.as_mime(), &bytes);
                let text = gemini.generate(Some(&media), prompt, &[], config).await?;
                AnalysisResult::new(text, None)
            }
            AnalysisProtocol::RemoteFile => {
                let bytes = store.read(&asset.filename).await?;
                let handle = gemini
                    .upload_file(bytes, asset.mime.as_mime(), &asset.filename)
                    .await?;
                let active = gemini.wait_for_active(&handle).await?;

                let mime = if active.mime_type.is_empty() {
                    asset.mime.as_mime().to_string()
                } else {
                    active.mime_type.clone()
                };
                let media = MediaRef::file(mime, active.uri.clone());
                let text = gemini.generate(Some(&media), prompt, &[], config).await?;

                // Cleanup is best-effort: the analysis already succeeded.
                if let Err(e) = gemini.delete_file(&active.name).await {
                    warn!(name = %active.name, error = %e, "Failed to delete provider file");
                }

                self.video_uri = Some(active.uri.clone());
                AnalysisResult::new(text, Some(active.uri))
            }
        };

        info!(filename = %asset.filename, "Initial analysis complete");

        self.history.push(ChatMessage::ai(&result.text));
        self.analysis = Some(result.clone());
        self.phase = SessionPhase::Analyzed;
        Ok(result)
    }

    /// Answer one chat question about the attached video.
    ///
    /// `prior` is the caller's full message log; the provider receives the
    /// bounded, role-mapped reduction of it. On success the question and the
    /// reply are appended to the session log in that order; on failure
    /// nothing is appended.
    pub async fn chat(
        &mut self,
        gemini: &GeminiClient,
        store: &MediaStore,
        question: &str,
        prior: &[ChatMessage],
        protocol: AnalysisProtocol,
        config: Option<&GenerationConfig>,
    ) -> SessionResult<ChatTurnResult> {
        if question.trim().is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let context = reduce_history(prior);

        let text = match protocol {
            AnalysisProtocol::Inline => {
                let asset = self.asset.clone().ok_or(SessionError::NoMedia)?;
                let bytes = store.read(&asset.filename).await?;
                let media = MediaRef::inline_bytes(asset.mime.as_mime(), &bytes);
                let prompt =
                    format!("{question}\n\nAnswer directly based on the content of the video.");
                gemini.generate(Some(&media), &prompt, &context, config).await?
            }
            AnalysisProtocol::RemoteFile => {
                let uri = self.video_uri.clone().ok_or(SessionError::NoMedia)?;
                let mime = self
                    .asset
                    .as_ref()
                    .map(|a| a.mime.as_mime())
                    .unwrap_or("video/mp4");
                let media = MediaRef::file(mime, uri);
                gemini.generate(Some(&media), question, &context, config).await?
            }
        };

        self.history.push(ChatMessage::user(question));
        let result = ChatTurnResult::new(text);
        self.history.push(ChatMessage::ai(&result.text));
        self.phase = SessionPhase::Chatting;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tempfile::{tempdir, TempDir};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use vchat_models::Sender;

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn test_client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key")
            .with_base_url(server.uri())
            .with_model("gemini-2.0-flash")
            .with_poll_interval(Duration::ZERO)
    }

    async fn stored_session(dir: &TempDir) -> (MediaStore, Session) {
        let store = MediaStore::new(dir.path());
        let asset = store
            .store(b"fake video bytes", "video/mp4", "clip.mp4")
            .await
            .unwrap();
        let mut session = Session::new();
        session.attach(asset);
        (store, session)
    }

    fn generate_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ] } }
            ]
        })
    }

    async fn mount_generate(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_body(text)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_chat_before_upload_is_no_media() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let client = test_client(&server);

        let mut session = Session::new();
        let err = session
            .chat(&client, &store, "What happens?", &[], AnalysisProtocol::Inline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoMedia));
        assert_eq!(session.phase(), SessionPhase::Empty);
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_question() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let err = session
            .chat(&client, &store, "   ", &[], AnalysisProtocol::Inline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyQuestion));
    }

    #[tokio::test]
    async fn test_analyze_requires_media() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let client = test_client(&server);

        let mut session = Session::new();
        let err = session
            .analyze(&client, &store, None, AnalysisProtocol::Inline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoMedia));
    }

    #[tokio::test]
    async fn test_analyze_inline_success() {
        let server = MockServer::start().await;
        mount_generate(&server, "A cat runs.").await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let result = session
            .analyze(&client, &store, Some("Describe this"), AnalysisProtocol::Inline, None)
            .await
            .unwrap();

        assert_eq!(result.text, "A cat runs.");
        assert_eq!(result.kind, AnalysisResult::KIND);
        assert!(result.video_uri.is_none());
        assert_eq!(session.phase(), SessionPhase::Analyzed);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].sender, Sender::Ai);

        // The inline protocol never touches the Files API.
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.path() == MODEL_PATH));
    }

    #[tokio::test]
    async fn test_analyze_failure_leaves_machine_uploaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let err = session
            .analyze(&client, &store, None, AnalysisProtocol::Inline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Provider(_)));

        // State is not corrupted; the asset is still usable for a retry.
        assert_eq!(session.phase(), SessionPhase::Uploaded);
        assert!(session.asset().is_some());
        assert!(session.analysis().is_none());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_attach_resets_prior_state() {
        let server = MockServer::start().await;
        mount_generate(&server, "First analysis").await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        session
            .analyze(&client, &store, None, AnalysisProtocol::Inline, None)
            .await
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Analyzed);

        let replacement = store
            .store(b"other video", "video/webm", "other.webm")
            .await
            .unwrap();
        session.attach(replacement);

        assert_eq!(session.phase(), SessionPhase::Uploaded);
        assert!(session.analysis().is_none());
        assert!(session.history().is_empty());
        assert!(session.video_uri().is_none());
    }

    #[tokio::test]
    async fn test_chat_appends_user_then_ai() {
        let server = MockServer::start().await;
        mount_generate(&server, "It jumps.").await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let result = session
            .chat(&client, &store, "What does the cat do?", &[], AnalysisProtocol::Inline, None)
            .await
            .unwrap();

        assert_eq!(result.text, "It jumps.");
        assert_eq!(result.kind, ChatTurnResult::KIND);
        assert_eq!(session.phase(), SessionPhase::Chatting);

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[0].text, "What does the cat do?");
        assert_eq!(history[1].sender, Sender::Ai);
        assert_eq!(history[1].text, "It jumps.");
    }

    #[tokio::test]
    async fn test_chat_failure_appends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let err = session
            .chat(&client, &store, "Anything?", &[], AnalysisProtocol::Inline, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Provider(_)));
        assert!(session.history().is_empty());
        assert_eq!(session.phase(), SessionPhase::Uploaded);
    }

    #[tokio::test]
    async fn test_chat_context_is_bounded_and_system_free() {
        let server = MockServer::start().await;
        mount_generate(&server, "ok").await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let mut prior = vec![ChatMessage::system("connected")];
        for i in 1..=4 {
            prior.push(ChatMessage::user(format!("q{i}")));
            prior.push(ChatMessage::ai(format!("a{i}")));
        }
        prior.pop(); // 7 user/ai entries
        prior.push(ChatMessage::system("upload complete")); // + 2 system

        session
            .chat(&client, &store, "q5", &prior, AnalysisProtocol::Inline, None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let contents = body["contents"].as_array().unwrap();

        // 5 bounded history turns plus the final user turn.
        assert_eq!(contents.len(), 6);
        for content in contents {
            for part in content["parts"].as_array().unwrap() {
                if let Some(text) = part["text"].as_str() {
                    assert!(!text.contains("connected"));
                    assert!(!text.contains("upload complete"));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_remote_file_flow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .respond_with(ResponseTemplate::new(200).insert_header(
                "x-goog-upload-url",
                format!("{}/upload-session", server.uri()).as_str(),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {
                    "name": "files/abc",
                    "uri": "https://provider.example/files/abc",
                    "state": "PROCESSING",
                    "mimeType": "video/mp4"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "files/abc",
                "uri": "https://provider.example/files/abc",
                "state": "ACTIVE",
                "mimeType": "video/mp4"
            })))
            .mount(&server)
            .await;
        mount_generate(&server, "A cat runs.").await;
        Mock::given(method("DELETE"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        let result = session
            .analyze(&client, &store, Some("Describe this"), AnalysisProtocol::RemoteFile, None)
            .await
            .unwrap();

        assert_eq!(result.text, "A cat runs.");
        assert_eq!(
            result.video_uri.as_deref(),
            Some("https://provider.example/files/abc")
        );
        assert_eq!(
            session.video_uri(),
            Some("https://provider.example/files/abc")
        );
        assert_eq!(session.phase(), SessionPhase::Analyzed);
    }

    #[tokio::test]
    async fn test_remote_cleanup_failure_is_swallowed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .respond_with(ResponseTemplate::new(200).insert_header(
                "x-goog-upload-url",
                format!("{}/upload-session", server.uri()).as_str(),
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {
                    "name": "files/abc",
                    "uri": "https://provider.example/files/abc",
                    "state": "ACTIVE",
                    "mimeType": "video/mp4"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "files/abc",
                "uri": "https://provider.example/files/abc",
                "state": "ACTIVE",
                "mimeType": "video/mp4"
            })))
            .mount(&server)
            .await;
        mount_generate(&server, "done").await;
        Mock::given(method("DELETE"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        // Deletion failure is logged, not propagated.
        let result = session
            .analyze(&client, &store, None, AnalysisProtocol::RemoteFile, None)
            .await
            .unwrap();
        assert_eq!(result.text, "done");
        assert_eq!(session.phase(), SessionPhase::Analyzed);
    }

    #[tokio::test]
    async fn test_chat_remote_uses_recorded_uri() {
        let server = MockServer::start().await;
        mount_generate(&server, "Sure.").await;
        let dir = tempdir().unwrap();
        let (store, mut session) = stored_session(&dir).await;
        let client = test_client(&server);

        session.set_remote_uri("https://provider.example/files/xyz");
        session
            .chat(&client, &store, "And then?", &[], AnalysisProtocol::RemoteFile, None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0]["fileData"]["fileUri"],
            "https://provider.example/files/xyz"
        );
    }

    #[test]
    fn test_analysis_protocol_parsing() {
        assert_eq!(
            "inline".parse::<AnalysisProtocol>().unwrap(),
            AnalysisProtocol::Inline
        );
        assert_eq!(
            "remote".parse::<AnalysisProtocol>().unwrap(),
            AnalysisProtocol::RemoteFile
        );
        assert!("carrier-pigeon".parse::<AnalysisProtocol>().is_err());
    }
}
