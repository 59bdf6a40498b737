//! Media asset models.

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Supported video mimetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoMime {
    /// video/mp4
    Mp4,
    /// video/webm
    Webm,
    /// video/quicktime (.mov)
    QuickTime,
    /// video/x-msvideo (.avi)
    Avi,
}

impl VideoMime {
    /// Parse a declared mimetype string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "video/mp4" => Some(VideoMime::Mp4),
            "video/webm" => Some(VideoMime::Webm),
            "video/quicktime" | "video/mov" => Some(VideoMime::QuickTime),
            "video/x-msvideo" | "video/avi" => Some(VideoMime::Avi),
            _ => None,
        }
    }

    /// Parse a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "mp4" => Some(VideoMime::Mp4),
            "webm" => Some(VideoMime::Webm),
            "mov" => Some(VideoMime::QuickTime),
            "avi" => Some(VideoMime::Avi),
            _ => None,
        }
    }

    /// The canonical mimetype string.
    pub fn as_mime(&self) -> &'static str {
        match self {
            VideoMime::Mp4 => "video/mp4",
            VideoMime::Webm => "video/webm",
            VideoMime::QuickTime => "video/quicktime",
            VideoMime::Avi => "video/x-msvideo",
        }
    }

    /// File extension (without the dot) for this mimetype.
    pub fn extension(&self) -> &'static str {
        match self {
            VideoMime::Mp4 => "mp4",
            VideoMime::Webm => "webm",
            VideoMime::QuickTime => "mov",
            VideoMime::Avi => "avi",
        }
    }
}

impl fmt::Display for VideoMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_mime())
    }
}

/// A locally stored uploaded video.
///
/// Created by a successful store; owned by the session that uploaded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Generated unique filename (the local ID)
    pub filename: String,

    /// Absolute path of the stored file
    pub path: PathBuf,

    /// Size in bytes (always > 0)
    pub size_bytes: u64,

    /// Declared mimetype
    pub mime: VideoMime,
}

/// Provider-side processing state of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessingState {
    /// The provider is still ingesting the file
    Processing,
    /// The file is ready to be referenced in a generation request
    Active,
    /// Ingestion failed
    Failed,
    /// Any other state string the provider reports
    Other(String),
}

impl ProcessingState {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessingState::Processing => "PROCESSING",
            ProcessingState::Active => "ACTIVE",
            ProcessingState::Failed => "FAILED",
            ProcessingState::Other(s) => s.as_str(),
        }
    }

    /// Whether this state can no longer transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingState::Processing)
    }
}

impl From<String> for ProcessingState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PROCESSING" => ProcessingState::Processing,
            "ACTIVE" => ProcessingState::Active,
            "FAILED" => ProcessingState::Failed,
            _ => ProcessingState::Other(s),
        }
    }
}

impl From<ProcessingState> for String {
    fn from(state: ProcessingState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider-side representation of an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileHandle {
    /// Provider resource name (e.g. `files/abc123`)
    pub name: String,

    /// Provider URI used to reference the file in generation requests
    pub uri: String,

    /// Current processing state
    pub state: ProcessingState,

    /// Mimetype as recorded by the provider
    #[serde(default)]
    pub mime_type: String,
}
