//! Gemini API wire types.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Media attached to a generation request.
#[derive(Debug, Clone)]
pub enum MediaRef {
    /// Base64 payload carried inside the request
    Inline { mime_type: String, data: String },
    /// Reference to a previously uploaded provider file
    File { mime_type: String, uri: String },
}

impl MediaRef {
    /// Encode raw bytes as an inline payload.
    pub fn inline_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        MediaRef::Inline {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn file(mime_type: impl Into<String>, uri: impl Into<String>) -> Self {
        MediaRef::File {
            mime_type: mime_type.into(),
            uri: uri.into(),
        }
    }
}

/// Generation options passed through to the provider verbatim.
///
/// The gateway does not validate or clamp them beyond type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Gemini generateContent request.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest {
    pub contents: Vec<Content>,

    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn media(media: &MediaRef) -> Self {
        match media {
            MediaRef::Inline { mime_type, data } => Part {
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
                ..Default::default()
            },
            MediaRef::File { mime_type, uri } => Part {
                file_data: Some(FileData {
                    mime_type: mime_type.clone(),
                    file_uri: uri.clone(),
                }),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

/// Gemini generateContent response.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// File object as returned by the Files API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileObject {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub mime_type: String,
}

/// Envelope of the upload finalize response.
#[derive(Debug, Deserialize)]
pub(crate) struct FileUploadResponse {
    pub file: FileObject,
}
