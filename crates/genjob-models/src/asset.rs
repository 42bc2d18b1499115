//! Re-hosted assets produced by one generation phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of stored object; determines key suffix and default content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Text,
    ImagePrompt,
    Audio,
    Video,
    Thumbnail,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Text => "text",
            AssetKind::ImagePrompt => "image_prompt",
            AssetKind::Audio => "audio",
            AssetKind::Video => "video",
            AssetKind::Thumbnail => "thumbnail",
        }
    }

    /// Object name suffix used in storage keys.
    pub fn file_name(&self) -> &'static str {
        match self {
            AssetKind::Text => "text.json",
            AssetKind::ImagePrompt => "image_prompt.json",
            AssetKind::Audio => "audio.mp3",
            AssetKind::Video => "video.mp4",
            AssetKind::Thumbnail => "thumbnail.jpg",
        }
    }

    pub fn default_content_type(&self) -> &'static str {
        match self {
            AssetKind::Text | AssetKind::ImagePrompt => "application/json",
            AssetKind::Audio => "audio/mpeg",
            AssetKind::Video => "video/mp4",
            AssetKind::Thumbnail => "image/jpeg",
        }
    }
}

/// Metadata attached to an uploaded phase output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Result tag (`text`, `image_prompt`, `audio`, `video`).
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub duration: Option<f64>,
    pub file_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// Public URLs for one phase, primary first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub urls: Vec<String>,
    pub metadata: AssetMetadata,
}

impl UploadedAsset {
    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
