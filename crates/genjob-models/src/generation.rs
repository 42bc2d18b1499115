//! Normalized generation results.
//!
//! Provider adapters map their native response shapes into
//! `GenerationResult`; nothing downstream sees provider field names.

use serde::{Deserialize, Serialize};

/// Token accounting reported by text-completion providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResult {
    pub content: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePromptResult {
    pub original_prompt: String,
    pub enhanced_prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioResult {
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub model: String,
    pub preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResult {
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub fps: u32,
    pub has_audio: bool,
    pub model: String,
    pub preview: bool,
}

/// Output of one generation phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationResult {
    Text(TextResult),
    ImagePrompt(ImagePromptResult),
    Audio(AudioResult),
    Video(VideoResult),
}

impl GenerationResult {
    /// Short tag used in storage keys and callback metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationResult::Text(_) => "text",
            GenerationResult::ImagePrompt(_) => "image_prompt",
            GenerationResult::Audio(_) => "audio",
            GenerationResult::Video(_) => "video",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            GenerationResult::Text(r) => &r.model,
            GenerationResult::ImagePrompt(r) => &r.model,
            GenerationResult::Audio(r) => &r.model,
            GenerationResult::Video(r) => &r.model,
        }
    }

    pub fn is_preview(&self) -> bool {
        match self {
            GenerationResult::Text(r) => r.preview,
            GenerationResult::ImagePrompt(r) => r.preview,
            GenerationResult::Audio(r) => r.preview,
            GenerationResult::Video(r) => r.preview,
        }
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            GenerationResult::Text(r) => r.usage,
            GenerationResult::ImagePrompt(r) => r.usage,
            GenerationResult::Audio(_) | GenerationResult::Video(_) => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            GenerationResult::Audio(r) => r.duration,
            GenerationResult::Video(r) => r.duration,
            GenerationResult::Text(_) | GenerationResult::ImagePrompt(_) => None,
        }
    }

    /// Whether the result carries anything worth uploading.
    pub fn is_deliverable(&self) -> bool {
        match self {
            GenerationResult::Text(r) => !r.content.trim().is_empty(),
            GenerationResult::ImagePrompt(r) => !r.enhanced_prompt.trim().is_empty(),
            GenerationResult::Audio(r) => !r.audio_url.is_empty(),
            GenerationResult::Video(r) => !r.video_url.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> GenerationResult {
        GenerationResult::Video(VideoResult {
            video_url: "https://cdn/v.mp4".to_string(),
            thumbnail_url: None,
            duration: Some(5.0),
            fps: 24,
            has_audio: false,
            model: "fal-ai/wan-i2v".to_string(),
            preview: true,
        })
    }

    #[test]
    fn test_accessors() {
        let result = video();
        assert_eq!(result.kind(), "video");
        assert_eq!(result.model(), "fal-ai/wan-i2v");
        assert!(result.is_preview());
        assert_eq!(result.duration(), Some(5.0));
        assert!(result.usage().is_none());
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(video()).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["fps"], 24);
        assert!(json.get("thumbnail_url").is_none());
    }

    #[test]
    fn test_blank_text_not_deliverable() {
        let result = GenerationResult::Text(TextResult {
            content: "  \n".to_string(),
            model: "m".to_string(),
            usage: None,
            preview: true,
        });
        assert!(!result.is_deliverable());
    }
}
