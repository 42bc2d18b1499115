//! Typed per-module generation parameters.
//!
//! Jobs arrive with an untyped `params` map. `ModuleParams::parse` turns it
//! into one variant per module so that request builders never have to look up
//! optional keys by name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::ParamsError;
use crate::module::ModuleId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParams {
    pub prompt: String,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePromptParams {
    pub prompt: String,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechParams {
    pub text: String,
    pub voice: Option<String>,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageToVideoParams {
    pub image_url: String,
    pub prompt: Option<String>,
}

/// Image-to-video driven by an audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechToVideoParams {
    pub image_url: String,
    pub audio_url: String,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarVideoParams {
    pub image_url: String,
    pub audio_url: String,
    pub prompt: Option<String>,
}

/// Validated parameters, one variant per module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "module", content = "params")]
pub enum ModuleParams {
    #[serde(rename = "chat")]
    Chat(ChatParams),
    #[serde(rename = "image")]
    ImagePrompt(ImagePromptParams),
    #[serde(rename = "speech")]
    Speech(SpeechParams),
    #[serde(rename = "video-no-audio")]
    ImageToVideo(ImageToVideoParams),
    #[serde(rename = "video-with-audio")]
    SpeechToVideo(SpeechToVideoParams),
    #[serde(rename = "avatar-video")]
    AvatarVideo(AvatarVideoParams),
    /// Modules without a real integration keep their raw params.
    #[serde(rename = "music")]
    Placeholder(Map<String, Value>),
}

impl ModuleParams {
    /// Parse and validate the raw params for `module`.
    pub fn parse(module: ModuleId, params: &Map<String, Value>) -> Result<Self, ParamsError> {
        let p = ParamReader { module, params };

        Ok(match module {
            ModuleId::Chat => ModuleParams::Chat(ChatParams {
                prompt: p.required_str("prompt")?,
                system_prompt: p.optional_str("system_prompt")?,
            }),
            ModuleId::Image => ModuleParams::ImagePrompt(ImagePromptParams {
                prompt: p.required_str("prompt")?,
                style: p.optional_str("style")?,
            }),
            ModuleId::Speech => ModuleParams::Speech(SpeechParams {
                text: p.required_str("text")?,
                voice: p.optional_str("voice")?,
                speed: p.optional_f64("speed")?,
            }),
            ModuleId::VideoNoAudio => ModuleParams::ImageToVideo(ImageToVideoParams {
                image_url: p.required_url("image_url")?,
                prompt: p.optional_str("prompt")?,
            }),
            ModuleId::VideoWithAudio => ModuleParams::SpeechToVideo(SpeechToVideoParams {
                image_url: p.required_url("image_url")?,
                audio_url: p.required_url("audio_url")?,
                prompt: p.optional_str("prompt")?,
            }),
            ModuleId::AvatarVideo => ModuleParams::AvatarVideo(AvatarVideoParams {
                image_url: p.required_url("image_url")?,
                audio_url: p.required_url("audio_url")?,
                prompt: p.optional_str("prompt")?,
            }),
            ModuleId::Music => ModuleParams::Placeholder(params.clone()),
        })
    }

    /// The module these params belong to.
    pub fn module(&self) -> ModuleId {
        match self {
            ModuleParams::Chat(_) => ModuleId::Chat,
            ModuleParams::ImagePrompt(_) => ModuleId::Image,
            ModuleParams::Speech(_) => ModuleId::Speech,
            ModuleParams::ImageToVideo(_) => ModuleId::VideoNoAudio,
            ModuleParams::SpeechToVideo(_) => ModuleId::VideoWithAudio,
            ModuleParams::AvatarVideo(_) => ModuleId::AvatarVideo,
            ModuleParams::Placeholder(_) => ModuleId::Music,
        }
    }
}

struct ParamReader<'a> {
    module: ModuleId,
    params: &'a Map<String, Value>,
}

impl ParamReader<'_> {
    fn optional_str(&self, field: &str) -> Result<Option<String>, ParamsError> {
        match self.params.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ParamsError::invalid_type(self.module.as_str(), field, "a string")),
        }
    }

    fn required_str(&self, field: &str) -> Result<String, ParamsError> {
        self.optional_str(field)?
            .ok_or_else(|| ParamsError::missing(self.module.as_str(), field))
    }

    fn required_url(&self, field: &str) -> Result<String, ParamsError> {
        let value = self.required_str(field)?;
        match Url::parse(&value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
            _ => Err(ParamsError::InvalidUrl {
                module: self.module.as_str().to_string(),
                field: field.to_string(),
                value,
            }),
        }
    }

    fn optional_f64(&self, field: &str) -> Result<Option<f64>, ParamsError> {
        match self.params.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(_) => Err(ParamsError::invalid_type(self.module.as_str(), field, "a number")),
        }
    }
}
