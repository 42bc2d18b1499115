//! Module registry: which provider and model serve each generation module.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// A named generation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModuleId {
    #[serde(rename = "chat")]
    Chat,
    /// Prompt enhancement for image generation.
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "speech")]
    Speech,
    #[serde(rename = "video-no-audio")]
    VideoNoAudio,
    #[serde(rename = "video-with-audio")]
    VideoWithAudio,
    #[serde(rename = "avatar-video")]
    AvatarVideo,
    /// Served by the fallback provider until a real integration lands.
    #[serde(rename = "music")]
    Music,
}

impl ModuleId {
    pub const ALL: [ModuleId; 7] = [
        ModuleId::Chat,
        ModuleId::Image,
        ModuleId::Speech,
        ModuleId::VideoNoAudio,
        ModuleId::VideoWithAudio,
        ModuleId::AvatarVideo,
        ModuleId::Music,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleId::Chat => "chat",
            ModuleId::Image => "image",
            ModuleId::Speech => "speech",
            ModuleId::VideoNoAudio => "video-no-audio",
            ModuleId::VideoWithAudio => "video-with-audio",
            ModuleId::AvatarVideo => "avatar-video",
            ModuleId::Music => "music",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| RegistryError::UnknownModule(s.to_string()))
    }
}

/// Provider family serving a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    TextCompletion,
    QueuedMedia,
    Fallback,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::TextCompletion => "text-completion",
            ProviderKind::QueuedMedia => "queued-media",
            ProviderKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: ModuleId,
    pub display_name: String,
    pub provider: ProviderKind,
    pub model_id: String,
    /// Average completion time, for display estimates only.
    pub avg_time_seconds: u32,
}

impl ModuleConfig {
    pub fn new(
        id: ModuleId,
        display_name: impl Into<String>,
        provider: ProviderKind,
        model_id: impl Into<String>,
        avg_time_seconds: u32,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            provider,
            model_id: model_id.into(),
            avg_time_seconds,
        }
    }
}

/// Immutable module table, built once at start-up and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, ModuleConfig>,
}

impl ModuleRegistry {
    /// Empty registry; use `with_module` to populate.
    pub fn new() -> Self {
        Self::default()
    }

    /// The production module table.
    pub fn builtin() -> Self {
        Self::new()
            .with_module(ModuleConfig::new(
                ModuleId::Chat,
                "Chat",
                ProviderKind::TextCompletion,
                "openai/gpt-4o-mini",
                8,
            ))
            .with_module(ModuleConfig::new(
                ModuleId::Image,
                "Image Prompt",
                ProviderKind::TextCompletion,
                "openai/gpt-4o-mini",
                10,
            ))
            .with_module(ModuleConfig::new(
                ModuleId::Speech,
                "Text to Speech",
                ProviderKind::QueuedMedia,
                "fal-ai/kokoro/american-english",
                20,
            ))
            .with_module(ModuleConfig::new(
                ModuleId::VideoNoAudio,
                "Image to Video",
                ProviderKind::QueuedMedia,
                "fal-ai/wan-i2v",
                120,
            ))
            .with_module(ModuleConfig::new(
                ModuleId::VideoWithAudio,
                "Image to Video with Audio",
                ProviderKind::QueuedMedia,
                "fal-ai/wan/v2.2-a14b/speech-to-video",
                180,
            ))
            .with_module(ModuleConfig::new(
                ModuleId::AvatarVideo,
                "Talking Avatar",
                ProviderKind::QueuedMedia,
                "fal-ai/kling-video/v1/pro/ai-avatar",
                240,
            ))
            .with_module(ModuleConfig::new(
                ModuleId::Music,
                "Music",
                ProviderKind::Fallback,
                "placeholder",
                5,
            ))
    }

    /// Add or replace a module entry.
    pub fn with_module(mut self, config: ModuleConfig) -> Self {
        self.modules.insert(config.id, config);
        self
    }

    /// Look up a module by its wire identifier.
    pub fn lookup(&self, module: &str) -> Result<&ModuleConfig, RegistryError> {
        let id: ModuleId = module.parse()?;
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownModule(module.to_string()))
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleConfig> {
        self.modules.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_module() {
        let registry = ModuleRegistry::builtin();
        for id in ModuleId::ALL {
            let config = registry.lookup(id.as_str()).unwrap();
            assert_eq!(config.id, id);
            assert!(!config.model_id.is_empty());
        }
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(
            registry.lookup("does-not-exist"),
            Err(RegistryError::UnknownModule("does-not-exist".to_string()))
        );
    }

    #[test]
    fn test_lookup_known_id_absent_from_custom_registry() {
        let registry = ModuleRegistry::new().with_module(ModuleConfig::new(
            ModuleId::Chat,
            "Chat",
            ProviderKind::TextCompletion,
            "test-model",
            1,
        ));

        assert!(registry.lookup("chat").is_ok());
        assert!(registry.lookup("speech").is_err());
    }

    #[test]
    fn test_module_id_serde_matches_as_str() {
        for id in ModuleId::ALL {
            let json = serde_json::to_value(id).unwrap();
            assert_eq!(json, id.as_str());
            assert_eq!(id.as_str().parse::<ModuleId>().unwrap(), id);
        }
    }

    #[test]
    fn test_provider_assignments() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(registry.get(ModuleId::Chat).unwrap().provider, ProviderKind::TextCompletion);
        assert_eq!(registry.get(ModuleId::Image).unwrap().provider, ProviderKind::TextCompletion);
        assert_eq!(registry.get(ModuleId::AvatarVideo).unwrap().provider, ProviderKind::QueuedMedia);
        assert_eq!(registry.get(ModuleId::Music).unwrap().provider, ProviderKind::Fallback);
    }
}
