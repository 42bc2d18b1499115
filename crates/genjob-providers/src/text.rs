//! Text-completion adapter (OpenRouter-compatible chat completions).
//!
//! Serves two modules with different prompt templates: direct chat and
//! prompt enhancement for image generation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use genjob_models::{
    GenerationResult, ImagePromptResult, JobStage, ModuleConfig, ModuleId, ModuleParams,
    ProviderKind, TextResult, TokenUsage,
};

use crate::error::{ensure_success, ProviderError, ProviderResult};
use crate::provider::GenerationProvider;

pub const PREVIEW_MAX_TOKENS: u32 = 150;
pub const FINAL_MAX_TOKENS: u32 = 1000;
const FINAL_FREQUENCY_PENALTY: f32 = 0.3;
const FINAL_PRESENCE_PENALTY: f32 = 0.2;

const CHAT_PREVIEW_SYSTEM: &str =
    "You are a helpful assistant. Reply with a short preview of your answer in two or three sentences.";

const CHAT_FINAL_SYSTEM: &str = "You are a helpful, knowledgeable assistant. \
Give a complete, well-structured answer. Use short paragraphs or lists where they help, \
avoid repeating yourself, and do not pad the answer with filler.";

const IMAGE_PREVIEW_SYSTEM: &str = "Rewrite the user's idea as a concise image generation prompt. \
Return only the prompt, in one sentence.";

const IMAGE_FINAL_SYSTEM: &str = "You are an expert prompt engineer for text-to-image models. \
Expand the user's idea into a single detailed prompt describing subject, composition, lighting, \
color palette, lens and art style. Do not use lists, quotes or explanations. \
Return only the finished prompt.";

/// Configuration for the text-completion provider.
#[derive(Debug, Clone)]
pub struct TextCompletionConfig {
    /// API key (`OPENROUTER_API_KEY`); checked at call time.
    pub api_key: Option<String>,
    /// API base URL, without trailing `/chat/completions`.
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional `HTTP-Referer` attribution header.
    pub site_url: Option<String>,
    /// Optional `X-Title` attribution header.
    pub app_name: Option<String>,
}

impl Default for TextCompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout: Duration::from_secs(120),
            site_url: None,
            app_name: None,
        }
    }
}

impl TextCompletionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            timeout: Duration::from_secs(
                std::env::var("OPENROUTER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            site_url: std::env::var("OPENROUTER_SITE_URL").ok(),
            app_name: std::env::var("OPENROUTER_APP_NAME").ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Chat completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the provider request for a module and stage.
///
/// Preview uses a short system prompt and a small token cap; final uses a
/// longer system prompt, a larger cap and repetition penalties.
pub fn build_request(
    config: &ModuleConfig,
    params: &ModuleParams,
    stage: JobStage,
) -> ProviderResult<ChatCompletionRequest> {
    let (system, user) = match (params, stage) {
        (ModuleParams::Chat(p), JobStage::Preview) => (
            CHAT_PREVIEW_SYSTEM.to_string(),
            p.prompt.clone(),
        ),
        (ModuleParams::Chat(p), JobStage::Final) => (
            p.system_prompt
                .clone()
                .unwrap_or_else(|| CHAT_FINAL_SYSTEM.to_string()),
            p.prompt.clone(),
        ),
        (ModuleParams::ImagePrompt(p), stage) => {
            let system = if stage.is_preview() {
                IMAGE_PREVIEW_SYSTEM
            } else {
                IMAGE_FINAL_SYSTEM
            };
            let user = match &p.style {
                Some(style) => format!("{}\n\nStyle: {}", p.prompt, style),
                None => p.prompt.clone(),
            };
            (system.to_string(), user)
        }
        (other, _) => {
            return Err(ProviderError::unsupported(
                other.module().as_str(),
                ProviderKind::TextCompletion.as_str(),
            ))
        }
    };

    let messages = vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ];

    Ok(match stage {
        JobStage::Preview => ChatCompletionRequest {
            model: config.model_id.clone(),
            messages,
            max_tokens: PREVIEW_MAX_TOKENS,
            temperature: 0.7,
            frequency_penalty: None,
            presence_penalty: None,
        },
        JobStage::Final => ChatCompletionRequest {
            model: config.model_id.clone(),
            messages,
            max_tokens: FINAL_MAX_TOKENS,
            temperature: 0.7,
            frequency_penalty: Some(FINAL_FREQUENCY_PENALTY),
            presence_penalty: Some(FINAL_PRESENCE_PENALTY),
        },
    })
}

/// OpenRouter-compatible text-completion provider.
pub struct TextCompletionProvider {
    http: Client,
    config: TextCompletionConfig,
}

impl TextCompletionProvider {
    pub fn new(config: TextCompletionConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(TextCompletionConfig::from_env())
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> ProviderResult<ChatCompletionResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::missing_credential("OPENROUTER_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!("Sending chat completion request to {} (model={})", url, request.model);

        let mut builder = self.http.post(&url).bearer_auth(api_key).json(request);
        if let Some(site) = &self.config.site_url {
            builder = builder.header("HTTP-Referer", site);
        }
        if let Some(app) = &self.config.app_name {
            builder = builder.header("X-Title", app);
        }

        let response = ensure_success(builder.send().await?).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("chat completion: {}", e)))
    }
}

#[async_trait]
impl GenerationProvider for TextCompletionProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TextCompletion
    }

    fn supports(&self, module: ModuleId) -> bool {
        matches!(module, ModuleId::Chat | ModuleId::Image)
    }

    async fn generate(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
        stage: JobStage,
    ) -> ProviderResult<GenerationResult> {
        let request = build_request(config, params, stage)?;
        let response = self.complete(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::empty_result("no completion content"))?;

        let model = response.model.unwrap_or_else(|| config.model_id.clone());
        info!(
            module = %config.id,
            stage = %stage,
            tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0),
            "Text completion finished"
        );

        Ok(match params {
            ModuleParams::ImagePrompt(p) => GenerationResult::ImagePrompt(ImagePromptResult {
                original_prompt: p.prompt.clone(),
                enhanced_prompt: content,
                model,
                usage: response.usage,
                preview: stage.is_preview(),
            }),
            _ => GenerationResult::Text(TextResult {
                content,
                model,
                usage: response.usage,
                preview: stage.is_preview(),
            }),
        })
    }
}
