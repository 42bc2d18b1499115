//! Queued-media adapter (fal-style queue API).
//!
//! Speech synthesis, image-to-video (silent and audio-driven) and avatar
//! generation all go through one submit/poll/fetch cycle. Request bodies and
//! response shapes differ per module, so each module has its own builder and
//! its own normalizer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use genjob_models::{
    AudioResult, GenerationResult, JobStage, ModuleConfig, ModuleId, ModuleParams, ProviderKind,
    VideoResult,
};

use crate::error::{ensure_success, ProviderError, ProviderResult};
use crate::provider::GenerationProvider;

/// Every image-to-video clip is 5 seconds at 24 fps.
pub const VIDEO_FPS: u32 = 24;
pub const VIDEO_NUM_FRAMES: u32 = 121;
pub const VIDEO_GUIDANCE_SCALE: f64 = 5.0;
pub const VIDEO_DURATION_SECS: f64 = 5.0;

/// Speech previews only synthesize the head of the text.
pub const SPEECH_PREVIEW_CHARS: usize = 200;

const DEFAULT_VOICE: &str = "af_heart";
const DEFAULT_MOTION_PROMPT: &str = "Subtle natural motion, cinematic camera movement";

/// Configuration for the queued-media provider.
#[derive(Debug, Clone)]
pub struct QueuedMediaConfig {
    /// API key (`FAL_KEY`); checked at call time.
    pub api_key: Option<String>,
    /// Queue API base URL.
    pub queue_url: String,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Timeout for each individual HTTP call.
    pub request_timeout: Duration,
}

impl Default for QueuedMediaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            queue_url: "https://queue.fal.run".to_string(),
            poll_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl QueuedMediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FAL_KEY").ok().filter(|k| !k.is_empty()),
            queue_url: std::env::var("FAL_QUEUE_URL")
                .unwrap_or_else(|_| "https://queue.fal.run".to_string()),
            poll_interval: Duration::from_millis(
                std::env::var("FAL_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            request_timeout: Duration::from_secs(
                std::env::var("FAL_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

// ============================================================================
// Request builders
// ============================================================================

/// Build the provider input for a module and stage.
pub fn build_input(params: &ModuleParams, stage: JobStage) -> ProviderResult<Value> {
    let resolution = match stage {
        JobStage::Preview => "480p",
        JobStage::Final => "720p",
    };
    let inference_steps = match stage {
        JobStage::Preview => 20,
        JobStage::Final => 40,
    };

    match params {
        ModuleParams::Speech(p) => {
            let text = match stage {
                JobStage::Preview => truncate_chars(&p.text, SPEECH_PREVIEW_CHARS),
                JobStage::Final => p.text.clone(),
            };
            Ok(json!({
                "prompt": text,
                "voice": p.voice.as_deref().unwrap_or(DEFAULT_VOICE),
                "speed": p.speed.unwrap_or(1.0),
            }))
        }
        ModuleParams::ImageToVideo(p) => Ok(json!({
            "image_url": p.image_url,
            "prompt": p.prompt.as_deref().unwrap_or(DEFAULT_MOTION_PROMPT),
            "num_frames": VIDEO_NUM_FRAMES,
            "frames_per_second": VIDEO_FPS,
            "resolution": resolution,
            "guidance_scale": VIDEO_GUIDANCE_SCALE,
            "num_inference_steps": inference_steps,
            "enable_safety_checker": true,
        })),
        ModuleParams::SpeechToVideo(p) => Ok(json!({
            "image_url": p.image_url,
            "audio_url": p.audio_url,
            "prompt": p.prompt.as_deref().unwrap_or(DEFAULT_MOTION_PROMPT),
            "num_frames": VIDEO_NUM_FRAMES,
            "frames_per_second": VIDEO_FPS,
            "resolution": resolution,
            "guidance_scale": VIDEO_GUIDANCE_SCALE,
            "num_inference_steps": inference_steps,
        })),
        ModuleParams::AvatarVideo(p) => {
            let mut input = json!({
                "image_url": p.image_url,
                "audio_url": p.audio_url,
            });
            if let Some(prompt) = &p.prompt {
                input["prompt"] = json!(prompt);
            }
            Ok(input)
        }
        other => Err(ProviderError::unsupported(
            other.module().as_str(),
            ProviderKind::QueuedMedia.as_str(),
        )),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// Response normalizers
// ============================================================================

#[derive(Debug, Deserialize)]
struct FileRef {
    url: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpeechOutput {
    #[serde(default)]
    audio: Option<FileRef>,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Image-to-video output: `{ video: { url, thumbnail_url? }, thumbnail?: { url } }`.
#[derive(Debug, Deserialize)]
struct NestedVideoOutput {
    #[serde(default)]
    video: Option<FileRef>,
    #[serde(default)]
    thumbnail: Option<FileRef>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    fps: Option<u32>,
}

/// Avatar output: `{ video_url, thumbnail_url?, duration? }`.
#[derive(Debug, Deserialize)]
struct FlatVideoOutput {
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

fn parse_output<T: for<'de> Deserialize<'de>>(module: ModuleId, output: Value) -> ProviderResult<T> {
    serde_json::from_value(output)
        .map_err(|e| ProviderError::invalid_response(format!("{} output: {}", module, e)))
}

fn non_empty(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

/// Map a provider result into the common `GenerationResult` shape.
pub fn normalize_output(
    config: &ModuleConfig,
    stage: JobStage,
    output: Value,
) -> ProviderResult<GenerationResult> {
    let model = config.model_id.clone();
    let preview = stage.is_preview();

    match config.id {
        ModuleId::Speech => {
            let out: SpeechOutput = parse_output(config.id, output)?;
            let (audio_url, content_type) = match out.audio {
                Some(file) => (non_empty(Some(file.url)), file.content_type),
                None => (non_empty(out.audio_url), None),
            };
            let audio_url =
                audio_url.ok_or_else(|| ProviderError::empty_result("speech output has no audio URL"))?;

            Ok(GenerationResult::Audio(AudioResult {
                audio_url,
                content_type,
                duration: out.duration,
                model,
                preview,
            }))
        }
        ModuleId::VideoNoAudio | ModuleId::VideoWithAudio => {
            let out: NestedVideoOutput = parse_output(config.id, output)?;
            let video = out
                .video
                .ok_or_else(|| ProviderError::empty_result(format!("{} output has no video", config.id)))?;
            let video_url = non_empty(Some(video.url))
                .ok_or_else(|| ProviderError::empty_result(format!("{} output has no video URL", config.id)))?;
            let thumbnail_url =
                non_empty(video.thumbnail_url).or_else(|| non_empty(out.thumbnail.map(|t| t.url)));

            Ok(GenerationResult::Video(VideoResult {
                video_url,
                thumbnail_url,
                duration: Some(out.duration.unwrap_or(VIDEO_DURATION_SECS)),
                fps: out.fps.unwrap_or(VIDEO_FPS),
                has_audio: config.id == ModuleId::VideoWithAudio,
                model,
                preview,
            }))
        }
        ModuleId::AvatarVideo => {
            let out: FlatVideoOutput = parse_output(config.id, output)?;
            let video_url = non_empty(out.video_url)
                .ok_or_else(|| ProviderError::empty_result("avatar output has no video_url"))?;

            Ok(GenerationResult::Video(VideoResult {
                video_url,
                thumbnail_url: non_empty(out.thumbnail_url),
                duration: out.duration,
                fps: VIDEO_FPS,
                has_audio: true,
                model,
                preview,
            }))
        }
        other => Err(ProviderError::unsupported(
            other.as_str(),
            ProviderKind::QueuedMedia.as_str(),
        )),
    }
}

// ============================================================================
// Queue client
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

/// Queue-based media provider.
pub struct QueuedMediaProvider {
    http: Client,
    config: QueuedMediaConfig,
}

impl QueuedMediaProvider {
    pub fn new(config: QueuedMediaConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(QueuedMediaConfig::from_env())
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::missing_credential("FAL_KEY"))
    }

    /// Submit a request and wait until the provider reports completion.
    pub async fn submit_and_wait(&self, model_id: &str, input: &Value) -> ProviderResult<Value> {
        let api_key = self.api_key()?;
        let base = self.config.queue_url.trim_end_matches('/');
        let submit_url = format!("{}/{}", base, model_id);

        debug!("Submitting queued request to {}", submit_url);
        let response = self
            .http
            .post(&submit_url)
            .header("Authorization", format!("Key {}", api_key))
            .json(input)
            .send()
            .await?;
        let submitted: SubmitResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("submit response: {}", e)))?;

        let request_base = format!("{}/requests/{}", submit_url, submitted.request_id);
        let status_url = submitted
            .status_url
            .unwrap_or_else(|| format!("{}/status", request_base));
        let mut response_url = submitted.response_url.unwrap_or(request_base);

        info!(
            request_id = %submitted.request_id,
            model = %model_id,
            "Queued media request submitted"
        );

        let mut polls: u64 = 0;
        loop {
            let response = self
                .http
                .get(&status_url)
                .header("Authorization", format!("Key {}", api_key))
                .send()
                .await?;
            let status: StatusResponse = ensure_success(response)
                .await?
                .json()
                .await
                .map_err(|e| ProviderError::invalid_response(format!("status response: {}", e)))?;

            match status.status.as_str() {
                "COMPLETED" => {
                    if let Some(error) = status.error {
                        return Err(ProviderError::JobFailed(error));
                    }
                    if let Some(url) = status.response_url {
                        response_url = url;
                    }
                    break;
                }
                "IN_QUEUE" | "IN_PROGRESS" => {
                    polls += 1;
                    if polls % 30 == 0 {
                        debug!(
                            request_id = %submitted.request_id,
                            polls,
                            "Still waiting for queued media request"
                        );
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                "FAILED" | "ERROR" | "CANCELLED" => {
                    let reason = status.error.unwrap_or_else(|| status.status.clone());
                    warn!(request_id = %submitted.request_id, "Queued media request failed: {}", reason);
                    return Err(ProviderError::JobFailed(reason));
                }
                other => {
                    return Err(ProviderError::invalid_response(format!(
                        "unknown queue status '{}'",
                        other
                    )))
                }
            }
        }

        let response = self
            .http
            .get(&response_url)
            .header("Authorization", format!("Key {}", api_key))
            .send()
            .await?;
        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("result response: {}", e)))
    }
}

#[async_trait]
impl GenerationProvider for QueuedMediaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::QueuedMedia
    }

    fn supports(&self, module: ModuleId) -> bool {
        matches!(
            module,
            ModuleId::Speech | ModuleId::VideoNoAudio | ModuleId::VideoWithAudio | ModuleId::AvatarVideo
        )
    }

    async fn generate(
        &self,
        config: &ModuleConfig,
        params: &ModuleParams,
        stage: JobStage,
    ) -> ProviderResult<GenerationResult> {
        let input = build_input(params, stage)?;
        let output = self.submit_and_wait(&config.model_id, &input).await?;
        let result = normalize_output(config, stage, output)?;

        info!(module = %config.id, stage = %stage, kind = result.kind(), "Queued media generation finished");
        Ok(result)
    }
}
