//! Re-hosts generation results in object storage.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde_json::json;
use tracing::{info, warn};

use genjob_models::{
    AssetKind, AssetMetadata, GenerationResult, JobStage, ModuleId, UploadedAsset,
};

use crate::error::StorageResult;
use crate::fetch::AssetFetcher;
use crate::keys::{asset_key, asset_key_for_type};
use crate::store::ObjectStore;

pub const ASSETS_UPLOADED_TOTAL: &str = "genjob_assets_uploaded_total";

/// Where one asset goes.
struct AssetTarget<'a> {
    user_id: &'a str,
    job_id: &'a str,
    stage: JobStage,
}

impl AssetTarget<'_> {
    fn key(&self, kind: AssetKind) -> String {
        asset_key(self.user_id, self.job_id, self.stage, kind)
    }

    fn typed_key(&self, kind: AssetKind, content_type: &str) -> String {
        asset_key_for_type(self.user_id, self.job_id, self.stage, kind, content_type)
    }
}

/// Uploads one phase's output and returns the public URLs that made it.
///
/// Failures are isolated per asset: a failed thumbnail never discards a
/// successful video. The caller decides what an empty URL list means.
#[derive(Clone)]
pub struct AssetUploader {
    store: Arc<dyn ObjectStore>,
    fetcher: AssetFetcher,
}

impl AssetUploader {
    pub fn new(store: Arc<dyn ObjectStore>, fetcher: AssetFetcher) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn upload(
        &self,
        result: &GenerationResult,
        module: ModuleId,
        user_id: &str,
        job_id: &str,
        stage: JobStage,
    ) -> UploadedAsset {
        let target = AssetTarget {
            user_id,
            job_id,
            stage,
        };
        let mut urls = Vec::new();

        match result {
            GenerationResult::Text(text) => {
                let document = json!({
                    "content": text.content,
                    "model": text.model,
                    "module": module,
                    "preview": text.preview,
                    "usage": text.usage,
                    "generated_at": Utc::now(),
                });
                self.collect(
                    &mut urls,
                    AssetKind::Text,
                    self.put_json(&target, AssetKind::Text, &document).await,
                );
            }
            GenerationResult::ImagePrompt(prompt) => {
                let document = json!({
                    "original_prompt": prompt.original_prompt,
                    "enhanced_prompt": prompt.enhanced_prompt,
                    "model": prompt.model,
                    "module": module,
                    "preview": prompt.preview,
                    "usage": prompt.usage,
                    "generated_at": Utc::now(),
                });
                self.collect(
                    &mut urls,
                    AssetKind::ImagePrompt,
                    self.put_json(&target, AssetKind::ImagePrompt, &document).await,
                );
            }
            GenerationResult::Audio(audio) => {
                let uploaded = self
                    .rehost(
                        &target,
                        AssetKind::Audio,
                        &audio.audio_url,
                        audio.content_type.as_deref(),
                    )
                    .await;
                self.collect(&mut urls, AssetKind::Audio, uploaded);
            }
            GenerationResult::Video(video) => {
                let uploaded = self
                    .rehost(&target, AssetKind::Video, &video.video_url, None)
                    .await;
                self.collect(&mut urls, AssetKind::Video, uploaded);

                if let Some(thumbnail_url) = &video.thumbnail_url {
                    let uploaded = self
                        .rehost(&target, AssetKind::Thumbnail, thumbnail_url, None)
                        .await;
                    self.collect(&mut urls, AssetKind::Thumbnail, uploaded);
                }
            }
        }

        info!(
            job_id = %job_id,
            module = %module,
            stage = %stage,
            uploaded = urls.len(),
            "Asset upload finished"
        );

        UploadedAsset {
            metadata: AssetMetadata {
                kind: result.kind().to_string(),
                model: result.model().to_string(),
                duration: result.duration(),
                file_count: urls.len(),
                generated_at: Utc::now(),
            },
            urls,
        }
    }

    fn collect(&self, urls: &mut Vec<String>, kind: AssetKind, uploaded: StorageResult<String>) {
        match uploaded {
            Ok(url) => {
                let labels = [("kind", kind.as_str().to_string())];
                counter!(ASSETS_UPLOADED_TOTAL, &labels).increment(1);
                urls.push(url);
            }
            Err(e) => warn!(kind = kind.as_str(), "Asset upload failed: {}", e),
        }
    }

    async fn put_json(
        &self,
        target: &AssetTarget<'_>,
        kind: AssetKind,
        document: &serde_json::Value,
    ) -> StorageResult<String> {
        let key = target.key(kind);
        let body = serde_json::to_vec_pretty(document)?;
        self.store
            .put_object(&key, body, kind.default_content_type())
            .await?;
        Ok(self.store.public_url(&key))
    }

    async fn rehost(
        &self,
        target: &AssetTarget<'_>,
        kind: AssetKind,
        source_url: &str,
        reported_content_type: Option<&str>,
    ) -> StorageResult<String> {
        let fetched = self.fetcher.fetch(source_url).await?;
        let content_type = resolve_content_type(
            kind,
            reported_content_type,
            fetched.content_type.as_deref(),
        );

        let key = target.typed_key(kind, &content_type);
        self.store.put_object(&key, fetched.bytes, &content_type).await?;
        Ok(self.store.public_url(&key))
    }
}

/// Provider-reported type wins, then a specific header type, then the kind default.
fn resolve_content_type(kind: AssetKind, reported: Option<&str>, fetched: Option<&str>) -> String {
    let usable = |ct: &&str| {
        let ct = ct.trim();
        !ct.is_empty() && !ct.starts_with("application/octet-stream") && !ct.starts_with("binary/")
    };

    reported
        .filter(usable)
        .or_else(|| fetched.filter(usable))
        .unwrap_or_else(|| kind.default_content_type())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_resolution() {
        assert_eq!(
            resolve_content_type(AssetKind::Audio, Some("audio/wav"), Some("audio/mpeg")),
            "audio/wav"
        );
        assert_eq!(
            resolve_content_type(AssetKind::Audio, None, Some("application/octet-stream")),
            "audio/mpeg"
        );
        assert_eq!(
            resolve_content_type(AssetKind::Thumbnail, None, Some("image/png")),
            "image/png"
        );
        assert_eq!(resolve_content_type(AssetKind::Video, None, None), "video/mp4");
    }
}
