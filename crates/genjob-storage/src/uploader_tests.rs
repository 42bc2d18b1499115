//! Tests for the asset uploader.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use genjob_models::{
    AudioResult, GenerationResult, JobStage, ModuleId, TextResult, VideoResult,
};

use crate::error::StorageError;
use crate::fetch::AssetFetcher;
use crate::store::MockObjectStore;
use crate::uploader::AssetUploader;

// =============================================================================
// Test Helpers
// =============================================================================

fn uploader(store: MockObjectStore) -> AssetUploader {
    AssetUploader::new(
        Arc::new(store),
        AssetFetcher::new(Duration::from_secs(5)).unwrap(),
    )
}

fn with_public_urls(store: &mut MockObjectStore) {
    store
        .expect_public_url()
        .returning(|key| format!("https://cdn.test/{}", key));
}

fn video(server: &MockServer, thumbnail: bool) -> GenerationResult {
    GenerationResult::Video(VideoResult {
        video_url: format!("{}/out/video.mp4", server.uri()),
        thumbnail_url: thumbnail.then(|| format!("{}/out/thumb.jpg", server.uri())),
        duration: Some(5.0),
        fps: 24,
        has_audio: false,
        model: "fal-ai/wan-i2v".to_string(),
        preview: false,
    })
}

async fn serve_video(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/out/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "video/mp4"))
        .mount(server)
        .await;
}

// =============================================================================
// Video
// =============================================================================

#[tokio::test]
async fn test_thumbnail_failure_keeps_video() {
    let server = MockServer::start().await;
    serve_video(&server).await;
    Mock::given(method("GET"))
        .and(path("/out/thumb.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .withf(|key, data, content_type| {
            key == "user_u1/job_j1/final_video.mp4" && data.len() == 64 && content_type == "video/mp4"
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    with_public_urls(&mut store);

    let asset = uploader(store)
        .upload(&video(&server, true), ModuleId::VideoNoAudio, "u1", "j1", JobStage::Final)
        .await;

    assert_eq!(asset.urls, vec!["https://cdn.test/user_u1/job_j1/final_video.mp4"]);
    assert_eq!(asset.metadata.file_count, 1);
    assert_eq!(asset.metadata.kind, "video");
    assert_eq!(asset.metadata.duration, Some(5.0));
}

#[tokio::test]
async fn test_video_and_thumbnail_uploaded_in_order() {
    let server = MockServer::start().await;
    serve_video(&server).await;
    Mock::given(method("GET"))
        .and(path("/out/thumb.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8; 8], "image/jpeg"))
        .mount(&server)
        .await;

    let mut store = MockObjectStore::new();
    store.expect_put_object().times(2).returning(|_, _, _| Ok(()));
    with_public_urls(&mut store);

    let asset = uploader(store)
        .upload(&video(&server, true), ModuleId::VideoNoAudio, "u1", "j1", JobStage::Preview)
        .await;

    assert_eq!(
        asset.urls,
        vec![
            "https://cdn.test/user_u1/job_j1/preview_video.mp4",
            "https://cdn.test/user_u1/job_j1/preview_thumbnail.jpg",
        ]
    );
    assert_eq!(asset.primary_url(), Some("https://cdn.test/user_u1/job_j1/preview_video.mp4"));
}

#[tokio::test]
async fn test_every_fetch_failing_yields_empty_asset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut store = MockObjectStore::new();
    store.expect_put_object().never();

    let asset = uploader(store)
        .upload(&video(&server, true), ModuleId::VideoNoAudio, "u1", "j1", JobStage::Final)
        .await;

    assert!(asset.is_empty());
    assert_eq!(asset.metadata.file_count, 0);
}

// =============================================================================
// Audio and text
// =============================================================================

#[tokio::test]
async fn test_audio_keys_are_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/speech.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 16], "application/octet-stream"))
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut store = MockObjectStore::new();
    let recorder = seen.clone();
    store
        .expect_put_object()
        .times(2)
        .returning(move |key, _, content_type| {
            recorder
                .lock()
                .unwrap()
                .push((key.to_string(), content_type.to_string()));
            Ok(())
        });
    with_public_urls(&mut store);

    let result = GenerationResult::Audio(AudioResult {
        audio_url: format!("{}/speech.mp3", server.uri()),
        content_type: None,
        duration: Some(2.5),
        model: "fal-ai/kokoro/american-english".to_string(),
        preview: false,
    });
    let uploader = uploader(store);
    let first = uploader
        .upload(&result, ModuleId::Speech, "u1", "j1", JobStage::Final)
        .await;
    let second = uploader
        .upload(&result, ModuleId::Speech, "u1", "j1", JobStage::Final)
        .await;

    assert_eq!(first.urls, second.urls);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0].0, "user_u1/job_j1/final_audio.mp3");
    assert_eq!(seen[0].1, "audio/mpeg");
}

#[tokio::test]
async fn test_wav_audio_keeps_wav_extension() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/speech"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 16], "application/octet-stream"))
        .mount(&server)
        .await;

    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .withf(|key, _, content_type| {
            key == "user_u1/job_j1/final_audio.wav" && content_type == "audio/wav"
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    with_public_urls(&mut store);

    let result = GenerationResult::Audio(AudioResult {
        audio_url: format!("{}/speech", server.uri()),
        content_type: Some("audio/wav".to_string()),
        duration: None,
        model: "fal-ai/kokoro/american-english".to_string(),
        preview: false,
    });
    let asset = uploader(store)
        .upload(&result, ModuleId::Speech, "u1", "j1", JobStage::Final)
        .await;

    assert_eq!(asset.urls, vec!["https://cdn.test/user_u1/job_j1/final_audio.wav".to_string()]);
}

#[tokio::test]
async fn test_text_result_stored_as_json_document() {
    let body = Arc::new(Mutex::new(Vec::new()));
    let captured = body.clone();

    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .withf(|key, _, content_type| {
            key == "user_u1/job_j1/preview_text.json" && content_type == "application/json"
        })
        .times(1)
        .returning(move |_, data, _| {
            *captured.lock().unwrap() = data;
            Ok(())
        });
    with_public_urls(&mut store);

    let result = GenerationResult::Text(TextResult {
        content: "Hello there".to_string(),
        model: "openai/gpt-4o-mini".to_string(),
        usage: None,
        preview: true,
    });
    let asset = uploader(store)
        .upload(&result, ModuleId::Chat, "u1", "j1", JobStage::Preview)
        .await;

    assert_eq!(asset.urls.len(), 1);
    let document: serde_json::Value = serde_json::from_slice(&body.lock().unwrap()).unwrap();
    assert_eq!(document["content"], "Hello there");
    assert_eq!(document["module"], "chat");
    assert_eq!(document["preview"], true);
}

#[tokio::test]
async fn test_store_failure_yields_empty_asset() {
    let mut store = MockObjectStore::new();
    store
        .expect_put_object()
        .times(1)
        .returning(|key, _, _| Err(StorageError::upload_failed(key.to_string())));

    let result = GenerationResult::Text(TextResult {
        content: "Hello".to_string(),
        model: "m".to_string(),
        usage: None,
        preview: false,
    });
    let asset = uploader(store)
        .upload(&result, ModuleId::Chat, "u1", "j1", JobStage::Final)
        .await;

    assert!(asset.is_empty());
}
