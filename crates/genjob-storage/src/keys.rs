//! Storage key layout.
//!
//! `user_{user_id}/job_{job_id}/{stage}_{file}`. Keys depend only on their
//! inputs, so re-uploading the same asset overwrites rather than duplicates.

use genjob_models::{AssetKind, JobStage};

/// Object key for one asset of one job phase.
pub fn asset_key(user_id: &str, job_id: &str, stage: JobStage, kind: AssetKind) -> String {
    format!(
        "user_{}/job_{}/{}_{}",
        sanitize_segment(user_id),
        sanitize_segment(job_id),
        stage.as_str(),
        kind.file_name()
    )
}

/// Object key whose extension follows the stored content type.
///
/// Unknown types keep the kind's default file name.
pub fn asset_key_for_type(
    user_id: &str,
    job_id: &str,
    stage: JobStage,
    kind: AssetKind,
    content_type: &str,
) -> String {
    match extension_for(content_type) {
        Some(ext) => format!(
            "user_{}/job_{}/{}_{}.{}",
            sanitize_segment(user_id),
            sanitize_segment(job_id),
            stage.as_str(),
            kind.as_str(),
            ext
        ),
        None => asset_key(user_id, job_id, stage, kind),
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let ext = match essence.to_ascii_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/mp4" | "audio/aac" => "m4a",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "application/json" => "json",
        _ => return None,
    };
    Some(ext)
}

/// Replace anything that could change the key hierarchy.
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
