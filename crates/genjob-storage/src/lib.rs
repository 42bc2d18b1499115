//! Cloudflare R2 storage client and asset uploader.
//!
//! This crate provides:
//! - An R2 client behind the `ObjectStore` trait
//! - Deterministic object keys per user, job, stage and asset kind
//! - Re-hosting of provider outputs with per-asset failure isolation

pub mod client;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod store;
pub mod uploader;

#[cfg(test)]
mod uploader_tests;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use fetch::{AssetFetcher, FetchedAsset};
pub use keys::{asset_key, asset_key_for_type};
pub use store::ObjectStore;
pub use uploader::AssetUploader;
