//! Third-party generation provider adapters.
//!
//! This crate provides:
//! - A text-completion adapter (OpenRouter-compatible chat completions)
//! - A queued-media adapter (submit, poll, fetch result)
//! - A fallback adapter for modules without a real integration
//! - A dispatcher that routes each module to its provider
//!
//! Every adapter returns the normalized `GenerationResult`; provider-native
//! response shapes never leave this crate.

pub mod dispatcher;
pub mod error;
pub mod fallback;
pub mod media;
pub mod provider;
pub mod text;

pub use dispatcher::ProviderDispatcher;
pub use error::{ProviderError, ProviderResult};
pub use fallback::FallbackProvider;
pub use media::{QueuedMediaConfig, QueuedMediaProvider};
pub use provider::GenerationProvider;
pub use text::{TextCompletionConfig, TextCompletionProvider};
