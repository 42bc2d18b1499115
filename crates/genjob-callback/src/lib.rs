//! Signed callbacks to the backend that issued a job.
//!
//! Every callback carries `X-Worker-Signature` and `X-Worker-Timestamp`.
//! The signature is a hex HMAC-SHA256, keyed by the shared secret, over
//! `{job_id}.{timestamp}.{sha256_hex(body)}`.

pub mod error;
pub mod notifier;
pub mod signer;

pub use error::{NotifyError, NotifyResult};
pub use notifier::{CallbackConfig, CallbackNotifier, CallbackRoute};
pub use signer::{CallbackSigner, SignedHeaders, SIGNATURE_HEADER, TIMESTAMP_HEADER};
