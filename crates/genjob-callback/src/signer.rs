//! HMAC-SHA256 callback signatures.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{NotifyError, NotifyResult};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Worker-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Worker-Timestamp";

/// Header values for one signed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub signature: String,
    pub timestamp: i64,
}

/// Signs (and verifies) callback bodies with the shared secret.
#[derive(Clone)]
pub struct CallbackSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CallbackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSigner").finish_non_exhaustive()
    }
}

impl CallbackSigner {
    pub fn new(secret: impl Into<String>) -> NotifyResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(NotifyError::config("callback signing secret is empty"));
        }
        Ok(Self {
            secret: secret.into_bytes(),
        })
    }

    /// `{job_id}.{timestamp}.{sha256_hex(body)}`
    pub fn signing_string(job_id: &str, timestamp: i64, body: &[u8]) -> String {
        let digest = hex::encode(Sha256::digest(body));
        format!("{}.{}.{}", job_id, timestamp, digest)
    }

    fn mac(&self, job_id: &str, timestamp: i64, body: &[u8]) -> NotifyResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| NotifyError::config(format!("Invalid HMAC key: {}", e)))?;
        mac.update(Self::signing_string(job_id, timestamp, body).as_bytes());
        Ok(mac)
    }

    /// Hex signature for a callback body at `timestamp` (unix seconds).
    pub fn sign(&self, job_id: &str, timestamp: i64, body: &[u8]) -> NotifyResult<String> {
        let mac = self.mac(job_id, timestamp, body)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Sign with the current time.
    pub fn sign_now(&self, job_id: &str, body: &[u8]) -> NotifyResult<SignedHeaders> {
        let timestamp = Utc::now().timestamp();
        Ok(SignedHeaders {
            signature: self.sign(job_id, timestamp, body)?,
            timestamp,
        })
    }

    /// Check a received callback.
    ///
    /// Returns `false` for a malformed or mismatched signature, or when
    /// `timestamp` is more than `max_skew_secs` away from `now`.
    pub fn verify_at(
        &self,
        job_id: &str,
        timestamp: i64,
        body: &[u8],
        signature: &str,
        now: i64,
        max_skew_secs: i64,
    ) -> NotifyResult<bool> {
        if now.abs_diff(timestamp) > max_skew_secs.max(0).unsigned_abs() {
            return Ok(false);
        }

        let sig_bytes = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };

        let mac = self.mac(job_id, timestamp, body)?;
        Ok(mac.verify_slice(&sig_bytes).is_ok())
    }

    pub fn verify(
        &self,
        job_id: &str,
        timestamp: i64,
        body: &[u8],
        signature: &str,
        max_skew_secs: i64,
    ) -> NotifyResult<bool> {
        self.verify_at(
            job_id,
            timestamp,
            body,
            signature,
            Utc::now().timestamp(),
            max_skew_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1_700_000_000;

    fn signer() -> CallbackSigner {
        CallbackSigner::new("shared-secret").unwrap()
    }

    #[test]
    fn test_signature_is_deterministic() {
        let body = br#"{"status":"completed"}"#;
        let a = signer().sign("j1", TS, body).unwrap();
        let b = signer().sign("j1", TS, body).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_each_input_changes_signature() {
        let body = br#"{"status":"completed"}"#;
        let base = signer().sign("j1", TS, body).unwrap();

        assert_ne!(base, signer().sign("j2", TS, body).unwrap());
        assert_ne!(base, signer().sign("j1", TS + 1, body).unwrap());
        assert_ne!(base, signer().sign("j1", TS, br#"{"status":"failed"}"#).unwrap());
        assert_ne!(
            base,
            CallbackSigner::new("other-secret").unwrap().sign("j1", TS, body).unwrap()
        );
    }

    #[test]
    fn test_signing_string_format() {
        let s = CallbackSigner::signing_string("j1", TS, b"");
        assert_eq!(
            s,
            "j1.1700000000.e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_round_trip_and_tamper() {
        let body = br#"{"preview_url":"https://cdn/a.mp4"}"#;
        let sig = signer().sign("j1", TS, body).unwrap();

        assert!(signer().verify_at("j1", TS, body, &sig, TS + 10, 300).unwrap());
        assert!(!signer().verify_at("j1", TS, b"{}", &sig, TS + 10, 300).unwrap());
        assert!(!signer().verify_at("j2", TS, body, &sig, TS + 10, 300).unwrap());
        assert!(!signer().verify_at("j1", TS, body, "not-hex", TS, 300).unwrap());
    }

    #[test]
    fn test_verify_rejects_stale_timestamp() {
        let body = b"{}";
        let sig = signer().sign("j1", TS, body).unwrap();
        assert!(!signer().verify_at("j1", TS, body, &sig, TS + 301, 300).unwrap());
    }

    #[test]
    fn test_verify_extreme_timestamps_are_stale() {
        let body = b"{}";
        for ts in [i64::MIN, i64::MAX] {
            let sig = signer().sign("j1", ts, body).unwrap();
            assert!(!signer().verify_at("j1", ts, body, &sig, TS, 300).unwrap());
        }
        assert!(!signer().verify_at("j1", TS, body, "00", i64::MIN, i64::MAX).unwrap());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(CallbackSigner::new(""), Err(NotifyError::Config(_))));
    }
}
