//! Posts signed callbacks to the issuing backend.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use genjob_models::{CompletionPayload, PreviewReadyPayload};

use crate::error::{NotifyError, NotifyResult};
use crate::signer::{CallbackSigner, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Per-job callback endpoints on the issuing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackRoute {
    PreviewReady,
    Completion,
}

impl CallbackRoute {
    pub fn path(&self) -> &'static str {
        match self {
            CallbackRoute::PreviewReady => "/preview_ready",
            CallbackRoute::Completion => "/callback",
        }
    }

    /// Metric and log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackRoute::PreviewReady => "preview_ready",
            CallbackRoute::Completion => "callback",
        }
    }
}

impl std::fmt::Display for CallbackRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback configuration.
#[derive(Clone)]
pub struct CallbackConfig {
    /// Issuing backend base URL
    pub base_url: String,
    /// Shared HMAC secret
    pub signing_secret: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for CallbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CallbackConfig {
    /// Create config from environment variables.
    pub fn from_env() -> NotifyResult<Self> {
        Ok(Self {
            base_url: std::env::var("CALLBACK_BASE_URL")
                .map_err(|_| NotifyError::config("CALLBACK_BASE_URL not set"))?,
            signing_secret: std::env::var("CALLBACK_SIGNING_SECRET")
                .map_err(|_| NotifyError::config("CALLBACK_SIGNING_SECRET not set"))?,
            timeout: Duration::from_secs(
                std::env::var("CALLBACK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

/// Sends signed callbacks. No retries: a non-2xx response is an error.
#[derive(Clone)]
pub struct CallbackNotifier {
    http: Client,
    base_url: String,
    signer: CallbackSigner,
}

impl CallbackNotifier {
    pub fn new(config: CallbackConfig) -> NotifyResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(NotifyError::config("CALLBACK_BASE_URL is empty"));
        }

        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url,
            signer: CallbackSigner::new(config.signing_secret)?,
        })
    }

    pub fn from_env() -> NotifyResult<Self> {
        Self::new(CallbackConfig::from_env()?)
    }

    pub fn url_for(&self, job_id: &str, route: CallbackRoute) -> String {
        format!(
            "{}/api/jobs/{}{}",
            self.base_url,
            urlencoding::encode(job_id),
            route.path()
        )
    }

    /// Serialize, sign and post `payload` to the job's `route`.
    pub async fn notify<T: Serialize + ?Sized>(
        &self,
        job_id: &str,
        route: CallbackRoute,
        payload: &T,
    ) -> NotifyResult<()> {
        let body = serde_json::to_vec(payload)?;
        let signed = self.signer.sign_now(job_id, &body)?;
        let url = self.url_for(job_id, route);

        debug!(job_id = %job_id, route = %route, "Sending callback to {}", url);

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, &signed.signature)
            .header(TIMESTAMP_HEADER, signed.timestamp.to_string())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(job_id = %job_id, route = %route, status = status.as_u16(), "Callback rejected");
            return Err(NotifyError::Rejected {
                route: route.as_str(),
                status: status.as_u16(),
                body,
            });
        }

        info!(job_id = %job_id, route = %route, "Callback delivered");
        Ok(())
    }

    pub async fn notify_preview_ready(
        &self,
        job_id: &str,
        payload: &PreviewReadyPayload,
    ) -> NotifyResult<()> {
        self.notify(job_id, CallbackRoute::PreviewReady, payload).await
    }

    pub async fn notify_completion(
        &self,
        job_id: &str,
        payload: &CompletionPayload,
    ) -> NotifyResult<()> {
        self.notify(job_id, CallbackRoute::Completion, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-secret";

    fn notifier(server: &MockServer) -> CallbackNotifier {
        CallbackNotifier::new(CallbackConfig {
            base_url: format!("{}/", server.uri()),
            signing_secret: SECRET.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(CallbackRoute::PreviewReady.path(), "/preview_ready");
        assert_eq!(CallbackRoute::Completion.path(), "/callback");
    }

    #[tokio::test]
    async fn test_url_for_encodes_job_id() {
        let server = MockServer::start().await;
        let url = notifier(&server).url_for("a b", CallbackRoute::Completion);
        assert_eq!(url, format!("{}/api/jobs/a%20b/callback", server.uri()));
    }

    #[tokio::test]
    async fn test_signed_completion_callback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jobs/j1/callback"))
            .and(header_exists("x-worker-signature"))
            .and(header_exists("x-worker-timestamp"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let payload = CompletionPayload::failed("boom", "chat", "provider_error");
        notifier(&server).notify_completion("j1", &payload).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        let signature = request.headers.get("x-worker-signature").unwrap().to_str().unwrap();
        let timestamp: i64 = request
            .headers
            .get("x-worker-timestamp")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();

        let signer = CallbackSigner::new(SECRET).unwrap();
        assert!(signer.verify("j1", timestamp, &request.body, signature, 60).unwrap());

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error_message"], "boom");
    }

    #[tokio::test]
    async fn test_non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("already completed"))
            .mount(&server)
            .await;

        let err = notifier(&server)
            .notify("j1", CallbackRoute::PreviewReady, &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotifyError::Rejected { route: "preview_ready", status: 409, ref body } if body == "already completed"
        ));
    }
}
