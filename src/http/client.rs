use crate::errors::FetchError;
use crate::observability::provider_metrics;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Raw response of a successful provider call
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub link: Option<String>,
    pub body: String,
}

/// reqwest client shared by the provider adapters, throttled by a single governor quota
#[derive(Debug, Clone)]
pub struct RateLimitedHttpClient {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl RateLimitedHttpClient {
    pub fn new(requests_per_second: u32, burst: u32) -> Result<Self, FetchError> {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));

        let client = reqwest::Client::builder()
            .user_agent("dora-metrics")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| FetchError::Transport {
                provider: "http",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Limiter handle for adapters that bring their own HTTP stack (octocrab).
    pub fn rate_limiter(&self) -> Arc<DefaultDirectRateLimiter> {
        Arc::clone(&self.rate_limiter)
    }

    /// GET `url`, mapping any non-2xx status into [`FetchError::Status`].
    pub async fn get(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(String, String)],
        bearer: Option<&str>,
    ) -> Result<HttpResponse, FetchError> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        provider_metrics().record_request();
        debug!(provider, url, "Executing provider request");

        let mut request = self.client.get(url).query(query);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            provider_metrics().record_error();
            FetchError::Transport {
                provider,
                message: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| FetchError::Transport {
            provider,
            message: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            provider_metrics().record_error();
            return Err(FetchError::status(provider, status, error_message(&body)));
        }

        Ok(HttpResponse { status, link, body })
    }
}

/// Prefer the provider's `message` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
