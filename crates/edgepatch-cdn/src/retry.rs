//! Retry policy shared by the purge, storage and page-fetch clients.
//!
//! A request is sent again when the transport fails or the server answers
//! with a transient status (408, 429, 502, 503, 504). Every other response,
//! error statuses included, goes straight back to the caller. Once retries
//! run out the last response or error is returned unchanged, so callers
//! interpret statuses in one place.
//!
//! Only idempotent requests go through here: purges, whole-object `PUT`s
//! and `GET`s.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

/// Backoff schedule for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first request.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries at 200ms, 400ms and 800ms.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Send once and never retry.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Delay before retry number `retry`, counting from zero.
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay)
    }

    /// Send the request built by `f`, retrying per this policy. `target`
    /// names the endpoint in logs.
    pub async fn send<F, Fut>(
        &self,
        target: &str,
        f: F,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut retry = 0;
        loop {
            let outcome = f().await;
            let cause = match &outcome {
                Ok(resp) if is_transient(resp.status()) => format!("status {}", resp.status()),
                Ok(_) => return outcome,
                Err(e) if e.is_builder() => return outcome,
                Err(e) => e.to_string(),
            };
            if retry >= self.max_retries {
                return outcome;
            }
            let delay = self.delay(retry);
            retry += 1;
            tracing::warn!(
                target_url = target,
                retry,
                max_retries = self.max_retries,
                "request failed ({cause}), retrying in {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Statuses worth another attempt.
pub fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FAST: RetryPolicy = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };

    #[test]
    fn delays_double_up_to_the_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..6).map(|r| policy.delay(r).as_millis()).collect();
        assert_eq!(delays, [200, 400, 800, 1600, 2000, 2000]);
        assert_eq!(RetryPolicy::NONE.delay(4), Duration::ZERO);
        assert_eq!(policy.delay(u32::MAX), policy.max_delay);
    }

    #[tokio::test]
    async fn closed_port_exhausts_every_attempt() {
        let calls = AtomicU32::new(0);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result = FAST
            .send("http://127.0.0.1:1/purge", || {
                calls.fetch_add(1, Ordering::SeqCst);
                client.post("http://127.0.0.1:1/purge").send()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), FAST.max_retries + 1);
    }

    #[tokio::test]
    async fn transient_status_is_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = server.uri();
        let resp = FAST.send(&url, || client.get(&url).send()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn last_transient_response_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = server.uri();
        let resp = FAST.send(&url, || client.get(&url).send()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn permanent_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = server.uri();
        let resp = FAST.send(&url, || client.get(&url).send()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
