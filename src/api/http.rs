use rand::Rng;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Default retry schedule: 3 retries with exponential backoff from 1s, plus jitter.
const RETRY_BASE_DELAY_SECS: u64 = 1;
const MAX_RETRIES: usize = 3;
const RETRY_JITTER_DIVISOR: u128 = 4; // + up to 25% jitter

/// Transport-level retry policy for a gateway.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_secs(RETRY_BASE_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Send every request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn base_delay_for(&self, attempt: usize) -> Duration {
        let multiplier = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }
}

fn is_retriable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// POST and PATCH may have taken effect before the server failed.
fn is_idempotent(method: &Method) -> bool {
    !matches!(*method, Method::POST | Method::PATCH)
}

fn is_retriable_send_error(method: &Method, err: &reqwest::Error) -> bool {
    err.is_connect() || (err.is_timeout() && is_idempotent(method))
}

fn add_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = delay.as_millis() / RETRY_JITTER_DIVISOR;
    if max_jitter_ms == 0 {
        return delay;
    }

    let max_jitter_ms = std::cmp::min(max_jitter_ms, u128::from(u64::MAX)) as u64;
    let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter_ms);
    delay + Duration::from_millis(jitter_ms)
}

/// Send a request, retrying transient failures per `policy`.
///
/// Non-retriable statuses (including 401) are handed back to the caller
/// untouched; the refresh decorator sits above this layer. Non-idempotent
/// methods are only retried when the connection was never established.
pub(super) async fn send_with_retry(
    policy: RetryPolicy,
    method: &Method,
    mut make_request: impl FnMut() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, reqwest::Error> {
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success()
                    || !is_retriable_status(status)
                    || !is_idempotent(method)
                    || attempt >= policy.max_retries
                {
                    return Ok(response);
                }

                let base_delay = policy.base_delay_for(attempt);
                let delay = add_jitter(base_delay);
                debug!(
                    "HTTP request failed with status {}; retrying in {:?} (base {:?}, attempt {}/{})",
                    status,
                    delay,
                    base_delay,
                    attempt + 1,
                    max_attempts
                );
                let _ = response.bytes().await;
                sleep(delay).await;
            }
            Err(err) => {
                if !is_retriable_send_error(method, &err) || attempt >= policy.max_retries {
                    debug!("HTTP request failed after {} attempt(s): {}", attempt + 1, err);
                    return Err(err);
                }

                let base_delay = policy.base_delay_for(attempt);
                let delay = add_jitter(base_delay);
                debug!(
                    "HTTP request error: {}; retrying in {:?} (base {:?}, attempt {}/{})",
                    err,
                    delay,
                    base_delay,
                    attempt + 1,
                    max_attempts
                );
                sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.base_delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.base_delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let base = Duration::from_secs(4);
        for _ in 0..100 {
            let delay = add_jitter(base);
            assert!(delay >= base);
            assert!(delay <= base + Duration::from_secs(1));
        }
    }

    #[test]
    fn test_unauthorized_is_not_retried() {
        assert!(!is_retriable_status(StatusCode::UNAUTHORIZED));
        assert!(is_retriable_status(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_post_is_not_idempotent() {
        assert!(!is_idempotent(&Method::POST));
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(is_idempotent(&Method::DELETE));
    }
}
