use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::constants::ai;

/// Closed set of provider fault categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Provider asked us to slow down; retried with backoff
    RateLimited,
    /// Anything else; propagated immediately
    Fatal,
}

/// Error from a model API call
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        /// Structured error code from the response body, when present
        code: Option<String>,
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("API request failed: {0}")]
    Transport(String),
    #[error("Malformed provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Structured codes some providers send alongside a 429
const RATE_LIMIT_CODES: &[&str] = &["rate_limit_exceeded", "rate_limit_error"];

/// Message fragments that indicate rate limiting when no status is available
const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "max rpm"];

/// Classify a provider fault.
///
/// Detection order: HTTP 429, a structured rate-limit error code, then
/// case-insensitive message sniffing for known rate-limit phrasing. The last
/// step is a heuristic and may misfire on providers with unusual wording.
pub fn classify_fault(err: &ProviderError) -> FaultClass {
    if err.status().is_some_and(is_retryable_status) {
        return FaultClass::RateLimited;
    }

    if let ProviderError::Http {
        code: Some(code), ..
    } = err
    {
        if RATE_LIMIT_CODES.contains(&code.as_str()) {
            return FaultClass::RateLimited;
        }
    }

    let text = err.to_string().to_ascii_lowercase();
    if RATE_LIMIT_PHRASES.iter().any(|p| text.contains(p)) {
        return FaultClass::RateLimited;
    }

    FaultClass::Fatal
}

/// Whether an HTTP status is retry-eligible
pub fn is_retryable_status(status: u16) -> bool {
    status == 429
}

/// Errors that know whether they may be retried
pub trait IsRetryable {
    fn fault_class(&self) -> FaultClass;

    fn is_retryable(&self) -> bool {
        self.fault_class() == FaultClass::RateLimited
    }

    /// Server-suggested delay, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl IsRetryable for ProviderError {
    fn fault_class(&self) -> FaultClass {
        classify_fault(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Retry budget and delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first call
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: ai::RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(ai::RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryConfig {
    /// Delay after the given zero-based failed attempt: `base * 2^attempt`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out. The last error is returned in the latter cases.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
    E: IsRetryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let remaining = attempt + 1 < config.max_attempts;
                if !err.is_retryable() || !remaining {
                    return Err(err);
                }

                let delay = err
                    .retry_after()
                    .map_or(config.delay_for_attempt(attempt), |hint| {
                        hint.max(config.delay_for_attempt(attempt))
                    });
                warn!(
                    attempt = attempt + 1,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn http(status: u16, message: &str) -> ProviderError {
        ProviderError::Http {
            status,
            code: None,
            message: message.to_string(),
            retry_after: None,
        }
    }

    fn instant() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_classify_status_429() {
        assert_eq!(classify_fault(&http(429, "slow down")), FaultClass::RateLimited);
    }

    #[test]
    fn test_classify_message_phrases() {
        assert_eq!(
            classify_fault(&ProviderError::Transport("Rate Limit reached".into())),
            FaultClass::RateLimited
        );
        assert_eq!(
            classify_fault(&http(400, "Max RPM exceeded for org")),
            FaultClass::RateLimited
        );
    }

    #[test]
    fn test_classify_structured_code() {
        let err = ProviderError::Http {
            status: 400,
            code: Some("rate_limit_exceeded".into()),
            message: "try later".into(),
            retry_after: None,
        };
        assert_eq!(classify_fault(&err), FaultClass::RateLimited);
    }

    #[test]
    fn test_classify_other_failures_fatal() {
        assert_eq!(classify_fault(&http(500, "internal")), FaultClass::Fatal);
        assert_eq!(classify_fault(&http(401, "bad key")), FaultClass::Fatal);
        assert_eq!(
            classify_fault(&ProviderError::Transport("connection reset".into())),
            FaultClass::Fatal
        );
    }

    #[test]
    fn test_delay_doubles_from_base() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_with_retry_recovers_after_rate_limit() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, ProviderError> = with_retry(&instant(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(http(429, "rate limit"))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_fatal_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ProviderError> = with_retry(&instant(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(http(500, "boom"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ProviderError> = with_retry(&instant(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(http(429, "rate limit"))
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
