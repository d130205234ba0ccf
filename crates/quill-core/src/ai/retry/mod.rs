//! Rate limiting and retry logic
//!
//! Provides exponential backoff for handling API rate limits.
//!
//! Only faults classified as `FaultClass::RateLimited` are retried; every other
//! provider failure is fatal and propagates on the first occurrence.

mod backoff;

pub use backoff::{
    classify_fault, is_retryable_status, with_retry, FaultClass, IsRetryable, ProviderError,
    RetryConfig,
};
