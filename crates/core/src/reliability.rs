//! Error classification, circuit breaking, and retry-with-backoff, shared by the LLM
//! and search provider adapters (§4.4/§4.5).

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;

/// Classification of a provider failure, used to decide whether to retry and how loudly
/// to alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network issues, timeouts — should retry.
    Transient,
    /// API key issues — alert immediately, no retry.
    Authentication,
    /// Rate limits — back off, retry with delay.
    Quota,
    /// Bad query — don't retry.
    InvalidRequest,
    /// 5xx errors — retry with backoff.
    ServiceError,
    /// Parse errors — log for debugging, don't retry.
    InvalidResponse,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub should_retry: bool,
    pub alert_severity: AlertSeverity,
    pub suggested_action: &'static str,
    pub retry_delay_ms: Option<u64>,
}

/// Classify a failure from its type name and display string. Detection cues are
/// checked in a fixed precedence order; the first match wins.
pub fn classify_error(type_name: &str, message: &str) -> ClassifiedError {
    let error_str = message.to_lowercase();
    let error_name = type_name.to_lowercase();

    if error_str.contains("401")
        || error_str.contains("403")
        || error_str.contains("unauthorized")
    {
        return ClassifiedError {
            category: ErrorCategory::Authentication,
            should_retry: false,
            alert_severity: AlertSeverity::Critical,
            suggested_action: "Check API key configuration",
            retry_delay_ms: None,
        };
    }

    if error_str.contains("429")
        || error_str.contains("rate limit")
        || error_str.contains("too many requests")
    {
        return ClassifiedError {
            category: ErrorCategory::Quota,
            should_retry: true,
            alert_severity: AlertSeverity::Warning,
            suggested_action: "Implement backoff or upgrade API plan",
            retry_delay_ms: Some(5000),
        };
    }

    if ["500", "502", "503", "504"].iter().any(|c| error_str.contains(c))
        || error_str.contains("service unavailable")
        || error_str.contains("internal server error")
    {
        return ClassifiedError {
            category: ErrorCategory::ServiceError,
            should_retry: true,
            alert_severity: AlertSeverity::Warning,
            suggested_action: "Provider service issue, will auto-retry",
            retry_delay_ms: None,
        };
    }

    if error_name.contains("timeout") || error_str.contains("timeout") {
        return ClassifiedError {
            category: ErrorCategory::Transient,
            should_retry: true,
            alert_severity: AlertSeverity::Info,
            suggested_action: "Network timeout, will retry",
            retry_delay_ms: None,
        };
    }

    if error_name.contains("connection")
        || error_str.contains("connection")
        || error_str.contains("network")
    {
        return ClassifiedError {
            category: ErrorCategory::Transient,
            should_retry: true,
            alert_severity: AlertSeverity::Info,
            suggested_action: "Network issue, will retry",
            retry_delay_ms: None,
        };
    }

    if error_str.contains("400") || error_str.contains("bad request") || error_str.contains("invalid") {
        return ClassifiedError {
            category: ErrorCategory::InvalidRequest,
            should_retry: false,
            alert_severity: AlertSeverity::Warning,
            suggested_action: "Invalid request, check query format",
            retry_delay_ms: None,
        };
    }

    if error_str.contains("json") || error_str.contains("parse") || error_str.contains("decode") {
        return ClassifiedError {
            category: ErrorCategory::InvalidResponse,
            should_retry: false,
            alert_severity: AlertSeverity::Warning,
            suggested_action: "Failed to parse provider response",
            retry_delay_ms: None,
        };
    }

    ClassifiedError {
        category: ErrorCategory::Unknown,
        should_retry: false,
        alert_severity: AlertSeverity::Warning,
        suggested_action: "Investigate error details",
        retry_delay_ms: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct CircuitBreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
}

/// Circuit breaker guarding a single provider. `should_allow_request` transitions
/// `Open` to `HalfOpen` once `recovery_timeout` has elapsed since the last failure;
/// a single lock protects all state so the transition is atomic with the read.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    success_threshold: u32,
    inner: Mutex<CircuitBreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
            inner: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.success_threshold {
                reset_locked(&mut inner);
                tracing::info!("circuit breaker closed after successful recovery");
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure_at = Some(Instant::now());
        inner.success_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            tracing::warn!("circuit breaker reopened during recovery");
        } else if inner.failure_count >= self.failure_threshold {
            inner.state = CircuitState::Open;
            tracing::warn!(failures = inner.failure_count, "circuit breaker opened");
        }
    }

    pub fn should_allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.last_failure_at.map(|t| t.elapsed());
                if elapsed.map_or(false, |e| e > self.recovery_timeout) {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    tracing::info!("circuit breaker entering half-open state");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        reset_locked(&mut inner);
        tracing::info!("circuit breaker manually reset");
    }

    /// Numeric state for external health/metrics surfacing: 0 closed, 1 half-open, 2 open.
    pub fn state_value(&self) -> u8 {
        match self.state() {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

fn reset_locked(inner: &mut CircuitBreakerState) {
    inner.state = CircuitState::Closed;
    inner.failure_count = 0;
    inner.success_count = 0;
    inner.last_failure_at = None;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
    pub retryable_categories: HashSet<ErrorCategory>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_ms: 100,
            retryable_categories: HashSet::from([
                ErrorCategory::Transient,
                ErrorCategory::ServiceError,
                ErrorCategory::Quota,
            ]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    pub attempts: u32,
    pub total_delay_ms: u64,
    pub retry_reasons: Vec<ErrorCategory>,
    pub final_success: bool,
}

/// An operation failure carrying enough information to classify it, without forcing a
/// shared error type across callers.
pub trait RetryableError: std::fmt::Display {
    fn type_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum RetryOutcome<E> {
    #[error("circuit breaker open for {operation_name}")]
    CircuitOpen { operation_name: String },
    #[error(transparent)]
    Failed(E),
}

/// Run `operation` with retry-with-backoff, consulting `circuit_breaker` before each
/// attempt and after each failure. Jitter and the classifier's suggested delay (when
/// larger than the computed backoff) both apply, matching the reference retry loop.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    circuit_breaker: Option<&CircuitBreaker>,
    operation_name: &str,
) -> Result<(T, RetryStats), RetryOutcome<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    let mut stats = RetryStats::default();
    let mut last_error: Option<E> = None;

    for attempt in 0..=config.max_retries {
        if let Some(breaker) = circuit_breaker {
            if !breaker.should_allow_request() {
                return Err(RetryOutcome::CircuitOpen {
                    operation_name: operation_name.to_string(),
                });
            }
        }

        stats.attempts = attempt + 1;

        match operation().await {
            Ok(result) => {
                stats.final_success = true;
                if let Some(breaker) = circuit_breaker {
                    breaker.record_success();
                }
                if attempt > 0 {
                    tracing::info!(operation_name, retries = attempt, "succeeded after retries");
                }
                return Ok((result, stats));
            }
            Err(err) => {
                let classified = classify_error(err.type_name(), &err.to_string());
                stats.retry_reasons.push(classified.category);

                if attempt < config.max_retries {
                    tracing::warn!(operation_name, attempt = attempt + 1, error = %err, "attempt failed");
                } else {
                    tracing::error!(operation_name, attempt = attempt + 1, error = %err, "attempt failed");
                }

                let exhausted = attempt >= config.max_retries;
                let non_retryable = !config.retryable_categories.contains(&classified.category);

                last_error = Some(err);

                if exhausted {
                    tracing::error!(operation_name, attempts = config.max_retries + 1, "all retries exhausted");
                    break;
                }
                if non_retryable {
                    tracing::error!(operation_name, category = ?classified.category, "non-retryable error");
                    break;
                }

                if let Some(breaker) = circuit_breaker {
                    breaker.record_failure();
                }

                let base_delay = (config.base_delay_ms.saturating_mul(1u64 << attempt)).min(config.max_delay_ms);
                let jitter = if config.jitter_ms > 0 {
                    rand::thread_rng().gen_range(0..=config.jitter_ms)
                } else {
                    0
                };
                let mut delay_ms = base_delay + jitter;
                if let Some(suggested) = classified.retry_delay_ms {
                    delay_ms = delay_ms.max(suggested);
                }
                stats.total_delay_ms += delay_ms;

                tracing::info!(operation_name, delay_ms, next_attempt = attempt + 2, "retrying");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }

    if let Some(breaker) = circuit_breaker {
        breaker.record_failure();
    }
    Err(RetryOutcome::Failed(last_error.expect("loop always sets last_error before breaking")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl RetryableError for TestError {
        fn type_name(&self) -> &str {
            "TestError"
        }
    }

    #[test]
    fn classifies_auth_errors_as_non_retryable() {
        let classified = classify_error("HttpError", "401 Unauthorized");
        assert_eq!(classified.category, ErrorCategory::Authentication);
        assert!(!classified.should_retry);
    }

    #[test]
    fn classifies_rate_limit_with_suggested_delay() {
        let classified = classify_error("HttpError", "429 Too Many Requests");
        assert_eq!(classified.category, ErrorCategory::Quota);
        assert_eq!(classified.retry_delay_ms, Some(5000));
    }

    #[test]
    fn circuit_breaker_opens_after_threshold_and_half_opens_after_timeout() {
        let breaker = CircuitBreaker::new(2, Duration::from_millis(0), 1);
        assert!(breaker.should_allow_request());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.should_allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn retry_with_backoff_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter_ms: 0,
            ..RetryConfig::default()
        };

        let (result, stats) = retry_with_backoff(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError("connection reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
            &config,
            None,
            "test-op",
        )
        .await
        .expect("should eventually succeed");

        assert_eq!(result, 42);
        assert_eq!(stats.attempts, 3);
        assert!(stats.final_success);
    }

    #[tokio::test]
    async fn retry_with_backoff_stops_on_non_retryable_error() {
        let config = RetryConfig::default();
        let result: Result<((), RetryStats), _> = retry_with_backoff(
            || async { Err(TestError("400 bad request".into())) },
            &config,
            None,
            "test-op",
        )
        .await;

        assert!(result.is_err());
    }
}
