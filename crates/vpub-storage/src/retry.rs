//! Retry with exponential backoff and optional jitter.
//!
//! The same arithmetic drives two scheduling forms:
//! - [`retry_blocking`] parks the calling thread between attempts
//! - [`retry_async`] suspends only the calling task
//!
//! Which form to use is the caller's choice. Attempt counting is local to
//! each call; nothing is shared between invocations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use metrics::counter;
use rand::Rng;
use tracing::warn;

/// Metric name for retried attempts.
pub const RETRIES_TOTAL: &str = "vpub_transfer_retries_total";

/// Classifies errors that are worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Factor applied to the delay after every failed attempt.
    pub backoff_multiplier: f64,
    /// Extra random delay as a fraction of the nominal delay. `0.0` disables jitter.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Default::default()
        }
    }

    /// Per-file upload policy: 3 attempts, 1s initial delay, doubling, no jitter.
    pub fn upload_default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter_fraction: 0.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    pub fn without_jitter(self) -> Self {
        self.with_jitter(0.0)
    }

    /// Effective number of attempts.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Nominal delay sequence, starting at `initial_delay`.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            multiplier: self.backoff_multiplier,
        }
    }

    /// Add `uniform(0, delay * jitter_fraction)` to a nominal delay.
    pub fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_fraction <= 0.0 || delay.is_zero() {
            return delay;
        }
        let max_extra = delay.as_secs_f64() * self.jitter_fraction;
        let extra = rand::rng().random_range(0.0..=max_extra);
        delay.saturating_add(Duration::try_from_secs_f64(extra).unwrap_or_default())
    }
}

/// Iterator over nominal backoff delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    multiplier: f64,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(Duration::MAX);
        Some(current)
    }
}

/// Run a fallible operation, parking the thread between attempts.
pub fn retry_blocking<T, E, F>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Retryable + Display,
{
    retry_blocking_with(policy, operation, op, std::thread::sleep)
}

/// Run a fallible async operation, suspending the task between attempts.
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::upload_default();
/// retry_async(&policy, "put_object", || store.put_file(&path, &key, content_type)).await?;
/// ```
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    retry_async_with(policy, operation, op, tokio::time::sleep).await
}

/// Blocking retry loop with an injectable sleep primitive.
pub fn retry_blocking_with<T, E, F, S>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
    mut sleep: S,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Retryable + Display,
    S: FnMut(Duration),
{
    let attempts = policy.attempts();
    let mut backoff = policy.backoff();
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                let delay = next_delay(policy, &mut backoff);
                log_retry(operation, attempt, attempts, delay, &e);
                sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Async retry loop with an injectable sleep primitive.
pub async fn retry_async_with<T, E, F, Fut, S, SFut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
    mut sleep: S,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let attempts = policy.attempts();
    let mut backoff = policy.backoff();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                let delay = next_delay(policy, &mut backoff);
                log_retry(operation, attempt, attempts, delay, &e);
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn next_delay(policy: &RetryPolicy, backoff: &mut Backoff) -> Duration {
    let nominal = backoff.next().unwrap_or(policy.initial_delay);
    policy.jittered(nominal)
}

fn log_retry(operation: &str, attempt: u32, attempts: u32, delay: Duration, error: &impl Display) {
    warn!(
        operation = %operation,
        attempt,
        max_attempts = attempts,
        delay_ms = delay.as_millis() as u64,
        "Operation failed, retrying: {}",
        error
    );
    counter!(RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, PartialEq)]
    struct TestError {
        attempt: u32,
        retryable: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failure #{}", self.attempt)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(4, Duration::from_millis(100)).without_jitter()
    }

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<_> = policy().backoff().take(4).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_backoff_custom_multiplier() {
        let delays: Vec<_> = RetryPolicy::new(3, Duration::from_secs(1))
            .with_multiplier(3.0)
            .backoff()
            .take(3)
            .collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(9)]
        );
    }

    #[test]
    fn test_upload_default_policy() {
        let policy = RetryPolicy::upload_default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert_eq!(policy.jitter_fraction, 0.0);
    }

    #[test]
    fn test_jitter_stays_within_fraction() {
        let policy = policy().with_jitter(0.5);
        for _ in 0..100 {
            let delay = policy.jittered(Duration::from_millis(200));
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(300));
        }
    }

    #[test]
    fn test_saturated_backoff_with_jitter_stays_at_max() {
        let policy = RetryPolicy::default().with_jitter(0.5);
        let saturated = policy.backoff().nth(2000).unwrap();
        assert_eq!(saturated, Duration::MAX);
        assert_eq!(policy.jittered(saturated), Duration::MAX);
    }

    #[test]
    fn test_blocking_permanent_failure_counts() {
        let calls = Cell::new(0u32);
        let sleeps = RefCell::new(Vec::new());

        let result: Result<(), TestError> = retry_blocking_with(
            &policy(),
            "test",
            || {
                calls.set(calls.get() + 1);
                Err(TestError {
                    attempt: calls.get(),
                    retryable: true,
                })
            },
            |d| sleeps.borrow_mut().push(d),
        );

        assert_eq!(calls.get(), 4);
        assert_eq!(sleeps.borrow().len(), 3);
        // The last error comes back untouched.
        assert_eq!(
            result.unwrap_err(),
            TestError {
                attempt: 4,
                retryable: true
            }
        );
    }

    #[test]
    fn test_kth_sleep_is_at_least_nominal_with_jitter() {
        let policy = policy().with_jitter(0.25);
        let sleeps = RefCell::new(Vec::new());

        let _: Result<(), TestError> = retry_blocking_with(
            &policy,
            "test",
            || {
                Err(TestError {
                    attempt: 0,
                    retryable: true,
                })
            },
            |d| sleeps.borrow_mut().push(d),
        );

        for (k, delay) in sleeps.borrow().iter().enumerate() {
            let nominal = Duration::from_millis(100) * 2u32.pow(k as u32);
            assert!(*delay >= nominal, "sleep {k} was {delay:?}, expected >= {nominal:?}");
        }
    }

    #[test]
    fn test_non_retryable_error_is_not_retried() {
        let calls = Cell::new(0u32);
        let sleeps = Cell::new(0u32);

        let result: Result<(), TestError> = retry_blocking_with(
            &policy(),
            "test",
            || {
                calls.set(calls.get() + 1);
                Err(TestError {
                    attempt: 1,
                    retryable: false,
                })
            },
            |_| sleeps.set(sleeps.get() + 1),
        );

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert_eq!(sleeps.get(), 0);
    }

    #[test]
    fn test_success_is_never_retried() {
        let calls = Cell::new(0u32);

        let result: Result<u32, TestError> = retry_blocking_with(
            &policy(),
            "test",
            || {
                calls.set(calls.get() + 1);
                Ok(7)
            },
            |_| panic!("must not sleep after success"),
        );

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(0, Duration::from_millis(1));

        let _: Result<(), TestError> = retry_blocking_with(
            &policy,
            "test",
            || {
                calls.set(calls.get() + 1);
                Err(TestError {
                    attempt: 1,
                    retryable: true,
                })
            },
            |_| {},
        );

        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_blocking_and_async_forms_agree() {
        let blocking_calls = Cell::new(0u32);
        let blocking_sleeps = RefCell::new(Vec::new());
        let _: Result<(), TestError> = retry_blocking_with(
            &policy(),
            "blocking",
            || {
                blocking_calls.set(blocking_calls.get() + 1);
                Err(TestError {
                    attempt: blocking_calls.get(),
                    retryable: true,
                })
            },
            |d| blocking_sleeps.borrow_mut().push(d),
        );

        let async_calls = Cell::new(0u32);
        let async_sleeps = RefCell::new(Vec::new());
        let _: Result<(), TestError> = retry_async_with(
            &policy(),
            "async",
            || {
                async_calls.set(async_calls.get() + 1);
                let attempt = async_calls.get();
                async move {
                    Err(TestError {
                        attempt,
                        retryable: true,
                    })
                }
            },
            |d| {
                async_sleeps.borrow_mut().push(d);
                async {}
            },
        )
        .await;

        assert_eq!(blocking_calls.get(), async_calls.get());
        assert_eq!(*blocking_sleeps.borrow(), *async_sleeps.borrow());
        assert_eq!(
            *async_sleeps.borrow(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_async_eventual_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1)).without_jitter();
        let calls = std::sync::atomic::AtomicU32::new(0);

        let result = retry_async(&policy, "test", || {
            let count = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(TestError {
                        attempt: count + 1,
                        retryable: true,
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_blocking_real_sleep() {
        let policy = RetryPolicy::new(2, Duration::from_millis(5)).without_jitter();
        let calls = Cell::new(0u32);
        let started = std::time::Instant::now();

        let result: Result<(), TestError> = retry_blocking(&policy, "test", || {
            calls.set(calls.get() + 1);
            Err(TestError {
                attempt: calls.get(),
                retryable: true,
            })
        });

        assert_eq!(result.unwrap_err().attempt, 2);
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
