//! Bounded exponential-backoff polling.
//!
//! [`poll_until_ready`] keeps calling a probe until it succeeds or the
//! overall deadline passes. Used to wait for the database after the
//! containers start, instead of sleeping for a fixed interval.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Delay after the first failed probe.
    pub initial_delay: Duration,
    /// Upper bound on the delay between probes.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Give up once this much time has passed since the first probe.
    pub timeout: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ReadinessConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Probe never succeeded within [`ReadinessConfig::timeout`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{target} not ready after {attempts} attempts in {elapsed_ms}ms: {last_error}")]
pub struct NotReady {
    pub target: String,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub last_error: String,
}

/// Calculate the next backoff delay, clamped to [`ReadinessConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReadinessConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Call `probe` until it returns `Ok`, sleeping with exponential backoff
/// between attempts. Returns the number of attempts made.
///
/// The final sleep is shortened so the call never overshoots the
/// deadline by more than one probe.
pub async fn poll_until_ready<F, Fut, E>(
    target: &str,
    config: &ReadinessConfig,
    mut probe: F,
) -> Result<u32, NotReady>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let start = Instant::now();
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let last_error = match probe().await {
            Ok(()) => {
                tracing::info!(target_name = target, attempt, "Ready");
                return Ok(attempt);
            }
            Err(e) => e.to_string(),
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(NotReady {
                target: target.to_string(),
                attempts: attempt,
                elapsed_ms: elapsed.as_millis() as u64,
                last_error,
            });
        }

        tracing::debug!(
            target_name = target,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %last_error,
            "Not ready yet",
        );

        tokio::time::sleep(delay.min(config.timeout - elapsed)).await;
        delay = next_delay(delay, config);
    }
}
