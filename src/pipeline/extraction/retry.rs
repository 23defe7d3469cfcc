use std::time::Duration;

use crate::pipeline::PipelineError;

/// Bounded exponential backoff around one fallible provider call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_factor,
        }
    }

    /// Extraction request: 3 attempts, 1s then 2s.
    pub fn extraction() -> Self {
        Self::new(3, Duration::from_secs(1), 2.0)
    }

    /// Repair request: 2 attempts, 1s.
    pub fn repair() -> Self {
        Self::new(2, Duration::from_secs(1), 2.0)
    }

    /// Same attempt ceiling with no waiting. Used by tests and offline clients.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, 1.0)
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_delay
            .mul_f64(self.backoff_factor.max(0.0).powi(exponent))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt ceiling is reached. Attempt state is local to this call.
pub fn retry_with_backoff<T, F>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Result<T, PipelineError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "LLM call failed, retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
            Err(e) => return Err(e),
        }
    }
}
