//! Bounded condition polling.
//!
//! This module provides a general-purpose poll loop for any async condition
//! check against an external system. The loop runs the check at a fixed
//! interval until the condition is satisfied or the timeout elapses, and
//! reports which of the two happened rather than treating a timeout as a
//! hard failure.
//!
//! # Example
//!
//! ```ignore
//! use stackup_core::poll::{poll_until, PollConfig, PollStatus};
//!
//! let outcome = poll_until(&PollConfig::default(), "namespace_active", || async {
//!     let phase = kubectl_get_phase().await?;
//!     Ok(if phase == "Active" { PollStatus::Satisfied } else { PollStatus::Pending })
//! })
//! .await?;
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for a bounded poll loop.
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Delay between condition checks
    pub interval: Duration,
    /// Total time budget for the condition to become satisfied
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollConfig {
    /// Create a config with the given timeout and the default interval.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Result of a single condition check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStatus {
    /// The condition holds; stop polling.
    Satisfied,
    /// The condition does not hold yet; keep polling.
    Pending,
}

/// Terminal outcome of a poll loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition became satisfied within the time budget.
    Satisfied {
        /// How long the condition took to become satisfied
        waited: Duration,
    },
    /// The time budget elapsed without the condition becoming satisfied.
    TimedOut {
        /// How long was waited in total
        waited: Duration,
    },
}

impl PollOutcome {
    /// Whether the condition was satisfied.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }
}

/// Poll an async condition until satisfied or the timeout elapses.
///
/// The check runs at least once, even with a zero timeout. Errors returned
/// by the check abort the loop immediately; a check that merely cannot
/// observe the condition yet should return `PollStatus::Pending` instead.
///
/// # Arguments
/// * `config` - Interval and timeout for the loop
/// * `operation_name` - Name for logging purposes
/// * `check` - The async condition check
pub async fn poll_until<F, Fut, E>(
    config: &PollConfig,
    operation_name: &str,
    mut check: F,
) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<PollStatus, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();

    loop {
        match check().await? {
            PollStatus::Satisfied => {
                let waited = start.elapsed();
                debug!(
                    operation = %operation_name,
                    waited_ms = waited.as_millis(),
                    "condition satisfied"
                );
                return Ok(PollOutcome::Satisfied { waited });
            }
            PollStatus::Pending => {}
        }

        if start.elapsed() >= config.timeout {
            let waited = start.elapsed();
            warn!(
                operation = %operation_name,
                waited_ms = waited.as_millis(),
                "condition not satisfied before timeout"
            );
            return Ok(PollOutcome::TimedOut { waited });
        }

        debug!(operation = %operation_name, "condition pending, waiting");
        tokio::time::sleep(config.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_satisfied_immediately() {
        let outcome: Result<PollOutcome, &str> =
            poll_until(&fast_config(), "op", || async { Ok(PollStatus::Satisfied) }).await;
        assert!(outcome.unwrap().is_satisfied());
    }

    #[tokio::test]
    async fn test_satisfied_after_pending() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let outcome: Result<PollOutcome, &str> = poll_until(&fast_config(), "op", || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(PollStatus::Pending)
                } else {
                    Ok(PollStatus::Satisfied)
                }
            }
        })
        .await;

        assert!(outcome.unwrap().is_satisfied());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out() {
        let outcome: Result<PollOutcome, &str> =
            poll_until(&fast_config(), "op", || async { Ok(PollStatus::Pending) }).await;

        match outcome.unwrap() {
            PollOutcome::TimedOut { waited } => {
                assert!(waited >= Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_error_aborts() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let outcome: Result<PollOutcome, &str> = poll_until(&fast_config(), "op", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("probe failed")
            }
        })
        .await;

        assert_eq!(outcome, Err("probe failed"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_still_checks_once() {
        let config = PollConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::ZERO,
        };

        let outcome: Result<PollOutcome, &str> =
            poll_until(&config, "op", || async { Ok(PollStatus::Satisfied) }).await;
        assert!(outcome.unwrap().is_satisfied());
    }
}
