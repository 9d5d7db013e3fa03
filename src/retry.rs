//! Bounded retry with a fixed pause between attempts.
//!
//! Structure extraction, media resolution, and per-lesson download
//! attempts all share the same retry shape: try up to N times, sleep a
//! fixed delay between failures, and hand back the last error once the
//! budget is spent.

use std::future::Future;
use std::time::Duration;

/// How often and how patiently an operation is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    /// Total number of attempts, including the first.
    pub attempts: u32,

    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetrySchedule {
    /// Creates a schedule with the given attempt budget and pause.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Runs `op` until it succeeds or the schedule's attempts run out.
///
/// Sleeps `schedule.delay` between failed attempts. Returns the last
/// error when the budget is exhausted. A schedule with zero attempts is
/// treated as one attempt.
pub async fn with_retry<T, E, F, Fut>(schedule: RetrySchedule, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_while(schedule, op, |_| true).await
}

/// Like [`with_retry`], but gives up immediately on errors
/// `should_retry` rejects. A lost browser session must not burn the
/// remaining attempt budget.
pub async fn with_retry_while<T, E, F, Fut, R>(
    schedule: RetrySchedule,
    mut op: F,
    mut should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= schedule.attempts || !should_retry(&err) => return Err(err),
            Err(_) => {
                attempt += 1;
                tokio::time::sleep(schedule.delay).await;
            }
        }
    }
}
