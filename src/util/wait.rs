//! Cancellable timed waits
//!
//! [`TimedWait`] pairs an absolute deadline with a [`CancellationToken`] so
//! polling loops compose with the caller's overall timeout instead of each
//! loop keeping its own ad hoc timer.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The interval elapsed and the deadline has not been reached
    Ready,
    /// The deadline was reached
    Expired,
    /// The token was cancelled
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TimedWait {
    deadline: Instant,
    cancel: CancellationToken,
}

impl TimedWait {
    pub fn new(max_wait: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + max_wait,
            cancel,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Suspends for `interval`, never past the deadline
    pub async fn pause(&self, interval: Duration) -> WaitOutcome {
        if self.cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        let now = Instant::now();
        if now >= self.deadline {
            return WaitOutcome::Expired;
        }

        let wake = (now + interval).min(self.deadline);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => WaitOutcome::Cancelled,
            _ = tokio::time::sleep_until(wake) => {
                if wake >= self.deadline {
                    WaitOutcome::Expired
                } else {
                    WaitOutcome::Ready
                }
            }
        }
    }

    /// Runs `fut` unless the deadline passes or the token fires first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, WaitOutcome> {
        if self.cancel.is_cancelled() {
            return Err(WaitOutcome::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WaitOutcome::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(WaitOutcome::Expired),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pause_ready_before_deadline() {
        let wait = TimedWait::new(Duration::from_secs(5), CancellationToken::new());
        assert_eq!(wait.pause(Duration::from_millis(1)).await, WaitOutcome::Ready);
    }

    #[tokio::test]
    async fn test_pause_clamped_to_deadline() {
        let wait = TimedWait::new(Duration::from_millis(10), CancellationToken::new());
        let started = Instant::now();
        assert_eq!(wait.pause(Duration::from_secs(60)).await, WaitOutcome::Expired);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(wait.is_expired());
    }

    #[tokio::test]
    async fn test_pause_cancelled() {
        let token = CancellationToken::new();
        let wait = TimedWait::new(Duration::from_secs(60), token.clone());
        token.cancel();
        assert_eq!(wait.pause(Duration::from_secs(30)).await, WaitOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_run_completes() {
        let wait = TimedWait::new(Duration::from_secs(5), CancellationToken::new());
        assert_eq!(wait.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let wait = TimedWait::new(Duration::from_millis(5), CancellationToken::new());
        let result = wait.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(WaitOutcome::Expired));
    }
}
