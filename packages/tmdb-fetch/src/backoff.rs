//! Rate-limit backoff gate.
//!
//! Every request passes the gate before it is sent. When a response carries
//! the rate-limit signal the gate is tripped, and all requests (of every
//! category) wait until the pause has elapsed. The wait is a timer raced
//! against the pipeline's cancellation token, so other tasks keep running.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, Result};

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Waiting { until: Instant },
}

/// Holds pipeline progress for a fixed delay after a rate-limit signal.
#[derive(Debug)]
pub struct BackoffGate {
    delay: Duration,
    resume_at: Mutex<Option<Instant>>,
    cancel: CancellationToken,
}

impl BackoffGate {
    pub fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self {
            delay,
            resume_at: Mutex::new(None),
            cancel,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn state(&self) -> GateState {
        match *self.resume_at.lock().await {
            Some(until) if until > Instant::now() => GateState::Waiting { until },
            _ => GateState::Idle,
        }
    }

    /// Start (or restart) the pause.
    pub async fn trip(&self) -> Instant {
        let until = Instant::now() + self.delay;
        let mut resume_at = self.resume_at.lock().await;
        *resume_at = Some(match *resume_at {
            Some(existing) if existing > until => existing,
            _ => until,
        });
        until
    }

    /// Wait until the gate is open.
    ///
    /// Returns immediately when idle and `Err(Cancelled)` as soon as the
    /// token fires, including during a pause.
    pub async fn pass(&self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let until = match *self.resume_at.lock().await {
                Some(until) if until > Instant::now() => until,
                _ => return Ok(()),
            };

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep_until(until) => {}
            }
            // The pause may have been extended while we slept; check again.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_gate_passes_immediately() {
        let gate = BackoffGate::new(Duration::from_secs(10), CancellationToken::new());
        let start = Instant::now();
        gate.pass().await.unwrap();
        assert_eq!(Instant::now(), start);
        assert_eq!(gate.state().await, GateState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tripped_gate_waits_full_delay() {
        let gate = BackoffGate::new(Duration::from_secs(10), CancellationToken::new());
        let start = Instant::now();
        gate.trip().await;
        assert!(matches!(gate.state().await, GateState::Waiting { .. }));

        gate.pass().await.unwrap();

        assert!(Instant::now() - start >= Duration::from_secs(10));
        assert_eq!(gate.state().await, GateState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_pending_until_delay_elapses() {
        let gate = BackoffGate::new(Duration::from_secs(10), CancellationToken::new());
        gate.trip().await;

        let mut pass = tokio_test::task::spawn(gate.pass());
        tokio_test::assert_pending!(pass.poll());

        tokio::time::advance(Duration::from_secs(9)).await;
        tokio_test::assert_pending!(pass.poll());

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio_test::assert_ready_ok!(pass.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait() {
        let cancel = CancellationToken::new();
        let gate = BackoffGate::new(Duration::from_secs(3600), cancel.clone());
        gate.trip().await;

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let result = gate.pass().await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(Instant::now() - start < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_gate_rejects_even_when_idle() {
        let cancel = CancellationToken::new();
        let gate = BackoffGate::new(Duration::from_secs(10), cancel.clone());
        cancel.cancel();
        assert!(matches!(gate.pass().await, Err(FetchError::Cancelled)));
    }
}
