//! Delayed, cancellable unit of work.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// A job that runs once after a delay unless cancelled first.
///
/// Firing and cancelling race through a single atomic flag: whichever
/// transition leaves the pending state first wins. Cancelling after the job
/// has fired does nothing, and the job itself is never interrupted.
///
/// Dropping the handle does not cancel the job.
#[derive(Debug)]
pub struct DebouncedTask {
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
    delay: Duration,
}

impl DebouncedTask {
    /// Spawn `job` onto the current tokio runtime, to run after `delay`.
    ///
    /// # Panics
    ///
    /// When called outside a tokio runtime.
    pub fn schedule<F, Fut>(delay: Duration, job: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let flag = Arc::clone(&state);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if flag
                .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            job().await;
        });

        Self {
            state,
            handle,
            delay,
        }
    }

    /// Cancel the job if it has not fired yet.
    ///
    /// Returns true when this call prevented the job from running.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            // Only the sleep is left to interrupt.
            self.handle.abort();
        }
        cancelled
    }

    /// Still waiting for the delay to elapse.
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    /// The delay elapsed and the job started.
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// The job ran to completion or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
