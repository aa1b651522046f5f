//! Cooperative cancellation.
//!
//! A single, clonable, set-only flag shared by all client tasks of a phase.
//! Every suspension point in the executor and the join-point barrier checks
//! it; once set it is never unset.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Idempotent; never clears it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, returning early if the token is cancelled
    /// while waiting. The `bool` is `true` if the sleep ran to completion.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
            _ = self.cancelled() => false,
        }
    }

    /// Resolves once the token is cancelled; polls on a short interval
    /// since the flag has no waker of its own.
    fn cancelled(&self) -> impl Future<Output = ()> + '_ {
        async move {
            while !self.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    }
}
