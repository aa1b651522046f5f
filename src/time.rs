//! Clock abstraction.
//!
//! The scheduler and executor need two different notions of time: a
//! monotonic clock for measuring durations (service time, latency,
//! elapsed-since-task-start) and a wall-clock for the epoch timestamps
//! carried on every [`crate::sampler::Sample`]. Splitting them into a
//! trait lets schedule/executor tests run against a fake clock instead of
//! sleeping in real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Opaque monotonic instant, only meaningful relative to another call
    /// to [`Clock::now`] on the same clock.
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch, used for `Sample::absolute_time`.
    fn epoch_seconds(&self) -> f64;
}

/// The real system clock, backed by [`std::time::Instant`] /
/// [`std::time::SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs_f64()
    }
}

/// A manually-advanced clock for deterministic tests.
///
/// `now()` returns a fixed base `Instant` offset by however many
/// nanoseconds have been added with [`SimClock::advance`]; `epoch_seconds`
/// tracks a separately-seeded wall-clock offset so tests can assert exact
/// `absolute_time` values.
pub struct SimClock {
    base: Instant,
    elapsed_nanos: AtomicU64,
    epoch_base: f64,
}

impl SimClock {
    pub fn new(epoch_base: f64) -> Self {
        Self {
            base: Instant::now(),
            elapsed_nanos: AtomicU64::new(0),
            epoch_base,
        }
    }

    /// Advances both the monotonic and wall-clock views by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn epoch_seconds(&self) -> f64 {
        self.epoch_base + self.elapsed().as_secs_f64()
    }
}

/// A [`SimClock`] that advances itself by a fixed `step` every time `now()`
/// is polled, so a consumer driven purely by repeated `now()` calls (an
/// unthrottled, time-bounded [`crate::scheduler::Schedule`], or a throttled
/// [`crate::executor::run`] loop) observes elapsed wall-clock time without a
/// real `tokio::time::sleep`.
pub struct TickingClock {
    inner: SimClock,
    step: Duration,
}

impl TickingClock {
    pub fn new(epoch_base: f64, step: Duration) -> Self {
        Self {
            inner: SimClock::new(epoch_base),
            step,
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> Instant {
        self.inner.advance(self.step);
        self.inner.now()
    }

    fn epoch_seconds(&self) -> f64 {
        self.inner.epoch_seconds()
    }
}
