//! Scheduler: for one `(task, client_index_within_task)` pair,
//! produces a lazy, ordered sequence of [`ScheduleTuple`]s.
//!
//! Mirrors `fantoch::client::Workload::next_cmd`'s "generate the next
//! invocation on demand" shape, generalised with an explicit bound
//! (iteration- or time-based) and throttling, instead of a fixed
//! `command_count`.

use crate::model::{Bound, Task};
use crate::params::ParamSource;
use crate::sampler::SampleType;
use crate::time::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct ScheduleTuple {
    /// Time since this client's task-phase start at which the invocation is
    /// planned to run.
    pub planned_time: Duration,
    pub sample_type: SampleType,
    /// Progress fraction in `(0, 1]`.
    pub progress: f64,
}

/// Per-client throttle: `Some(interval)` spaces invocation `i` (0-indexed)
/// at `i * interval` from task start; `None` means back-to-back.
fn throttle_interval(task: &Task) -> Option<Duration> {
    task.target_throughput()
        .map(|ops_per_sec| Duration::from_secs_f64(1.0 / ops_per_sec))
}

/// Splits `total` into `clients` chunks differing by at most one, the
/// remainder going to the lowest-indexed clients, and returns this client's
/// share. Shared with [`crate::params`]'s built-in partitionable sources,
/// which split their own iteration budgets the same way.
pub(crate) fn local_share(total: u64, clients: u32, client_index: u32) -> u64 {
    let clients = clients.max(1) as u64;
    let client_index = client_index as u64;
    let base = total / clients;
    let remainder = total % clients;
    base + u64::from(client_index < remainder)
}

/// An iteration-bounded schedule: `local_warmup + local_count` invocations,
/// the first `local_warmup` tagged `Warmup`, spaced by `interval` if
/// throttled.
pub struct IterationSchedule {
    interval: Option<Duration>,
    local_warmup: u64,
    local_total: u64,
    next: u64,
}

impl Iterator for IterationSchedule {
    type Item = ScheduleTuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.local_total {
            return None;
        }
        let i = self.next;
        self.next += 1;
        let planned_time = match self.interval {
            Some(interval) => interval.mul_f64(i as f64),
            None => Duration::ZERO,
        };
        let sample_type = if i < self.local_warmup {
            SampleType::Warmup
        } else {
            SampleType::Normal
        };
        Some(ScheduleTuple {
            planned_time,
            sample_type,
            progress: (i + 1) as f64 / self.local_total as f64,
        })
    }
}

/// A time-bounded schedule: yields invocations spaced by `interval` (or
/// back-to-back) until `elapsed >= warmup + measurement`. Progress falls
/// back to a monotone elapsed-time fraction when the param source's total
/// size is unknown.
///
/// Throttled invocations carry a synthetic `planned_time` (`i * interval`)
/// that already tracks how far into the phase the schedule should be, so it
/// doubles as the deadline/classification reference. Unthrottled
/// invocations have no such schedule of their own — back-to-back means
/// "whenever the executor gets to it" — so `planned_time` stays `Duration::
/// ZERO` (no delay to sleep for) while termination and warmup/normal
/// classification instead consult actual elapsed wall-clock time off
/// `clock`, the same [`Clock`] seam the executor uses for everything else.
pub struct TimeSchedule {
    interval: Option<Duration>,
    warmup: Duration,
    total: Option<Duration>,
    known_size: Option<u64>,
    issued: u64,
    next_index: u64,
    clock: Arc<dyn Clock>,
    start: Instant,
}

impl TimeSchedule {
    fn deadline(&self) -> Option<Duration> {
        self.total.map(|t| self.warmup + t)
    }
}

impl Iterator for TimeSchedule {
    type Item = ScheduleTuple;

    fn next(&mut self) -> Option<Self::Item> {
        let planned_time = match self.interval {
            Some(interval) => interval.mul_f64(self.next_index as f64),
            None => Duration::ZERO,
        };
        let reference_time = match self.interval {
            Some(_) => planned_time,
            None => self.clock.now().saturating_duration_since(self.start),
        };
        if let Some(deadline) = self.deadline() {
            if reference_time >= deadline {
                return None;
            }
        }
        self.next_index += 1;
        self.issued += 1;

        let sample_type = if reference_time < self.warmup {
            SampleType::Warmup
        } else {
            SampleType::Normal
        };
        let progress = match (self.known_size, self.deadline()) {
            (Some(size), _) if size > 0 => (self.issued as f64 / size as f64).min(1.0),
            (_, Some(deadline)) if !deadline.is_zero() => {
                (reference_time.as_secs_f64() / deadline.as_secs_f64()).clamp(0.0, 1.0)
            }
            _ => 1.0 - 1.0 / (self.issued as f64 + 1.0),
        };

        Some(ScheduleTuple {
            planned_time,
            sample_type,
            progress,
        })
    }
}

pub enum Schedule {
    Iteration(IterationSchedule),
    Time(TimeSchedule),
}

impl Iterator for Schedule {
    type Item = ScheduleTuple;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Schedule::Iteration(s) => s.next(),
            Schedule::Time(s) => s.next(),
        }
    }
}

/// Builds the schedule for one client of `task`, and partitions `source`
/// into `task.clients` shards, returning this client's shard. `clock` is
/// only consulted by time-bounded, unthrottled schedules (see
/// [`TimeSchedule`]); iteration-bounded and throttled schedules ignore it.
pub fn schedule_for(
    task: &Task,
    client_index_within_task: u32,
    source: &dyn ParamSource,
    clock: Arc<dyn Clock>,
) -> (Schedule, Box<dyn ParamSource>) {
    let partitioned = source.partition(client_index_within_task, task.clients.max(1));
    let interval = throttle_interval(task);

    let schedule = match task.bound {
        Bound::Iterations {
            warmup_iterations,
            iterations,
        } => {
            let local_warmup = local_share(warmup_iterations, task.clients, client_index_within_task);
            let local_iterations = local_share(iterations, task.clients, client_index_within_task);
            Schedule::Iteration(IterationSchedule {
                interval,
                local_warmup,
                local_total: local_warmup + local_iterations,
                next: 0,
            })
        }
        Bound::Time {
            warmup_time_period,
            time_period,
        } => {
            let start = clock.now();
            Schedule::Time(TimeSchedule {
                interval,
                warmup: Duration::from_secs_f64(warmup_time_period.max(0.0)),
                total: time_period.map(|t| Duration::from_secs_f64(t.max(0.0))),
                known_size: partitioned.size(),
                issued: 0,
                next_index: 0,
                clock,
                start,
            })
        }
    };

    (schedule, partitioned)
}
