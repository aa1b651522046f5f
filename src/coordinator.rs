//! Coordinator: runs one [`Allocation`] to completion.
//!
//! One `tokio::task` per client walks that client's row of [`Slot`]s;
//! every client blocks on a shared [`tokio::sync::Barrier`] at each
//! join-point so no client starts the next phase before every other
//! client has finished the previous one — the same "wait for all, then
//! act" shape `fantoch::run`'s task group uses to park connection tasks
//! between protocol rounds, generalised here so client 0 additionally runs
//! the phase-wide index-setup/health-gate actions while the rest wait.

use crate::allocator::{Allocation, Slot};
use crate::cancel::CancellationToken;
use crate::cluster::ClusterClient;
use crate::executor;
use crate::model::OperationType;
use crate::params;
use crate::runner::RunnerCapability;
use crate::sampler::{Sample, Sampler};
use crate::scheduler::schedule_for;
use crate::time::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Barrier;

/// Resolves a scoped [`RunnerCapability`] for an operation type. Shared
/// read-only across all client tasks, mirroring the cluster-client handle.
pub type RunnerRegistry = Arc<HashMap<OperationType, Arc<dyn RunnerCapability>>>;

/// Phase-wide actions a coordinator runs once per join-point, while every
/// client is parked at the barrier. Left to the caller since index setup
/// and the health gate both need track/config state outside this crate's
/// data model.
#[async_trait::async_trait]
pub trait PhaseHooks: Send + Sync {
    async fn before_phase(&self, join_point_index: usize) -> crate::error::Result<()>;
}

/// A [`PhaseHooks`] that does nothing, for runs with no index setup or
/// health gate configured.
pub struct NoopHooks;

#[async_trait::async_trait]
impl PhaseHooks for NoopHooks {
    async fn before_phase(&self, _join_point_index: usize) -> crate::error::Result<()> {
        Ok(())
    }
}

/// Runs `allocation` to completion against `client`, returning every
/// sample collected across all client tasks, in no particular
/// cross-client order (aggregation imposes order, not collection).
pub async fn run_allocation(
    allocation: Allocation,
    runners: RunnerRegistry,
    client: Arc<dyn ClusterClient>,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn PhaseHooks>,
    cancel: CancellationToken,
) -> crate::error::Result<Vec<Sample>> {
    let num_clients = allocation.clients as usize;
    let barrier = Arc::new(Barrier::new(num_clients));
    let allocation = Arc::new(allocation);

    let mut handles = Vec::with_capacity(num_clients);
    for client_id in 0..num_clients {
        let allocation = Arc::clone(&allocation);
        let runners = Arc::clone(&runners);
        let client = Arc::clone(&client);
        let clock = Arc::clone(&clock);
        let hooks = Arc::clone(&hooks);
        let barrier = Arc::clone(&barrier);
        let cancel = cancel.clone();

        handles.push(tokio::spawn(async move {
            run_client(
                client_id as u32,
                allocation,
                runners,
                client,
                clock,
                hooks,
                barrier,
                cancel,
            )
            .await
        }));
    }

    let mut all_samples = Vec::new();
    for handle in handles {
        let samples = handle.await.map_err(|e| color_eyre::eyre::eyre!(e))??;
        all_samples.extend(samples);
    }
    Ok(all_samples)
}

#[allow(clippy::too_many_arguments)]
async fn run_client(
    client_id: u32,
    allocation: Arc<Allocation>,
    runners: RunnerRegistry,
    client: Arc<dyn ClusterClient>,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn PhaseHooks>,
    barrier: Arc<Barrier>,
    cancel: CancellationToken,
) -> crate::error::Result<Vec<Sample>> {
    let row = &allocation.allocations[client_id as usize];
    let sampler = Arc::new(Sampler::new(client_id, clock.epoch_seconds()));

    for slot in row {
        if cancel.is_cancelled() {
            break;
        }
        match slot {
            Slot::Idle => {}
            Slot::Task(task, shard_index) => {
                let runner = runners.get(&task.operation.op_type).cloned().ok_or_else(|| {
                    color_eyre::eyre::eyre!(
                        "no runner registered for operation type {:?}",
                        task.operation.op_type
                    )
                })?;
                let source = params::create(&task.operation.param_source, &task.operation.params);
                let (schedule, source) =
                    schedule_for(task, *shard_index, source.as_ref(), Arc::clone(&clock));
                executor::run(
                    &cancel,
                    client_id,
                    &task.operation,
                    schedule,
                    source,
                    runner.as_ref(),
                    client.as_ref(),
                    clock.as_ref(),
                    Arc::clone(&sampler),
                )
                .await?;
            }
            Slot::JoinPoint(index) => {
                // leader runs phase-wide actions; everyone else just waits.
                // `wait()` itself doesn't order "leader acted" before
                // "everyone proceeds" — the leader runs its hook, *then*
                // reaches the barrier, so followers block until it does.
                if client_id == 0 {
                    hooks.before_phase(*index).await?;
                }
                barrier.wait().await;
            }
        }
    }

    Ok(sampler.drain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::allocate;
    use crate::cluster::FakeClusterClient;
    use crate::model::{AllocationUnit, Bound, Operation, OperationType, Parallel, Params, Task};
    use crate::params::{self, ParamSource};
    use crate::runner::RunnerOutcome;
    use crate::time::SystemClock;
    use async_trait::async_trait;
    use parking_lot::Mutex as PMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FiniteSource {
        remaining: u64,
    }

    impl ParamSource for FiniteSource {
        fn partition(&self, _index: u32, _count: u32) -> Box<dyn ParamSource> {
            Box::new(FiniteSource {
                remaining: self.remaining,
            })
        }
        fn size(&self) -> Option<u64> {
            Some(self.remaining)
        }
        fn params(&mut self) -> Params {
            self.remaining = self.remaining.saturating_sub(1);
            Params::new()
        }
    }

    struct CountingRunner(Arc<AtomicUsize>);

    #[async_trait]
    impl RunnerCapability for CountingRunner {
        async fn run(&self, _client: &dyn ClusterClient, _params: &Params) -> crate::error::Result<RunnerOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(RunnerOutcome::Unit)
        }
    }

    /// Records the order join-point hooks fire in, so tests can assert
    /// phase-wide actions run exactly once per join-point, before any
    /// client proceeds into the next phase.
    struct RecordingHooks(PMutex<Vec<usize>>);

    #[async_trait::async_trait]
    impl PhaseHooks for RecordingHooks {
        async fn before_phase(&self, join_point_index: usize) -> crate::error::Result<()> {
            self.0.lock().push(join_point_index);
            Ok(())
        }
    }

    fn register_unique_source(name: &str, count: u64) {
        params::register(
            name,
            Arc::new(move |_: &Params| Box::new(FiniteSource { remaining: count }) as Box<dyn ParamSource>),
        );
    }

    #[tokio::test]
    async fn single_task_single_client_collects_one_sample_per_iteration() {
        register_unique_source("coordinator-test-single", 5);
        let op = Operation::new("search", OperationType::Search, "coordinator-test-single");
        let task = Task::new(op.clone()).with_bound(Bound::Iterations {
            warmup_iterations: 0,
            iterations: 5,
        });
        let allocation = allocate(&[AllocationUnit::Task(task)]);
        assert_eq!(allocation.clients, 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut runners: HashMap<OperationType, Arc<dyn RunnerCapability>> = HashMap::new();
        runners.insert(OperationType::Search, Arc::new(CountingRunner(Arc::clone(&calls))));

        let samples = run_allocation(
            allocation,
            Arc::new(runners),
            Arc::new(FakeClusterClient::default()),
            Arc::new(SystemClock),
            Arc::new(NoopHooks),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.client_id, 0);
            assert!((sample.percent_completed - ((i + 1) as f64 / 5.0)).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn parallel_tasks_run_concurrently_and_join_point_hook_fires_once() {
        register_unique_source("coordinator-test-parallel-a", 2);
        register_unique_source("coordinator-test-parallel-b", 2);
        let op_a = Operation::new("op-a", OperationType::Search, "coordinator-test-parallel-a");
        let op_b = Operation::new("op-b", OperationType::Index, "coordinator-test-parallel-b");
        let task_a = Task::new(op_a).with_bound(Bound::Iterations {
            warmup_iterations: 0,
            iterations: 2,
        });
        let task_b = Task::new(op_b).with_bound(Bound::Iterations {
            warmup_iterations: 0,
            iterations: 2,
        });
        let allocation = allocate(&[AllocationUnit::Parallel(Parallel::new(vec![task_a, task_b]))]);
        assert_eq!(allocation.clients, 2);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut runners: HashMap<OperationType, Arc<dyn RunnerCapability>> = HashMap::new();
        runners.insert(OperationType::Search, Arc::new(CountingRunner(Arc::clone(&calls))));
        runners.insert(OperationType::Index, Arc::new(CountingRunner(Arc::clone(&calls))));

        let hooks = Arc::new(RecordingHooks(PMutex::new(Vec::new())));

        let samples = run_allocation(
            allocation,
            Arc::new(runners),
            Arc::new(FakeClusterClient::default()),
            Arc::new(SystemClock),
            Arc::clone(&hooks) as Arc<dyn PhaseHooks>,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // two join-points bound the single phase; each fires exactly once.
        assert_eq!(*hooks.0.lock(), vec![0, 1]);
    }

    #[tokio::test]
    async fn cancelling_before_run_yields_no_samples_for_any_client() {
        register_unique_source("coordinator-test-cancel", 5);
        let op = Operation::new("search", OperationType::Search, "coordinator-test-cancel");
        let task = Task::new(op).with_clients(2).with_bound(Bound::Iterations {
            warmup_iterations: 0,
            iterations: 5,
        });
        let allocation = allocate(&[AllocationUnit::Task(task)]);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut runners: HashMap<OperationType, Arc<dyn RunnerCapability>> = HashMap::new();
        runners.insert(OperationType::Search, Arc::new(CountingRunner(Arc::clone(&calls))));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let samples = run_allocation(
            allocation,
            Arc::new(runners),
            Arc::new(FakeClusterClient::default()),
            Arc::new(SystemClock),
            Arc::new(NoopHooks),
            cancel,
        )
        .await
        .unwrap();

        assert!(samples.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
