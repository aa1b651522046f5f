//! Executor: drives one client's [`Schedule`] against one
//! [`RunnerCapability`], feeding a [`Sampler`] and honouring cancellation.

use crate::cancel::CancellationToken;
use crate::cluster::ClusterClient;
use crate::model::{Operation, Params};
use crate::params::ParamSource;
use crate::runner::{execute_single, RunnerCapability, RunnerScope};
use crate::sampler::Sampler;
use crate::scheduler::Schedule;
use crate::time::Clock;
use std::sync::Arc;

/// Runs `schedule` to completion (or until `cancel` is set), pulling one
/// parameter bundle per tuple from `source` and appending a sample to
/// `sampler` for every invocation that actually runs.
///
/// Mirrors `fantoch::client::Client::next_cmd`/`handle`'s "pull, act,
/// record" loop, generalised with cooperative cancellation and throttled
/// sleeps instead of a fixed command budget.
pub async fn run(
    cancel: &CancellationToken,
    client_id: u32,
    operation: &Operation,
    mut schedule: Schedule,
    mut source: Box<dyn ParamSource>,
    runner: &(dyn RunnerCapability + Send + Sync),
    client: &dyn ClusterClient,
    clock: &dyn Clock,
    sampler: Arc<Sampler>,
) -> crate::error::Result<()> {
    let client_start = clock.now();
    let mut total_ops_so_far = 0.0;

    while let Some(tuple) = schedule.next() {
        if cancel.is_cancelled() {
            break;
        }

        let planned_at = client_start + tuple.planned_time;
        let now = clock.now();
        if planned_at > now && !cancel.sleep(planned_at - now).await {
            break;
        }
        if cancel.is_cancelled() {
            break;
        }

        let params: Params = source.params();
        let t_before = clock.now();
        let scope = RunnerScope::acquire(runner);
        let (total_ops, unit, meta) = execute_single(scope, client, &params).await?;
        let t_after = clock.now();

        let service_time_ms = (t_after - t_before).as_secs_f64() * 1000.0;
        let latency_ms = if tuple.planned_time.is_zero() {
            service_time_ms
        } else {
            (t_after - planned_at).as_secs_f64() * 1000.0
        };

        total_ops_so_far += total_ops;

        sampler.add(
            clock.epoch_seconds(),
            (t_after - client_start).as_secs_f64(),
            operation.clone(),
            tuple.sample_type,
            meta,
            latency_ms,
            service_time_ms,
            total_ops,
            unit,
            total_ops_so_far,
            tuple.progress,
        );
    }

    Ok(())
}
