//! Runner capability and `execute_single`.
//!
//! A [`RunnerCapability`] issues one request against the cluster and
//! returns an unnormalised result; [`execute_single`] folds that result
//! into `(total_ops, unit, meta)`, matching `esrally.driver.driver.execute_single`'s
//! normalisation table. Scoped acquisition/release is modelled the way
//! `fantoch::run`'s per-connection tasks bracket work with explicit setup
//! and teardown: a [`RunnerScope`] is acquired before the call and dropped
//! (releasing) on every exit path, including panics unwinding through it.

use crate::cluster::ClusterClient;
use crate::error::SystemSetupError;
use crate::model::Params;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The result of one runner invocation, before normalisation.
pub enum RunnerOutcome {
    /// No return value: a single, successful, unit-weighted operation.
    Unit,
    /// `(total_ops, unit)`, successful.
    Weighted(f64, String),
    /// A free-form success payload; `weight`/`unit` are pulled out and the
    /// rest is carried as request metadata.
    Detailed(Map<String, Value>),
    /// A connection-level failure: no HTTP status is available.
    ConnectionError { description: String },
    /// An HTTP-status failure.
    HttpError { status: u32, description: String },
}

/// A scoped capability to run one operation type against a cluster client.
#[async_trait]
pub trait RunnerCapability: Send + Sync {
    async fn run(&self, client: &dyn ClusterClient, params: &Params) -> crate::error::Result<RunnerOutcome>;
}

/// RAII guard around one invocation. The acquire/act/always-release pattern
/// `fantoch::executor`'s task lifecycle follows is modelled here as a guard
/// whose `Drop` performs the release; callers never need a `finally`-equivalent.
pub struct RunnerScope<'a> {
    runner: &'a (dyn RunnerCapability + 'a),
    released: bool,
}

impl<'a> RunnerScope<'a> {
    pub fn acquire(runner: &'a (dyn RunnerCapability + 'a)) -> Self {
        Self {
            runner,
            released: false,
        }
    }

    pub fn runner(&self) -> &dyn RunnerCapability {
        self.runner
    }

    pub fn release(mut self) {
        self.released = true;
    }
}

impl Drop for RunnerScope<'_> {
    fn drop(&mut self) {
        self.released = true;
    }
}

/// Normalises a runner invocation's result into `(weight, unit, meta)`.
///
/// `required_keys` are the parameter keys the runner is about to read from
/// `params` in insertion order; if the runner subsequently reports a
/// missing key via [`RunnerOutcome`] is not how missing keys are surfaced —
/// runners instead call [`missing_key`] directly, which raises
/// [`SystemSetupError`] with these keys and the runner's name baked in.
pub async fn execute_single(
    scope: RunnerScope<'_>,
    client: &dyn ClusterClient,
    params: &Params,
) -> crate::error::Result<(f64, String, Map<String, Value>)> {
    let runner = scope.runner();
    let outcome = runner.run(client, params).await?;
    scope.release();

    Ok(match outcome {
        RunnerOutcome::Unit => (1.0, "ops".to_string(), success_meta(Map::new())),
        RunnerOutcome::Weighted(n, unit) => (n, unit, success_meta(Map::new())),
        RunnerOutcome::Detailed(mut meta) => {
            let weight = meta
                .remove("weight")
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0);
            let unit = meta
                .remove("unit")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "ops".to_string());
            (weight, unit, success_meta(meta))
        }
        RunnerOutcome::ConnectionError { description } => {
            let mut meta = Map::new();
            meta.insert("error-description".to_string(), Value::String(description));
            meta.insert("success".to_string(), Value::Bool(false));
            (0.0, "ops".to_string(), meta)
        }
        RunnerOutcome::HttpError { status, description } => {
            let mut meta = Map::new();
            meta.insert("http-status".to_string(), Value::from(status));
            meta.insert("error-description".to_string(), Value::String(description));
            meta.insert("success".to_string(), Value::Bool(false));
            (0.0, "ops".to_string(), meta)
        }
    })
}

fn success_meta(mut meta: Map<String, Value>) -> Map<String, Value> {
    meta.insert("success".to_string(), Value::Bool(true));
    meta
}

/// Raised by a runner when a required parameter key is absent from
/// `params`. `keys` must be `params`' keys in insertion order.
pub fn missing_key(
    runner_name: impl Into<String>,
    params: &Params,
    missing: impl Into<String>,
) -> SystemSetupError {
    SystemSetupError::missing_key(
        runner_name,
        params.keys().cloned().collect(),
        missing,
    )
}

/// A runner backed by a plain async closure, for tests and simple
/// operation types that don't need their own struct.
pub struct ClosureRunner<F>(pub Arc<F>)
where
    F: for<'a> Fn(
            &'a dyn ClusterClient,
            &'a Params,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<RunnerOutcome>> + Send + 'a>>
        + Send
        + Sync;

#[async_trait]
impl<F> RunnerCapability for ClosureRunner<F>
where
    F: for<'a> Fn(
            &'a dyn ClusterClient,
            &'a Params,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<RunnerOutcome>> + Send + 'a>>
        + Send
        + Sync,
{
    async fn run(&self, client: &dyn ClusterClient, params: &Params) -> crate::error::Result<RunnerOutcome> {
        (self.0)(client, params).await
    }
}
