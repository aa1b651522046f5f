//! Error taxonomy.
//!
//! Transport and HTTP-status failures are not modelled as Rust errors at
//! all: `execute_single` folds them into the sample's `request_meta_data`
//! and execution continues (kinds 1–2). `SystemSetupError` and
//! [`GateError`] are the two fatal, typed error kinds (3–4); everything
//! else unexpected (kind 5) propagates as a [`color_eyre::Report`].

use thiserror::Error;

/// Alias for the unexpected/fatal error kind: anything
/// that isn't a [`SystemSetupError`] or [`GateError`] propagates as a
/// `color_eyre` report, the way `fantoch_exp` threads `eyre::Result`
/// through its AWS orchestration.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// A missing parameter key, or any other setup mistake a runner detects
/// before issuing a request. Fatal: halts the client that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSetupError {
    pub runner: String,
    pub keys: Vec<String>,
    pub missing_key: String,
}

impl SystemSetupError {
    pub fn missing_key(
        runner: impl Into<String>,
        keys: Vec<String>,
        missing_key: impl Into<String>,
    ) -> Self {
        Self {
            runner: runner.into(),
            keys,
            missing_key: missing_key.into(),
        }
    }
}

impl std::fmt::Display for SystemSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self
            .keys
            .iter()
            .map(|k| format!("'{k}'"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "Cannot execute [{}]. Provided parameters are: [{}]. Error: ['{}'].",
            self.runner, keys, self.missing_key
        )
    }
}

impl std::error::Error for SystemSetupError {}


/// Failures raised by the cluster health gate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error(
        "Cluster reached status [{reached}] which is equal or better than the expected status [{expected}] but there were [{relocating_shards}] relocating shards and we require zero relocating shards (Use the /_cat/shards API to check which shards are relocating.)"
    )]
    RelocatingShards {
        reached: String,
        expected: String,
        relocating_shards: u32,
    },

    #[error("Cluster did not reach status [{expected}]. Last reached status: [{last}]")]
    StatusNotReached { expected: String, last: String },
}
