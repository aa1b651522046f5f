//! Logging: a thin `tracing-subscriber` initialiser, following
//! `fantoch`'s direct use of `tracing`'s macros rather than a bespoke
//! logging façade.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, defaulting to `info` when unset. Call once, near the start
/// of `main`; a second call is a no-op (the underlying `set_global_default`
/// error is swallowed, mirroring tools that tolerate re-init under test
/// harnesses that call `main` more than once).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
