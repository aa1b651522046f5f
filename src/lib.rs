//! Load-generation core of a benchmark driver.
//!
//! Given a track's task list, the [`allocator`] expands it into per-client
//! timelines, the [`scheduler`] turns each client's task slot into a lazy
//! sequence of planned invocations, the [`executor`] drives that sequence
//! against a [`cluster`] handle through a [`runner`], and the
//! [`coordinator`] ties all of a phase's clients together behind a
//! join-point barrier. [`aggregator`] turns the resulting samples into
//! throughput over time.

pub mod aggregator;
pub mod allocator;
pub mod cancel;
pub mod cluster;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod health;
pub mod index_setup;
pub mod logging;
pub mod model;
pub mod params;
pub mod runner;
pub mod sampler;
pub mod scheduler;
pub mod time;

pub use error::{GateError, Result, SystemSetupError};
pub use model::{AllocationUnit, Bound, Operation, OperationType, Parallel, Params, Task};
