//! Immutable workload description: [`Operation`], [`Task`],
//! [`Parallel`], and the allocation-time wrapper [`AllocationUnit`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub type Params = Map<String, Value>;

/// An operation invocation target: a name, a type and the param source
/// that produces its per-invocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub param_source: String,
    #[serde(default)]
    pub params: Params,
}

impl Operation {
    pub fn new(
        name: impl Into<String>,
        op_type: OperationType,
        param_source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            op_type,
            param_source: param_source.into(),
            params: Params::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

// Operation names are unique, so equality and
// hashing are both defined on the name alone: `operations_per_joinpoint`
// relies on this to dedup correctly when the same operation is referenced
// by more than one task.
impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Operation {}

impl std::hash::Hash for Operation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Index,
    Search,
    IndicesStats,
    Bulk,
    ClusterHealth,
}

/// How long a [`Task`] runs: either a fixed iteration count, or wall-clock
/// bounded (with an optional unbounded measurement period).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    Iterations {
        warmup_iterations: u64,
        iterations: u64,
    },
    Time {
        warmup_time_period: f64,
        /// `None` means unbounded measurement time.
        time_period: Option<f64>,
    },
}

/// An immutable description of how to run an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub operation: Operation,
    pub bound: Bound,
    #[serde(default = "Task::default_clients")]
    pub clients: u32,
    #[serde(default)]
    pub params: Params,
}

impl Task {
    fn default_clients() -> u32 {
        1
    }

    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            bound: Bound::Time {
                warmup_time_period: 0.0,
                time_period: None,
            },
            clients: Self::default_clients(),
            params: Params::new(),
        }
    }

    pub fn with_clients(mut self, clients: u32) -> Self {
        self.clients = clients;
        self
    }

    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Per-client target throughput in operations per second, if throttling
    /// is configured.
    pub fn target_throughput(&self) -> Option<f64> {
        let throughput = self.params.get("target-throughput")?.as_f64()?;
        if throughput <= 0.0 {
            return None;
        }
        let clients = self
            .params
            .get("clients")
            .and_then(Value::as_u64)
            .unwrap_or(self.clients as u64)
            .max(1);
        Some(throughput / clients as f64)
    }
}

/// A group of sub-[`Task`]s run concurrently within one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parallel {
    pub tasks: Vec<Task>,
    /// Outer client count. If unset, defaults to the sum of sub-task client
    /// counts. May be smaller than that sum, in which case sub-tasks wrap
    /// round-robin over the available client rows.
    pub clients: Option<u32>,
}

impl Parallel {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            clients: None,
        }
    }

    pub fn with_clients(mut self, clients: u32) -> Self {
        self.clients = Some(clients);
        self
    }

    /// Sum of sub-task client counts, each defaulting to 1.
    pub fn sub_task_clients_sum(&self) -> u32 {
        self.tasks.iter().map(|t| t.clients).sum()
    }

    /// Effective outer width: `clients` if set, else the sum of sub-task
    /// client counts. `clients` may be smaller than that sum — the
    /// allocator then wraps sub-tasks round-robin over the narrower set of
    /// client rows instead of rejecting the configuration.
    pub fn width(&self) -> u32 {
        match self.clients {
            Some(c) => c,
            None => self.sub_task_clients_sum(),
        }
    }
}

/// One item of the ordered task list the [`crate::allocator::Allocator`]
/// consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AllocationUnit {
    Task(Task),
    Parallel(Parallel),
}

impl AllocationUnit {
    pub fn width(&self) -> u32 {
        match self {
            AllocationUnit::Task(task) => task.clients,
            AllocationUnit::Parallel(parallel) => parallel.width(),
        }
    }

    /// The set of operations run by this item, used to populate
    /// `operations_per_joinpoint`.
    pub fn operations(&self) -> HashSet<Operation> {
        match self {
            AllocationUnit::Task(task) => {
                std::iter::once(task.operation.clone()).collect()
            }
            AllocationUnit::Parallel(parallel) => parallel
                .tasks
                .iter()
                .map(|t| t.operation.clone())
                .collect(),
        }
    }
}
