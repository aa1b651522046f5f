//! Sampler: an append-only, thread-safe buffer of [`Sample`]s
//! collected by one client's [`crate::executor::Executor`] over a task
//! phase.

use crate::model::Operation;
use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Warmup,
    Normal,
}

// `serde` derive macros for a two-variant enum aren't worth a dependency on
// `serde_repr` here; a manual impl keeps wire representation explicit.
impl serde::Serialize for SampleType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SampleType::Warmup => serializer.serialize_str("warmup"),
            SampleType::Normal => serializer.serialize_str("normal"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub client_id: u32,
    pub absolute_time: f64,
    pub relative_time: f64,
    pub operation: Operation,
    pub sample_type: SampleType,
    pub request_meta_data: Map<String, Value>,
    pub latency_ms: f64,
    pub service_time_ms: f64,
    pub total_ops: f64,
    pub total_ops_unit: String,
    pub total_ops_so_far: f64,
    pub percent_completed: f64,
}

#[derive(Default)]
pub struct Sampler {
    client_id: u32,
    start_timestamp: f64,
    samples: Mutex<Vec<Sample>>,
}

impl Sampler {
    pub fn new(client_id: u32, start_timestamp: f64) -> Self {
        Self {
            client_id,
            start_timestamp,
            samples: Mutex::new(Vec::new()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        absolute_time: f64,
        relative_time: f64,
        operation: Operation,
        sample_type: SampleType,
        request_meta_data: Map<String, Value>,
        latency_ms: f64,
        service_time_ms: f64,
        total_ops: f64,
        total_ops_unit: String,
        total_ops_so_far: f64,
        percent_completed: f64,
    ) {
        self.samples.lock().push(Sample {
            client_id: self.client_id,
            absolute_time,
            relative_time,
            operation,
            sample_type,
            request_meta_data,
            latency_ms,
            service_time_ms,
            total_ops,
            total_ops_unit,
            total_ops_so_far,
            percent_completed,
        });
    }

    pub fn start_timestamp(&self) -> f64 {
        self.start_timestamp
    }

    /// Drains the buffered samples, leaving the sampler empty.
    pub fn drain(&self) -> Vec<Sample> {
        std::mem::take(&mut self.samples.lock())
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
