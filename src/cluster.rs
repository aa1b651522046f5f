//! Cluster client abstraction: the one seam the driver
//! core calls across the network. Generalises `fantoch::run`'s pattern of
//! talking to a remote process behind an async trait, so the allocator,
//! scheduler, executor and health gate can all be exercised against a
//! test double instead of a live cluster.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub version_number: String,
}

#[derive(Debug, Clone)]
pub struct ClusterHealth {
    pub status: Option<String>,
    pub relocating_shards: u32,
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn info(&self) -> crate::error::Result<ClusterInfo>;
    async fn cluster_health(&self) -> crate::error::Result<ClusterHealth>;
    async fn indices_exists(&self, index: &str) -> crate::error::Result<bool>;
    async fn indices_delete(&self, index: &str) -> crate::error::Result<()>;
    async fn indices_create(&self, index: &str, body: Map<String, Value>) -> crate::error::Result<()>;
    async fn bulk(&self, body: Value) -> crate::error::Result<Value>;
}

/// In-memory test double. Every call is recorded in `calls` so tests can
/// assert on the exact invocation sequence, the way `fantoch::client::Client`
/// tests inspect `data()` after a run instead of mocking the network.
#[derive(Default)]
pub struct FakeClusterClient {
    pub calls: Mutex<Vec<String>>,
    pub health: Mutex<Option<ClusterHealth>>,
    pub index_exists: Mutex<bool>,
    pub created_bodies: Mutex<Vec<(String, Map<String, Value>)>>,
    pub bulk_response: Mutex<Value>,
}

impl FakeClusterClient {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn info(&self) -> crate::error::Result<ClusterInfo> {
        self.record("info");
        Ok(ClusterInfo {
            version_number: "8.0.0".to_string(),
        })
    }

    async fn cluster_health(&self) -> crate::error::Result<ClusterHealth> {
        self.record("cluster.health");
        Ok(self.health.lock().clone().unwrap_or(ClusterHealth {
            status: Some("green".to_string()),
            relocating_shards: 0,
        }))
    }

    async fn indices_exists(&self, index: &str) -> crate::error::Result<bool> {
        self.record(format!("indices.exists[{index}]"));
        Ok(*self.index_exists.lock())
    }

    async fn indices_delete(&self, index: &str) -> crate::error::Result<()> {
        self.record(format!("indices.delete[{index}]"));
        Ok(())
    }

    async fn indices_create(&self, index: &str, body: Map<String, Value>) -> crate::error::Result<()> {
        self.record(format!("indices.create[{index}]"));
        self.created_bodies.lock().push((index.to_string(), body));
        Ok(())
    }

    async fn bulk(&self, _body: Value) -> crate::error::Result<Value> {
        self.record("bulk");
        Ok(self.bulk_response.lock().clone())
    }
}
