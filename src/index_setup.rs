//! Index Setup: exists/delete-if-exists/create-always against
//! a [`ClusterClient`], for auto-managed indices only.

use crate::cluster::ClusterClient;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct IndexType {
    pub name: String,
    pub mapping: Value,
}

#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub auto_managed: bool,
    pub types: Vec<IndexType>,
}

/// Runs the exists/delete-if-exists/create-always algorithm. A no-op when `index.auto_managed`
/// is false.
pub async fn setup_index(
    client: &dyn ClusterClient,
    index: &Index,
    index_settings: Map<String, Value>,
) -> crate::error::Result<()> {
    if !index.auto_managed {
        return Ok(());
    }

    if client.indices_exists(&index.name).await? {
        client.indices_delete(&index.name).await?;
    }

    let mut mappings = Map::new();
    for t in &index.types {
        mappings.insert(t.name.clone(), t.mapping.clone());
    }

    let mut body = Map::new();
    body.insert("settings".to_string(), Value::Object(index_settings));
    body.insert("mappings".to_string(), Value::Object(mappings));

    client.indices_create(&index.name, body).await
}
