//! Cluster Health Gate: polls cluster health until the
//! reached status is at least as good as expected, or fails fatally.

use crate::cluster::ClusterClient;
use crate::error::GateError;
use std::time::Duration;

fn status_rank(status: &str) -> Option<u8> {
    match status {
        "red" => Some(0),
        "yellow" => Some(1),
        "green" => Some(2),
        _ => None,
    }
}

/// Renders a possibly-absent status the way the gate's error messages do:
/// the literal string `None` when the cluster reports no status, matching
/// `driver_test.py::test_rejects_unknown_cluster_status`.
fn render_status(status: &Option<String>) -> String {
    match status {
        Some(s) => s.clone(),
        None => "None".to_string(),
    }
}

/// Retry budget for [`wait_for_cluster_status`]: bounds how long the gate
/// will poll before giving up and reporting the last-seen status.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Polls `client` until its reported status is >= `expected_status` with
/// zero relocating shards, sleeping `budget.poll_interval` between polls
/// up to `budget.max_attempts` times. Returns `(reached_status,
/// relocating_shards)` on success.
pub async fn wait_for_cluster_status(
    client: &dyn ClusterClient,
    expected_status: &str,
    budget: RetryBudget,
) -> Result<(String, u32), GateError> {
    let expected_rank = status_rank(expected_status).unwrap_or(0);
    let mut last_status: Option<String> = None;

    for attempt in 0..budget.max_attempts {
        let health = client
            .cluster_health()
            .await
            .map_err(|_| GateError::StatusNotReached {
                expected: expected_status.to_string(),
                last: render_status(&last_status),
            })?;
        last_status = health.status.clone();

        if let Some(reached_rank) = health.status.as_deref().and_then(status_rank) {
            if reached_rank >= expected_rank {
                if health.relocating_shards == 0 {
                    return Ok((health.status.unwrap(), 0));
                }
                return Err(GateError::RelocatingShards {
                    reached: health.status.unwrap(),
                    expected: expected_status.to_string(),
                    relocating_shards: health.relocating_shards,
                });
            }
        }

        if attempt + 1 < budget.max_attempts {
            tokio::time::sleep(budget.poll_interval).await;
        }
    }

    Err(GateError::StatusNotReached {
        expected: expected_status.to_string(),
        last: render_status(&last_status),
    })
}
