//! Shared scaffolding for standing up a real `PoolSupervisor` against the
//! test doubles in `mock`.

use std::sync::Arc;
use std::time::Duration;

use invoker_common::config::{PoolConfig, PrewarmEntry};
use invoker_runtime::supervisor::{PoolSnapshot, PoolSupervisor, SupervisorHandle};
use pool_model::{ActionDescriptor, ActivationMessage, ExecKind};
use tokio::task::JoinHandle;

use crate::mock::{ChannelFeed, MockDriver};

pub struct Pool {
    pub handle: SupervisorHandle,
    pub driver: Arc<MockDriver>,
    pub feed: Arc<ChannelFeed>,
    pub join: JoinHandle<()>,
}

impl Pool {
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
        let _ = self.join.await;
    }
}

pub fn config(max_active_containers: u32, prewarm: Vec<PrewarmEntry>) -> PoolConfig {
    PoolConfig {
        max_active_containers,
        prewarm,
        log_message_interval_secs: 1,
        log_level: "info".to_string(),
        log_dir: None,
    }
}

pub fn prewarm_entry(exec_kind: &str, memory_mb: u32, count: u32) -> PrewarmEntry {
    PrewarmEntry {
        count,
        exec_kind: exec_kind.to_string(),
        memory_mb,
    }
}

/// Spawns a `PoolSupervisor` with a short idle timeout (tests never rely
/// on idle self-destruction, and a long one would keep proxy tasks alive
/// past test teardown).
pub fn spawn_pool(cfg: &PoolConfig) -> Pool {
    let driver = Arc::new(MockDriver::new());
    let feed = Arc::new(ChannelFeed::new());
    let (handle, join) = PoolSupervisor::spawn(
        cfg,
        driver.clone() as Arc<dyn invoker_runtime::ContainerDriver>,
        feed.clone() as Arc<dyn invoker_runtime::FeedAdapter>,
        Duration::from_secs(600),
    );
    Pool {
        handle,
        driver,
        feed,
        join,
    }
}

pub fn action(name: &str, revision: u64, exec_kind: &str, memory_mb: u32) -> ActionDescriptor {
    ActionDescriptor::new(name, revision, ExecKind::new(exec_kind), memory_mb, 60_000)
}

pub fn activation(tenant: &str, activation_id: &str) -> ActivationMessage {
    ActivationMessage {
        activation_id: activation_id.to_string(),
        transaction_id: format!("tx-{activation_id}"),
        tenant: tenant.to_string(),
        args: serde_json::json!({}),
        submitted_at: chrono::Utc::now(),
    }
}

/// Polls `inspect()` until `pred` holds or `timeout` elapses, returning the
/// last snapshot observed either way. Tests assert on the returned snapshot
/// so a timeout fails with a useful diagnostic instead of a bare bool.
pub async fn wait_for<F>(handle: &SupervisorHandle, timeout: Duration, pred: F) -> PoolSnapshot
where
    F: Fn(&PoolSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let snapshot = handle.inspect().await.expect("supervisor still running");
        if pred(&snapshot) || tokio::time::Instant::now() >= deadline {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
