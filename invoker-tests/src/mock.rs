//! Test doubles for the two external collaborators invoker-runtime
//! commands: the container runtime driver and the feed's `Processed`
//! sink (§1, §4.5, SPEC_FULL.md "Supplemented behavior" 3-4).

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use invoker_runtime::{ContainerDriver, ContainerHandle, Error, FeedAdapter, Result};
use pool_model::{ActionDescriptor, ExecKind};

/// In-memory `ContainerDriver`. Every lifecycle call succeeds unless the
/// test has armed `fail_next_runs`, which lets scenario tests simulate
/// the transient `run` failure that drives the `RescheduleJob` path.
/// `hold_runs`/`release_runs` let a test keep a container genuinely busy
/// for as long as it needs, to exercise saturation directly instead of
/// racing an instantaneous completion.
#[derive(Default)]
pub struct MockDriver {
    next_handle: AtomicU64,
    fail_next_runs: AtomicUsize,
    fail_next_runs_terminal: AtomicUsize,
    held: AtomicBool,
    hold_notify: Notify,
    removed: Mutex<Vec<ContainerHandle>>,
    created: Mutex<Vec<ContainerHandle>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls to `run` return a transient error (§7
    /// "transient proxy errors" — triggers `RescheduleJob`).
    pub fn fail_next_runs(&self, n: usize) {
        self.fail_next_runs.store(n, Ordering::SeqCst);
    }

    /// The next `n` calls to `run` return an unrecoverable crash (§7
    /// "terminal container errors" — triggers `ContainerRemoved` only,
    /// no requeue).
    pub fn fail_next_runs_terminal(&self, n: usize) {
        self.fail_next_runs_terminal.store(n, Ordering::SeqCst);
    }

    /// Every call to `run` blocks until `release_runs` is called.
    pub fn hold_runs(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release_runs(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.hold_notify.notify_waiters();
    }

    pub fn removed_handles(&self) -> Vec<ContainerHandle> {
        self.removed.lock().clone()
    }

    pub fn created_handles(&self) -> Vec<ContainerHandle> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl ContainerDriver for MockDriver {
    async fn create(&self, kind: &ExecKind, memory_mb: u32) -> Result<ContainerHandle> {
        let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let handle = format!("{kind}-{memory_mb}mb-{n}");
        self.created.lock().push(handle.clone());
        Ok(handle)
    }

    async fn init(&self, _handle: &ContainerHandle) -> Result<()> {
        Ok(())
    }

    async fn bind_tenant(&self, _handle: &ContainerHandle, _action: &ActionDescriptor) -> Result<()> {
        Ok(())
    }

    async fn run(&self, _handle: &ContainerHandle, _args: &serde_json::Value) -> Result<()> {
        while self.held.load(Ordering::SeqCst) {
            self.hold_notify.notified().await;
        }

        let terminal_remaining = self.fail_next_runs_terminal.load(Ordering::SeqCst);
        if terminal_remaining > 0 {
            self.fail_next_runs_terminal.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::ContainerCrashed("simulated unrecoverable crash".into()));
        }

        let remaining = self.fail_next_runs.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_runs.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Driver("simulated transient run failure".into()));
        }
        Ok(())
    }

    async fn pause(&self, _handle: &ContainerHandle) -> Result<()> {
        Ok(())
    }

    async fn resume(&self, _handle: &ContainerHandle) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<()> {
        self.removed.lock().push(handle.clone());
        Ok(())
    }
}

/// Records every `Processed` signal so tests can assert on the §6/§8
/// (P8) conservation law without a real message broker.
#[derive(Default)]
pub struct ChannelFeed {
    count: AtomicUsize,
    notify: Notify,
}

impl ChannelFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Polls until `count()` reaches `target` or `timeout` elapses.
    pub async fn wait_for_count(&self, target: usize, timeout: std::time::Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count() >= target {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            let remaining = deadline - tokio::time::Instant::now();
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(remaining.min(std::time::Duration::from_millis(10))) => {}
            }
        }
    }
}

#[async_trait]
impl FeedAdapter for ChannelFeed {
    async fn processed(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}
