//! Feed Adapter boundary (§4.5). Out of scope per §1 beyond the
//! interface: the broker ingress and its consumer are external
//! collaborators. This module defines the contract the pool relies on
//! and a reference bounded implementation used by tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

/// The conservation-law sink: called once per `Run` whose execution ends
/// in either a completed job on a busy worker or a mid-flight removal of
/// a busy worker (§6, §7).
#[async_trait]
pub trait FeedAdapter: Send + Sync + 'static {
    async fn processed(&self);
}

/// Reference `FeedAdapter` that also enforces the §4.5 backpressure rule
/// ("MUST NOT deliver more than `maxActiveContainers` concurrent
/// unacknowledged Runs") via a counting semaphore: `admit` blocks until a
/// slot is available and `processed` returns one.
pub struct BoundedFeed {
    slots: Arc<Semaphore>,
}

impl BoundedFeed {
    pub fn new(max_active_containers: u32) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_active_containers as usize)),
        }
    }

    /// Blocks until fewer than `maxActiveContainers` Runs are
    /// unacknowledged, then returns. Callers deliver the `Run` to the
    /// supervisor immediately after this returns.
    pub async fn admit(&self) {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore never closed");
        permit.forget();
    }
}

#[async_trait]
impl FeedAdapter for BoundedFeed {
    async fn processed(&self) {
        self.slots.add_permits(1);
    }
}
