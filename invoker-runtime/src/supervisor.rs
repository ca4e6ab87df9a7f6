//! Pool Supervisor (§4.1): the single coordinator that owns `free`,
//! `busy` and `prewarmed`, and the only writer of pool-scheduling state.
//! It runs as one dedicated Tokio task draining an unbounded `mpsc`
//! channel — unbounded so that a `Run` re-posted to itself on saturation
//! (§4.1 step 4) can never deadlock against its own single reader.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pool_model::{ContainerData, ContainerStateTag, Run, WorkerId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use invoker_common::PoolConfig;

use crate::driver::ContainerDriver;
use crate::feed::FeedAdapter;
use crate::messages::{ProxyMessage, SupervisorMessage};
use crate::policy;
use crate::prewarm::{self, PrewarmTarget};
use crate::proxy;

/// Cloneable front for posting messages to a running `PoolSupervisor`.
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::UnboundedSender<SupervisorMessage>,
}

impl SupervisorHandle {
    /// Wraps a raw sender as a handle. Used by proxy unit tests that want
    /// to observe `SupervisorMessage`s without spinning up a full
    /// `PoolSupervisor` task.
    #[cfg(test)]
    pub fn for_test(tx: mpsc::UnboundedSender<SupervisorMessage>) -> Self {
        Self { tx }
    }

    /// Posts a message. Errors only if the supervisor task has already
    /// exited (e.g. past a `Shutdown`); callers treat that as terminal.
    pub fn send(&self, msg: SupervisorMessage) -> Result<(), crate::error::Error> {
        self.tx
            .send(msg)
            .map_err(|_| crate::error::Error::ChannelClosed)
    }

    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.send(SupervisorMessage::Shutdown { ack: ack_tx }).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Test/observability hook — see `SupervisorMessage::Inspect`.
    pub async fn inspect(&self) -> Option<PoolSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SupervisorMessage::Inspect { reply }).ok()?;
        rx.await.ok()
    }
}

/// A point-in-time copy of the three pool maps, for tests and debugging.
/// Never used for scheduling decisions — the live maps are the only
/// source of truth while the supervisor runs.
#[derive(Debug, Clone, Default)]
pub struct PoolSnapshot {
    pub free: HashMap<WorkerId, ContainerData>,
    pub busy: HashMap<WorkerId, ContainerData>,
    pub prewarmed: HashMap<WorkerId, ContainerData>,
}

/// Pure §4.1-step-4 log-throttling decision, pulled out of `reschedule` so
/// the P9 "at most one log per interval" property can be checked without a
/// running supervisor: given the job's current deadline, the current
/// instant and the configured interval, decide whether to log now and what
/// the job's next deadline should be.
fn log_decision(
    deadline: Option<Instant>,
    now: Instant,
    interval: Duration,
) -> (bool, Instant) {
    match deadline {
        Some(deadline) if now < deadline => (false, deadline),
        _ => (true, now + interval),
    }
}

struct Worker {
    sender: mpsc::Sender<ProxyMessage>,
}

pub struct PoolSupervisor {
    max_active_containers: u32,
    log_message_interval: Duration,
    idle_timeout: Duration,
    prewarm_targets: Vec<PrewarmTarget>,

    driver: Arc<dyn ContainerDriver>,
    feed: Arc<dyn FeedAdapter>,
    self_handle: SupervisorHandle,

    free: HashMap<WorkerId, ContainerData>,
    busy: HashMap<WorkerId, ContainerData>,
    prewarmed: HashMap<WorkerId, ContainerData>,
    workers: HashMap<WorkerId, Worker>,
    next_worker_id: u64,
}

impl PoolSupervisor {
    /// Builds and spawns the supervisor task. The Prewarm Manager's
    /// initial-fill pass (§4.3) runs as the first step inside that task.
    /// Returns a handle callers (the Feed Adapter, tests) use to post
    /// messages, and the task's `JoinHandle`.
    pub fn spawn(
        config: &PoolConfig,
        driver: Arc<dyn ContainerDriver>,
        feed: Arc<dyn FeedAdapter>,
        idle_timeout: Duration,
    ) -> (SupervisorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let self_handle = SupervisorHandle { tx };

        let prewarm_targets = config
            .prewarm
            .iter()
            .map(|e| PrewarmTarget {
                kind: pool_model::ExecKind::new(e.exec_kind.clone()),
                memory_mb: e.memory_mb,
                count: e.count,
            })
            .collect();

        let supervisor = PoolSupervisor {
            max_active_containers: config.max_active_containers,
            log_message_interval: config.log_message_interval(),
            idle_timeout,
            prewarm_targets,
            driver,
            feed,
            self_handle: self_handle.clone(),
            free: HashMap::new(),
            busy: HashMap::new(),
            prewarmed: HashMap::new(),
            workers: HashMap::new(),
            next_worker_id: 0,
        };

        let join = tokio::spawn(supervisor.run(rx));
        (self_handle, join)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SupervisorMessage>) {
        self.initial_fill().await;

        while let Some(msg) = rx.recv().await {
            match msg {
                SupervisorMessage::Run(job) => self.handle_run(job).await,
                SupervisorMessage::NeedWork { worker, data } => {
                    self.handle_need_work(worker, data).await
                }
                SupervisorMessage::ContainerRemoved { worker } => {
                    self.handle_container_removed(worker).await
                }
                SupervisorMessage::RescheduleJob { worker } => self.handle_reschedule_job(worker),
                SupervisorMessage::Shutdown { ack } => {
                    self.handle_shutdown(rx).await;
                    let _ = ack.send(());
                    return;
                }
                SupervisorMessage::Inspect { reply } => {
                    let _ = reply.send(PoolSnapshot {
                        free: self.free.clone(),
                        busy: self.busy.clone(),
                        prewarmed: self.prewarmed.clone(),
                    });
                }
            }
        }
    }

    async fn initial_fill(&mut self) {
        let targets = self.prewarm_targets.clone();
        for (kind, memory_mb) in prewarm::initial_population(&targets) {
            self.start_prewarm(kind, memory_mb).await;
        }
    }

    fn spawn_worker(&mut self) -> WorkerId {
        let id = WorkerId(self.next_worker_id);
        self.next_worker_id += 1;
        let sender = proxy::spawn(
            id,
            self.driver.clone(),
            self.self_handle.clone(),
            self.idle_timeout,
        );
        self.workers.insert(id, Worker { sender });
        id
    }

    async fn start_prewarm(&mut self, kind: pool_model::ExecKind, memory_mb: u32) {
        let id = self.spawn_worker();
        self.dispatch(id, ProxyMessage::Start { kind, memory_mb }).await;
    }

    async fn dispatch(&self, worker: WorkerId, msg: ProxyMessage) {
        if let Some(w) = self.workers.get(&worker) {
            let _ = w.sender.send(msg).await;
        }
    }

    #[instrument(skip(self, job), fields(action = %job.action.name, tenant = %job.msg.tenant))]
    async fn handle_run(&mut self, job: Run) {
        if self.busy.len() as u32 >= self.max_active_containers {
            self.reschedule(job);
            return;
        }

        // (a) warm reuse
        if let Some(worker) = policy::schedule(&job.action, &job.msg.tenant, &self.free) {
            self.admit(worker, job, ContainerStateTag::Warm).await;
            return;
        }

        let under_capacity =
            (self.busy.len() + self.free.len()) as u32 < self.max_active_containers;

        // (b) prewarm promotion
        if under_capacity {
            if let Some(worker) = self.promote_prewarm(&job.action).await {
                self.admit(worker, job, ContainerStateTag::Prewarmed).await;
                return;
            }
        }

        // (c) cold start
        if under_capacity {
            let worker = self.spawn_worker();
            self.free.insert(worker, ContainerData::NoData);
            self.admit(worker, job, ContainerStateTag::Cold).await;
            return;
        }

        // (d) evict-and-recreate
        if let Some(victim) = policy::remove(&self.free) {
            self.evict(victim).await;

            if (self.busy.len() + self.free.len()) as u32 < self.max_active_containers {
                if let Some(worker) = self.promote_prewarm(&job.action).await {
                    self.admit(worker, job, ContainerStateTag::Recreated).await;
                    return;
                }
            }

            // No prewarm matched the freed slot; fall through to a cold
            // container but keep the `recreated` tag (§9 open question b).
            let worker = self.spawn_worker();
            self.free.insert(worker, ContainerData::NoData);
            self.admit(worker, job, ContainerStateTag::Recreated).await;
            return;
        }

        // Saturated with no evictable victim: self-repost.
        self.reschedule(job);
    }

    /// Removes a `prewarmed` worker matching the action's `(kind, memory)`
    /// and moves it into `free`, immediately queuing a replacement of the
    /// same parameters. Returns the promoted worker id if one matched.
    async fn promote_prewarm(&mut self, action: &pool_model::ActionDescriptor) -> Option<WorkerId> {
        let worker =
            policy::schedule_prewarmed(&action.exec_kind, action.memory_mb, &self.prewarmed)?;
        let data = self
            .prewarmed
            .remove(&worker)
            .expect("matched worker must be present in prewarmed");
        let (kind, memory_mb) = action.prewarm_key();
        self.start_prewarm(kind, memory_mb).await;
        self.free.insert(worker, data);
        Some(worker)
    }

    /// Moves `worker` from `free` to `busy` and forwards the job.
    async fn admit(&mut self, worker: WorkerId, job: Run, tag: ContainerStateTag) {
        let data = self
            .free
            .remove(&worker)
            .expect("admit() called on a worker not present in free");
        self.busy.insert(worker, data);
        info!(container_state = %tag, worker = worker.0, "containerStart");
        self.dispatch(worker, ProxyMessage::Run(job)).await;
    }

    async fn evict(&mut self, worker: WorkerId) {
        self.free.remove(&worker);
        self.dispatch(worker, ProxyMessage::Remove).await;
    }

    fn reschedule(&self, job: Run) {
        let now = Instant::now();
        let (should_log, new_deadline) =
            log_decision(job.retry_log_deadline, now, self.log_message_interval);
        if should_log {
            error!(
                action = %job.action.name,
                tenant = %job.msg.tenant,
                busy = self.busy.len(),
                free = self.free.len(),
                max_active_containers = self.max_active_containers,
                "pool saturated, no free capacity or evictable victim; rescheduling Run"
            );
        }
        let rescheduled = job.rescheduled(new_deadline);
        let _ = self.self_handle.send(SupervisorMessage::Run(rescheduled));
    }

    async fn handle_need_work(&mut self, worker: WorkerId, data: ContainerData) {
        match data {
            ContainerData::PreWarmedData { .. } => {
                // Prewarmed containers never count against active
                // capacity and never signal the feed (§4.1).
                self.prewarmed.insert(worker, data);
            }
            ContainerData::WarmedData { .. } => {
                let was_busy = self.busy.remove(&worker).is_some();
                self.free.insert(worker, data);
                if was_busy {
                    self.feed.processed().await;
                }
            }
            ContainerData::NoData | ContainerData::Removed => {
                warn!(worker = worker.0, "NeedWork with unexpected container data, ignoring");
            }
        }
    }

    async fn handle_container_removed(&mut self, worker: WorkerId) {
        self.free.remove(&worker);
        let was_busy = self.busy.remove(&worker).is_some();
        self.prewarmed.remove(&worker);
        self.workers.remove(&worker);
        if was_busy {
            self.feed.processed().await;
        }
    }

    fn handle_reschedule_job(&mut self, worker: WorkerId) {
        // No feed signal: no capacity change beyond the lost worker, and
        // the job has already been re-sent by the proxy as a new `Run`.
        self.free.remove(&worker);
        self.busy.remove(&worker);
    }

    async fn handle_shutdown(&mut self, mut rx: mpsc::UnboundedReceiver<SupervisorMessage>) {
        info!("supervisor shutting down, draining all workers");
        let all: Vec<WorkerId> = self.workers.keys().copied().collect();
        for worker in &all {
            self.dispatch(*worker, ProxyMessage::Remove).await;
        }

        while !self.workers.is_empty() {
            match rx.recv().await {
                Some(SupervisorMessage::ContainerRemoved { worker }) => {
                    self.handle_container_removed(worker).await;
                }
                Some(_) => {
                    // Ignore further scheduling traffic while draining.
                }
                None => break,
            }
        }
    }
}
