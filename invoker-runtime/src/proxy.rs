//! Container Proxy (§4.2): a per-container state machine task that owns
//! one runtime container's lifecycle and serializes jobs against it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pool_model::{ContainerData, Run, WorkerId};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::driver::{ContainerDriver, ContainerHandle};
use crate::messages::{ProxyMessage, SupervisorMessage};
use crate::supervisor::SupervisorHandle;

/// Default idle period before a proxy self-destructs (§4.2 "any state +
/// age/idle timeout"). Not part of §6's configuration surface — spec.md
/// names the policy but does not parameterize it, so a constant stands in
/// until a caller needs it tunable.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Outcome of one `execute` call, carried back to the proxy loop over
/// `done_tx` once the spawned job task finishes.
struct JobOutcome {
    job: Run,
    handle: Option<ContainerHandle>,
    result: crate::error::Result<ContainerData>,
}

/// Spawns a Container Proxy task and returns the channel used to deliver
/// `ProxyMessage`s to it.
pub fn spawn(
    id: WorkerId,
    driver: Arc<dyn ContainerDriver>,
    supervisor: SupervisorHandle,
    idle_timeout: Duration,
) -> mpsc::Sender<ProxyMessage> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(run(id, driver, supervisor, rx, idle_timeout));
    tx
}

#[instrument(skip(driver, supervisor, rx), fields(worker = id.0))]
async fn run(
    id: WorkerId,
    driver: Arc<dyn ContainerDriver>,
    supervisor: SupervisorHandle,
    mut rx: mpsc::Receiver<ProxyMessage>,
    idle_timeout: Duration,
) {
    let mut data = ContainerData::NoData;
    let mut handle: Option<ContainerHandle> = None;
    let mut busy = false;

    // Job execution runs on its own task so this loop stays responsive to
    // `rx` while a job is in flight — that responsiveness is what lets the
    // guard below ever actually observe a second `Run` arriving for a
    // worker that is still busy, rather than being unreachable dead code.
    let (done_tx, mut done_rx) = mpsc::channel::<JobOutcome>(1);

    loop {
        let idle_since_started = !busy && handle.is_some();
        tokio::select! {
            biased;

            received = rx.recv() => {
                match received {
                    None => return,
                    Some(ProxyMessage::Start { kind, memory_mb }) => {
                        if let Err(err) = start(&driver, &mut handle, &kind, memory_mb).await {
                            warn!(%err, "failed to start prewarm container, aborting proxy");
                            let _ = supervisor.send(SupervisorMessage::ContainerRemoved { worker: id });
                            return;
                        }
                        data = ContainerData::PreWarmedData { kind, memory_mb };
                        let _ = supervisor.send(SupervisorMessage::NeedWork {
                            worker: id,
                            data: data.clone(),
                        });
                    }
                    Some(ProxyMessage::Run(job)) => {
                        if busy {
                            // §4.2 invariant: at most one in-flight job per proxy.
                            let _ = supervisor.send(SupervisorMessage::RescheduleJob { worker: id });
                            let _ = supervisor.send(SupervisorMessage::Run(job));
                            continue;
                        }
                        busy = true;
                        let driver = driver.clone();
                        let done_tx = done_tx.clone();
                        let handle_for_job = handle.clone();
                        let data_for_job = data.clone();
                        tokio::spawn(async move {
                            let result = execute(&driver, handle_for_job.clone(), &data_for_job, &job).await;
                            let (result, handle) = match result {
                                Ok((outcome, handle)) => (Ok(outcome), handle),
                                Err(err) => (Err(err), handle_for_job),
                            };
                            let _ = done_tx.send(JobOutcome { job, handle, result }).await;
                        });
                    }
                    Some(ProxyMessage::Remove) => {
                        destroy(&driver, &mut handle).await;
                        let _ = supervisor.send(SupervisorMessage::ContainerRemoved { worker: id });
                        return;
                    }
                }
            }

            Some(outcome) = done_rx.recv(), if busy => {
                busy = false;
                handle = outcome.handle;
                match outcome.result {
                    Ok(warmed) => {
                        data = warmed;
                        let _ = supervisor.send(SupervisorMessage::NeedWork {
                            worker: id,
                            data: data.clone(),
                        });
                    }
                    Err(crate::error::Error::ContainerCrashed(reason)) => {
                        // §7 terminal path: the container is gone and the
                        // activation with it. Only `ContainerRemoved` is
                        // sent — no `RescheduleJob`, no job repost — so the
                        // supervisor's busy-worker bookkeeping is the only
                        // thing that signals the feed here.
                        warn!(reason = %reason, "container crashed unrecoverably, activation lost");
                        destroy(&driver, &mut handle).await;
                        let _ = supervisor.send(SupervisorMessage::ContainerRemoved { worker: id });
                        return;
                    }
                    Err(err) => {
                        warn!(%err, "job execution failed, rescheduling and retiring container");
                        let _ = supervisor.send(SupervisorMessage::RescheduleJob { worker: id });
                        let _ = supervisor.send(SupervisorMessage::Run(outcome.job));
                        destroy(&driver, &mut handle).await;
                        let _ = supervisor.send(SupervisorMessage::ContainerRemoved { worker: id });
                        return;
                    }
                }
            }

            _ = tokio::time::sleep(idle_timeout), if idle_since_started => {
                debug!("proxy idle timeout elapsed, self-destructing");
                destroy(&driver, &mut handle).await;
                let _ = supervisor.send(SupervisorMessage::ContainerRemoved { worker: id });
                return;
            }
        }
    }
}

async fn start(
    driver: &Arc<dyn ContainerDriver>,
    handle: &mut Option<ContainerHandle>,
    kind: &pool_model::ExecKind,
    memory_mb: u32,
) -> crate::error::Result<()> {
    let h = driver.create(kind, memory_mb).await?;
    driver.init(&h).await?;
    *handle = Some(h);
    Ok(())
}

/// Runs one job to completion against whatever lifecycle stage `data`
/// says the container is in (cold / prewarmed / warm), returning the
/// `WarmedData` the proxy should report on success plus the container
/// handle to carry forward (set on a cold start, unchanged otherwise).
async fn execute(
    driver: &Arc<dyn ContainerDriver>,
    mut handle: Option<ContainerHandle>,
    data: &ContainerData,
    job: &Run,
) -> crate::error::Result<(ContainerData, Option<ContainerHandle>)> {
    match data {
        ContainerData::NoData => {
            let h = driver.create(&job.action.exec_kind, job.action.memory_mb).await?;
            driver.init(&h).await?;
            driver.bind_tenant(&h, &job.action).await?;
            driver.run(&h, &job.msg.args).await?;
            handle = Some(h);
        }
        ContainerData::PreWarmedData { .. } => {
            let h = handle.as_ref().expect("prewarmed proxy must hold a handle");
            driver.bind_tenant(h, &job.action).await?;
            driver.run(h, &job.msg.args).await?;
        }
        ContainerData::WarmedData { .. } => {
            let h = handle.as_ref().expect("warmed proxy must hold a handle");
            driver.run(h, &job.msg.args).await?;
        }
        ContainerData::Removed => {
            return Err(crate::error::Error::Driver(
                "job dispatched to a removed container".into(),
            ));
        }
    }

    let warmed = ContainerData::WarmedData {
        kind: job.action.exec_kind.clone(),
        memory_mb: job.action.memory_mb,
        tenant: job.msg.tenant.clone(),
        action: job.action.clone(),
        last_used: Instant::now(),
    };
    Ok((warmed, handle))
}

async fn destroy(driver: &Arc<dyn ContainerDriver>, handle: &mut Option<ContainerHandle>) {
    if let Some(h) = handle.take() {
        if let Err(err) = driver.remove(&h).await {
            warn!(%err, "error removing container during teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pool_model::{ActionDescriptor, ActivationMessage, ExecKind};
    use tokio::sync::Notify;

    struct BlockingDriver {
        gate: Notify,
        run_calls: AtomicUsize,
    }

    #[async_trait]
    impl ContainerDriver for BlockingDriver {
        async fn create(&self, _kind: &ExecKind, _memory_mb: u32) -> crate::error::Result<ContainerHandle> {
            Ok("handle-0".to_string())
        }

        async fn init(&self, _handle: &ContainerHandle) -> crate::error::Result<()> {
            Ok(())
        }

        async fn bind_tenant(
            &self,
            _handle: &ContainerHandle,
            _action: &ActionDescriptor,
        ) -> crate::error::Result<()> {
            Ok(())
        }

        async fn run(&self, _handle: &ContainerHandle, _args: &serde_json::Value) -> crate::error::Result<()> {
            let n = self.run_calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                self.gate.notified().await;
            }
            Ok(())
        }

        async fn pause(&self, _handle: &ContainerHandle) -> crate::error::Result<()> {
            Ok(())
        }

        async fn resume(&self, _handle: &ContainerHandle) -> crate::error::Result<()> {
            Ok(())
        }

        async fn remove(&self, _handle: &ContainerHandle) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn job() -> Run {
        let action = ActionDescriptor::new("echo", 1, ExecKind::new("nodejs:6"), 256, 60_000);
        let msg = ActivationMessage {
            activation_id: "a".into(),
            transaction_id: "t".into(),
            tenant: "tenantX".into(),
            args: serde_json::json!({}),
            submitted_at: chrono::Utc::now(),
        };
        Run::new(action, msg)
    }

    #[tokio::test]
    async fn second_run_while_busy_is_rescheduled_not_dropped() {
        let driver = Arc::new(BlockingDriver {
            gate: Notify::new(),
            run_calls: AtomicUsize::new(0),
        });
        let (sup_tx, mut sup_rx) = mpsc::unbounded_channel();
        let supervisor = SupervisorHandle::for_test(sup_tx);
        let proxy_tx = spawn(
            WorkerId(0),
            driver.clone(),
            supervisor,
            Duration::from_secs(600),
        );

        proxy_tx.send(ProxyMessage::Run(job())).await.unwrap();
        // Let the proxy pick the job up and block inside driver.run().
        tokio::time::sleep(Duration::from_millis(20)).await;
        proxy_tx.send(ProxyMessage::Run(job())).await.unwrap();

        let first = sup_rx.recv().await.unwrap();
        assert!(matches!(
            first,
            SupervisorMessage::RescheduleJob { worker } if worker == WorkerId(0)
        ));
        let second = sup_rx.recv().await.unwrap();
        assert!(matches!(second, SupervisorMessage::Run(_)));

        driver.gate.notify_waiters();
        let third = sup_rx.recv().await.unwrap();
        assert!(matches!(
            third,
            SupervisorMessage::NeedWork { worker, .. } if worker == WorkerId(0)
        ));
    }
}
