//! Message contract of §4.1 and §4.2, translated into Rust enums
//! exchanged over the Tokio `mpsc` channels described in `SPEC_FULL.md`'s
//! "Supervisor transport" / "Container Proxy transport" decisions.

use pool_model::{ContainerData, ExecKind, Run, WorkerId};
use tokio::sync::oneshot;

use crate::supervisor::PoolSnapshot;

/// Messages the Pool Supervisor accepts (§4.1's incoming-message table,
/// plus the supplemented `Shutdown` of `SPEC_FULL.md`).
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Admit, schedule, or reschedule an invocation.
    Run(Run),
    /// A proxy finished a job or an init and is now idle with this data.
    NeedWork { worker: WorkerId, data: ContainerData },
    /// A proxy has terminated its container.
    ContainerRemoved { worker: WorkerId },
    /// A proxy could not execute its assigned job; it will resend the
    /// `Run` itself (as a separate `SupervisorMessage::Run`).
    RescheduleJob { worker: WorkerId },
    /// Drain every worker and stop the supervisor task. Acks once every
    /// worker has reported `ContainerRemoved`.
    Shutdown { ack: oneshot::Sender<()> },
    /// Test/observability hook: snapshot `free`/`busy`/`prewarmed` as they
    /// stand when this message is processed. Does not mutate state.
    Inspect { reply: oneshot::Sender<PoolSnapshot> },
}

/// Messages a Container Proxy accepts from the Pool Supervisor (§6).
#[derive(Debug, Clone)]
pub enum ProxyMessage {
    Start { kind: ExecKind, memory_mb: u32 },
    Run(Run),
    Remove,
}
