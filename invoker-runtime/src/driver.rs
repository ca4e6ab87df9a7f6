//! The runtime-driver boundary (§1 "container runtime driver ... out of
//! scope"). The pool only *commands* container lifecycle operations; how
//! a container is actually created, paused, or torn down belongs to a
//! layer above this crate. `invoker-tests` supplies an in-memory
//! implementation for integration tests.

use async_trait::async_trait;

use pool_model::{ActionDescriptor, ExecKind};

use crate::error::Result;

/// Opaque handle to a created container. The pool never inspects it; it
/// is threaded back through `run`, `pause`, `resume` and `remove`.
pub type ContainerHandle = String;

/// The five lifecycle operations of §3: create, init, run, pause/resume,
/// remove. A `ContainerDriver` is shared (`Arc`) across every Container
/// Proxy task.
#[async_trait]
pub trait ContainerDriver: Send + Sync + 'static {
    /// Creates a container for the given `(exec_kind, memory_mb)` only —
    /// callers MUST NOT pass tenant code here; this is the guard the
    /// prewarm code-field hazard (§4.3, §9) relies on.
    async fn create(&self, kind: &ExecKind, memory_mb: u32) -> Result<ContainerHandle>;

    /// Initializes the runtime inside an already-created container so it
    /// becomes ready to accept jobs (used both for a bare prewarm
    /// initialization and for the cold-start path).
    async fn init(&self, handle: &ContainerHandle) -> Result<()>;

    /// Binds a prewarmed, runtime-initialized container to a specific
    /// tenant's action before its first job executes.
    async fn bind_tenant(&self, handle: &ContainerHandle, action: &ActionDescriptor) -> Result<()>;

    /// Executes one job inside the container. A transient failure
    /// (`Error::Driver`, no partial side effect visible to the
    /// activation) triggers the proxy's `RescheduleJob` path. An
    /// unrecoverable death (`Error::ContainerCrashed`) triggers the
    /// terminal path instead: `ContainerRemoved` only, no requeue (§7).
    async fn run(&self, handle: &ContainerHandle, args: &serde_json::Value) -> Result<()>;

    async fn pause(&self, handle: &ContainerHandle) -> Result<()>;

    async fn resume(&self, handle: &ContainerHandle) -> Result<()>;

    async fn remove(&self, handle: &ContainerHandle) -> Result<()>;
}
