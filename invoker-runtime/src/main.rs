mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use invoker_common::{PoolConfig, init_tracing};
use invoker_runtime::proxy::DEFAULT_IDLE_TIMEOUT;
use invoker_runtime::{BoundedFeed, PoolSupervisor};

use cli::CliArgs;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = PoolConfig::load(&args.config)?;
    if let Some(max_active) = args.max_active {
        config.max_active_containers = max_active;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = Some(log_dir);
    }

    let _guard = init_tracing(config.log_dir.as_deref(), "invoker.log", &config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        info!(
            max_active_containers = config.max_active_containers,
            prewarm_entries = config.prewarm.len(),
            "starting invoker pool"
        );

        // The container runtime driver and broker feed are external
        // collaborators (spec.md §1); this binary wires the supervisor up
        // with placeholders so the pool's own actor logic can boot and
        // drain cleanly standalone. Embedders supply a real driver/feed.
        let driver: Arc<dyn invoker_runtime::ContainerDriver> = Arc::new(NoopDriver);
        let feed = Arc::new(BoundedFeed::new(config.max_active_containers));

        let (handle, join) = PoolSupervisor::spawn(&config, driver, feed, DEFAULT_IDLE_TIMEOUT);

        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");
        handle.shutdown().await;
        let _ = join.await;
        Ok(())
    })
}

/// Placeholder `ContainerDriver` used only so this binary links and runs
/// standalone; it never succeeds at creating a real container. Real
/// deployments supply their own driver implementation and typically embed
/// `invoker-runtime` rather than running this binary directly.
struct NoopDriver;

#[async_trait::async_trait]
impl invoker_runtime::ContainerDriver for NoopDriver {
    async fn create(
        &self,
        _kind: &pool_model::ExecKind,
        _memory_mb: u32,
    ) -> invoker_runtime::Result<invoker_runtime::ContainerHandle> {
        Err(invoker_runtime::Error::Driver(
            "no container driver configured".into(),
        ))
    }

    async fn init(&self, _handle: &invoker_runtime::ContainerHandle) -> invoker_runtime::Result<()> {
        Ok(())
    }

    async fn bind_tenant(
        &self,
        _handle: &invoker_runtime::ContainerHandle,
        _action: &pool_model::ActionDescriptor,
    ) -> invoker_runtime::Result<()> {
        Ok(())
    }

    async fn run(
        &self,
        _handle: &invoker_runtime::ContainerHandle,
        _args: &serde_json::Value,
    ) -> invoker_runtime::Result<()> {
        Ok(())
    }

    async fn pause(&self, _handle: &invoker_runtime::ContainerHandle) -> invoker_runtime::Result<()> {
        Ok(())
    }

    async fn resume(&self, _handle: &invoker_runtime::ContainerHandle) -> invoker_runtime::Result<()> {
        Ok(())
    }

    async fn remove(&self, _handle: &invoker_runtime::ContainerHandle) -> invoker_runtime::Result<()> {
        Ok(())
    }
}
