pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{PoolConfig, PrewarmEntry};
pub use error::{Error, Result};
pub use telemetry::init_tracing;
