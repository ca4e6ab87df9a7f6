pub mod driver;
pub mod error;
pub mod feed;
pub mod messages;
pub mod policy;
pub mod prewarm;
pub mod proxy;
pub mod supervisor;

pub use driver::{ContainerDriver, ContainerHandle};
pub use error::{Error, Result};
pub use feed::{BoundedFeed, FeedAdapter};
pub use messages::{ProxyMessage, SupervisorMessage};
pub use supervisor::{PoolSnapshot, PoolSupervisor, SupervisorHandle};
