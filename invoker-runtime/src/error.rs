use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A transient driver failure (§7 "transient proxy errors"): the
    /// container never produced a side effect, so the job is safe to
    /// requeue via `RescheduleJob`.
    #[error("container driver error: {0}")]
    Driver(String),

    /// An unrecoverable runtime death (§7 "terminal container errors").
    /// The proxy reports `ContainerRemoved` only; the activation is lost
    /// and is not requeued by the pool — reporting it is the job of
    /// layers above the pool.
    #[error("container crashed unrecoverably: {0}")]
    ContainerCrashed(String),

    #[error("config error: {0}")]
    Config(#[from] invoker_common::Error),

    #[error("pool channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
