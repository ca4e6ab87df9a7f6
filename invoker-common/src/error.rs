use thiserror::Error;

/// Errors raised while loading or validating pool configuration.
///
/// These are construction-time errors only (§7 "configuration errors"):
/// the pool refuses to start rather than run with an invalid
/// configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
