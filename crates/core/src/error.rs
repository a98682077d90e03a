use thiserror::Error;

/// Top-level error type used across the entire application.
///
/// Variants carry rendered messages rather than source errors so the type stays
/// `Clone` and can be published through the sampler's state channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TegraError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot spawn '{path}': {message}")]
    Spawn { path: String, message: String },

    #[error("sampler stdout is not piped")]
    NoStdout,

    #[error("sampler is already started")]
    AlreadyStarted,

    #[error("sampler is not running")]
    NotRunning,

    #[error("sampler stopped before all devices reported")]
    StoppedBeforeReady,

    #[error("no complete sample within {0} ms")]
    StartupTimeout(u64),

    #[error("read error: {0}")]
    Read(String),

    #[error("sampler output is not valid UTF-8")]
    Decode,
}

pub type Result<T, E = TegraError> = std::result::Result<T, E>;
