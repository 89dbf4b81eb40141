pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the bridge itself.
///
/// Failures of the wrapped function are never translated into this type:
/// its return value (including any `Err`) reaches the caller unchanged and
/// its panics are resumed with the original payload.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("scheduler acquisition failed: {0}")]
    SchedulerAcquisition(String),

    #[error("scheduler is already running on this thread and nested drives are not enabled")]
    SchedulerRunning,

    #[error("executor error: {0}")]
    Executor(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("task was cancelled before it completed")]
    Canceled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn scheduler_acquisition<S: Into<String>>(msg: S) -> Self {
        Error::SchedulerAcquisition(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
