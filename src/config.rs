use crate::error::{Error, Result};
use std::time::Duration;

/// Where [`AsyncFn`](crate::bridge::AsyncFn) sends blocking calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Offload {
    /// The blocking pool of the acquired scheduler.
    #[default]
    Scheduler,
    /// A [`WorkerPool`](crate::executor::WorkerPool) owned by the bridge.
    Pool,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Pool threads kept alive while idle.
    pub num_threads: Option<usize>,
    /// Upper bound on pool threads.
    pub max_threads: usize,
    /// How long a pool thread beyond `num_threads` may idle before exiting.
    pub keep_alive: Duration,
    pub offload: Offload,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            max_threads: 512,
            keep_alive: Duration::from_secs(10),
            offload: Offload::default(),
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "asyncr-worker".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(Error::config("max_threads must be > 0"));
        }

        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > self.max_threads {
                return Err(Error::config(format!(
                    "num_threads ({}) exceeds max_threads ({})",
                    n, self.max_threads
                )));
            }
        }

        if self.keep_alive.is_zero() {
            return Err(Error::config("keep_alive must be non-zero"));
        }

        if let Some(size) = self.stack_size {
            if size < 64 * 1024 {
                return Err(Error::config("stack_size must be at least 64 KiB"));
            }
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    /// Pool threads kept alive while idle, never more than `max_threads`.
    pub fn worker_threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(num_cpus::get)
            .min(self.max_threads)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.config.max_threads = n;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn offload(mut self, offload: Offload) -> Self {
        self.config.offload = offload;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
