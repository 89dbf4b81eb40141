//! The two adapters and the factory that configures them.
//!
//! [`as_sync`] and [`as_async`] wrap a function with default settings.
//! [`Bridge`] is the configuring factory: build one from a [`Config`],
//! optionally pin it to an explicit scheduler, then wrap functions with it.

pub mod blocking;
pub mod callable;
pub mod suspend;

pub use blocking::{as_sync, as_sync_on, SyncFn};
pub use callable::{AsyncCallable, BlockingCallable};
pub use suspend::{as_async, as_async_on, AsyncFn};

use crate::config::{Config, Offload};
use crate::error::Result;
use crate::executor::WorkerPool;
use crate::scheduler::{reentrancy, CurrentScheduler, SchedulerAccessor};
use crate::telemetry::{Metrics, MetricsSnapshot};
use std::sync::Arc;
use suspend::OffloadTarget;

/// Factory for adapters sharing one configuration, scheduler source, worker
/// pool and metrics collector.
#[derive(Clone, Debug)]
pub struct Bridge {
    config: Arc<Config>,
    accessor: Arc<dyn SchedulerAccessor>,
    pool: Option<Arc<WorkerPool>>,
    metrics: Arc<Metrics>,
}

impl Bridge {
    /// Create a bridge. Sets up a worker pool when `config.offload` is
    /// [`Offload::Pool`] and enables the re-entrancy mode with `config`'s
    /// thread settings if it is not enabled yet.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        reentrancy::enable_with(&config);

        let pool = match config.offload {
            Offload::Pool => Some(Arc::new(WorkerPool::new(&config)?)),
            Offload::Scheduler => None,
        };

        Ok(Self {
            config: Arc::new(config),
            accessor: Arc::new(CurrentScheduler),
            pool,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Use `accessor` instead of the calling context's scheduler. Pass a
    /// [`Scheduler`](crate::scheduler::Scheduler) to pin every call to it.
    pub fn with_scheduler<A>(mut self, accessor: A) -> Self
    where
        A: SchedulerAccessor + 'static,
    {
        self.accessor = Arc::new(accessor);
        self
    }

    pub fn as_sync<F>(&self, func: F) -> SyncFn<F> {
        SyncFn::new(func, self.accessor.clone(), self.metrics.clone())
    }

    pub fn as_async<F>(&self, func: F) -> AsyncFn<F> {
        let target = match &self.pool {
            Some(pool) => OffloadTarget::Pool(pool.clone()),
            None => OffloadTarget::Scheduler,
        };
        AsyncFn::new(func, self.accessor.clone(), target, self.metrics.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> Option<&Arc<WorkerPool>> {
        self.pool.as_ref()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
