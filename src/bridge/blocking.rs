//! Calling async functions from blocking code.

use super::callable::AsyncCallable;
use crate::error::Result;
use crate::scheduler::{self, reentrancy, CurrentScheduler, Scheduler, SchedulerAccessor};
use crate::telemetry::{self, CallKind, Metrics};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Wrap an async function so it can be called from ordinary sequential code.
///
/// Every call acquires the scheduler for the calling context (the running
/// runtime, or the thread's fallback runtime) and blocks until the future
/// completes.
///
/// ```
/// use std::time::Duration;
///
/// let answer = asyncr::as_sync(|| async {
///     tokio::time::sleep(Duration::from_millis(1)).await;
///     42
/// });
///
/// assert_eq!(answer.call(()).unwrap(), 42);
/// ```
pub fn as_sync<F>(func: F) -> SyncFn<F> {
    SyncFn::new(func, Arc::new(CurrentScheduler), telemetry::global_metrics())
}

/// Like [`as_sync`], but always drives calls on `scheduler`.
pub fn as_sync_on<F>(scheduler: Scheduler, func: F) -> SyncFn<F> {
    SyncFn::new(func, Arc::new(scheduler), telemetry::global_metrics())
}

/// An async function exposed as a blocking one.
#[derive(Clone)]
pub struct SyncFn<F> {
    func: F,
    accessor: Arc<dyn SchedulerAccessor>,
    metrics: Arc<Metrics>,
}

impl<F> SyncFn<F> {
    pub(crate) fn new(func: F, accessor: Arc<dyn SchedulerAccessor>, metrics: Arc<Metrics>) -> Self {
        Self {
            func,
            accessor,
            metrics,
        }
    }

    /// Call the wrapped function and block until its future resolves.
    ///
    /// `Ok` carries exactly what the future produced, so an `Err` returned by
    /// the wrapped function arrives inside it untouched. The outer error is
    /// only for failing to acquire or drive a scheduler. A panic in the
    /// wrapped function unwinds out of this call with its original payload.
    pub fn call<Args>(&self, args: Args) -> Result<F::Output>
    where
        F: AsyncCallable<Args>,
        F::Output: Send,
    {
        let driver = reentrancy::enable();
        let start = Instant::now();

        let scheduler = match self.accessor.acquire() {
            Ok(scheduler) => scheduler,
            Err(e) => {
                self.metrics.record_failure();
                return Err(e);
            }
        };

        if scheduler::in_runtime_context() {
            self.metrics.record_nested_drive();
        }

        let result = scheduler.drive(Some(driver), self.func.call_async(args));

        match &result {
            Ok(_) => self.metrics.record_call(CallKind::Sync, start.elapsed()),
            Err(e) => {
                log::debug!("blocking call failed: {}", e);
                self.metrics.record_failure();
            }
        }

        result
    }

    pub fn inner(&self) -> &F {
        &self.func
    }

    pub fn into_inner(self) -> F {
        self.func
    }
}

impl<F> fmt::Debug for SyncFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFn")
            .field("func", &std::any::type_name::<F>())
            .field("accessor", &self.accessor)
            .finish()
    }
}
