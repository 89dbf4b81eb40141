//! Calling blocking functions from async code.

use super::callable::BlockingCallable;
use crate::error::{Error, Result};
use crate::executor::{Panic, WorkerPool};
use crate::scheduler::{reentrancy, CurrentScheduler, Scheduler, SchedulerAccessor};
use crate::telemetry::{self, CallKind, Metrics};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Wrap a blocking function so it can be awaited without stalling the
/// scheduler thread. Calls run on the blocking pool of the scheduler acquired
/// for the calling context, which grows as needed, so a blocking function may
/// itself make bridged calls.
///
/// ```
/// let double = asyncr::as_async(|x: u32| x * 2);
///
/// let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let value = runtime.block_on(double.call((21,))).unwrap();
/// assert_eq!(value, 42);
/// ```
pub fn as_async<F>(func: F) -> AsyncFn<F> {
    AsyncFn::new(
        func,
        Arc::new(CurrentScheduler),
        OffloadTarget::Scheduler,
        telemetry::global_metrics(),
    )
}

/// Like [`as_async`], but runs calls on the blocking pool of `scheduler`.
pub fn as_async_on<F>(scheduler: Scheduler, func: F) -> AsyncFn<F> {
    AsyncFn::new(
        func,
        Arc::new(scheduler),
        OffloadTarget::Scheduler,
        telemetry::global_metrics(),
    )
}

#[derive(Clone)]
pub(crate) enum OffloadTarget {
    Pool(Arc<WorkerPool>),
    /// The acquired scheduler's blocking pool.
    Scheduler,
}

impl fmt::Debug for OffloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffloadTarget::Pool(pool) => f.debug_tuple("Pool").field(pool).finish(),
            OffloadTarget::Scheduler => f.write_str("Scheduler"),
        }
    }
}

/// A blocking function exposed as an async one.
pub struct AsyncFn<F> {
    func: Arc<F>,
    accessor: Arc<dyn SchedulerAccessor>,
    target: OffloadTarget,
    metrics: Arc<Metrics>,
}

impl<F> AsyncFn<F> {
    pub(crate) fn new(
        func: F,
        accessor: Arc<dyn SchedulerAccessor>,
        target: OffloadTarget,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            func: Arc::new(func),
            accessor,
            target,
            metrics,
        }
    }

    /// Start a call. The returned future runs the wrapped function on a
    /// worker thread and resolves with its return value; only the awaiting
    /// task is suspended meanwhile.
    ///
    /// A panic in the wrapped function is resumed in the awaiting task with
    /// its original payload. [`Error::Canceled`] means the job was dropped
    /// before it ran, e.g. because its pool shut down.
    pub fn call<Args>(&self, args: Args) -> impl Future<Output = Result<F::Output>> + Send + 'static
    where
        F: BlockingCallable<Args> + 'static,
        Args: Send + 'static,
        F::Output: Send + 'static,
    {
        let func = self.func.clone();
        let accessor = self.accessor.clone();
        let target = self.target.clone();
        let metrics = self.metrics.clone();

        async move {
            reentrancy::enable();
            let start = Instant::now();

            let job = move || func.call_blocking(args);
            match offload(accessor, target, &metrics, job).await {
                Ok(Ok(value)) => {
                    metrics.record_call(CallKind::Async, start.elapsed());
                    Ok(value)
                }
                Ok(Err(panic)) => {
                    metrics.record_failure();
                    panic.resume()
                }
                Err(e) => {
                    log::debug!("offloaded call failed: {}", e);
                    metrics.record_failure();
                    Err(e)
                }
            }
        }
    }

    pub fn inner(&self) -> &F {
        &self.func
    }

    /// The wrapped function, if no call still holds on to it.
    pub fn into_inner(self) -> Option<F> {
        Arc::try_unwrap(self.func).ok()
    }
}

impl<F> Clone for AsyncFn<F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            accessor: self.accessor.clone(),
            target: self.target.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<F> fmt::Debug for AsyncFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFn")
            .field("func", &std::any::type_name::<F>())
            .field("accessor", &self.accessor)
            .field("target", &self.target)
            .finish()
    }
}

async fn offload<J, R>(
    accessor: Arc<dyn SchedulerAccessor>,
    target: OffloadTarget,
    metrics: &Metrics,
    job: J,
) -> Result<std::result::Result<R, Panic>>
where
    J: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let scheduler = accessor.acquire()?;
    metrics.record_offload();

    let receiver = match target {
        OffloadTarget::Pool(pool) => pool.offload(job)?,
        OffloadTarget::Scheduler => {
            return match scheduler.spawn_blocking(job).await {
                Ok(value) => Ok(Ok(value)),
                Err(e) if e.is_panic() => Ok(Err(Panic::from_payload(e.into_panic()))),
                Err(_) => Err(Error::Canceled),
            };
        }
    };

    receiver.recv().await.map_err(|_| Error::Canceled)
}
