//! Finding the scheduler for the calling context.

use super::Scheduler;
use crate::error::{Error, Result};
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};

// One fallback scheduler per thread, built on first use.
thread_local! {
    static FALLBACK: OnceCell<Arc<Runtime>> = const { OnceCell::new() };
}

/// Source of the scheduler an adapter drives its calls on.
pub trait SchedulerAccessor: Send + Sync + fmt::Debug {
    fn acquire(&self) -> Result<Scheduler>;
}

/// The runtime the caller is inside, or the thread's fallback runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentScheduler;

impl SchedulerAccessor for CurrentScheduler {
    fn acquire(&self) -> Result<Scheduler> {
        match Handle::try_current() {
            Ok(handle) => Ok(Scheduler::from_handle(handle)),
            Err(e) if e.is_missing_context() => fallback_scheduler(),
            Err(e) => Err(Error::scheduler_acquisition(e.to_string())),
        }
    }
}

/// An explicit handle always hands out itself.
impl SchedulerAccessor for Scheduler {
    fn acquire(&self) -> Result<Scheduler> {
        Ok(self.clone())
    }
}

/// Get the scheduler for the calling context.
///
/// Returns the running runtime when called from inside one. Otherwise returns
/// this thread's fallback current-thread runtime, creating it the first time.
/// The fallback is not entered or installed as the current runtime.
pub fn get_scheduler() -> Result<Scheduler> {
    CurrentScheduler.acquire()
}

fn fallback_scheduler() -> Result<Scheduler> {
    FALLBACK
        .try_with(|cell| {
            if let Some(runtime) = cell.get() {
                return Ok(Scheduler::from_shared(runtime.clone()));
            }

            let runtime = Arc::new(new_runtime()?);
            log::debug!(
                "created fallback scheduler for thread {:?}",
                std::thread::current().name().unwrap_or("unnamed")
            );
            Ok(Scheduler::from_shared(cell.get_or_init(|| runtime).clone()))
        })
        .map_err(|e| Error::scheduler_acquisition(format!("fallback scheduler unavailable: {}", e)))?
}

pub(crate) fn new_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}
