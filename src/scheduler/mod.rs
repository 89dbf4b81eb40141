//! Scheduler handles.
//!
//! A [`Scheduler`] is the tokio runtime a bridged call is driven on: either the
//! runtime the calling thread is already inside, or an owned runtime (the
//! per-thread fallback, or one supplied explicitly by the caller). The
//! [`accessor`] finds or creates one; [`reentrancy`] covers driving a
//! scheduler from a thread that is already running one.

pub mod accessor;
pub mod reentrancy;

pub use accessor::{get_scheduler, CurrentScheduler, SchedulerAccessor};
pub use reentrancy::NestedDriver;

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tokio::task::JoinHandle;

// Owned runtimes currently inside `Scheduler::block_on`, by address.
static DRIVEN: Mutex<Vec<usize>> = Mutex::new(Vec::new());

/// Handle to one cooperative scheduler instance.
///
/// Cloning is cheap and every clone refers to the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    /// A runtime reached through a handle, typically the one the acquiring
    /// thread was running inside.
    Entered(Handle),
    Owned(Arc<Runtime>),
}

impl Scheduler {
    pub fn from_runtime(runtime: Runtime) -> Self {
        Self::from_shared(Arc::new(runtime))
    }

    pub fn from_shared(runtime: Arc<Runtime>) -> Self {
        Self {
            kind: Kind::Owned(runtime),
        }
    }

    /// Wrap a handle to a runtime owned elsewhere.
    ///
    /// A current-thread runtime can only run its I/O and timer drivers from
    /// `Runtime::block_on`, so prefer [`Scheduler::from_shared`] when the
    /// override is a current-thread runtime that nothing else is driving.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            kind: Kind::Entered(handle),
        }
    }

    pub fn handle(&self) -> &Handle {
        match &self.kind {
            Kind::Entered(handle) => handle,
            Kind::Owned(runtime) => runtime.handle(),
        }
    }

    pub fn flavor(&self) -> RuntimeFlavor {
        self.handle().runtime_flavor()
    }

    /// True when this handle keeps its runtime alive.
    pub fn is_owned(&self) -> bool {
        matches!(self.kind, Kind::Owned(_))
    }

    /// Drive `future` to completion from sequential code.
    ///
    /// Outside a runtime context the scheduler runs on the calling thread.
    /// Inside one the drive is nested, which requires the re-entrancy mode
    /// ([`reentrancy::enable`]); without it this returns
    /// [`Error::SchedulerRunning`].
    pub fn run_until_complete<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        self.drive(reentrancy::driver(), future)
    }

    pub(crate) fn drive<F>(&self, driver: Option<&NestedDriver>, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        if !in_runtime_context() {
            return Ok(self.block_on(future));
        }

        match driver {
            Some(driver) => driver.drive(self, future),
            None => Err(Error::SchedulerRunning),
        }
    }

    /// Callers must not be inside a runtime context.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match &self.kind {
            Kind::Owned(runtime) => {
                let _driving = DrivenGuard::enter(runtime);
                runtime.block_on(future)
            }
            Kind::Entered(handle) => handle.block_on(future),
        }
    }

    /// True while an owned runtime is being driven through
    /// [`Scheduler::block_on`] on some thread.
    pub(crate) fn is_driven(&self) -> bool {
        match &self.kind {
            Kind::Owned(runtime) => DRIVEN.lock().contains(&runtime_key(runtime)),
            Kind::Entered(_) => false,
        }
    }

    /// Run a blocking closure on this scheduler's blocking pool.
    pub fn spawn_blocking<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle().spawn_blocking(f)
    }

    /// True when both handles own the same runtime.
    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        match (&self.kind, &other.kind) {
            (Kind::Owned(a), Kind::Owned(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn runtime_key(runtime: &Arc<Runtime>) -> usize {
    Arc::as_ptr(runtime) as usize
}

struct DrivenGuard(usize);

impl DrivenGuard {
    fn enter(runtime: &Arc<Runtime>) -> Self {
        let key = runtime_key(runtime);
        DRIVEN.lock().push(key);
        Self(key)
    }
}

impl Drop for DrivenGuard {
    fn drop(&mut self) {
        let mut driven = DRIVEN.lock();
        if let Some(pos) = driven.iter().position(|key| *key == self.0) {
            driven.swap_remove(pos);
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("owned", &self.is_owned())
            .field("flavor", &self.flavor())
            .finish()
    }
}

/// Whether the calling thread is currently inside a tokio runtime.
pub fn in_runtime_context() -> bool {
    Handle::try_current().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn current_thread_runtime() -> Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_until_complete_outside_context() {
        let scheduler = Scheduler::from_runtime(current_thread_runtime());

        let value = scheduler
            .run_until_complete(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                42
            })
            .unwrap();

        assert_eq!(value, 42);
        assert!(scheduler.is_owned());
        assert_eq!(scheduler.flavor(), RuntimeFlavor::CurrentThread);
    }

    #[test]
    fn test_nested_drive_rejected_without_driver() {
        let runtime = current_thread_runtime();
        let scheduler = Scheduler::from_handle(runtime.handle().clone());

        let result = runtime.block_on(async { scheduler.drive(None, async { 1 }) });

        assert!(matches!(result, Err(Error::SchedulerRunning)));
    }

    #[test]
    fn test_spawn_blocking_runs_closure() {
        let scheduler = Scheduler::from_runtime(current_thread_runtime());
        let handle = scheduler.spawn_blocking(|| 7 * 6);

        let value = scheduler.block_on(handle).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_in_runtime_context() {
        assert!(!in_runtime_context());

        let runtime = current_thread_runtime();
        assert!(runtime.block_on(async { in_runtime_context() }));
    }

    #[test]
    fn test_driven_only_inside_block_on() {
        let scheduler = Scheduler::from_runtime(current_thread_runtime());
        let clone = scheduler.clone();
        assert!(!scheduler.is_driven());

        let inside = scheduler.block_on(async move { clone.is_driven() });

        assert!(inside);
        assert!(!scheduler.is_driven());
    }

    #[test]
    fn test_clones_share_runtime() {
        let scheduler = Scheduler::from_runtime(current_thread_runtime());
        let clone = scheduler.clone();
        assert!(scheduler.ptr_eq(&clone));

        let other = Scheduler::from_runtime(current_thread_runtime());
        assert!(!scheduler.ptr_eq(&other));
    }
}
