//! Nested drives of an already-running scheduler.
//!
//! Tokio refuses to block a thread that is inside a runtime. When a blocking
//! adapter is called from such a thread, the future is handed to a scoped
//! helper thread instead, and the calling thread waits for it. The helper
//! drives the requested scheduler itself when it can make progress there: a
//! multi-thread scheduler, or an owned runtime nobody is driving. A
//! current-thread scheduler whose only thread is the one now waiting cannot,
//! so the helper drives an independent runtime instead. Independent runtimes
//! are kept after use and handed to later helpers.
//!
//! The mode is process-wide and monotonic: once enabled it stays enabled.

use super::{accessor, Scheduler};
use crate::config::Config;
use crate::error::Result;
use parking_lot::Mutex;
use std::future::Future;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use tokio::runtime::{Handle, RuntimeFlavor};

const MAX_IDLE_RUNTIMES: usize = 4;

static DRIVER: OnceLock<NestedDriver> = OnceLock::new();

/// Enable nested drives with default settings. Safe to call any number of
/// times; every call returns the same driver.
pub fn enable() -> &'static NestedDriver {
    DRIVER.get_or_init(|| NestedDriver::new(&Config::default()))
}

/// Enable nested drives, naming and sizing helper threads after `config`.
/// Has no effect if the mode is already enabled.
pub fn enable_with(config: &Config) -> &'static NestedDriver {
    DRIVER.get_or_init(|| NestedDriver::new(config))
}

pub fn is_enabled() -> bool {
    DRIVER.get().is_some()
}

pub(crate) fn driver() -> Option<&'static NestedDriver> {
    DRIVER.get()
}

#[derive(Debug)]
pub struct NestedDriver {
    thread_name: String,
    stack_size: Option<usize>,
    drives: AtomicU64,
    idle_runtimes: Mutex<Vec<Scheduler>>,
}

impl NestedDriver {
    fn new(config: &Config) -> Self {
        Self {
            thread_name: format!("{}-nested", config.thread_name_prefix),
            stack_size: config.stack_size,
            drives: AtomicU64::new(0),
            idle_runtimes: Mutex::new(Vec::new()),
        }
    }

    /// Number of nested drives performed so far.
    pub fn drives(&self) -> u64 {
        self.drives.load(Ordering::Relaxed)
    }

    pub(crate) fn drive<F>(&self, scheduler: &Scheduler, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        self.drives.fetch_add(1, Ordering::Relaxed);

        let target = match scheduler.flavor() {
            RuntimeFlavor::MultiThread => Some(scheduler.clone()),
            _ if scheduler.is_owned() && !scheduler.is_driven() => Some(scheduler.clone()),
            _ => None,
        };
        log::trace!(
            "nested drive on {} scheduler",
            if target.is_some() { "requested" } else { "independent" }
        );

        let run = || self.run_on_helper(target, future);

        // Blocking a multi-thread worker must be announced to tokio.
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(run),
            _ => run(),
        }
    }

    fn run_on_helper<F>(&self, target: Option<Scheduler>, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        let mut builder = thread::Builder::new().name(self.thread_name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        thread::scope(|scope| {
            let helper = builder.spawn_scoped(scope, move || -> Result<F::Output> {
                match target {
                    Some(scheduler) => Ok(scheduler.block_on(future)),
                    None => {
                        let scheduler = self.checkout()?;
                        let output = scheduler.block_on(future);
                        self.checkin(scheduler);
                        Ok(output)
                    }
                }
            })?;

            match helper.join() {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            }
        })
    }

    fn checkout(&self) -> Result<Scheduler> {
        if let Some(scheduler) = self.idle_runtimes.lock().pop() {
            return Ok(scheduler);
        }
        log::debug!("creating runtime for nested drives");
        Ok(Scheduler::from_shared(Arc::new(accessor::new_runtime()?)))
    }

    fn checkin(&self, scheduler: Scheduler) {
        let mut idle = self.idle_runtimes.lock();
        if idle.len() < MAX_IDLE_RUNTIMES {
            idle.push(scheduler);
        }
    }

    #[cfg(test)]
    fn idle_runtimes(&self) -> usize {
        self.idle_runtimes.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_enable_is_idempotent() {
        let first = enable() as *const NestedDriver;
        let second = enable() as *const NestedDriver;
        let third = enable_with(&Config::default()) as *const NestedDriver;

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert!(is_enabled());
    }

    #[test]
    fn test_nested_drive_in_current_thread_runtime() {
        let driver = enable();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scheduler = Scheduler::from_handle(runtime.handle().clone());
        let before = driver.drives();

        let value = runtime.block_on(async {
            scheduler
                .drive(Some(driver), async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    21 * 2
                })
                .unwrap()
        });

        assert_eq!(value, 42);
        assert!(driver.drives() > before);
    }

    #[test]
    fn test_nested_drive_in_multi_thread_runtime() {
        let driver = enable();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let scheduler = Scheduler::from_handle(runtime.handle().clone());

        let value = runtime.block_on(async {
            tokio::spawn(async move {
                scheduler
                    .drive(Some(driver), async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        "done"
                    })
                    .unwrap()
            })
            .await
            .unwrap()
        });

        assert_eq!(value, "done");
    }

    #[test]
    fn test_pinned_runtime_is_driven_when_nested() {
        let driver = enable();
        let pinned = Scheduler::from_runtime(
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap(),
        );
        let outer = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let park_task = || async {
            tokio::spawn(std::future::pending::<()>());
        };

        pinned.drive(Some(driver), park_task()).unwrap();
        assert_eq!(pinned.handle().metrics().num_alive_tasks(), 1);

        outer.block_on(async { pinned.drive(Some(driver), park_task()).unwrap() });
        assert_eq!(pinned.handle().metrics().num_alive_tasks(), 2);
    }

    #[test]
    fn test_pinned_runtime_nested_in_itself() {
        let driver = enable();
        let pinned = Scheduler::from_runtime(
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap(),
        );

        let value = pinned.block_on(async {
            pinned
                .drive(Some(driver), async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    7
                })
                .unwrap()
        });

        assert_eq!(value, 7);
    }

    #[test]
    fn test_independent_runtime_is_reused() {
        let driver = NestedDriver::new(&Config::default());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scheduler = Scheduler::from_handle(runtime.handle().clone());

        let alive = runtime.block_on(async {
            driver
                .drive(&scheduler, async {
                    tokio::spawn(std::future::pending::<()>());
                })
                .unwrap();
            driver
                .drive(&scheduler, async { Handle::current().metrics().num_alive_tasks() })
                .unwrap()
        });

        assert_eq!(alive, 1);
        assert_eq!(driver.idle_runtimes(), 1);
        assert_eq!(runtime.handle().metrics().num_alive_tasks(), 0);
    }

    #[test]
    fn test_nested_drive_resumes_panic() {
        let driver = enable();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scheduler = Scheduler::from_handle(runtime.handle().clone());

        let caught = runtime.block_on(async {
            panic::catch_unwind(panic::AssertUnwindSafe(|| {
                scheduler.drive(Some(driver), async { panic!("nested boom") })
            }))
        });

        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"nested boom"));
    }
}
