//! asyncr - call async code from blocking code and blocking code from async code
//!
//! Two adapters over the tokio scheduler:
//!
//! - [`as_sync`] turns a function returning a future into an ordinary
//!   blocking function. Each call drives the future to completion on the
//!   scheduler of the calling context, or on a per-thread fallback scheduler
//!   when there is none.
//! - [`as_async`] turns a blocking function into one returning a future. Each
//!   call runs on the scheduler's blocking pool, so the scheduler thread keeps
//!   running other tasks while the call blocks.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! async fn fetch(id: u32) -> String {
//!     tokio::time::sleep(Duration::from_millis(1)).await;
//!     format!("item-{}", id)
//! }
//!
//! // blocking code calling async code
//! let fetch_blocking = asyncr::as_sync(fetch);
//! assert_eq!(fetch_blocking.call((7,)).unwrap(), "item-7");
//!
//! // async code calling blocking code
//! let checksum = asyncr::as_async(|data: Vec<u8>| data.iter().map(|b| *b as u32).sum::<u32>());
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! assert_eq!(runtime.block_on(checksum.call((vec![1, 2, 3],))).unwrap(), 6);
//! ```
//!
//! Arguments are passed as a tuple; `call(())` calls a nullary function.
//!
//! # Errors
//!
//! Both adapters return `Result<T, asyncr::Error>` where `T` is exactly what
//! the wrapped function returned. A wrapped function's own `Err` values are
//! never converted, and its panics are resumed with the original payload.
//! [`Error`] only reports failures of the bridge itself.
//!
//! # Configuration
//!
//! [`Bridge`] builds adapters from a [`Config`]: whether blocking calls go to
//! the scheduler's blocking pool or a dedicated [`executor::WorkerPool`], the
//! pool's thread limits and names, and an optional explicit scheduler.

#![warn(missing_debug_implementations)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scheduler;
pub mod telemetry;

pub use bridge::{as_async, as_async_on, as_sync, as_sync_on, AsyncFn, Bridge, SyncFn};
pub use config::{Config, ConfigBuilder, Offload};
pub use error::{Error, Result};
pub use scheduler::{get_scheduler, CurrentScheduler, Scheduler, SchedulerAccessor};
