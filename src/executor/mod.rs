//! Dedicated threads for offloaded blocking calls.
//!
//! [`WorkerPool`] backs [`Offload::Pool`](crate::config::Offload::Pool):
//! named threads, fed from one injector queue, that blocking functions adapted
//! by a [`Bridge`](crate::bridge::Bridge) run on. The pool grows whenever a
//! job arrives and every thread is busy, so a job that waits on another job
//! never starves it.

pub mod panic;
pub mod worker_pool;

pub use panic::Panic;
pub use worker_pool::WorkerPool;
