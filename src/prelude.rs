pub use crate::bridge::{as_async, as_async_on, as_sync, as_sync_on, AsyncFn, Bridge, SyncFn};
pub use crate::bridge::{AsyncCallable, BlockingCallable};
pub use crate::config::{Config, ConfigBuilder, Offload};
pub use crate::error::{Error, Result};
pub use crate::scheduler::{get_scheduler, Scheduler, SchedulerAccessor};

pub use crate::telemetry::{Metrics, MetricsSnapshot};
