use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

/// A panic caught on a worker thread, payload intact, so it can be resumed
/// in the task that awaits the call.
pub struct Panic {
    payload: Box<dyn Any + Send + 'static>,
}

impl Panic {
    /// Run `f`, turning a panic into `Err`.
    pub fn catch<F, R>(f: F) -> Result<R, Panic>
    where
        F: FnOnce() -> R,
    {
        catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
            let panic = Panic::from_payload(payload);
            log::warn!("offloaded call panicked: {}", panic.message());
            panic
        })
    }

    pub(crate) fn from_payload(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self { payload }
    }

    pub fn message(&self) -> &str {
        if let Some(s) = self.payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = self.payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "unknown panic"
        }
    }

    /// Continue unwinding on the current thread with the original payload.
    pub fn resume(self) -> ! {
        resume_unwind(self.payload)
    }
}

impl fmt::Debug for Panic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panic")
            .field("message", &self.message())
            .finish()
    }
}
