use super::panic::Panic;
use crate::config::Config;
use crate::error::{Error, Result};
use crossbeam_deque::{Injector, Steal};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Threads that blocking calls are offloaded to.
///
/// The pool starts empty. A submitted job goes to an idle thread if there is
/// one, otherwise a new thread is started for it, up to `max_threads`.
/// Threads beyond `num_threads` exit after idling for `keep_alive`; the rest
/// sleep until woken by a submit.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

struct Shared {
    queue: Injector<Job>,
    state: Mutex<State>,
    wakeup: Condvar,
    core_threads: usize,
    max_threads: usize,
    keep_alive: Duration,
    thread_name_prefix: String,
    stack_size: Option<usize>,
    next_id: AtomicUsize,
}

#[derive(Debug, Default)]
struct State {
    threads: usize,
    idle: usize,
    /// Idle threads already claimed by a submit that have not woken yet.
    notified: usize,
    shutdown: bool,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        log::debug!(
            "created worker pool {:?} (keep {}, max {} threads)",
            config.thread_name_prefix,
            config.worker_threads(),
            config.max_threads
        );

        Ok(Self {
            shared: Arc::new(Shared {
                queue: Injector::new(),
                state: Mutex::new(State::default()),
                wakeup: Condvar::new(),
                core_threads: config.worker_threads(),
                max_threads: config.max_threads,
                keep_alive: config.keep_alive,
                thread_name_prefix: config.thread_name_prefix.clone(),
                stack_size: config.stack_size,
                next_id: AtomicUsize::new(0),
            }),
        })
    }

    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if state.shutdown {
            return Err(Error::executor("worker pool is shut down"));
        }

        shared.queue.push(Box::new(f));

        if state.idle > state.notified {
            state.notified += 1;
            shared.wakeup.notify_one();
        } else if state.threads < shared.max_threads {
            state.threads += 1;
            if let Err(e) = Shared::spawn_worker(shared) {
                state.threads -= 1;
                if state.threads == 0 {
                    // nobody is left to run it
                    shared.drain();
                }
                return Err(Error::executor(format!("spawn failed: {}", e)));
            }
        }

        Ok(())
    }

    /// Run `f` on a pool thread and deliver its outcome, panics included, to
    /// the returned one-shot receiver. The receiver sees a closed channel if
    /// the pool shuts down before the job runs.
    pub fn offload<F, R>(&self, f: F) -> Result<async_channel::Receiver<std::result::Result<R, Panic>>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = async_channel::bounded(1);

        self.execute(move || {
            let _ = sender.try_send(Panic::catch(f));
        })?;

        Ok(receiver)
    }

    /// Threads currently alive, busy or idle.
    pub fn num_threads(&self) -> usize {
        self.shared.state.lock().threads
    }

    pub fn idle_threads(&self) -> usize {
        self.shared.state.lock().idle
    }

    /// Stop accepting jobs and drop the ones still queued. Running jobs finish
    /// on their threads, which then exit.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        self.shared.wakeup.notify_all();
        drop(state);

        self.shared.drain();
        log::debug!("worker pool {:?} shut down", self.shared.thread_name_prefix);
    }
}

impl Shared {
    fn spawn_worker(shared: &Arc<Shared>) -> std::io::Result<()> {
        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{}", shared.thread_name_prefix, id));
        if let Some(size) = shared.stack_size {
            builder = builder.stack_size(size);
        }

        let worker = shared.clone();
        builder.spawn(move || worker.run())?;
        log::trace!("started worker {}-{}", shared.thread_name_prefix, id);
        Ok(())
    }

    fn run(&self) {
        loop {
            match self.queue.steal() {
                Steal::Success(job) => {
                    self.run_job(job);
                    continue;
                }
                Steal::Retry => continue,
                Steal::Empty => {}
            }

            let mut state = self.state.lock();
            if state.shutdown {
                state.threads -= 1;
                return;
            }
            // a submit may have landed between the steal and the lock
            if !self.queue.is_empty() {
                continue;
            }

            state.idle += 1;
            let keep = loop {
                let timed_out = if state.threads > self.core_threads {
                    self.wakeup.wait_for(&mut state, self.keep_alive).timed_out()
                } else {
                    self.wakeup.wait(&mut state);
                    false
                };

                if state.notified > 0 {
                    state.notified -= 1;
                    break true;
                }
                if state.shutdown {
                    break false;
                }
                if timed_out && state.threads > self.core_threads {
                    break false;
                }
            };
            state.idle -= 1;

            if !keep {
                state.threads -= 1;
                return;
            }
        }
    }

    fn run_job(&self, job: Job) {
        if let Err(panic) = Panic::catch(job) {
            log::error!("pool job panicked: {}", panic.message());
        }
    }

    fn drain(&self) {
        while !self.queue.steal().is_empty() {}
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.thread_name_prefix)
            .field("threads", &self.num_threads())
            .field("idle", &self.idle_threads())
            .field("max_threads", &self.shared.max_threads)
            .finish()
    }
}
