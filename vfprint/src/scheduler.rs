//! Single-threaded event loop owning all driver work
//!
//! Device operations suspend only at frame and timer waits, so one
//! current-thread runtime drives any number of devices and harnesses.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::task::{JoinHandle, LocalSet};
use tracing::debug;

use crate::error::Result;

/// Explicitly owned scheduler
///
/// # Examples
///
/// ```
/// use vfprint::Scheduler;
///
/// let mut scheduler = Scheduler::new().unwrap();
/// let task = scheduler.spawn(async { 40 + 2 });
/// assert_eq!(scheduler.block_on(task).unwrap(), 42);
/// scheduler.run_until_idle();
/// scheduler.shutdown();
/// ```
pub struct Scheduler {
    runtime: Runtime,
    local: LocalSet,
}

impl Scheduler {
    /// Build a current-thread runtime with I/O and timers enabled
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        debug!("Scheduler started");
        Ok(Self {
            runtime,
            local: LocalSet::new(),
        })
    }

    /// Drive the loop until `future` completes
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }

    /// Queue a task on the loop; it runs whenever the loop is driven
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.local.spawn_local(future)
    }

    /// Drive the loop until every spawned task has finished
    pub fn run_until_idle(&mut self) {
        let local = std::mem::take(&mut self.local);
        self.runtime.block_on(local);
    }

    /// Tear down the loop, dropping unfinished tasks
    pub fn shutdown(self) {
        let Self { runtime, local } = self;
        drop(local);
        runtime.shutdown_timeout(Duration::from_millis(100));
        debug!("Scheduler stopped");
    }
}
