use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a spawned background loop.
///
/// Stopping aborts the task, which drops whatever it is awaiting (a pending
/// sleep, an in-flight request). Dropping the handle stops the task too.
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn `task` on the current tokio runtime.
    pub fn spawn<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(task = name, "starting scheduled task");

        Self {
            name,
            handle: Some(tokio::spawn(task)),
        }
    }

    /// A handle that was never started. `stop` on it is a no-op.
    #[must_use]
    pub const fn idle(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the task. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(task = self.name, "stopped scheduled task");
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.stop();
    }
}
