//! Cancellable timer tasks
//!
//! Autoplay, feed production and featured rotation all run as background
//! tokio tasks owned through a [`TaskHandle`]. Cancelling a handle sets a
//! flag checked after every timer wake-up and aborts the task; the async
//! [`TaskHandle::cancel`] additionally waits for the task to be gone, so once
//! it returns the tick closure can never run again.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Returned by a tick to keep the timer running or end it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Owner of one background timer task.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    cancelled: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True until the task is cancelled or has stopped on its own
    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
            && self.join.as_ref().map(|j| !j.is_finished()).unwrap_or(false)
    }

    /// Request cancellation without waiting
    pub fn abort(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(join) = &self.join {
            join.abort();
        }
    }

    /// Cancel and wait until the task has fully stopped
    pub async fn cancel(mut self) {
        self.abort();
        if let Some(join) = self.join.take() {
            // a JoinError here is the abort we just requested
            let _ = join.await;
        }
        debug!("task {} cancelled", self.name);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Run `tick` every `period`, first firing one period from now.
///
/// Must be called from within a tokio runtime.
pub fn spawn_periodic<F, Fut>(name: impl Into<String>, period: Duration, mut tick: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = TickControl> + Send + 'static,
{
    let name = name.into();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let task_name = name.clone();

    let join = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if flag.load(Ordering::SeqCst) {
                break;
            }
            if tick().await == TickControl::Stop {
                debug!("task {} stopped itself", task_name);
                break;
            }
        }
    });

    TaskHandle {
        name,
        cancelled,
        join: Some(join),
    }
}
