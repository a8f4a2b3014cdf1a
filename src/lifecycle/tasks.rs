//! Tracked background tasks.
//!
//! Handlers hand fire-and-forget work (notification delivery and the like)
//! to a [`TaskTracker`]. The tracker counts in-flight tasks so shutdown can
//! wait for them, and contains panics so a failing task is logged instead of
//! taking anything else down.

use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct TaskTracker {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    active: Mutex<u64>,
    idle: Notify,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a tracked task. A panic inside the task is caught and logged.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        // Count before spawning so `wait` can never miss a just-spawned task.
        *inner.active.lock().expect("task tracker mutex poisoned") += 1;

        tokio::spawn(async move {
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                tracing::error!(panic = panic_message(panic.as_ref()), "background task panicked");
            }
            let mut active = inner.active.lock().expect("task tracker mutex poisoned");
            *active -= 1;
            if *active == 0 {
                drop(active);
                inner.idle.notify_waiters();
            }
        });
    }

    pub fn active(&self) -> u64 {
        *self.inner.active.lock().expect("task tracker mutex poisoned")
    }

    /// Resolve once every tracked task has finished.
    pub async fn wait(&self) {
        loop {
            let idle = self.inner.idle.notified();
            if self.active() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Best-effort human-readable payload of a caught panic.
pub fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    }
}
