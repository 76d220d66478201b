use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

static BACKGROUND_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("escrow-client-background")
        .enable_all()
        .build()
        .expect("failed to build background tokio runtime")
});

/// Handle to a background task. Dropping the handle leaves the task running;
/// call [`TaskHandle::cancel`] to stop it.
#[derive(Debug)]
pub struct TaskHandle {
    inner: JoinHandle<()>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Spawns a task on the ambient Tokio runtime, or on a shared background
/// runtime when called outside of one.
pub fn spawn_task<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = match Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => BACKGROUND_RUNTIME.spawn(future),
    };
    TaskHandle { inner }
}

/// Waits for the provided duration; zero returns immediately.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}
