//! Execution contexts used by the store.
//!
//! Background work (dependency orchestration, `prepare` phases) goes to an
//! injected [`TaskExecutor`]. Thread-affine work (synchronous loaders,
//! `finalize` phases) is queued on the [`MainThreadQueue`] and runs when the
//! owning thread pumps it.

use crate::future::AssetFuture;
use crossbeam::channel::{self, select, Receiver, Sender};
use parking_lot::RwLock;
use std::thread::{self, ThreadId};

/// Unit of work handed to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Background execution context. Injected into the store, never owned by it.
pub trait TaskExecutor: Send + Sync {
    fn spawn(&self, task: Task);
}

#[cfg(feature = "parallel")]
impl TaskExecutor for rayon::ThreadPool {
    fn spawn(&self, task: Task) {
        rayon::ThreadPool::spawn(self, task);
    }
}

/// Runs every task immediately on the spawning thread
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn spawn(&self, task: Task) {
        task();
    }
}

/// Spawns one OS thread per task
#[derive(Clone, Debug)]
pub struct ThreadExecutor {
    name_prefix: String,
}

impl ThreadExecutor {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
        }
    }
}

impl TaskExecutor for ThreadExecutor {
    fn spawn(&self, task: Task) {
        // Builder::spawn consumes the closure, so keep the task in a slot we can
        // reclaim if the thread cannot be created.
        let slot = std::sync::Arc::new(parking_lot::Mutex::new(Some(task)));
        let remote = slot.clone();
        let spawned = thread::Builder::new()
            .name(self.name_prefix.clone())
            .spawn(move || {
                if let Some(task) = remote.lock().take() {
                    task();
                }
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn loader thread, running inline: {e}");
            if let Some(task) = slot.lock().take() {
                task();
            }
        }
    }
}

#[cfg(feature = "parallel")]
pub(crate) fn default_executor(
    config: &crate::config::StoreConfig,
) -> crate::error::Result<std::sync::Arc<dyn TaskExecutor>> {
    let prefix = config.thread_name.clone();
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(move |i| format!("{prefix}-{i}"));
    if config.worker_threads > 0 {
        builder = builder.num_threads(config.worker_threads);
    }
    let pool = builder
        .build()
        .map_err(|e| crate::error::AssetError::Config(format!("Failed to build thread pool: {e}")))?;
    Ok(std::sync::Arc::new(pool))
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn default_executor(
    config: &crate::config::StoreConfig,
) -> crate::error::Result<std::sync::Arc<dyn TaskExecutor>> {
    Ok(std::sync::Arc::new(ThreadExecutor::new(config.thread_name.clone())))
}

/// Queue of work that must run on the owning thread.
pub struct MainThreadQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    owner: RwLock<ThreadId>,
}

impl MainThreadQueue {
    /// Creates a queue owned by the calling thread
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            owner: RwLock::new(thread::current().id()),
        }
    }

    /// Makes the calling thread the owning thread
    pub fn bind_current_thread(&self) {
        *self.owner.write() = thread::current().id();
    }

    pub fn is_owner(&self) -> bool {
        *self.owner.read() == thread::current().id()
    }

    pub fn post(&self, task: Task) {
        // The receiver lives as long as self, so the send cannot fail.
        let _ = self.sender.send(task);
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Runs queued tasks, at most `limit` of them if given. Returns how many ran.
    pub fn run_pending(&self, limit: Option<usize>) -> usize {
        let mut executed = 0;
        while limit.map_or(true, |limit| executed < limit) {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(_) => break,
            }
        }
        executed
    }

    /// Runs queued tasks until `future` completes.
    ///
    /// Blocks on the queue between tasks. Completion signals a private channel,
    /// so the loop never sleeps past it and nothing is left behind in the queue.
    pub fn run_until(&self, future: &AssetFuture) {
        let (wake, woken) = channel::bounded::<()>(1);
        future.on_complete(move |_| {
            let _ = wake.try_send(());
        });
        while !future.is_completed() {
            let done = select! {
                recv(self.receiver) -> task => match task {
                    Ok(task) => {
                        task();
                        false
                    }
                    Err(_) => true,
                },
                recv(woken) -> _ => true,
            };
            if done {
                break;
            }
        }
    }
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}
