//! Load tasks: the work scheduled for each newly referenced record.

use crate::dispose::{panic_message, DisposeErrorHandler, Disposers};
use crate::error::{AssetError, BoxError};
use crate::executor::{MainThreadQueue, TaskExecutor};
use crate::future::AssetValue;
use crate::identifier::Identifier;
use crate::loader::{Dependencies, ErasedAsyncLoader, Loader};
use crate::progress::LoadingProgress;
use crate::store::record::AssetRecord;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared between the store and its in-flight tasks
pub(crate) struct Shared {
    pub(crate) executor: Arc<dyn TaskExecutor>,
    pub(crate) main_thread: MainThreadQueue,
    pub(crate) progress: LoadingProgress,
    pub(crate) disposers: Disposers,
    pub(crate) on_dispose_error: DisposeErrorHandler,
}

impl Shared {
    pub(crate) fn dispose(&self, identifier: &Identifier, value: &AssetValue) -> bool {
        self.disposers
            .dispose(identifier, value, &self.on_dispose_error)
    }
}

fn guarded<R>(f: impl FnOnce() -> Result<R, BoxError>) -> Result<R, BoxError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        Err(format!("loader panicked: {}", panic_message(panic.as_ref())).into())
    })
}

#[derive(Clone)]
pub(crate) struct LoadTask {
    record: Arc<AssetRecord>,
    shared: Arc<Shared>,
}

impl LoadTask {
    pub(crate) fn new(record: Arc<AssetRecord>, shared: Arc<Shared>) -> Self {
        Self { record, shared }
    }

    /// Unloading completes the future early; a completed future means stop.
    fn is_cancelled(&self) -> bool {
        self.record.future.is_completed()
    }

    /// Waits for dependencies, then dispatches the loader.
    ///
    /// The wait is a continuation on each dependency future; the last one to
    /// complete resumes the task on whichever thread completed it.
    pub(crate) fn start(self) {
        if self.is_cancelled() {
            return;
        }
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("load_asset", asset = %self.record.identifier).entered();

        let dependencies = self.record.dependencies.clone();
        if dependencies.is_empty() {
            self.dispatch(Dependencies::default());
            return;
        }

        let remaining = Arc::new(AtomicUsize::new(dependencies.len()));
        for dependency in dependencies.iter() {
            let task = self.clone();
            let remaining = remaining.clone();
            dependency.future.on_complete(move |_| {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    task.resume();
                }
            });
        }
    }

    fn resume(self) {
        if self.is_cancelled() {
            return;
        }
        match self.record.collect_dependencies() {
            Ok(dependencies) => self.dispatch(dependencies),
            Err(error) => self.fail(error),
        }
    }

    fn dispatch(self, dependencies: Dependencies) {
        let Some(loader) = self.record.loader.clone() else {
            let error = AssetError::InvalidLoader {
                identifier: self.record.identifier.clone(),
                reason: "record has no loader".to_string(),
            };
            self.fail(error);
            return;
        };

        match loader {
            Loader::Sync(loader) => {
                let shared = self.shared.clone();
                shared.main_thread.post(Box::new(move || {
                    if self.is_cancelled() {
                        return;
                    }
                    let result = guarded(|| loader.load(&self.record.descriptor, &dependencies));
                    self.publish(result);
                }));
            }
            Loader::Async(loader) => {
                // The last dependency may have completed on the owning thread.
                if self.shared.main_thread.is_owner() {
                    let shared = self.shared.clone();
                    shared
                        .executor
                        .spawn(Box::new(move || self.prepare(loader, dependencies)));
                } else {
                    self.prepare(loader, dependencies);
                }
            }
        }
    }

    fn prepare(self, loader: Arc<dyn ErasedAsyncLoader>, dependencies: Dependencies) {
        if self.is_cancelled() {
            return;
        }
        let prepared = match guarded(|| loader.prepare(&self.record.descriptor, &dependencies)) {
            Ok(prepared) => prepared,
            Err(cause) => {
                self.publish(Err(cause));
                return;
            }
        };

        let shared = self.shared.clone();
        shared.main_thread.post(Box::new(move || {
            if self.is_cancelled() {
                debug!(asset = %self.record.identifier, "unloaded before finalize");
                return;
            }
            let result =
                guarded(|| loader.finalize(&self.record.descriptor, prepared, &dependencies));
            self.publish(result);
        }));
    }

    /// Runs the whole loader on the calling thread. Used by `load_sync`.
    pub(crate) fn run_inline(&self) {
        if self.is_cancelled() {
            return;
        }
        let dependencies = match self.record.collect_dependencies() {
            Ok(dependencies) => dependencies,
            Err(error) => {
                self.fail(error);
                return;
            }
        };
        let descriptor = &self.record.descriptor;
        let result = match &self.record.loader {
            Some(Loader::Sync(loader)) => guarded(|| loader.load(descriptor, &dependencies)),
            Some(Loader::Async(loader)) => guarded(|| loader.prepare(descriptor, &dependencies))
                .and_then(|prepared| {
                    guarded(|| loader.finalize(descriptor, prepared, &dependencies))
                }),
            None => Err("record has no loader".into()),
        };
        self.publish(result);
    }

    fn publish(&self, result: Result<AssetValue, BoxError>) {
        let identifier = &self.record.identifier;
        match result {
            Ok(value) => {
                if self.record.future.complete(Ok(value.clone())) {
                    self.shared.progress.register_loaded();
                    debug!(asset = %identifier, "loaded");
                } else {
                    warn!(asset = %identifier, "unloaded during loading, discarding result");
                    self.shared.dispose(identifier, &value);
                }
            }
            Err(cause) => self.fail(AssetError::loading(identifier, cause)),
        }
    }

    pub(crate) fn fail(&self, error: AssetError) {
        debug!(asset = %self.record.identifier, %error, "failed");
        if self.record.future.complete(Err(error)) {
            self.shared.progress.register_failed();
        }
    }
}
