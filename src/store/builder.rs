use crate::config::StoreConfig;
use crate::dispose::{log_dispose_error, Disposable, DisposeErrorHandler, Disposers};
use crate::error::{AssetError, BoxError, Result};
use crate::executor::{default_executor, MainThreadQueue, TaskExecutor};
use crate::identifier::{Asset, AssetType, Identifier, Parameters};
use crate::loader::{Loader, LoaderRegistry};
use crate::progress::LoadingProgress;
use crate::resolver::{AssetRoot, FileResolver};
use crate::store::task::Shared;
use crate::store::AssetStore;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::Arc;

/// Assembles an [`AssetStore`] from a config plus the parts that cannot be serialized.
pub struct AssetStoreBuilder {
    config: StoreConfig,
    executor: Option<Arc<dyn TaskExecutor>>,
    resolver: Option<Arc<dyn FileResolver>>,
    loaders: LoaderRegistry,
    default_parameters: FxHashMap<AssetType, Parameters>,
    disposers: Disposers,
    on_dispose_error: Option<DisposeErrorHandler>,
}

impl AssetStoreBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            executor: None,
            resolver: None,
            loaders: LoaderRegistry::new(),
            default_parameters: FxHashMap::default(),
            disposers: Disposers::default(),
            on_dispose_error: None,
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Background executor. Defaults to a thread pool sized by the config.
    pub fn executor<E: TaskExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn shared_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// File resolver. Defaults to [`AssetRoot`] at the configured root.
    pub fn resolver<R: FileResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Type-wide loader for the loader's output type
    pub fn loader(mut self, loader: Loader) -> Self {
        self.loaders.insert(None, loader);
        self
    }

    /// Loader used for paths ending in `suffix`
    pub fn loader_for_suffix(mut self, suffix: &str, loader: Loader) -> Self {
        self.loaders.insert(Some(suffix), loader);
        self
    }

    /// Parameters given to `T` loaders when a descriptor carries none
    pub fn default_parameters<T: Asset, P: Any + Send + Sync>(mut self, parameters: P) -> Self {
        self.default_parameters
            .insert(AssetType::of::<T>(), Arc::new(parameters));
        self
    }

    /// Dispose evicted `T` values through [`Disposable`]
    pub fn disposable<T: Disposable>(mut self) -> Self {
        self.disposers.register::<T>();
        self
    }

    /// Dispose evicted `T` values with a custom function
    pub fn disposer<T, F>(mut self, dispose: F) -> Self
    where
        T: Asset,
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.disposers.register_with::<T, F>(dispose);
        self
    }

    /// Receives disposal failures. Defaults to logging them.
    pub fn on_dispose_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Identifier, &AssetError) + Send + Sync + 'static,
    {
        self.on_dispose_error = Some(Arc::new(handler));
        self
    }

    /// Builds the store. The calling thread becomes its owning thread.
    pub fn build(self) -> Result<AssetStore> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => default_executor(&self.config)?,
        };
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(AssetRoot::new(self.config.asset_root.clone())));
        let on_dispose_error = self
            .on_dispose_error
            .unwrap_or_else(|| Arc::new(log_dispose_error));

        tracing::debug!(
            loaders = self.loaders.len(),
            asset_root = %self.config.asset_root.display(),
            "asset store created"
        );

        Ok(AssetStore {
            assets: Mutex::new(FxHashMap::default()),
            loaders: RwLock::new(self.loaders),
            resolver,
            default_parameters: self.default_parameters,
            shared: Arc::new(Shared {
                executor,
                main_thread: MainThreadQueue::new(),
                progress: LoadingProgress::new(),
                disposers: self.disposers,
                on_dispose_error,
            }),
        })
    }
}

impl Default for AssetStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
