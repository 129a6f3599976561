// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asset store
//!
//! Reference-counted cache of assets keyed by [`Identifier`].
//!
//! # Reference counting
//! Every `load*`/`add` call references the asset once, and through a
//! breadth-first walk every asset it transitively depends on, once per path.
//! `unload` runs the same walk decrementing. An asset is cached while its count
//! is above zero and disposed when it drops to zero.
//!
//! # Threads
//! The store is callable from any thread. Synchronous loaders and the
//! `finalize` phase of asynchronous loaders run on the owning thread (the
//! thread that built the store, see [`AssetStore::bind_owning_thread`]) when it
//! calls [`AssetStore::process_main_thread_tasks`] or blocks in
//! [`AssetStore::load`] / [`AssetStore::wait`]. Everything else runs on the
//! injected executor.

mod builder;
mod record;
mod task;

pub use builder::AssetStoreBuilder;

use crate::config::StoreConfig;
use crate::error::{AssetError, Result};
use crate::future::{downcast_value, AssetFuture, AssetHandle};
use crate::identifier::{Asset, AssetType, Descriptor, Identifier, Parameters};
use crate::loader::{Loader, LoaderRegistry};
use crate::progress::LoadingProgress;
use crate::resolver::FileResolver;
use parking_lot::{Mutex, RwLock};
use record::{AssetRecord, Entry};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use task::{LoadTask, Shared};
use tracing::{debug, trace};

type AssetMap = FxHashMap<Identifier, Entry>;

/// Concurrent, reference-counted asset cache
pub struct AssetStore {
    assets: Mutex<AssetMap>,
    loaders: RwLock<LoaderRegistry>,
    resolver: Arc<dyn FileResolver>,
    default_parameters: FxHashMap<AssetType, Parameters>,
    shared: Arc<Shared>,
}

fn check_type<T: Asset>(identifier: &Identifier) -> Result<()> {
    if identifier.asset_type().is::<T>() {
        Ok(())
    } else {
        Err(AssetError::TypeMismatch {
            identifier: identifier.clone(),
            requested: AssetType::of::<T>(),
        })
    }
}

/// Increments `root` and everything reachable from it, once per path.
/// Returns the records whose count went from 0 to 1.
fn increment_references(assets: &mut AssetMap, root: &Arc<AssetRecord>) -> Vec<Arc<AssetRecord>> {
    let mut newly_referenced = Vec::new();
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(record) = queue.pop_front() {
        let Some(entry) = assets.get_mut(&record.identifier) else {
            continue;
        };
        entry.references += 1;
        trace!(asset = %record.identifier, references = entry.references, "referenced");
        if entry.references == 1 {
            newly_referenced.push(record.clone());
        }
        queue.extend(record.dependencies.iter().cloned());
    }
    newly_referenced
}

/// Decrements `root` and everything reachable from it, once per path.
/// Returns the records that reached 0, already removed from the map.
fn decrement_references(assets: &mut AssetMap, root: &Identifier) -> Vec<Arc<AssetRecord>> {
    let mut removed = Vec::new();
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(identifier) = queue.pop_front() {
        let Some(entry) = assets.get_mut(&identifier) else {
            continue;
        };
        entry.references = entry.references.saturating_sub(1);
        trace!(asset = %identifier, references = entry.references, "released");
        queue.extend(entry.record.dependencies.iter().map(|d| d.identifier.clone()));
        if entry.references == 0 {
            if let Some(entry) = assets.remove(&identifier) {
                removed.push(entry.record);
            }
        }
    }
    removed
}

impl AssetStore {
    pub fn builder() -> AssetStoreBuilder {
        AssetStoreBuilder::new()
    }

    /// Store with default executor and resolver for `config`, no loaders
    pub fn new(config: StoreConfig) -> Result<Self> {
        AssetStoreBuilder::new().config(config).build()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Loads an asset and blocks until it is ready.
    ///
    /// On the owning thread this keeps running owning-thread work while
    /// waiting. Elsewhere it blocks; the owning thread must be pumping.
    pub fn load<T: Asset>(&self, descriptor: impl Into<Descriptor>) -> Result<Arc<T>> {
        let handle = self.load_async::<T>(descriptor)?;
        self.wait(&handle)
    }

    /// Requests an asset and returns its handle without waiting.
    ///
    /// Concurrent requests for the same identifier share one future and one
    /// loader invocation. Each call adds one reference.
    pub fn load_async<T: Asset>(&self, descriptor: impl Into<Descriptor>) -> Result<AssetHandle<T>> {
        let descriptor = descriptor.into();
        check_type::<T>(descriptor.identifier())?;

        let (record, newly_referenced) = self.acquire(descriptor)?;
        for record in newly_referenced {
            self.schedule(record);
        }
        Ok(AssetHandle::new(record.identifier.clone(), record.future.clone()))
    }

    /// Loads an asset entirely on the calling thread.
    ///
    /// Newly referenced assets are loaded here, dependencies first, both
    /// phases of asynchronous loaders included. Never waits for loads started
    /// elsewhere: if one is still in flight this fails with
    /// [`AssetError::MissingDependency`]. The reference taken by this call is
    /// kept either way and must be released with `unload`.
    pub fn load_sync<T: Asset>(&self, descriptor: impl Into<Descriptor>) -> Result<Arc<T>> {
        let descriptor = descriptor.into();
        check_type::<T>(descriptor.identifier())?;

        let (record, newly_referenced) = self.acquire(descriptor)?;
        let owned: FxHashSet<Identifier> = newly_referenced
            .iter()
            .map(|record| record.identifier.clone())
            .collect();
        for _ in &newly_referenced {
            self.shared.progress.register_scheduled();
        }
        self.drive(&record, &owned);

        match record.future.result() {
            Some(result) => downcast_value(&record.identifier, result?),
            None => Err(AssetError::missing_dependency(
                &record.identifier,
                &record.identifier,
                None,
            )),
        }
    }

    fn drive(&self, record: &Arc<AssetRecord>, owned: &FxHashSet<Identifier>) {
        if !owned.contains(&record.identifier) || record.future.is_completed() {
            return;
        }
        for dependency in &record.dependencies {
            self.drive(dependency, owned);
        }
        LoadTask::new(record.clone(), self.shared.clone()).run_inline();
    }

    /// Blocks until `handle` completes, running owning-thread work if called there.
    pub fn wait<T: Asset>(&self, handle: &AssetHandle<T>) -> Result<Arc<T>> {
        if self.shared.main_thread.is_owner() {
            self.shared.main_thread.run_until(handle.future());
        }
        handle.wait()
    }

    /// Registers an existing value as a loaded asset with no dependencies.
    pub fn add<T: Asset>(&self, identifier: Identifier, value: T) -> Result<()> {
        check_type::<T>(&identifier)?;
        {
            let mut assets = self.assets.lock();
            if assets.contains_key(&identifier) {
                return Err(AssetError::AlreadyLoaded(identifier));
            }
            let record = Arc::new(AssetRecord::added(identifier.clone(), Arc::new(value)));
            assets.insert(
                identifier.clone(),
                Entry {
                    record,
                    references: 1,
                },
            );
        }
        self.shared.progress.register_added();
        debug!(asset = %identifier, "added");
        Ok(())
    }

    /// Resolves or creates the record and references its subgraph.
    fn acquire(&self, descriptor: Descriptor) -> Result<(Arc<AssetRecord>, Vec<Arc<AssetRecord>>)> {
        let mut assets = self.assets.lock();
        let mut created = Vec::new();
        let record = match self.obtain(&mut assets, descriptor, &mut created, &mut Vec::new()) {
            Ok(record) => record,
            Err(error) => {
                for identifier in &created {
                    assets.remove(identifier);
                }
                return Err(error);
            }
        };
        let newly_referenced = increment_references(&mut assets, &record);
        Ok((record, newly_referenced))
    }

    /// Existing record for the descriptor, or a new one with its dependency records.
    ///
    /// New records enter the map with a zero count; `created` lists them so the
    /// caller can roll back if any part of the graph fails.
    fn obtain(
        &self,
        assets: &mut AssetMap,
        descriptor: Descriptor,
        created: &mut Vec<Identifier>,
        visiting: &mut Vec<Identifier>,
    ) -> Result<Arc<AssetRecord>> {
        let identifier = descriptor.to_identifier();
        if let Some(entry) = assets.get(&identifier) {
            return Ok(entry.record.clone());
        }
        if visiting.contains(&identifier) {
            return Err(AssetError::InvalidLoader {
                identifier,
                reason: "dependency cycle".to_string(),
            });
        }

        let loader = self
            .loaders
            .read()
            .get(identifier.asset_type(), identifier.path())
            .ok_or_else(|| AssetError::MissingLoader {
                asset_type: identifier.asset_type(),
                path: identifier.path().to_string(),
            })?;
        let descriptor = self.complete_descriptor(descriptor);

        visiting.push(identifier.clone());
        let mut dependencies = SmallVec::new();
        for dependency in loader.dependencies(&descriptor) {
            dependencies.push(self.obtain(assets, dependency, created, visiting)?);
        }
        visiting.pop();

        debug!(asset = %identifier, dependencies = dependencies.len(), "record created");
        let record = Arc::new(AssetRecord::new(descriptor, loader, dependencies));
        assets.insert(
            identifier.clone(),
            Entry {
                record: record.clone(),
                references: 0,
            },
        );
        created.push(identifier);
        Ok(record)
    }

    fn complete_descriptor(&self, mut descriptor: Descriptor) -> Descriptor {
        if !descriptor.has_parameters() {
            if let Some(parameters) = self.default_parameters.get(&descriptor.asset_type()) {
                descriptor = descriptor.with_shared_parameters(parameters.clone());
            }
        }
        if descriptor.file().is_none() {
            let file = self.resolver.resolve(descriptor.path());
            descriptor = descriptor.with_file(file);
        }
        descriptor
    }

    fn schedule(&self, record: Arc<AssetRecord>) {
        self.shared.progress.register_scheduled();
        debug!(asset = %record.identifier, "scheduled");
        let task = LoadTask::new(record, self.shared.clone());
        self.shared.executor.spawn(Box::new(move || task.start()));
    }

    // ------------------------------------------------------------------
    // Unloading
    // ------------------------------------------------------------------

    /// Releases one reference to the asset and its dependencies.
    ///
    /// Assets reaching zero are removed and disposed; ones still loading are
    /// completed with [`AssetError::UnloadedAsset`]. Returns whether the
    /// identifier was present.
    pub fn unload(&self, identifier: &Identifier) -> bool {
        let removed = {
            let mut assets = self.assets.lock();
            if !assets.contains_key(identifier) {
                return false;
            }
            decrement_references(&mut assets, identifier)
        };
        for record in &removed {
            self.evict(record);
        }
        true
    }

    fn evict(&self, record: &AssetRecord) {
        let identifier = &record.identifier;
        let progress = &self.shared.progress;
        if record
            .future
            .complete(Err(AssetError::UnloadedAsset(identifier.clone())))
        {
            progress.remove_pending();
            debug!(asset = %identifier, "unloaded while loading");
            return;
        }
        match record.future.result() {
            Some(Ok(value)) => {
                progress.remove_loaded();
                self.shared.dispose(identifier, &value);
            }
            Some(Err(_)) => progress.remove_failed(),
            None => {}
        }
        debug!(asset = %identifier, "unloaded");
    }

    /// Tears down every asset regardless of reference counts.
    ///
    /// Pending loads complete with [`AssetError::UnloadedAsset`], loaded values
    /// are disposed, and progress is reset.
    pub fn dispose_all(&self) {
        let records: Vec<Arc<AssetRecord>> = {
            let mut assets = self.assets.lock();
            assets.drain().map(|(_, entry)| entry.record).collect()
        };
        for record in &records {
            let identifier = &record.identifier;
            if record
                .future
                .complete(Err(AssetError::UnloadedAsset(identifier.clone())))
            {
                continue;
            }
            if let Some(Ok(value)) = record.future.result() {
                self.shared.dispose(identifier, &value);
            }
        }
        self.shared.progress.reset();
        debug!(count = records.len(), "disposed all assets");
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    fn future_of(&self, identifier: &Identifier) -> Option<AssetFuture> {
        self.assets
            .lock()
            .get(identifier)
            .map(|entry| entry.record.future.clone())
    }

    /// Loaded value. Fails if absent or still loading, or with the stored failure.
    pub fn get<T: Asset>(&self, identifier: &Identifier) -> Result<Arc<T>> {
        self.get_or_none(identifier)?
            .ok_or_else(|| AssetError::MissingAsset(identifier.clone()))
    }

    /// Like [`get`](Self::get), but `Ok(None)` when absent or still loading.
    pub fn get_or_none<T: Asset>(&self, identifier: &Identifier) -> Result<Option<Arc<T>>> {
        check_type::<T>(identifier)?;
        match self.future_of(identifier).and_then(|future| future.result()) {
            None => Ok(None),
            Some(result) => downcast_value(identifier, result?).map(Some),
        }
    }

    /// Handle to the asset's future. Never-requested assets get a handle that
    /// has already failed with [`AssetError::MissingAsset`].
    pub fn get_async<T: Asset>(&self, identifier: &Identifier) -> AssetHandle<T> {
        let future = self.future_of(identifier).unwrap_or_else(|| {
            AssetFuture::completed(Err(AssetError::MissingAsset(identifier.clone())))
        });
        AssetHandle::new(identifier.clone(), future)
    }

    /// Whether the identifier is cached in any state
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.assets.lock().contains_key(identifier)
    }

    /// Whether the asset finished loading successfully
    pub fn is_loaded(&self, identifier: &Identifier) -> bool {
        matches!(
            self.future_of(identifier).and_then(|future| future.result()),
            Some(Ok(_))
        )
    }

    /// Current reference count, 0 if absent
    pub fn reference_count(&self, identifier: &Identifier) -> usize {
        self.assets
            .lock()
            .get(identifier)
            .map_or(0, |entry| entry.references)
    }

    /// Direct dependencies discovered when the asset was first requested
    pub fn dependencies(&self, identifier: &Identifier) -> Vec<Identifier> {
        self.assets.lock().get(identifier).map_or_else(Vec::new, |entry| {
            entry
                .record
                .dependencies
                .iter()
                .map(|dependency| dependency.identifier.clone())
                .collect()
        })
    }

    /// Descriptor the asset was created with, parameters and file included
    pub fn descriptor(&self, identifier: &Identifier) -> Option<Descriptor> {
        self.assets
            .lock()
            .get(identifier)
            .map(|entry| entry.record.descriptor.clone())
    }

    pub fn identifiers(&self) -> Vec<Identifier> {
        self.assets.lock().keys().cloned().collect()
    }

    /// Number of cached assets
    pub fn len(&self) -> usize {
        self.assets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.lock().is_empty()
    }

    pub fn progress(&self) -> &LoadingProgress {
        &self.shared.progress
    }

    // ------------------------------------------------------------------
    // Loaders
    // ------------------------------------------------------------------

    /// Sets the type-wide loader for the loader's output type
    pub fn set_loader(&self, loader: Loader) {
        self.loaders.write().insert(None, loader);
    }

    /// Sets the loader for paths ending in `suffix`
    pub fn set_loader_for_suffix(&self, suffix: &str, loader: Loader) {
        self.loaders.write().insert(Some(suffix), loader);
    }

    /// Registers `loader` for `asset_type`, failing if it produces another type
    pub fn register_loader(
        &self,
        asset_type: AssetType,
        suffix: Option<&str>,
        loader: Loader,
    ) -> Result<()> {
        self.loaders.write().register(asset_type, suffix, loader)
    }

    pub fn loader_for(&self, asset_type: AssetType, path: &str) -> Option<Loader> {
        self.loaders.read().get(asset_type, path)
    }

    /// Whether evicted values of `asset_type` are disposed
    pub fn is_disposable(&self, asset_type: AssetType) -> bool {
        self.shared.disposers.supports(asset_type)
    }

    // ------------------------------------------------------------------
    // Owning thread
    // ------------------------------------------------------------------

    /// Makes the calling thread the owning thread
    pub fn bind_owning_thread(&self) {
        self.shared.main_thread.bind_current_thread();
    }

    pub fn is_owning_thread(&self) -> bool {
        self.shared.main_thread.is_owner()
    }

    /// Runs all queued owning-thread work. Call once per frame from the owning thread.
    pub fn process_main_thread_tasks(&self) -> usize {
        self.shared.main_thread.run_pending(None)
    }

    /// Runs at most `limit` queued owning-thread tasks
    pub fn update(&self, limit: usize) -> usize {
        self.shared.main_thread.run_pending(Some(limit))
    }

    /// Owning-thread tasks waiting to run
    pub fn pending_main_thread_tasks(&self) -> usize {
        self.shared.main_thread.len()
    }
}

impl fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assets = self.assets.lock();
        let mut entries: Vec<String> = assets
            .values()
            .map(|entry| {
                format!(
                    "{} [{}, references: {}, dependencies: {}]",
                    entry.record.identifier,
                    entry.record.state_name(),
                    entry.references,
                    entry.record.dependencies.len()
                )
            })
            .collect();
        entries.sort();
        f.debug_struct("AssetStore")
            .field("assets", &entries)
            .field("progress", &self.shared.progress.snapshot())
            .finish()
    }
}
