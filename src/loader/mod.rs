//! Loader protocol.
//!
//! A [`Loader`] is one of two variants:
//! - [`Loader::Sync`]: a single `load` call that runs on the owning thread.
//! - [`Loader::Async`]: `prepare` on a background thread, then `finalize` on
//!   the owning thread with whatever `prepare` produced.
//!
//! Both declare their dependencies up front. The store dispatches on the
//! variant with a single `match` when the load task runs.

pub mod builtin;
pub mod registry;

pub use builtin::{BinaryAsset, BytesLoader, JsonAsset, JsonLoader, TextAsset, TextLoader};
pub use registry::LoaderRegistry;

use crate::error::BoxError;
use crate::future::AssetValue;
use crate::identifier::{Asset, AssetType, Descriptor, Identifier};
use smallvec::SmallVec;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Loader producing `T` in one call on the owning thread
pub trait SyncLoader<T: Asset>: Send + Sync {
    /// Assets that must be loaded before this one
    fn dependencies(&self, _descriptor: &Descriptor) -> Vec<Descriptor> {
        Vec::new()
    }

    fn load(&self, descriptor: &Descriptor, dependencies: &Dependencies) -> Result<T, BoxError>;
}

/// Loader producing `T` in two phases
pub trait AsyncLoader<T: Asset>: Send + Sync {
    /// Data handed from `prepare` to `finalize`
    type Prepared: Send + 'static;

    /// Assets that must be loaded before this one
    fn dependencies(&self, _descriptor: &Descriptor) -> Vec<Descriptor> {
        Vec::new()
    }

    /// Background phase: I/O and decoding
    fn prepare(
        &self,
        descriptor: &Descriptor,
        dependencies: &Dependencies,
    ) -> Result<Self::Prepared, BoxError>;

    /// Owning-thread phase: thread-affine resource creation
    fn finalize(
        &self,
        descriptor: &Descriptor,
        prepared: Self::Prepared,
        dependencies: &Dependencies,
    ) -> Result<T, BoxError>;
}

/// Object-safe form of [`SyncLoader`]
pub trait ErasedSyncLoader: Send + Sync {
    fn output_type(&self) -> AssetType;
    fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor>;
    fn load(&self, descriptor: &Descriptor, dependencies: &Dependencies)
        -> Result<AssetValue, BoxError>;
}

/// Object-safe form of [`AsyncLoader`]
pub trait ErasedAsyncLoader: Send + Sync {
    fn output_type(&self) -> AssetType;
    fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor>;
    fn prepare(
        &self,
        descriptor: &Descriptor,
        dependencies: &Dependencies,
    ) -> Result<Box<dyn Any + Send>, BoxError>;
    fn finalize(
        &self,
        descriptor: &Descriptor,
        prepared: Box<dyn Any + Send>,
        dependencies: &Dependencies,
    ) -> Result<AssetValue, BoxError>;
}

struct SyncAdapter<T, L> {
    loader: L,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Asset, L: SyncLoader<T>> ErasedSyncLoader for SyncAdapter<T, L> {
    fn output_type(&self) -> AssetType {
        AssetType::of::<T>()
    }

    fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor> {
        self.loader.dependencies(descriptor)
    }

    fn load(
        &self,
        descriptor: &Descriptor,
        dependencies: &Dependencies,
    ) -> Result<AssetValue, BoxError> {
        let value = self.loader.load(descriptor, dependencies)?;
        Ok(Arc::new(value))
    }
}

struct AsyncAdapter<T, L> {
    loader: L,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Asset, L: AsyncLoader<T>> ErasedAsyncLoader for AsyncAdapter<T, L> {
    fn output_type(&self) -> AssetType {
        AssetType::of::<T>()
    }

    fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor> {
        self.loader.dependencies(descriptor)
    }

    fn prepare(
        &self,
        descriptor: &Descriptor,
        dependencies: &Dependencies,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        let prepared = self.loader.prepare(descriptor, dependencies)?;
        Ok(Box::new(prepared))
    }

    fn finalize(
        &self,
        descriptor: &Descriptor,
        prepared: Box<dyn Any + Send>,
        dependencies: &Dependencies,
    ) -> Result<AssetValue, BoxError> {
        let prepared = prepared
            .downcast::<L::Prepared>()
            .map_err(|_| "prepared data does not belong to this loader")?;
        let value = self.loader.finalize(descriptor, *prepared, dependencies)?;
        Ok(Arc::new(value))
    }
}

/// A registered loader: one of the two protocol variants.
#[derive(Clone)]
pub enum Loader {
    Sync(Arc<dyn ErasedSyncLoader>),
    Async(Arc<dyn ErasedAsyncLoader>),
}

impl Loader {
    pub fn sync<T, L>(loader: L) -> Self
    where
        T: Asset,
        L: SyncLoader<T> + 'static,
    {
        Loader::Sync(Arc::new(SyncAdapter {
            loader,
            _phantom: PhantomData,
        }))
    }

    pub fn asynchronous<T, L>(loader: L) -> Self
    where
        T: Asset,
        L: AsyncLoader<T> + 'static,
    {
        Loader::Async(Arc::new(AsyncAdapter {
            loader,
            _phantom: PhantomData,
        }))
    }

    /// Type of the values this loader produces
    pub fn output_type(&self) -> AssetType {
        match self {
            Loader::Sync(loader) => loader.output_type(),
            Loader::Async(loader) => loader.output_type(),
        }
    }

    pub fn dependencies(&self, descriptor: &Descriptor) -> Vec<Descriptor> {
        match self {
            Loader::Sync(loader) => loader.dependencies(descriptor),
            Loader::Async(loader) => loader.dependencies(descriptor),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Loader::Async(_))
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = if self.is_async() { "Async" } else { "Sync" };
        write!(f, "Loader::{variant}({})", self.output_type())
    }
}

/// Values of an asset's dependencies, handed to its loader
#[derive(Clone, Default)]
pub struct Dependencies {
    values: SmallVec<[(Identifier, AssetValue); 4]>,
}

impl Dependencies {
    pub(crate) fn push(&mut self, identifier: Identifier, value: AssetValue) {
        self.values.push((identifier, value));
    }

    /// Dependency of type `T` at `path`
    pub fn get<T: Asset>(&self, path: &str) -> Option<Arc<T>> {
        self.get_by_identifier(&Identifier::new::<T>(path))
    }

    pub fn get_by_identifier<T: Asset>(&self, identifier: &Identifier) -> Option<Arc<T>> {
        self.values
            .iter()
            .find(|(id, _)| id == identifier)
            .and_then(|(_, value)| value.clone().downcast::<T>().ok())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.values.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
