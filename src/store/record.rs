use crate::error::{AssetError, Result};
use crate::future::{AssetFuture, AssetValue};
use crate::identifier::{Descriptor, Identifier};
use crate::loader::{Dependencies, Loader};
use smallvec::SmallVec;
use std::sync::Arc;

/// Cache entry for one identifier.
///
/// Everything here is fixed at creation; dependencies are discovered once.
/// The reference count lives next to the record in the store map so it is
/// only ever touched under the store lock.
pub(crate) struct AssetRecord {
    pub(crate) identifier: Identifier,
    pub(crate) descriptor: Descriptor,
    pub(crate) future: AssetFuture,
    pub(crate) dependencies: SmallVec<[Arc<AssetRecord>; 4]>,
    pub(crate) loader: Option<Loader>,
}

impl AssetRecord {
    pub(crate) fn new(
        descriptor: Descriptor,
        loader: Loader,
        dependencies: SmallVec<[Arc<AssetRecord>; 4]>,
    ) -> Self {
        Self {
            identifier: descriptor.to_identifier(),
            descriptor,
            future: AssetFuture::pending(),
            dependencies,
            loader: Some(loader),
        }
    }

    /// Record for a value registered with `add`
    pub(crate) fn added(identifier: Identifier, value: AssetValue) -> Self {
        Self {
            descriptor: identifier.to_descriptor(),
            identifier,
            future: AssetFuture::completed(Ok(value)),
            dependencies: SmallVec::new(),
            loader: None,
        }
    }

    /// Values of all dependencies, failing if any is missing or still pending.
    pub(crate) fn collect_dependencies(&self) -> Result<Dependencies> {
        let mut values = Dependencies::default();
        for dependency in &self.dependencies {
            match dependency.future.result() {
                Some(Ok(value)) => values.push(dependency.identifier.clone(), value),
                Some(Err(cause)) => {
                    return Err(AssetError::missing_dependency(
                        &self.identifier,
                        &dependency.identifier,
                        Some(cause),
                    ))
                }
                None => {
                    return Err(AssetError::missing_dependency(
                        &self.identifier,
                        &dependency.identifier,
                        None,
                    ))
                }
            }
        }
        Ok(values)
    }

    pub(crate) fn state_name(&self) -> &'static str {
        match self.future.result() {
            None => "loading",
            Some(Ok(_)) => "loaded",
            Some(Err(_)) => "failed",
        }
    }
}

/// Map slot: the record plus its reference count
pub(crate) struct Entry {
    pub(crate) record: Arc<AssetRecord>,
    pub(crate) references: usize,
}
