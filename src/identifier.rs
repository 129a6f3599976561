//! Cache keys and load requests.
//!
//! An [`Identifier`] is the `(path, type)` pair the store is keyed by. A
//! [`Descriptor`] extends it with loader parameters and a resolved file.

use crate::resolver::FileHandle;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Marker for values that can live in the store
pub trait Asset: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Asset for T {}

/// Type tag of an asset, supplied at the call site through a generic parameter.
#[derive(Clone, Copy)]
pub struct AssetType {
    id: TypeId,
    name: &'static str,
}

impl AssetType {
    pub fn of<T: Asset>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }

    pub fn is<T: Asset>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for AssetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AssetType {}

impl Hash for AssetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetType({})", self.short_name())
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Immutable `(path, type)` cache key.
///
/// Two identifiers with the same path but different types are distinct.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    path: Arc<str>,
    asset_type: AssetType,
}

impl Identifier {
    pub fn new<T: Asset>(path: impl Into<Arc<str>>) -> Self {
        Self::with_type(path, AssetType::of::<T>())
    }

    pub fn with_type(path: impl Into<Arc<str>>, asset_type: AssetType) -> Self {
        Self {
            path: path.into(),
            asset_type,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn to_descriptor(&self) -> Descriptor {
        Descriptor::from(self.clone())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:?}, {})", self.path, self.asset_type)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.asset_type)
    }
}

/// Type-erased loader parameters
pub type Parameters = Arc<dyn Any + Send + Sync>;

/// A load request: identifier plus optional parameters and resolved file.
#[derive(Clone)]
pub struct Descriptor {
    identifier: Identifier,
    parameters: Option<Parameters>,
    file: Option<FileHandle>,
}

impl Descriptor {
    pub fn new<T: Asset>(path: impl Into<Arc<str>>) -> Self {
        Identifier::new::<T>(path).into()
    }

    pub fn with_parameters<P: Any + Send + Sync>(mut self, parameters: P) -> Self {
        self.parameters = Some(Arc::new(parameters));
        self
    }

    pub fn with_shared_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Use a pre-resolved file instead of the store's resolver
    pub fn with_file(mut self, file: FileHandle) -> Self {
        self.file = Some(file);
        self
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn path(&self) -> &str {
        self.identifier.path()
    }

    pub fn asset_type(&self) -> AssetType {
        self.identifier.asset_type()
    }

    /// Loader parameters downcast to `P`.
    ///
    /// Returns `None` when no parameters were given or they are of another type.
    pub fn parameters<P: Any>(&self) -> Option<&P> {
        self.parameters.as_ref()?.downcast_ref::<P>()
    }

    pub fn has_parameters(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn file(&self) -> Option<&FileHandle> {
        self.file.as_ref()
    }

    /// Resolved file, or an error loaders can propagate with `?`.
    pub fn require_file(&self) -> crate::error::Result<&FileHandle> {
        self.file.as_ref().ok_or_else(|| {
            crate::error::AssetError::IoError(format!("No file resolved for {}", self.identifier))
        })
    }

    /// Drops parameters and file handle.
    pub fn to_identifier(&self) -> Identifier {
        self.identifier.clone()
    }
}

impl From<Identifier> for Descriptor {
    fn from(identifier: Identifier) -> Self {
        Self {
            identifier,
            parameters: None,
            file: None,
        }
    }
}

impl From<Descriptor> for Identifier {
    fn from(descriptor: Descriptor) -> Self {
        descriptor.identifier
    }
}

impl From<&Descriptor> for Identifier {
    fn from(descriptor: &Descriptor) -> Self {
        descriptor.identifier.clone()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("identifier", &self.identifier)
            .field("has_parameters", &self.parameters.is_some())
            .field("file", &self.file)
            .finish()
    }
}
