//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use archetype_asset_store::prelude::*;
//! ```

pub use crate::config::StoreConfig;
pub use crate::dispose::Disposable;
pub use crate::error::{AssetError, BoxError, Result};
pub use crate::future::AssetHandle;
pub use crate::identifier::{Asset, AssetType, Descriptor, Identifier};
pub use crate::loader::{AsyncLoader, Dependencies, Loader, SyncLoader};
pub use crate::progress::LoadingProgress;
pub use crate::resolver::{AssetRoot, FileHandle, FileResolver};
pub use crate::store::{AssetStore, AssetStoreBuilder};
