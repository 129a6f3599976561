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

//! Archetype Asset Store - reference-counted asynchronous asset cache
//!
//! Assets are keyed by `(path, type)`, declare their dependencies through
//! their loader, load once no matter how many callers ask for them, and are
//! disposed exactly once when the last reference is released.

pub mod config;
pub mod dispose;
pub mod error;
pub mod executor;
pub mod future;
pub mod identifier;
pub mod loader;
pub mod prelude;
pub mod progress;
pub mod resolver;
pub mod store;


pub use config::*;
pub use dispose::{log_dispose_error, Disposable, DisposeErrorHandler};
pub use error::*;
pub use executor::*;
pub use future::{AssetFuture, AssetHandle, AssetValue, LoadResult};
pub use identifier::*;
pub use loader::{
    AsyncLoader, Dependencies, ErasedAsyncLoader, ErasedSyncLoader, Loader, LoaderRegistry,
    SyncLoader,
};
pub use progress::*;
pub use resolver::*;
pub use store::{AssetStore, AssetStoreBuilder};
