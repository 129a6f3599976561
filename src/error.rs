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

//! Error types

use crate::identifier::{AssetType, Identifier};
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by loaders and disposers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared cause of a failure. Cloned into every observer of a failed asset.
pub type SharedCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Asset store error type
#[derive(Debug, Clone)]
pub enum AssetError {
    /// Identifier was never loaded or added, or has not finished loading
    MissingAsset(Identifier),

    /// Asset was unloaded while it was being loaded or awaited
    UnloadedAsset(Identifier),

    /// No loader registered for the type and path
    MissingLoader { asset_type: AssetType, path: String },

    /// Loader cannot be used for the requested asset
    InvalidLoader {
        identifier: Identifier,
        reason: String,
    },

    /// Loader raised an error while producing the asset
    Loading {
        identifier: Identifier,
        cause: SharedCause,
    },

    /// A dependency failed, was unloaded, or was still loading
    MissingDependency {
        identifier: Identifier,
        dependency: Identifier,
        cause: Option<Box<AssetError>>,
    },

    /// `add` called for an identifier that is already present
    AlreadyLoaded(Identifier),

    /// Asset requested through a type that does not match its identifier
    TypeMismatch {
        identifier: Identifier,
        requested: AssetType,
    },

    /// Disposal of an evicted value failed (reported, never propagated)
    Disposal {
        identifier: Identifier,
        cause: SharedCause,
    },

    /// Store configuration error
    Config(String),

    /// IO error (file operations, etc.)
    IoError(String),
}

impl AssetError {
    pub(crate) fn loading(identifier: &Identifier, cause: BoxError) -> Self {
        AssetError::Loading {
            identifier: identifier.clone(),
            cause: Arc::from(cause),
        }
    }

    pub(crate) fn missing_dependency(
        identifier: &Identifier,
        dependency: &Identifier,
        cause: Option<AssetError>,
    ) -> Self {
        AssetError::MissingDependency {
            identifier: identifier.clone(),
            dependency: dependency.clone(),
            cause: cause.map(Box::new),
        }
    }

    /// Identifier the error refers to, if any.
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            AssetError::MissingAsset(id)
            | AssetError::UnloadedAsset(id)
            | AssetError::AlreadyLoaded(id) => Some(id),
            AssetError::InvalidLoader { identifier, .. }
            | AssetError::Loading { identifier, .. }
            | AssetError::MissingDependency { identifier, .. }
            | AssetError::TypeMismatch { identifier, .. }
            | AssetError::Disposal { identifier, .. } => Some(identifier),
            AssetError::MissingLoader { .. } | AssetError::Config(_) | AssetError::IoError(_) => {
                None
            }
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::MissingAsset(id) => write!(f, "Asset not loaded: {id}"),
            AssetError::UnloadedAsset(id) => write!(f, "Asset was unloaded: {id}"),
            AssetError::MissingLoader { asset_type, path } => {
                write!(f, "No loader registered for {asset_type} at path: {path}")
            }
            AssetError::InvalidLoader { identifier, reason } => {
                write!(f, "Invalid loader for {identifier}: {reason}")
            }
            AssetError::Loading { identifier, cause } => {
                write!(f, "Failed to load {identifier}: {cause}")
            }
            AssetError::MissingDependency {
                identifier,
                dependency,
                cause: Some(cause),
            } => write!(f, "Dependency {dependency} of {identifier} is missing: {cause}"),
            AssetError::MissingDependency {
                identifier,
                dependency,
                cause: None,
            } => write!(f, "Dependency {dependency} of {identifier} is still loading"),
            AssetError::AlreadyLoaded(id) => write!(f, "Asset already loaded: {id}"),
            AssetError::TypeMismatch {
                identifier,
                requested,
            } => write!(f, "Asset {identifier} requested as {requested}"),
            AssetError::Disposal { identifier, cause } => {
                write!(f, "Failed to dispose {identifier}: {cause}")
            }
            AssetError::Config(msg) => write!(f, "Configuration error: {msg}"),
            AssetError::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Loading { cause, .. } | AssetError::Disposal { cause, .. } => {
                Some(cause.as_ref())
            }
            AssetError::MissingDependency {
                cause: Some(cause), ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        AssetError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        AssetError::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    struct Texture;

    #[test]
    fn test_loading_error_keeps_cause() {
        let id = Identifier::new::<Texture>("texture.png");
        let cause: BoxError = "corrupted header".into();
        let error = AssetError::loading(&id, cause);

        assert_eq!(error.identifier(), Some(&id));
        assert!(error.source().is_some());
        assert!(error.to_string().contains("corrupted header"));
    }

    #[test]
    fn test_missing_dependency_display() {
        let font = Identifier::new::<Texture>("font.fnt");
        let page = Identifier::new::<Texture>("font.png");

        let pending = AssetError::missing_dependency(&font, &page, None);
        assert!(pending.to_string().contains("still loading"));
        assert!(pending.source().is_none());

        let failed = AssetError::missing_dependency(
            &font,
            &page,
            Some(AssetError::UnloadedAsset(page.clone())),
        );
        assert!(failed.source().is_some());
    }
}
