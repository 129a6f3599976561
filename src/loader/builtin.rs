//! General-purpose loaders for raw file contents.

use crate::error::BoxError;
use crate::identifier::Descriptor;
use crate::loader::{AsyncLoader, Dependencies, SyncLoader};

/// Raw file contents
#[derive(Clone, Debug)]
pub struct BinaryAsset {
    pub data: Vec<u8>,
    pub path: String,
}

/// Synchronous loader for raw bytes
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesLoader;

impl SyncLoader<BinaryAsset> for BytesLoader {
    fn load(&self, descriptor: &Descriptor, _: &Dependencies) -> Result<BinaryAsset, BoxError> {
        let data = descriptor.require_file()?.read()?;
        Ok(BinaryAsset {
            data,
            path: descriptor.path().to_string(),
        })
    }
}

/// UTF-8 text file
#[derive(Clone, Debug)]
pub struct TextAsset {
    pub content: String,
    pub path: String,
}

/// Synchronous loader for UTF-8 text
#[derive(Clone, Copy, Debug, Default)]
pub struct TextLoader;

impl SyncLoader<TextAsset> for TextLoader {
    fn load(&self, descriptor: &Descriptor, _: &Dependencies) -> Result<TextAsset, BoxError> {
        let content = descriptor.require_file()?.read_to_string()?;
        Ok(TextAsset {
            content,
            path: descriptor.path().to_string(),
        })
    }
}

/// Parsed JSON document
#[derive(Clone, Debug)]
pub struct JsonAsset {
    pub value: serde_json::Value,
    pub path: String,
}

/// Asynchronous JSON loader: reads and parses off-thread, publishes on the owning thread
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLoader;

impl AsyncLoader<JsonAsset> for JsonLoader {
    type Prepared = serde_json::Value;

    fn prepare(
        &self,
        descriptor: &Descriptor,
        _: &Dependencies,
    ) -> Result<serde_json::Value, BoxError> {
        let bytes = descriptor.require_file()?.read()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn finalize(
        &self,
        descriptor: &Descriptor,
        value: serde_json::Value,
        _: &Dependencies,
    ) -> Result<JsonAsset, BoxError> {
        Ok(JsonAsset {
            value,
            path: descriptor.path().to_string(),
        })
    }
}
