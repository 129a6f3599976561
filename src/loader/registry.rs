use crate::error::{AssetError, Result};
use crate::identifier::{AssetType, Identifier};
use crate::loader::Loader;
use ahash::AHashMap;

/// Loaders by type, with optional path-suffix overrides.
///
/// A loader registered for a suffix wins over the type-wide default for paths
/// ending in that suffix. When several suffixes match, the longest wins.
#[derive(Clone, Default, Debug)]
pub struct LoaderRegistry {
    defaults: AHashMap<AssetType, Loader>,
    by_suffix: AHashMap<AssetType, Vec<(String, Loader)>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` for its own output type
    pub fn insert(&mut self, suffix: Option<&str>, loader: Loader) {
        let asset_type = loader.output_type();
        match suffix {
            None => {
                self.defaults.insert(asset_type, loader);
            }
            Some(suffix) => {
                let entries = self.by_suffix.entry(asset_type).or_default();
                entries.retain(|(existing, _)| existing != suffix);
                entries.push((suffix.to_string(), loader));
                entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
            }
        }
    }

    /// Registers `loader` for `asset_type`, rejecting loaders of another output type
    pub fn register(
        &mut self,
        asset_type: AssetType,
        suffix: Option<&str>,
        loader: Loader,
    ) -> Result<()> {
        if loader.output_type() != asset_type {
            return Err(AssetError::InvalidLoader {
                identifier: Identifier::with_type(suffix.unwrap_or("*"), asset_type),
                reason: format!("loader produces {}", loader.output_type()),
            });
        }
        self.insert(suffix, loader);
        Ok(())
    }

    /// Loader for an asset of `asset_type` at `path`
    pub fn get(&self, asset_type: AssetType, path: &str) -> Option<Loader> {
        self.by_suffix
            .get(&asset_type)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|(suffix, _)| path.ends_with(suffix.as_str()))
                    .map(|(_, loader)| loader.clone())
            })
            .or_else(|| self.defaults.get(&asset_type).cloned())
    }

    pub fn contains(&self, asset_type: AssetType) -> bool {
        self.defaults.contains_key(&asset_type) || self.by_suffix.contains_key(&asset_type)
    }

    /// Number of registrations, defaults and suffix overrides alike
    pub fn len(&self) -> usize {
        self.defaults.len() + self.by_suffix.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::identifier::Descriptor;
    use crate::loader::{Dependencies, SyncLoader};

    #[derive(Debug, PartialEq)]
    struct Texture(&'static str);

    struct Named(&'static str);

    impl SyncLoader<Texture> for Named {
        fn load(&self, _: &Descriptor, _: &Dependencies) -> std::result::Result<Texture, BoxError> {
            Ok(Texture(self.0))
        }
    }

    fn loaded_by(registry: &LoaderRegistry, path: &str) -> Option<&'static str> {
        let Some(Loader::Sync(loader)) = registry.get(AssetType::of::<Texture>(), path) else {
            return None;
        };
        let value = loader
            .load(&Descriptor::new::<Texture>(path), &Dependencies::default())
            .ok()?;
        value.downcast_ref::<Texture>().map(|t| t.0)
    }

    #[test]
    fn test_suffix_beats_default() {
        let mut registry = LoaderRegistry::new();
        registry.insert(None, Loader::sync::<Texture, _>(Named("default")));
        registry.insert(Some(".ktx"), Loader::sync::<Texture, _>(Named("ktx")));
        registry.insert(Some(".gz.ktx"), Loader::sync::<Texture, _>(Named("compressed")));

        assert_eq!(registry.len(), 3);
        assert_eq!(loaded_by(&registry, "a.png"), Some("default"));
        assert_eq!(loaded_by(&registry, "a.ktx"), Some("ktx"));
        assert_eq!(loaded_by(&registry, "a.gz.ktx"), Some("compressed"));
    }

    #[test]
    fn test_missing_type_has_no_loader() {
        let mut registry = LoaderRegistry::new();
        registry.insert(Some(".ktx"), Loader::sync::<Texture, _>(Named("ktx")));
        assert!(registry.contains(AssetType::of::<Texture>()));
        assert_eq!(loaded_by(&registry, "a.png"), None);
        assert!(registry.get(AssetType::of::<String>(), "a.ktx").is_none());
    }

    #[test]
    fn test_reregistering_suffix_replaces() {
        let mut registry = LoaderRegistry::new();
        registry.insert(Some(".ktx"), Loader::sync::<Texture, _>(Named("old")));
        registry.insert(Some(".ktx"), Loader::sync::<Texture, _>(Named("new")));
        assert_eq!(registry.len(), 1);
        assert_eq!(loaded_by(&registry, "a.ktx"), Some("new"));
    }

    #[test]
    fn test_register_rejects_wrong_output_type() {
        let mut registry = LoaderRegistry::new();
        let loader = Loader::sync::<Texture, _>(Named("x"));
        let result = registry.register(AssetType::of::<String>(), None, loader);
        assert!(matches!(result, Err(AssetError::InvalidLoader { .. })));
        assert!(registry.is_empty());
    }
}
