use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolved file backing an asset
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    pub fn read_to_string(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }

    pub fn len(&self) -> io::Result<u64> {
        fs::metadata(&self.path).map(|m| m.len())
    }
}

/// Turns asset paths into file handles. One resolver per store.
pub trait FileResolver: Send + Sync {
    fn resolve(&self, path: &str) -> FileHandle;
}

impl<F> FileResolver for F
where
    F: Fn(&str) -> FileHandle + Send + Sync,
{
    fn resolve(&self, path: &str) -> FileHandle {
        self(path)
    }
}

/// Resolves paths relative to a root directory
#[derive(Clone, Debug)]
pub struct AssetRoot {
    base_path: PathBuf,
}

impl AssetRoot {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl FileResolver for AssetRoot {
    fn resolve(&self, path: &str) -> FileHandle {
        FileHandle::new(self.base_path.join(path))
    }
}

impl Default for AssetRoot {
    fn default() -> Self {
        Self::new("assets")
    }
}

/// Uses asset paths as file paths unchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityResolver;

impl FileResolver for IdentityResolver {
    fn resolve(&self, path: &str) -> FileHandle {
        FileHandle::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_root_joins_paths() {
        let root = AssetRoot::new("content");
        let file = root.resolve("textures/stone.png");
        assert_eq!(file.path(), Path::new("content/textures/stone.png"));
        assert_eq!(file.extension(), Some("png"));
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |path: &str| FileHandle::new(format!("/virtual/{path}"));
        assert_eq!(
            resolver.resolve("a.txt").path(),
            Path::new("/virtual/a.txt")
        );
    }

    #[test]
    fn test_identity_resolver_reads_files() {
        let file = IdentityResolver.resolve("Cargo.toml");
        assert!(file.exists());
        assert!(file.len().unwrap() > 0);
        assert!(!IdentityResolver.resolve("nonexistent.txt").exists());
    }
}
