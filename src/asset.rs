//! Model asset resolution and staging.
//!
//! Bundled assets live under a configured asset root; the engine wants a
//! plain file path, so the loader copies the asset to a fixed destination
//! in the cache directory before construction. The destination is
//! overwritten on every load. Stale files from a previously configured
//! destination name are not cleaned up; the cache holds at most one live
//! model per configured name and orphans are harmless.

use std::path::{Component, Path, PathBuf};

use crate::error::LoadError;

/// A resolved model asset: where it comes from and where it gets staged.
#[derive(Clone, Debug)]
pub struct ModelAsset {
    identifier: String,
    source: PathBuf,
    destination: PathBuf,
}

impl ModelAsset {
    /// Resolve an asset identifier under the asset root.
    ///
    /// Identifiers are relative paths into the bundle; anything that would
    /// escape the root (absolute paths, `..` components) resolves to
    /// nothing, the same as a missing asset.
    pub fn resolve(
        asset_root: &Path,
        identifier: &str,
        cache_dir: &Path,
        file_name: &str,
    ) -> Result<Self, LoadError> {
        if identifier.is_empty() || !is_bundle_relative(Path::new(identifier)) {
            return Err(LoadError::AssetNotFound(identifier.to_string()));
        }

        let source = asset_root.join(identifier);
        if !source.is_file() {
            return Err(LoadError::AssetNotFound(identifier.to_string()));
        }

        Ok(Self {
            identifier: identifier.to_string(),
            source,
            destination: cache_dir.join(file_name),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Copy the asset bytes to the cache destination, overwriting any
    /// previous copy, and return the staged path.
    pub fn stage(&self) -> Result<PathBuf, LoadError> {
        if let Some(parent) = self.destination.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LoadError::CopyIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::copy(&self.source, &self.destination).map_err(|source| LoadError::CopyIo {
            path: self.destination.clone(),
            source,
        })?;

        log::debug!(
            "staged asset '{}' to {}",
            self.identifier,
            self.destination.display()
        );
        Ok(self.destination.clone())
    }
}

fn is_bundle_relative(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}
