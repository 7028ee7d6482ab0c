use std::path::{Path, PathBuf};

use crate::error::RenderError;

/// Pluggable source of template files.
///
/// Used strictly sequentially; `load` may be re-entered for
/// include/extends chains, and no handle outlives a single call.
pub trait SourceLoader {
    /// Read the file at `path` as a string.
    fn load(&self, path: &Path) -> Result<String, RenderError>;

    /// Resolve `name` as a sibling of `base`.
    fn resolve_sibling(&self, base: &Path, name: &str) -> PathBuf;
}

/// The filesystem loader.
#[derive(Debug, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<String, RenderError> {
        log::debug!("loading {}", path.display());
        std::fs::read_to_string(path).map_err(|cause| RenderError::Io {
            path: path.to_path_buf(),
            cause,
        })
    }

    fn resolve_sibling(&self, base: &Path, name: &str) -> PathBuf {
        base.with_file_name(name)
    }
}
