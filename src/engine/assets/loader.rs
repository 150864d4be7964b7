// Path resolution and resource decoding

use super::palette::{self, PaletteColor};
use super::texture::{self, Texture};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Base directory that logical asset names are resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    base_path: PathBuf,
}

impl AssetRoot {
    /// Create a new asset root with the given base path
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the full path for a logical name
    ///
    /// Names are joined as-is; an absolute name or `..` components escape the root.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Whether a non-empty file exists for the name
    ///
    /// Best effort: the file can still vanish before it is actually read.
    pub fn can_load(&self, name: &str) -> bool {
        is_loadable(&self.resolve(name))
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The base path as a display string
    pub fn as_string(&self) -> String {
        self.base_path.to_string_lossy().into_owned()
    }
}

/// Whether `path` is a non-empty regular file
pub fn is_loadable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Decodes files into in-memory resources
///
/// Called synchronously on the thread that drives the cache.
pub trait ResourceLoader: Send + Sync {
    /// Decode the image at `path`, consulting its sidecar metafile when asked to
    fn load_texture(&self, path: &Path, use_metafile: bool) -> Result<Texture>;

    /// Parse the palette file at `path`
    fn load_palette(&self, path: &Path) -> Result<Vec<PaletteColor>>;
}

/// Loader reading image and palette files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl ResourceLoader for FileLoader {
    fn load_texture(&self, path: &Path, use_metafile: bool) -> Result<Texture> {
        let tex = Texture::from_file(path)?;
        if use_metafile {
            tex.with_metafile(&texture::metafile_path(path))
        } else {
            Ok(tex)
        }
    }

    fn load_palette(&self, path: &Path) -> Result<Vec<PaletteColor>> {
        palette::read_palette(path)
    }
}
