// Asset cache configuration

use std::path::{Path, PathBuf};

/// Default base directory for assets
pub const DEFAULT_ROOT: &str = "assets";

/// Placeholder shown in place of assets that cannot be found
pub const DEFAULT_MISSING_ASSET: &str = "missing.png";

/// How external file changes are noticed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    /// Use the OS facility when it is compiled in
    #[default]
    Native,
    /// Never watch; loaded assets only change through explicit reloads
    Disabled,
}

/// Settings for an [`AssetCache`](super::AssetCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    root: PathBuf,
    watch: WatchMode,
    missing_asset: String,
}

impl CacheConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_watch(mut self, watch: WatchMode) -> Self {
        self.watch = watch;
        self
    }

    /// Logical name of the placeholder texture, resolved against the root
    pub fn with_missing_asset(mut self, name: impl Into<String>) -> Self {
        self.missing_asset = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn watch(&self) -> WatchMode {
        self.watch
    }

    pub fn missing_asset(&self) -> &str {
        &self.missing_asset
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            watch: WatchMode::Native,
            missing_asset: DEFAULT_MISSING_ASSET.to_string(),
        }
    }
}
