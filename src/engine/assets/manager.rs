// Central asset cache

use super::config::CacheConfig;
use super::hot_reload::{open_facility, WatchDescriptor, WatchEventKind, WatchFacility};
use super::loader::{is_loadable, AssetRoot, FileLoader, ResourceLoader};
use super::palette::PaletteColor;
use super::texture::Texture;
use super::{AssetError, AssetId, Handle};
use log::{debug, info, trace, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Shared handle to a cached texture
pub type TextureHandle = Handle<Texture>;

/// Upper bound on poll rounds per update check; leftovers wait for the next tick
const MAX_DRAIN_ROUNDS: usize = 64;

/// A loaded file and what is needed to decode it again
struct WatchEntry {
    path: PathBuf,
    use_metafile: bool,
    handle: TextureHandle,
}

/// Central asset cache
///
/// Maps logical names to decoded resources, loading each resolved path at most
/// once until it is invalidated, and refreshes loaded textures in place when
/// their files are rewritten on disk.
///
/// Mutation is single-threaded: one thread drives `get`/`load`/`check_updates`.
/// Other threads may read through handles they were given.
pub struct AssetCache {
    root: AssetRoot,

    /// Logical name of the placeholder texture
    missing_asset: String,

    loader: Box<dyn ResourceLoader>,
    watch: Box<dyn WatchFacility>,

    /// Loaded textures by resolved path
    textures: HashMap<PathBuf, TextureHandle>,

    /// Parsed palettes by resolved path
    palettes: HashMap<PathBuf, Vec<PaletteColor>>,

    watches: HashMap<WatchDescriptor, WatchEntry>,
    watched_paths: HashMap<PathBuf, WatchDescriptor>,

    /// Placeholder, built on first use
    missing: Option<TextureHandle>,
}

impl AssetCache {
    /// Create a cache decoding from disk, watching files as configured
    pub fn new(config: CacheConfig) -> Result<Self, AssetError> {
        let watch = open_facility(config.watch()).map_err(AssetError::WatchInit)?;
        Ok(Self::with_parts(config, Box::new(FileLoader), watch))
    }

    /// Create a cache from explicit collaborators
    pub fn with_parts(
        config: CacheConfig,
        loader: Box<dyn ResourceLoader>,
        watch: Box<dyn WatchFacility>,
    ) -> Self {
        if !watch.is_live() {
            info!("Live asset reloading is disabled");
        }

        Self {
            root: AssetRoot::new(config.root()),
            missing_asset: config.missing_asset().to_string(),
            loader,
            watch,
            textures: HashMap::new(),
            palettes: HashMap::new(),
            watches: HashMap::new(),
            watched_paths: HashMap::new(),
            missing: None,
        }
    }

    /// Current base directory
    pub fn root(&self) -> &Path {
        self.root.base_path()
    }

    /// Current base directory as a string
    pub fn root_string(&self) -> String {
        self.root.as_string()
    }

    /// Move the cache to a new base directory
    ///
    /// Changing the root always invalidates everything, since every cached
    /// resolved path is stale. Returns `false` (and keeps the cache) when the
    /// root is unchanged.
    pub fn relocate_root<P: AsRef<Path>>(&mut self, root: P) -> bool {
        let root = AssetRoot::new(root);
        if root == self.root {
            return false;
        }

        info!(
            "Asset root relocated from {} to {}",
            self.root.as_string(),
            root.as_string()
        );
        self.root = root;
        self.clear();
        true
    }

    /// Set the base directory; see [`AssetCache::relocate_root`]
    pub fn set_root<P: AsRef<Path>>(&mut self, root: P) {
        self.relocate_root(root);
    }

    /// Whether a non-empty file exists for the name under the current root
    pub fn can_load(&self, name: &str) -> bool {
        self.root.can_load(name)
    }

    /// Load a texture from disk, replacing any cached copy
    ///
    /// A name with no file behind it yields the placeholder texture and drops
    /// whatever was cached for it. A file that exists but fails to decode is an
    /// error.
    pub fn load(&mut self, name: &str, use_metafile: bool) -> Result<TextureHandle, AssetError> {
        let path = self.root.resolve(name);

        if !self.root.can_load(name) {
            warn!("Asset file {} is not there, using placeholder", path.display());
            self.forget(&path);
            return self.missing_texture();
        }

        let texture = self
            .loader
            .load_texture(&path, use_metafile)
            .map_err(|reason| AssetError::Decode {
                path: path.display().to_string(),
                reason,
            })?;

        let handle = Handle::new(AssetId::from_path(&path), texture);
        debug!("Loaded texture {} ({})", path.display(), handle.id());

        self.register_watch(&path, use_metafile, &handle);
        self.textures.insert(path, handle.clone());

        Ok(handle)
    }

    /// Get a texture, loading it on first request
    pub fn get(&mut self, name: &str, use_metafile: bool) -> Result<TextureHandle, AssetError> {
        if let Some(handle) = self.textures.get(&self.root.resolve(name)) {
            trace!("Texture cache hit for {}", name);
            return Ok(handle.clone());
        }

        debug!("Texture cache miss for {}", name);
        self.load(name, use_metafile)
    }

    /// Get a copy of a palette, parsing the file on first request
    pub fn get_palette(&mut self, name: &str) -> Result<Vec<PaletteColor>, AssetError> {
        let path = self.root.resolve(name);

        if let Some(palette) = self.palettes.get(&path) {
            return Ok(palette.clone());
        }

        if !self.root.can_load(name) {
            return Err(AssetError::NotFound(path.display().to_string()));
        }

        let palette = self
            .loader
            .load_palette(&path)
            .map_err(|reason| AssetError::Decode {
                path: path.display().to_string(),
                reason,
            })?;

        debug!("Loaded palette {} ({} colors)", path.display(), palette.len());
        self.palettes.insert(path, palette.clone());
        Ok(palette)
    }

    /// The placeholder texture shown for missing assets
    ///
    /// Built from `<root>/<missing asset>` on first use and shared afterwards.
    /// Failing to load the placeholder itself is an error.
    pub fn missing_texture(&mut self) -> Result<TextureHandle, AssetError> {
        if let Some(handle) = &self.missing {
            return Ok(handle.clone());
        }

        let path = self.root.resolve(&self.missing_asset);
        let texture = self
            .loader
            .load_texture(&path, false)
            .map_err(|reason| AssetError::Decode {
                path: path.display().to_string(),
                reason,
            })?;

        info!("Loaded placeholder texture {}", path.display());
        let handle = Handle::new(AssetId::from_path(&path), texture);
        self.missing = Some(handle.clone());
        Ok(handle)
    }

    /// Apply pending file changes to loaded textures
    ///
    /// Never blocks. Drains the watch facility until it reports nothing pending,
    /// for at most 64 poll rounds; events still queued after that are applied
    /// by the next call. Each rewritten texture is refreshed at most once per
    /// call. Returns the number of textures refreshed.
    pub fn check_updates(&mut self) -> Result<usize, AssetError> {
        let mut refreshed = HashSet::new();

        for _ in 0..MAX_DRAIN_ROUNDS {
            let events = self.watch.poll().map_err(AssetError::WatchRead)?;
            if events.is_empty() {
                return Ok(refreshed.len());
            }

            for event in events {
                if !self.watches.contains_key(&event.descriptor) {
                    debug!("Ignoring event for stale watch {}", event.descriptor);
                    continue;
                }
                if refreshed.contains(&event.descriptor) {
                    continue;
                }

                let updated = match event.kind {
                    WatchEventKind::Written => self
                        .watches
                        .get(&event.descriptor)
                        .is_some_and(|entry| refresh(self.loader.as_ref(), entry)),
                    WatchEventKind::Removed => self.rearm(event.descriptor),
                };

                if updated {
                    refreshed.insert(event.descriptor);
                }
            }
        }

        debug!(
            "Watch events still pending after {} rounds, continuing next check",
            MAX_DRAIN_ROUNDS
        );
        Ok(refreshed.len())
    }

    /// Drop every cached resource and watch
    ///
    /// Handles held elsewhere stay valid but are no longer refreshed or returned
    /// by lookups.
    pub fn clear(&mut self) {
        for (descriptor, entry) in self.watches.drain() {
            if let Err(e) = self.watch.remove(descriptor) {
                warn!("{} ({})", e, entry.path.display());
            }
        }
        self.watched_paths.clear();

        debug!(
            "Cleared {} textures and {} palettes",
            self.textures.len(),
            self.palettes.len()
        );
        self.textures.clear();
        self.palettes.clear();
        self.missing = None;
    }

    /// Whether file changes can trigger refreshes
    pub fn is_live(&self) -> bool {
        self.watch.is_live()
    }

    /// Get statistics about cached assets
    pub fn stats(&self) -> AssetStats {
        AssetStats {
            texture_count: self.textures.len(),
            palette_count: self.palettes.len(),
            watch_count: self.watches.len(),
        }
    }

    fn register_watch(&mut self, path: &Path, use_metafile: bool, handle: &TextureHandle) {
        // One registration per path; a reload re-targets it
        if let Some(descriptor) = self.watched_paths.get(path) {
            if let Some(entry) = self.watches.get_mut(descriptor) {
                entry.handle = handle.clone();
                entry.use_metafile = use_metafile;
                return;
            }
        }

        match self.watch.add(path) {
            Ok(Some(descriptor)) => {
                self.watched_paths.insert(path.to_path_buf(), descriptor);
                self.watches.insert(
                    descriptor,
                    WatchEntry {
                        path: path.to_path_buf(),
                        use_metafile,
                        handle: handle.clone(),
                    },
                );
            }
            Ok(None) => {}
            Err(e) => warn!("{}; live reloading disabled for this asset", e),
        }
    }

    /// Drop the cached texture and watch for a path
    fn forget(&mut self, path: &Path) {
        if self.textures.remove(path).is_some() {
            debug!("Evicted texture {}", path.display());
        }

        if let Some(descriptor) = self.watched_paths.remove(path) {
            self.watches.remove(&descriptor);
            if let Err(e) = self.watch.remove(descriptor) {
                warn!("{} ({})", e, path.display());
            }
        }
    }

    /// Re-watch a file that was deleted or replaced, refreshing it if it came back
    fn rearm(&mut self, descriptor: WatchDescriptor) -> bool {
        let Some(entry) = self.watches.remove(&descriptor) else {
            return false;
        };
        self.watched_paths.remove(&entry.path);

        // The OS usually dropped the watch together with the file
        if let Err(e) = self.watch.remove(descriptor) {
            trace!("{}", e);
        }

        if !is_loadable(&entry.path) {
            warn!(
                "Watched asset {} was removed, keeping the last loaded content",
                entry.path.display()
            );
            return false;
        }

        let updated = refresh(self.loader.as_ref(), &entry);
        self.register_watch(&entry.path, entry.use_metafile, &entry.handle);
        updated
    }
}

/// Decode a watched file again into its existing handle
///
/// A file caught mid-write may not decode; the previous content is kept then.
fn refresh(loader: &dyn ResourceLoader, entry: &WatchEntry) -> bool {
    match loader.load_texture(&entry.path, entry.use_metafile) {
        Ok(texture) => {
            entry.handle.replace(texture);
            info!(
                "Reloaded {} (generation {})",
                entry.path.display(),
                entry.handle.generation()
            );
            true
        }
        Err(e) => {
            warn!("Failed to reload {}: {:#}", entry.path.display(), e);
            false
        }
    }
}

/// Statistics about cached assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetStats {
    pub texture_count: usize,
    pub palette_count: usize,
    pub watch_count: usize,
}
