// Filesystem watch facilities for live asset reloading

use super::config::WatchMode;
use std::fmt;
use std::path::Path;

/// Opaque id of one registered watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchDescriptor(pub(crate) u64);

impl fmt::Display for WatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd{}", self.0)
    }
}

/// What happened to a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// The file was closed after being written
    Written,
    /// The file was deleted or renamed away; the watch is gone with it
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchEvent {
    pub descriptor: WatchDescriptor,
    pub kind: WatchEventKind,
}

/// Watch facility errors
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to initialize file watching: {0}")]
    Init(String),

    #[error("Failed to watch {path}: {reason}")]
    Add { path: String, reason: String },

    #[error("Failed to remove watch {descriptor}: {reason}")]
    Remove {
        descriptor: WatchDescriptor,
        reason: String,
    },

    #[error("Failed to read watch events: {0}")]
    Read(String),
}

/// Non-blocking notification of changes to registered files
pub trait WatchFacility: Send {
    /// Start watching a file
    ///
    /// Returns `None` when the facility does not support live reloading.
    fn add(&mut self, path: &Path) -> Result<Option<WatchDescriptor>, WatchError>;

    /// Stop watching; the descriptor is forgotten even when this fails
    fn remove(&mut self, descriptor: WatchDescriptor) -> Result<(), WatchError>;

    /// Drain pending events without blocking
    ///
    /// An empty vector means nothing is pending. Errors are distinct from "empty".
    fn poll(&mut self) -> Result<Vec<WatchEvent>, WatchError>;

    /// Whether registered files can ever produce events
    fn is_live(&self) -> bool;
}

/// Facility for platforms or configurations without file watching
#[derive(Debug, Default)]
pub struct NullWatch;

impl WatchFacility for NullWatch {
    fn add(&mut self, _path: &Path) -> Result<Option<WatchDescriptor>, WatchError> {
        Ok(None)
    }

    fn remove(&mut self, _descriptor: WatchDescriptor) -> Result<(), WatchError> {
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<WatchEvent>, WatchError> {
        Ok(Vec::new())
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Create the facility selected by the configuration
pub fn open_facility(mode: WatchMode) -> Result<Box<dyn WatchFacility>, WatchError> {
    match mode {
        WatchMode::Disabled => Ok(Box::new(NullWatch)),
        #[cfg(feature = "watch")]
        WatchMode::Native => Ok(Box::new(native::NotifyWatch::new()?)),
        #[cfg(not(feature = "watch"))]
        WatchMode::Native => {
            log::info!("File watching not compiled in, live reloading disabled");
            Ok(Box::new(NullWatch))
        }
    }
}

#[cfg(feature = "watch")]
pub use native::NotifyWatch;

#[cfg(feature = "watch")]
mod native {
    use super::{WatchDescriptor, WatchError, WatchEvent, WatchEventKind, WatchFacility};
    use crossbeam_channel::{Receiver, TryRecvError};
    use notify::event::{AccessKind, AccessMode, ModifyKind};
    use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    struct Registration {
        path: PathBuf,
        canonical: Option<PathBuf>,
    }

    /// OS-backed facility (inotify, FSEvents, ReadDirectoryChangesW)
    pub struct NotifyWatch {
        watcher: RecommendedWatcher,
        events: Receiver<notify::Result<Event>>,
        next_descriptor: u64,
        /// Both the registered and the canonical path map to the descriptor,
        /// since some backends report canonical paths only
        by_path: HashMap<PathBuf, WatchDescriptor>,
        registrations: HashMap<WatchDescriptor, Registration>,
    }

    impl NotifyWatch {
        pub fn new() -> Result<Self, WatchError> {
            let (tx, rx) = crossbeam_channel::unbounded();
            let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
                // Receiver only goes away together with the watcher
                let _ = tx.send(res);
            })
            .map_err(|e| WatchError::Init(e.to_string()))?;

            Ok(Self {
                watcher,
                events: rx,
                next_descriptor: 1,
                by_path: HashMap::new(),
                registrations: HashMap::new(),
            })
        }

        /// Number of active registrations
        pub fn len(&self) -> usize {
            self.registrations.len()
        }

        pub fn is_empty(&self) -> bool {
            self.registrations.is_empty()
        }

        fn classify(kind: &EventKind) -> Option<WatchEventKind> {
            match kind {
                EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                    Some(WatchEventKind::Written)
                }
                // Only inotify reports close-after-write; elsewhere a data write is the best signal
                #[cfg(not(target_os = "linux"))]
                EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                    Some(WatchEventKind::Written)
                }
                EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                    Some(WatchEventKind::Removed)
                }
                _ => None,
            }
        }
    }

    impl WatchFacility for NotifyWatch {
        fn add(&mut self, path: &Path) -> Result<Option<WatchDescriptor>, WatchError> {
            if let Some(&descriptor) = self.by_path.get(path) {
                return Ok(Some(descriptor));
            }

            self.watcher
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|e| WatchError::Add {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;

            let descriptor = WatchDescriptor(self.next_descriptor);
            self.next_descriptor += 1;

            let canonical = path.canonicalize().ok().filter(|c| c != path);
            self.by_path.insert(path.to_path_buf(), descriptor);
            if let Some(canonical) = &canonical {
                self.by_path.insert(canonical.clone(), descriptor);
            }
            self.registrations.insert(
                descriptor,
                Registration {
                    path: path.to_path_buf(),
                    canonical,
                },
            );

            log::trace!("Watching {} as {}", path.display(), descriptor);
            Ok(Some(descriptor))
        }

        fn remove(&mut self, descriptor: WatchDescriptor) -> Result<(), WatchError> {
            let registration =
                self.registrations
                    .remove(&descriptor)
                    .ok_or_else(|| WatchError::Remove {
                        descriptor,
                        reason: "unknown descriptor".to_string(),
                    })?;

            self.by_path.remove(&registration.path);
            if let Some(canonical) = &registration.canonical {
                self.by_path.remove(canonical);
            }

            self.watcher
                .unwatch(&registration.path)
                .map_err(|e| WatchError::Remove {
                    descriptor,
                    reason: e.to_string(),
                })
        }

        fn poll(&mut self) -> Result<Vec<WatchEvent>, WatchError> {
            let mut pending = Vec::new();

            loop {
                let event = match self.events.try_recv() {
                    Ok(Ok(event)) => event,
                    Ok(Err(e)) => return Err(WatchError::Read(e.to_string())),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        return Err(WatchError::Read("event channel disconnected".to_string()))
                    }
                };

                let Some(kind) = Self::classify(&event.kind) else {
                    continue;
                };

                for path in &event.paths {
                    match self.by_path.get(path) {
                        Some(&descriptor) => pending.push(WatchEvent { descriptor, kind }),
                        None => log::trace!("Event for unwatched path {}", path.display()),
                    }
                }
            }

            Ok(pending)
        }

        fn is_live(&self) -> bool {
            true
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::engine::assets::loader::FileLoader;
        use crate::engine::assets::{AssetCache, CacheConfig};
        use std::time::{Duration, Instant};

        const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

        fn save_png(path: &Path, red: u8) {
            image::RgbaImage::from_pixel(1, 1, image::Rgba([red, 0, 0, 255]))
                .save(path)
                .unwrap();
        }

        /// Poll until `done` holds or the timeout passes
        fn wait_for(mut done: impl FnMut() -> bool) -> bool {
            let deadline = Instant::now() + EVENT_TIMEOUT;
            while Instant::now() < deadline {
                if done() {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            false
        }

        #[test]
        fn test_write_produces_written_event() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("a.png");
            std::fs::write(&path, b"first").unwrap();

            let mut watch = NotifyWatch::new().unwrap();
            let descriptor = watch.add(&path).unwrap().unwrap();

            std::fs::write(&path, b"second").unwrap();

            let seen = wait_for(|| {
                watch.poll().unwrap().iter().any(|event| {
                    event.descriptor == descriptor && event.kind == WatchEventKind::Written
                })
            });
            assert!(seen, "no write event for {}", path.display());
        }

        #[test]
        fn test_cache_follows_real_file_changes() {
            let dir = tempfile::tempdir().unwrap();
            save_png(&dir.path().join("missing.png"), 0);
            let path = dir.path().join("a.png");
            save_png(&path, 10);

            let mut cache = AssetCache::with_parts(
                CacheConfig::new(dir.path()),
                Box::new(FileLoader),
                Box::new(NotifyWatch::new().unwrap()),
            );
            let a = cache.get("a.png", false).unwrap();
            assert_eq!(a.read().pixels[0], 10);
            assert_eq!(cache.stats().watch_count, 1);

            // Atomic save: write elsewhere, then rename over the watched file
            let staged = dir.path().join("a.png.tmp.png");
            save_png(&staged, 20);
            std::fs::rename(&staged, &path).unwrap();

            assert!(wait_for(|| {
                cache.check_updates().unwrap();
                a.read().pixels[0] == 20
            }));
            assert_eq!(cache.stats().watch_count, 1);

            // The re-armed watch sees in-place writes too
            save_png(&path, 30);
            assert!(wait_for(|| {
                cache.check_updates().unwrap();
                a.read().pixels[0] == 30
            }));
            assert!(a.generation() >= 2);
        }

        #[test]
        fn test_poll_without_events_is_empty() {
            let mut watch = NotifyWatch::new().unwrap();
            assert!(watch.poll().unwrap().is_empty());
            assert!(watch.is_live());
        }

        #[test]
        fn test_add_missing_file_fails() {
            let mut watch = NotifyWatch::new().unwrap();
            let err = watch.add(Path::new("/nonexistent/file.png")).unwrap_err();
            assert!(matches!(err, WatchError::Add { .. }));
            assert!(watch.is_empty());
        }

        #[test]
        fn test_add_same_path_twice_shares_descriptor() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("a.png");
            std::fs::write(&path, b"data").unwrap();

            let mut watch = NotifyWatch::new().unwrap();
            let first = watch.add(&path).unwrap();
            let second = watch.add(&path).unwrap();

            assert!(first.is_some());
            assert_eq!(first, second);
            assert_eq!(watch.len(), 1);

            watch.remove(first.unwrap()).unwrap();
            assert!(watch.is_empty());
        }

        #[test]
        fn test_remove_unknown_descriptor() {
            let mut watch = NotifyWatch::new().unwrap();
            assert!(watch.remove(WatchDescriptor(99)).is_err());
        }
    }
}
