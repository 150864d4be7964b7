// Asset management system
//
// Resolves logical names against a root directory, caches decoded textures and
// palettes, and keeps them coherent with files edited on disk.

mod config;
mod handle;
mod hot_reload;
mod loader;
mod manager;
pub mod palette;
pub mod texture;

pub use config::{CacheConfig, WatchMode, DEFAULT_MISSING_ASSET, DEFAULT_ROOT};
pub use handle::{AssetId, Handle};
pub use hot_reload::{
    open_facility, NullWatch, WatchDescriptor, WatchError, WatchEvent, WatchEventKind,
    WatchFacility,
};
pub use loader::{AssetRoot, FileLoader, ResourceLoader};
pub use manager::{AssetCache, AssetStats, TextureHandle};
pub use palette::PaletteColor;
pub use texture::{SubTexture, Texture};

#[cfg(feature = "watch")]
pub use hot_reload::NotifyWatch;

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to load asset {path}: {reason:#}")]
    Decode { path: String, reason: anyhow::Error },

    #[error("File watching unavailable: {0}")]
    WatchInit(#[source] WatchError),

    #[error("Failed to check for asset updates: {0}")]
    WatchRead(#[source] WatchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_display() {
        let err = AssetError::NotFound("palettes/base.csv".to_string());
        assert_eq!(err.to_string(), "Asset not found: palettes/base.csv");
    }

    #[test]
    fn test_decode_error_names_path() {
        let err = AssetError::Decode {
            path: "/assets/broken.png".to_string(),
            reason: anyhow::anyhow!("bad header"),
        };
        let text = err.to_string();
        assert!(text.contains("/assets/broken.png"));
        assert!(text.contains("bad header"));
    }
}
