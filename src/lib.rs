//! Asset cache with live filesystem invalidation.
//!
//! Textures and palettes are resolved against a root directory, decoded once
//! and shared through [`Handle`]s. Files rewritten on disk are picked up by
//! [`AssetCache::check_updates`], usually driven by an [`UpdatePump`].

pub mod engine;

pub use engine::assets::{
    AssetCache, AssetError, AssetId, AssetStats, CacheConfig, Handle, PaletteColor, Texture,
    TextureHandle, WatchMode,
};
pub use engine::update_loop::UpdatePump;
