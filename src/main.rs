use anyhow::Result;
use assetwatch::{AssetCache, CacheConfig, UpdatePump, WatchMode};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Load assets and keep them in sync with their files on disk
#[derive(Debug, Parser)]
#[command(name = "assetwatch", version, about)]
struct Args {
    /// Directory logical asset names are resolved against
    #[arg(long, env = "ASSET_ROOT", default_value = assetwatch::engine::assets::DEFAULT_ROOT)]
    root: PathBuf,

    /// Disable live reloading
    #[arg(long)]
    no_watch: bool,

    /// Consult sidecar metafiles for texture regions
    #[arg(long)]
    metafile: bool,

    /// Minimum time between update checks
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Stop after this many update checks (0 runs until killed)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Palettes to load
    #[arg(long = "palette")]
    palettes: Vec<String>,

    /// Textures to load
    names: Vec<String>,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let watch = if args.no_watch {
        WatchMode::Disabled
    } else {
        WatchMode::Native
    };

    let mut cache = AssetCache::new(CacheConfig::new(&args.root).with_watch(watch))?;
    info!("Serving assets from {}", cache.root_string());

    let mut textures = Vec::with_capacity(args.names.len());
    for name in &args.names {
        let handle = cache.get(name, args.metafile)?;
        {
            let tex = handle.read();
            info!(
                "{}: {}x{}, {} regions",
                name,
                tex.width,
                tex.height,
                tex.subtexture_count()
            );
        }
        textures.push((name.as_str(), handle));
    }

    for name in &args.palettes {
        let palette = cache.get_palette(name)?;
        info!("{}: {} colors", name, palette.len());
    }

    if !cache.is_live() {
        info!("Nothing to watch, exiting");
        return Ok(());
    }

    let mut pump = UpdatePump::new(Duration::from_millis(args.interval_ms));
    info!("Watching {} textures", cache.stats().watch_count);

    while args.ticks == 0 || pump.check_count() < args.ticks {
        if pump.tick(&mut cache)? > 0 {
            for (name, handle) in &textures {
                let tex = handle.read();
                info!(
                    "{}: generation {}, {}x{}",
                    name,
                    handle.generation(),
                    tex.width,
                    tex.height
                );
            }
        }
        std::thread::sleep(pump.time_until_due(Instant::now()).max(Duration::from_millis(1)));
    }

    info!(
        "Stopped after {} checks, {} refreshes",
        pump.check_count(),
        pump.refresh_count()
    );
    Ok(())
}
