/// Update pump for live asset reloading
///
/// Decides on which ticks the asset cache should apply pending file changes.
/// Checking is cheap and never blocks, but a fixed interval keeps bursts of
/// editor saves from being re-decoded on every frame.
use crate::engine::assets::{AssetCache, AssetError};
use std::time::{Duration, Instant};

/// Default interval between update checks (10 per second)
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Update check timing state
pub struct UpdatePump {
    /// Minimum time between two checks
    interval: Duration,

    /// Time of the last check, `None` before the first one
    last_check: Option<Instant>,

    /// Whether checks are suspended
    paused: bool,

    /// Checks performed
    check_count: u64,

    /// Resources refreshed over all checks
    refresh_count: u64,
}

impl UpdatePump {
    /// Create a new pump checking at most once per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_check: None,
            paused: false,
            check_count: 0,
            refresh_count: 0,
        }
    }

    /// Whether a check is due at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        if self.paused {
            return false;
        }
        match self.last_check {
            Some(last) => now.duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Time left until the next check is due
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_check {
            Some(last) => self.interval.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Run a check if one is due, returning the number of refreshed resources
    pub fn tick(&mut self, cache: &mut AssetCache) -> Result<usize, AssetError> {
        self.tick_at(cache, Instant::now())
    }

    /// Same as [`UpdatePump::tick`] with an explicit clock
    pub fn tick_at(&mut self, cache: &mut AssetCache, now: Instant) -> Result<usize, AssetError> {
        if !self.is_due(now) {
            return Ok(0);
        }

        self.last_check = Some(now);
        self.check_count += 1;

        let refreshed = cache.check_updates()?;
        if refreshed > 0 {
            log::debug!("Update check {} refreshed {} assets", self.check_count, refreshed);
        }
        self.refresh_count += refreshed as u64;
        Ok(refreshed)
    }

    /// Get the interval between checks
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Get total number of checks performed
    pub fn check_count(&self) -> u64 {
        self.check_count
    }

    /// Get total number of resources refreshed
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Check if update checks are paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspend update checks
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Asset update checks paused");
        }
    }

    /// Resume update checks; the next tick checks immediately
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.last_check = None;
            log::info!("Asset update checks resumed");
        }
    }
}

impl Default for UpdatePump {
    fn default() -> Self {
        Self::new(DEFAULT_CHECK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::{CacheConfig, WatchMode};

    fn disabled_cache() -> (tempfile::TempDir, AssetCache) {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::new(dir.path()).with_watch(WatchMode::Disabled);
        let cache = AssetCache::new(config).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_pump_creation() {
        let pump = UpdatePump::default();
        assert_eq!(pump.interval(), DEFAULT_CHECK_INTERVAL);
        assert_eq!(pump.check_count(), 0);
        assert_eq!(pump.refresh_count(), 0);
        assert!(!pump.is_paused());
    }

    #[test]
    fn test_first_tick_is_due() {
        let pump = UpdatePump::new(Duration::from_secs(60));
        assert!(pump.is_due(Instant::now()));
        assert_eq!(pump.time_until_due(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_interval_gates_checks() {
        let (_dir, mut cache) = disabled_cache();
        let mut pump = UpdatePump::new(Duration::from_millis(100));
        let start = Instant::now();

        pump.tick_at(&mut cache, start).unwrap();
        pump.tick_at(&mut cache, start + Duration::from_millis(50)).unwrap();
        assert_eq!(pump.check_count(), 1);
        assert_eq!(
            pump.time_until_due(start + Duration::from_millis(50)),
            Duration::from_millis(50)
        );

        pump.tick_at(&mut cache, start + Duration::from_millis(100)).unwrap();
        assert_eq!(pump.check_count(), 2);
    }

    #[test]
    fn test_paused_no_checks() {
        let (_dir, mut cache) = disabled_cache();
        let mut pump = UpdatePump::new(Duration::ZERO);

        pump.pause();
        assert!(pump.is_paused());
        pump.tick(&mut cache).unwrap();
        assert_eq!(pump.check_count(), 0);

        pump.resume();
        assert!(!pump.is_paused());
        pump.tick(&mut cache).unwrap();
        assert_eq!(pump.check_count(), 1);
    }

    #[test]
    fn test_tick_without_events_refreshes_nothing() {
        let (_dir, mut cache) = disabled_cache();
        let mut pump = UpdatePump::default();

        assert_eq!(pump.tick(&mut cache).unwrap(), 0);
        assert_eq!(pump.refresh_count(), 0);
    }
}
