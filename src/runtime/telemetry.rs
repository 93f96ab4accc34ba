use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters for one import run.
#[derive(Default, Debug)]
pub struct Telemetry {
    categories_created: AtomicU64,
    categories_failed: AtomicU64,
    cache_hits: AtomicU64,
    waves: AtomicU64,
}

impl Telemetry {
    pub fn record_created(&self) {
        self.categories_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.categories_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wave(&self) {
        self.waves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn categories_created(&self) -> u64 {
        self.categories_created.load(Ordering::Relaxed)
    }

    pub fn categories_failed(&self) -> u64 {
        self.categories_failed.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn waves(&self) -> u64 {
        self.waves.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            categories_created: self.categories_created(),
            categories_failed: self.categories_failed(),
            cache_hits: self.cache_hits(),
            waves: self.waves(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub categories_created: u64,
    pub categories_failed: u64,
    pub cache_hits: u64,
    pub waves: u64,
}
