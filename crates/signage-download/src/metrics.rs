//! Optional Prometheus gauges over [`crate::CacheStats`], mirroring the
//! teacher's `metrics` feature pattern of keeping `prometheus` out of the
//! default dependency graph.

use crate::manager::CacheStats;
use prometheus::{IntGauge, Registry};

pub struct DownloadMetrics {
    cache_used_bytes: IntGauge,
    cache_budget_bytes: IntGauge,
    in_flight: IntGauge,
}

impl DownloadMetrics {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let cache_used_bytes = IntGauge::new(
            "signage_cache_used_bytes",
            "Bytes currently held in the in-memory blob cache",
        )?;
        let cache_budget_bytes = IntGauge::new(
            "signage_cache_budget_bytes",
            "Configured byte budget for the in-memory blob cache",
        )?;
        let in_flight = IntGauge::new(
            "signage_downloads_in_flight",
            "Number of downloads currently in the Downloading state",
        )?;

        registry.register(Box::new(cache_used_bytes.clone()))?;
        registry.register(Box::new(cache_budget_bytes.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            cache_used_bytes,
            cache_budget_bytes,
            in_flight,
        })
    }

    pub fn observe(&self, stats: &CacheStats) {
        self.cache_used_bytes.set(stats.cache_used_bytes as i64);
        self.cache_budget_bytes.set(stats.cache_budget_bytes as i64);
        self.in_flight.set(stats.in_flight as i64);
    }
}
