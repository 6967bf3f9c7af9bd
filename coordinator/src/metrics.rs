//! Prometheus metrics for poll writes and the cache behind them.
//!
//! [`CoordinatorMetrics`] owns its own [`Registry`]; the HTTP `/metrics`
//! route renders it with [`CoordinatorMetrics::encode`].

use pollchain_cache::CacheStats;
use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

pub struct CoordinatorMetrics {
    pub registry: Registry,

    /// Finished writes by `operation` (create_poll, cast_vote) and `outcome`
    /// (confirmed, reverted, failed).
    pub transactions: IntCounterVec,
    /// Writes stopped before submission, by `operation` and `reason`.
    pub rejections: IntCounterVec,

    /// Submission to receipt, in milliseconds.
    pub confirmation_latency_ms: Histogram,

    pub cache_hits: IntGauge,
    pub cache_misses: IntGauge,
    pub cache_ledger_reads: IntGauge,
    pub cache_invalidations: IntGauge,
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transactions = register_int_counter_vec_with_registry!(
            Opts::new(
                "pollchain_transactions_total",
                "Poll transactions by operation and outcome"
            ),
            &["operation", "outcome"],
            registry
        )
        .expect("failed to register transactions counter");

        let rejections = register_int_counter_vec_with_registry!(
            Opts::new(
                "pollchain_rejections_total",
                "Writes rejected before submission"
            ),
            &["operation", "reason"],
            registry
        )
        .expect("failed to register rejections counter");

        // 50 ms to roughly 7 minutes.
        let confirmation_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "pollchain_confirmation_latency_ms",
                "Time from submission to receipt in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(50.0, 2.0, 14).unwrap()),
            registry
        )
        .expect("failed to register confirmation_latency_ms histogram");

        let cache_hits = register_int_gauge_with_registry!(
            Opts::new("pollchain_cache_hits", "Cache lookups served locally"),
            registry
        )
        .expect("failed to register cache_hits gauge");

        let cache_misses = register_int_gauge_with_registry!(
            Opts::new("pollchain_cache_misses", "Cache lookups that needed a fill"),
            registry
        )
        .expect("failed to register cache_misses gauge");

        let cache_ledger_reads = register_int_gauge_with_registry!(
            Opts::new(
                "pollchain_cache_ledger_reads",
                "Read-only ledger calls issued by the cache"
            ),
            registry
        )
        .expect("failed to register cache_ledger_reads gauge");

        let cache_invalidations = register_int_gauge_with_registry!(
            Opts::new("pollchain_cache_invalidations", "Cache invalidations"),
            registry
        )
        .expect("failed to register cache_invalidations gauge");

        Self {
            registry,
            transactions,
            rejections,
            confirmation_latency_ms,
            cache_hits,
            cache_misses,
            cache_ledger_reads,
            cache_invalidations,
        }
    }

    pub fn observe_cache(&self, stats: &CacheStats) {
        self.cache_hits.set(stats.hits() as i64);
        self.cache_misses.set(stats.misses() as i64);
        self.cache_ledger_reads.set(stats.ledger_reads() as i64);
        self.cache_invalidations.set(stats.invalidations() as i64);
    }

    /// Prometheus text exposition of every metric in the registry.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for CoordinatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
