use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Squad lifecycle counters
#[derive(Debug, Default)]
pub struct SquadMetrics {
    pub squads_formed: AtomicU64,
    pub participants_waiting: AtomicU64,
    pub abandonments: AtomicU64,
    pub expirations: AtomicU64,
    pub votes: AtomicU64,
    pub resets: AtomicU64,
    pub absorbed_failures: AtomicU64,
}

impl SquadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_formation(&self, squads: usize, waiting: usize) {
        self.squads_formed.fetch_add(squads as u64, Ordering::Relaxed);
        self.participants_waiting
            .fetch_add(waiting as u64, Ordering::Relaxed);
    }

    pub fn record_abandonment(&self) {
        self.abandonments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vote(&self) {
        self.votes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failures(&self, count: usize) {
        self.absorbed_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SquadStats {
        SquadStats {
            squads_formed: self.squads_formed.load(Ordering::Relaxed),
            participants_waiting: self.participants_waiting.load(Ordering::Relaxed),
            abandonments: self.abandonments.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            votes: self.votes.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            absorbed_failures: self.absorbed_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Squad metrics: formed={}, waiting={}, abandoned={}, expired={}, votes={}, resets={}, failures={}",
            stats.squads_formed,
            stats.participants_waiting,
            stats.abandonments,
            stats.expirations,
            stats.votes,
            stats.resets,
            stats.absorbed_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadStats {
    pub squads_formed: u64,
    pub participants_waiting: u64,
    pub abandonments: u64,
    pub expirations: u64,
    pub votes: u64,
    pub resets: u64,
    pub absorbed_failures: u64,
}

/// Global metrics instance
static SQUAD_METRICS: std::sync::LazyLock<SquadMetrics> =
    std::sync::LazyLock::new(SquadMetrics::new);

pub fn squad_metrics() -> &'static SquadMetrics {
    &SQUAD_METRICS
}

/// Time an orchestration run and log its duration
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
