//! Parser statistics (spec §4.1: `get_stats() -> { files_parsed, hits,
//! misses, hit_rate, total_ms, mean_ms }`).
//!
//! Mean parse time is recomputed from the running total only every
//! `MEAN_RECOMPUTE_INTERVAL` calls, matching spec's "mean parse time is
//! recomputed periodically to amortize cost, never on every call."

use serde::{Deserialize, Serialize};

const MEAN_RECOMPUTE_INTERVAL: u64 = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserStats {
    pub files_parsed: u64,
    pub hits: u64,
    pub misses: u64,
    pub total_ms: f64,
    pub mean_ms: f64,
    calls_since_recompute: u64,
}

impl ParserStats {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_parse(&mut self, elapsed_ms: f64) {
        self.misses += 1;
        self.files_parsed += 1;
        self.total_ms += elapsed_ms;
        self.calls_since_recompute += 1;
        if self.calls_since_recompute >= MEAN_RECOMPUTE_INTERVAL {
            self.recompute_mean();
        }
    }

    fn recompute_mean(&mut self) {
        self.calls_since_recompute = 0;
        if self.files_parsed > 0 {
            self.mean_ms = self.total_ms / self.files_parsed as f64;
        }
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Forces the periodic mean recomputation; exposed so `get_stats` always
    /// returns a value consistent with the latest call even mid-interval.
    pub fn snapshot(&mut self) -> ParserStats {
        self.recompute_mean();
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_with_no_calls() {
        let stats = ParserStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn mean_recomputes_after_interval() {
        let mut stats = ParserStats::default();
        for _ in 0..MEAN_RECOMPUTE_INTERVAL {
            stats.record_parse(10.0);
        }
        assert!((stats.mean_ms - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_forces_recompute_mid_interval() {
        let mut stats = ParserStats::default();
        stats.record_parse(4.0);
        stats.record_parse(8.0);
        let snap = stats.snapshot();
        assert!((snap.mean_ms - 6.0).abs() < f64::EPSILON);
    }
}
