//! Execution-history advisor (spec §4.3): a bounded map from the
//! SHA-256 of a job's code to its past execution statistics, used to
//! suggest a priority (SJF-flavored) when the caller submits none.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use moduly_ports::sandbox::Priority;
use sha2::{Digest, Sha256};

/// Average-execution-time below which `High` is suggested.
const FAST_THRESHOLD: Duration = Duration::from_millis(500);
/// Average-execution-time above which `Low` is suggested.
const SLOW_THRESHOLD: Duration = Duration::from_secs(2);

/// Running statistics for one distinct code payload.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionStats {
    /// Number of completed executions recorded.
    pub total_executions: u64,
    /// Sum of every recorded execution time.
    pub total_time: Duration,
    /// Shortest execution time seen.
    pub min_time: Duration,
    /// Longest execution time seen.
    pub max_time: Duration,
    last_seen: Instant,
}

impl ExecutionStats {
    fn record(&mut self, elapsed: Duration) {
        self.total_executions += 1;
        self.total_time += elapsed;
        self.min_time = self.min_time.min(elapsed);
        self.max_time = self.max_time.max(elapsed);
        self.last_seen = Instant::now();
    }

    /// Mean execution time across every recorded run.
    #[must_use]
    pub fn avg_time(&self) -> Duration {
        if self.total_executions == 0 {
            Duration::ZERO
        } else {
            self.total_time / u32::try_from(self.total_executions).unwrap_or(u32::MAX)
        }
    }
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self {
            total_executions: 0,
            total_time: Duration::ZERO,
            min_time: Duration::MAX,
            max_time: Duration::ZERO,
            last_seen: Instant::now(),
        }
    }
}

/// Bounded, SHA-256-keyed store of per-code execution statistics.
///
/// Safe to share across the scheduler's worker tasks — every operation
/// goes through a [`DashMap`] entry, not a crate-wide lock.
pub struct ExecutionHistory {
    stats: DashMap<String, ExecutionStats>,
    max_entries: usize,
}

impl ExecutionHistory {
    /// Build a history bounded to `max_entries` distinct code hashes.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            stats: DashMap::new(),
            max_entries,
        }
    }

    fn hash_code(code: &str) -> String {
        let digest = Sha256::digest(code.as_bytes());
        hex::encode(digest)
    }

    /// Record one job's execution time against its code hash, evicting
    /// the oldest 25% of entries if the bound is exceeded.
    pub fn record(&self, code: &str, elapsed: Duration) {
        let key = Self::hash_code(code);
        self.stats.entry(key).or_default().record(elapsed);

        if self.stats.len() > self.max_entries {
            self.evict_oldest();
        }
    }

    /// Suggest a priority for `code` from its recorded average
    /// execution time, or `fallback` if no history exists.
    #[must_use]
    pub fn suggest_priority(&self, code: &str, fallback: Priority) -> Priority {
        let key = Self::hash_code(code);
        let Some(entry) = self.stats.get(&key) else {
            return fallback;
        };
        if entry.total_executions == 0 {
            return fallback;
        }
        let avg = entry.avg_time();
        if avg < FAST_THRESHOLD {
            Priority::High
        } else if avg > SLOW_THRESHOLD {
            Priority::Low
        } else {
            Priority::Normal
        }
    }

    /// The recorded statistics for `code`, if any.
    #[must_use]
    pub fn stats_for(&self, code: &str) -> Option<ExecutionStats> {
        self.stats.get(&Self::hash_code(code)).map(|entry| *entry)
    }

    /// Number of distinct code hashes currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// `true` when no code hash has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    fn evict_oldest(&self) {
        let mut by_age: Vec<(String, Instant)> =
            self.stats.iter().map(|entry| (entry.key().clone(), entry.value().last_seen)).collect();
        by_age.sort_by_key(|(_, last_seen)| *last_seen);
        let remove_count = by_age.len() / 4;
        for (key, _) in by_age.into_iter().take(remove_count) {
            self.stats.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_returns_fallback() {
        let history = ExecutionHistory::new(100);
        assert_eq!(history.suggest_priority("print(1)", Priority::Normal), Priority::Normal);
    }

    #[test]
    fn fast_code_suggests_high() {
        let history = ExecutionHistory::new(100);
        history.record("fast()", Duration::from_millis(10));
        assert_eq!(history.suggest_priority("fast()", Priority::Normal), Priority::High);
    }

    #[test]
    fn slow_code_suggests_low() {
        let history = ExecutionHistory::new(100);
        history.record("slow()", Duration::from_secs(5));
        assert_eq!(history.suggest_priority("slow()", Priority::Normal), Priority::Low);
    }

    #[test]
    fn mid_range_code_suggests_normal() {
        let history = ExecutionHistory::new(100);
        history.record("mid()", Duration::from_millis(900));
        assert_eq!(history.suggest_priority("mid()", Priority::High), Priority::Normal);
    }

    #[test]
    fn eviction_keeps_size_bounded() {
        let history = ExecutionHistory::new(4);
        for i in 0..8 {
            history.record(&format!("code_{i}"), Duration::from_millis(1));
        }
        assert!(history.len() <= 4 + 1);
    }
}
