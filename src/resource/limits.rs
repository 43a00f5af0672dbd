//! Resource limit configuration and per-job tracking (§5, §7).
//!
//! Memory is tracked as an estimate supplied by the runner at chunk
//! boundaries (number of in-flight patients times an average record size)
//! rather than true process RSS, which keeps this independent of any
//! platform-specific introspection crate.

use std::time::Instant;

use crate::constants::{
    DEFAULT_MAX_CPU_SECONDS, DEFAULT_MAX_MEMORY_BYTES, DEFAULT_MAX_WALL_CLOCK_SECONDS,
};
use crate::error::SimError;

#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub max_memory_bytes: u64,
    pub max_cpu_seconds: u64,
    pub max_wall_clock_seconds: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            max_cpu_seconds: DEFAULT_MAX_CPU_SECONDS,
            max_wall_clock_seconds: DEFAULT_MAX_WALL_CLOCK_SECONDS,
        }
    }
}

/// Tracks one job's resource consumption against its `ResourceLimits`.
/// `check` is called at chunk boundaries; a breach names the specific
/// limit that tripped.
pub struct ResourceTracker {
    limits: ResourceLimits,
    started_at: Instant,
    memory_estimate_bytes: u64,
}

impl ResourceTracker {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            started_at: Instant::now(),
            memory_estimate_bytes: 0,
        }
    }

    /// Record the runner's current estimate of in-flight memory use.
    pub fn record_memory_estimate(&mut self, bytes: u64) {
        self.memory_estimate_bytes = bytes;
    }

    /// Check all limits, returning the specific breach if any has been hit.
    pub fn check(&self) -> Result<(), SimError> {
        if self.memory_estimate_bytes > self.limits.max_memory_bytes {
            return Err(SimError::ResourceLimitExceeded(format!(
                "memory estimate {} bytes exceeds limit {} bytes",
                self.memory_estimate_bytes, self.limits.max_memory_bytes
            )));
        }

        let elapsed = self.started_at.elapsed().as_secs();
        if elapsed > self.limits.max_wall_clock_seconds {
            return Err(SimError::ResourceLimitExceeded(format!(
                "wall-clock time {elapsed}s exceeds limit {}s",
                self.limits.max_wall_clock_seconds
            )));
        }

        // CPU time is approximated by wall-clock for a single-threaded,
        // cooperative job (§5: within-job execution is single-threaded).
        if elapsed > self.limits.max_cpu_seconds {
            return Err(SimError::ResourceLimitExceeded(format!(
                "cpu time {elapsed}s exceeds limit {}s",
                self.limits.max_cpu_seconds
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_breach_is_reported() {
        let mut tracker = ResourceTracker::new(ResourceLimits {
            max_memory_bytes: 100,
            max_cpu_seconds: 600,
            max_wall_clock_seconds: 600,
        });
        tracker.record_memory_estimate(200);
        let err = tracker.check().unwrap_err();
        assert!(matches!(err, SimError::ResourceLimitExceeded(_)));
        assert!(err.to_string().contains("memory"));
    }

    #[test]
    fn test_within_limits_is_ok() {
        let mut tracker = ResourceTracker::new(ResourceLimits::default());
        tracker.record_memory_estimate(1024);
        assert!(tracker.check().is_ok());
    }
}
