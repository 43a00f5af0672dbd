//! Centralized defaults for chunking, resource limits, and cache behavior.

/// Default chunk size for schedule materialization (C7)
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default maximum resident memory per job, in bytes (≈512 MiB)
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 512 * 1024 * 1024;

/// Default maximum CPU time per job, in seconds
pub const DEFAULT_MAX_CPU_SECONDS: u64 = 600;

/// Default maximum wall-clock time per job, in seconds
pub const DEFAULT_MAX_WALL_CLOCK_SECONDS: u64 = 1800;

/// Default global concurrency cap (J) across jobs
pub const DEFAULT_CONCURRENCY_CAP: usize = 2;

/// Default output-writer flush interval, in appended records
pub const DEFAULT_WRITER_FLUSH_INTERVAL: usize = 100;

/// Default in-process cache TTL for the external memoization tier, in seconds
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default LRU capacity for the external cache tier
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Hour-of-day band considered "overnight" for intensity reduction (00:00-05:00)
pub const OVERNIGHT_HOUR_END: u32 = 5;

/// Minimum reduction factor applied to the overnight band
pub const OVERNIGHT_REDUCTION: f64 = 0.30;

/// Additional multiplier applied to hour 0 specifically
pub const MIDNIGHT_MULTIPLIER: f64 = 0.5;

/// Threshold above which hour-0 share is considered degenerate and redistributed
pub const HOUR_ZERO_DEGENERATE_SHARE: f64 = 0.10;

/// Target hour-0 share after redistribution
pub const HOUR_ZERO_TARGET_SHARE: f64 = 0.05;

/// Inclusive daytime hour range receiving redistributed excess
pub const DAYTIME_HOUR_RANGE: (u32, u32) = (6, 18);

/// Half-width, in hours, of the window within which a mass-casualty cluster's
/// members are scattered around the cluster center instant
pub const MASS_CASUALTY_WINDOW_HOURS: f64 = 0.25;
