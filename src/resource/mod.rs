//! Per-job resource accounting: memory, CPU-time, and wall-clock limits
//! (§5, §7). A breach is fatal to the job, named specifically in the error.

pub mod limits;

pub use limits::{ResourceLimits, ResourceTracker};
