//! Job Runner (C7): admission, chunked execution, and the resource/
//! cancellation accounting that wraps a single job's pass through the
//! generation pipeline (§4.7, §5).

pub mod job_runner;
pub mod pool;

pub use pool::WorkerPool;
