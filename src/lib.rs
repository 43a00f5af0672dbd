//! Synthetic military casualty generator.
//!
//! Given a declarative exercise configuration, produces a stream of
//! synthetic patient records — demographics, injuries, triage — carried
//! through a temporally-realistic movement timeline across a tiered
//! medical-evacuation network (POI -> Role 1 -> Role 2 -> Role 3 -> Role 4)
//! to a terminal outcome (KIA, return-to-duty, or remains at Role 4).
//!
//! Generation runs as a long-running, cancellable, resource-limited job
//! behind a capped worker pool, with persistent job state and an optional
//! REST transport (§1-§9).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod api;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod job;
pub mod observability;
pub mod output;
pub mod resource;
pub mod runner;
pub mod store;

pub use domain::{ReferenceData, JobRequest as DomainJobRequest};
pub use error::{SimError, SimResult};
pub use job::{JobId, JobState, JobStatus};
pub use runner::WorkerPool;
pub use store::JobStore;
