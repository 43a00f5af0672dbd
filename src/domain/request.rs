//! JobRequest: the closed configuration record submitted by an external
//! collaborator (§3, §6). Immutable once a job starts executing.
//!
//! Per Design Notes, unrecognized/forward-compatible flags live in the small
//! open `extensions` map rather than making the whole record dynamically
//! typed; every flag the core actually interprets is a named field here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::types::FrontConfig;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
    Extreme,
}

impl Intensity {
    /// Relative scale applied to mass-casualty-cluster probability only;
    /// per invariant 7 this MUST NOT scale total patient count.
    pub fn mass_casualty_scale(self) -> f64 {
        match self {
            Intensity::Low => 0.5,
            Intensity::Medium => 1.0,
            Intensity::High => 1.6,
            Intensity::Extreme => 2.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tempo {
    Sustained,
    Surge,
    Decisive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Structured,
    Tabular,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputOptions {
    pub formats: Vec<OutputFormat>,
    #[serde(default)]
    pub compression: bool,
    /// Never persisted by the core; held only for the duration of C6's write
    #[serde(default, skip_serializing)]
    pub encryption_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub total_patients: u64,
    pub days_of_fighting: u32,
    pub base_date: DateTime<Utc>,
    /// Warfare-scenario name -> weight for per-hour scenario draws
    pub warfare_types: HashMap<String, f64>,
    pub intensity: Intensity,
    pub tempo: Tempo,
    #[serde(default)]
    pub environmental_conditions: Vec<String>,
    #[serde(default)]
    pub special_events: Vec<String>,
    pub fronts: Vec<FrontConfig>,
    /// Scenario -> (injury type -> override weight); empty entries fall back
    /// to the C1 catalog default
    #[serde(default)]
    pub injury_mix: HashMap<String, HashMap<String, f64>>,
    pub output: OutputOptions,
    pub chunk_size: Option<usize>,
    /// Seed for the job's reproducible PRNG stream
    pub seed: u64,
    /// Forward-compatible, unrecognized flags
    #[serde(default)]
    pub extensions: serde_json::Value,
}

impl JobRequest {
    /// Pre-admission validation (§7 ValidationError). Rejected requests
    /// never create a job.
    pub fn validate(&self) -> SimResult<()> {
        if self.total_patients == 0 {
            return Err(SimError::Validation("total_patients must be >= 1".into()));
        }
        if self.days_of_fighting == 0 {
            return Err(SimError::Validation("days_of_fighting must be >= 1".into()));
        }
        if self.warfare_types.is_empty() {
            return Err(SimError::Validation("warfare_types must not be empty".into()));
        }
        let warfare_sum: f64 = self.warfare_types.values().sum();
        if warfare_sum <= 0.0 || !warfare_sum.is_finite() {
            return Err(SimError::Validation(
                "warfare_types weights cannot be normalized".into(),
            ));
        }
        if self.fronts.is_empty() {
            return Err(SimError::Validation("fronts must not be empty".into()));
        }
        let front_share_sum: f64 = self.fronts.iter().map(|f| f.casualty_share).sum();
        if (front_share_sum - 1.0).abs() > 0.05 {
            return Err(SimError::Validation(format!(
                "front casualty shares must sum to ~1.0, got {front_share_sum}"
            )));
        }
        for front in &self.fronts {
            if front.nationality_mix.is_empty() {
                return Err(SimError::Validation(format!(
                    "front {} has no nationality distribution",
                    front.id
                )));
            }
            let nat_sum: f64 = front.nationality_mix.values().sum();
            if (nat_sum - 1.0).abs() > 0.05 {
                return Err(SimError::Validation(format!(
                    "front {} nationality shares must sum to ~1.0, got {nat_sum}",
                    front.id
                )));
            }
        }
        if self.output.formats.is_empty() {
            return Err(SimError::Validation("output.formats must not be empty".into()));
        }
        Ok(())
    }

    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size
            .filter(|&c| c > 0)
            .unwrap_or(crate::constants::DEFAULT_CHUNK_SIZE)
    }
}
