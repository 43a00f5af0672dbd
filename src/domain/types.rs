//! Core domain entities shared across C2-C6 (§3 Data Model)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named evacuation echelon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facility {
    Poi,
    Role1,
    Role2,
    Role3,
    Role4,
}

impl Facility {
    pub fn as_str(self) -> &'static str {
        match self {
            Facility::Poi => "POI",
            Facility::Role1 => "Role1",
            Facility::Role2 => "Role2",
            Facility::Role3 => "Role3",
            Facility::Role4 => "Role4",
        }
    }

    /// Default facility chain: POI -> Role1 -> Role2 -> Role3 -> Role4
    pub fn default_chain() -> Vec<Facility> {
        vec![
            Facility::Poi,
            Facility::Role1,
            Facility::Role2,
            Facility::Role3,
            Facility::Role4,
        ]
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Triage category assigned at intake. T4/expectant collapses into T1 for
/// timeline purposes but is retained as a tag (see DESIGN.md Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriageCategory {
    T1,
    T2,
    T3,
}

impl TriageCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TriageCategory::T1 => "T1",
            TriageCategory::T2 => "T2",
            TriageCategory::T3 => "T3",
        }
    }
}

/// Anatomical region of the primary injury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyRegion {
    Extremity,
    Junctional,
    Central,
}

/// Terminal outcome of a patient's movement timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalStatus {
    Kia,
    Rtd,
    RemainsRole4,
}

/// Discriminant for timeline events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineEventType {
    Arrival,
    EvacuationStart,
    TransitStart,
    Kia,
    Rtd,
    Remains,
}

/// A single step in a patient's movement through the evacuation network.
/// `hours_since_injury` is monotonically non-decreasing within a patient and
/// `timestamp` always equals `injury_timestamp + hours_since_injury`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_type: TimelineEventType,
    pub facility_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub hours_since_injury: f64,
    pub from_facility: Option<String>,
    pub to_facility: Option<String>,
    pub evacuation_duration_hours: Option<f64>,
    pub transit_duration_hours: Option<f64>,
}

/// Demographic attributes produced by C3, independent of injury/outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographics {
    pub given_name: String,
    pub family_name: String,
    pub gender: String,
    pub rank: String,
    pub national_id: String,
}

/// A fully-simulated synthetic casualty record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: u64,
    pub demographics: Demographics,
    pub nationality: String,
    pub front_id: String,
    pub injury_type: String,
    pub triage_category: TriageCategory,
    /// True when the underlying sampled category was T4/expectant
    pub is_expectant: bool,
    pub body_region: BodyRegion,
    pub injury_timestamp: DateTime<Utc>,
    pub movement_timeline: Vec<TimelineEvent>,
    pub final_status: FinalStatus,
    pub last_facility: String,
}

/// A single scheduled casualty-arrival instant, produced once by C2
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub injury_instant: DateTime<Utc>,
    pub front_id: String,
    pub warfare_scenario: String,
    pub is_mass_casualty_member: bool,
    pub cluster_id: Option<u64>,
}

/// Ordered sequence of scheduled casualty-arrival instants
pub type Schedule = Vec<ScheduleEntry>;

/// Per-front configuration: casualty share, nationality mix, optional chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontConfig {
    pub id: String,
    pub casualty_share: f64,
    /// Nationality code -> share of this front's casualties
    pub nationality_mix: HashMap<String, f64>,
    pub facility_chain_override: Option<Vec<Facility>>,
}
