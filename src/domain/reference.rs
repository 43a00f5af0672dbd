//! Reference Data Provider (C1)
//!
//! Loads, once per process, the static tables that parameterize every other
//! component: nationality/name pools, the evacuation-timing table, per-triage
//! KIA/RTD probabilities, and the injury catalog. All lookups are pure and
//! thread-safe after load; failure at load time is fatal to the process.

use std::collections::HashMap;

use crate::domain::types::{Facility, TriageCategory};
use crate::error::{SimError, SimResult};

/// Parameters of a triangular distribution (min, mode, max), in hours
#[derive(Debug, Clone, Copy)]
pub struct TriangularParams {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

impl TriangularParams {
    pub fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min, mode, max }
    }
}

/// Dwell-then-transit timing for a (triage, from, to) hop
#[derive(Debug, Clone, Copy)]
pub struct HopTiming {
    pub dwell: TriangularParams,
    pub transit: TriangularParams,
}

/// In-facility KIA/RTD probabilities for a (triage, facility) pair
#[derive(Debug, Clone, Copy)]
pub struct OutcomeProbs {
    pub rtd: f64,
    pub kia: f64,
}

/// Name/gender/rank/id-format pool for one nationality
#[derive(Debug, Clone)]
pub struct NationalityProfile {
    pub iso3: String,
    pub given_names: Vec<(String, f64)>,
    pub family_names: Vec<(String, f64)>,
    /// Probability of "male"; otherwise "female"
    pub male_ratio: f64,
    pub ranks: Vec<String>,
}

/// Weighted injury type entry within a warfare scenario's catalog
#[derive(Debug, Clone)]
pub struct InjuryCatalogEntry {
    pub injury_type: String,
    pub weight: f64,
    pub cbrn_contaminated: bool,
}

/// The full static reference-data set (C1)
#[derive(Debug, Clone)]
pub struct ReferenceData {
    nationalities: HashMap<String, NationalityProfile>,
    timing_table: HashMap<(TriageCategory, Facility, Facility), HopTiming>,
    outcome_table: HashMap<(TriageCategory, Facility), OutcomeProbs>,
    pre_role1_kia: HashMap<TriageCategory, f64>,
    pre_role1_kia_timing: TriangularParams,
    injury_catalog: HashMap<String, Vec<InjuryCatalogEntry>>,
    triage_prior: Vec<(TriageCategory, bool, f64)>,
    body_region_prior: Vec<(&'static str, f64)>,
}

fn triage_key(t: TriageCategory) -> &'static str {
    match t {
        TriageCategory::T1 => "t1",
        TriageCategory::T2 => "t2",
        TriageCategory::T3 => "t3",
    }
}

impl ReferenceData {
    /// Build the default reference-data set. Returns an error (fatal to the
    /// process) if the embedded tables fail to normalize, which would
    /// indicate a packaging defect rather than a runtime condition.
    pub fn load() -> SimResult<Self> {
        let nationalities = default_nationalities();
        let timing_table = default_timing_table();
        let outcome_table = default_outcome_table();
        let pre_role1_kia = default_pre_role1_kia();
        let injury_catalog = default_injury_catalog();

        if nationalities.is_empty() {
            return Err(SimError::Configuration(
                "reference data: no nationalities loaded".to_string(),
            ));
        }

        Ok(Self {
            nationalities,
            timing_table,
            outcome_table,
            pre_role1_kia,
            pre_role1_kia_timing: TriangularParams::new(0.05, 0.25, 1.0),
            injury_catalog,
            triage_prior: vec![
                (TriageCategory::T1, false, 0.36),
                (TriageCategory::T2, false, 0.29),
                (TriageCategory::T3, false, 0.31),
                // T4/expectant collapses into T1 but is tagged `is_expectant`
                (TriageCategory::T1, true, 0.04),
            ],
            body_region_prior: vec![
                ("extremity", 0.60),
                ("junctional", 0.15),
                ("central", 0.25),
            ],
        })
    }

    pub fn nationality(&self, code: &str) -> SimResult<&NationalityProfile> {
        self.nationalities
            .get(code)
            .ok_or_else(|| SimError::Configuration(format!("unknown nationality code: {code}")))
    }

    pub fn nationality_codes(&self) -> impl Iterator<Item = &str> {
        self.nationalities.keys().map(String::as_str)
    }

    pub fn hop_timing(&self, triage: TriageCategory, from: Facility, to: Facility) -> SimResult<HopTiming> {
        self.timing_table
            .get(&(triage, from, to))
            .copied()
            .ok_or_else(|| {
                SimError::Configuration(format!(
                    "missing timing table entry for ({}, {}, {})",
                    triage_key(triage),
                    from,
                    to
                ))
            })
    }

    pub fn outcome_probs(&self, triage: TriageCategory, facility: Facility) -> SimResult<OutcomeProbs> {
        self.outcome_table
            .get(&(triage, facility))
            .copied()
            .ok_or_else(|| {
                SimError::Configuration(format!(
                    "missing outcome table entry for ({}, {})",
                    triage_key(triage),
                    facility
                ))
            })
    }

    pub fn pre_role1_kia_probability(&self, triage: TriageCategory) -> f64 {
        self.pre_role1_kia.get(&triage).copied().unwrap_or(0.0)
    }

    pub fn pre_role1_kia_timing(&self) -> TriangularParams {
        self.pre_role1_kia_timing
    }

    pub fn injury_catalog_for(&self, scenario: &str) -> &[InjuryCatalogEntry] {
        self.injury_catalog
            .get(scenario)
            .map(|v| v.as_slice())
            .unwrap_or_else(|| {
                self.injury_catalog
                    .get("conventional")
                    .map(|v| v.as_slice())
                    .unwrap_or(&[])
            })
    }

    pub fn triage_prior(&self) -> &[(TriageCategory, bool, f64)] {
        &self.triage_prior
    }

    pub fn body_region_prior(&self) -> &[(&'static str, f64)] {
        &self.body_region_prior
    }
}

fn default_nationalities() -> HashMap<String, NationalityProfile> {
    let mut m = HashMap::new();
    m.insert(
        "UKR".to_string(),
        NationalityProfile {
            iso3: "UKR".to_string(),
            given_names: vec![
                ("Oleksandr".to_string(), 1.0),
                ("Dmytro".to_string(), 1.0),
                ("Andriy".to_string(), 1.0),
                ("Iryna".to_string(), 0.6),
                ("Olena".to_string(), 0.6),
            ],
            family_names: vec![
                ("Shevchenko".to_string(), 1.0),
                ("Kovalenko".to_string(), 1.0),
                ("Bondarenko".to_string(), 1.0),
            ],
            male_ratio: 0.85,
            ranks: vec!["Private".into(), "Sergeant".into(), "Lieutenant".into()],
        },
    );
    m.insert(
        "RUS".to_string(),
        NationalityProfile {
            iso3: "RUS".to_string(),
            given_names: vec![
                ("Ivan".to_string(), 1.0),
                ("Sergei".to_string(), 1.0),
                ("Mikhail".to_string(), 1.0),
            ],
            family_names: vec![
                ("Ivanov".to_string(), 1.0),
                ("Petrov".to_string(), 1.0),
                ("Smirnov".to_string(), 1.0),
            ],
            male_ratio: 0.9,
            ranks: vec!["Private".into(), "Corporal".into(), "Captain".into()],
        },
    );
    m.insert(
        "USA".to_string(),
        NationalityProfile {
            iso3: "USA".to_string(),
            given_names: vec![
                ("James".to_string(), 1.0),
                ("Michael".to_string(), 1.0),
                ("Sarah".to_string(), 0.5),
            ],
            family_names: vec![
                ("Smith".to_string(), 1.0),
                ("Johnson".to_string(), 1.0),
                ("Williams".to_string(), 1.0),
            ],
            male_ratio: 0.82,
            ranks: vec!["Private".into(), "Specialist".into(), "Sergeant".into()],
        },
    );
    m
}

fn default_timing_table() -> HashMap<(TriageCategory, Facility, Facility), HopTiming> {
    use Facility::*;
    use TriageCategory::*;
    let mut m = HashMap::new();
    let hops = [
        (Poi, Role1),
        (Role1, Role2),
        (Role2, Role3),
        (Role3, Role4),
    ];
    for &(from, to) in &hops {
        for triage in [T1, T2, T3] {
            let severity = match triage {
                T1 => 1.5,
                T2 => 1.0,
                T3 => 0.6,
            };
            m.insert(
                (triage, from, to),
                HopTiming {
                    dwell: TriangularParams::new(0.1 * severity, 0.5 * severity, 2.0 * severity),
                    transit: TriangularParams::new(0.2, 0.75, 3.0),
                },
            );
        }
    }
    m
}

fn default_outcome_table() -> HashMap<(TriageCategory, Facility), OutcomeProbs> {
    use Facility::*;
    use TriageCategory::*;
    let mut m = HashMap::new();
    let entries: &[(TriageCategory, Facility, f64, f64)] = &[
        (T1, Role1, 0.05, 0.12),
        (T1, Role2, 0.08, 0.07),
        (T1, Role3, 0.15, 0.03),
        (T1, Role4, 0.20, 0.01),
        (T2, Role1, 0.20, 0.04),
        (T2, Role2, 0.30, 0.02),
        (T2, Role3, 0.35, 0.01),
        (T2, Role4, 0.40, 0.005),
        (T3, Role1, 0.55, 0.01),
        (T3, Role2, 0.65, 0.005),
        (T3, Role3, 0.55, 0.003),
        (T3, Role4, 0.50, 0.001),
    ];
    for &(triage, facility, rtd, kia) in entries {
        m.insert((triage, facility), OutcomeProbs { rtd, kia });
    }
    m
}

fn default_pre_role1_kia() -> HashMap<TriageCategory, f64> {
    use TriageCategory::*;
    let mut m = HashMap::new();
    m.insert(T1, 0.18);
    m.insert(T2, 0.05);
    m.insert(T3, 0.01);
    m
}

fn default_injury_catalog() -> HashMap<String, Vec<InjuryCatalogEntry>> {
    let mut m = HashMap::new();
    m.insert(
        "conventional".to_string(),
        vec![
            entry("gunshot-wound", 0.45, false),
            entry("blast-fragmentation", 0.35, false),
            entry("blunt-trauma", 0.20, false),
        ],
    );
    m.insert(
        "artillery".to_string(),
        vec![
            entry("blast-fragmentation", 0.60, false),
            entry("blast-lung", 0.15, false),
            entry("traumatic-amputation", 0.15, false),
            entry("burns", 0.10, false),
        ],
    );
    m.insert(
        "drone".to_string(),
        vec![
            entry("blast-fragmentation", 0.50, false),
            entry("penetrating-trauma", 0.30, false),
            entry("burns", 0.20, false),
        ],
    );
    m.insert(
        "cbrn".to_string(),
        vec![
            entry("chemical-exposure", 0.50, true),
            entry("radiological-exposure", 0.20, true),
            entry("blast-fragmentation", 0.30, false),
        ],
    );
    m.insert(
        "mixed".to_string(),
        vec![
            entry("gunshot-wound", 0.25, false),
            entry("blast-fragmentation", 0.35, false),
            entry("burns", 0.15, false),
            entry("traumatic-amputation", 0.15, false),
            entry("blunt-trauma", 0.10, false),
        ],
    );
    m
}

fn entry(injury_type: &str, weight: f64, cbrn: bool) -> InjuryCatalogEntry {
    InjuryCatalogEntry {
        injury_type: injury_type.to_string(),
        weight,
        cbrn_contaminated: cbrn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_succeeds() {
        let data = ReferenceData::load().unwrap();
        assert!(data.nationality("UKR").is_ok());
        assert!(data.nationality("ZZZ").is_err());
    }

    #[test]
    fn test_hop_timing_covers_default_chain() {
        let data = ReferenceData::load().unwrap();
        for &(from, to) in &[
            (Facility::Poi, Facility::Role1),
            (Facility::Role1, Facility::Role2),
            (Facility::Role2, Facility::Role3),
            (Facility::Role3, Facility::Role4),
        ] {
            for triage in [TriageCategory::T1, TriageCategory::T2, TriageCategory::T3] {
                assert!(data.hop_timing(triage, from, to).is_ok());
            }
        }
    }

    #[test]
    fn test_unknown_scenario_falls_back_to_conventional() {
        let data = ReferenceData::load().unwrap();
        let catalog = data.injury_catalog_for("does-not-exist");
        assert!(!catalog.is_empty());
    }
}
