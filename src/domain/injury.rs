//! Injury Assigner (C4)
//!
//! Samples injury type, triage category, and body region for one
//! ScheduleEntry, gated by its warfare scenario. Injury-mix overrides from
//! the JobRequest take priority over the C1 catalog default.

use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

use crate::domain::reference::ReferenceData;
use crate::domain::types::{BodyRegion, TriageCategory};
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone)]
pub struct InjuryAssignment {
    pub injury_type: String,
    pub triage_category: TriageCategory,
    pub is_expectant: bool,
    pub body_region: BodyRegion,
    pub cbrn_contaminated: bool,
}

pub fn assign(
    reference: &ReferenceData,
    scenario: &str,
    injury_mix_override: Option<&HashMap<String, f64>>,
    rng: &mut ChaCha8Rng,
) -> SimResult<InjuryAssignment> {
    let (injury_type, cbrn_contaminated) = pick_injury(reference, scenario, injury_mix_override, rng)?;
    let (triage_category, is_expectant) = pick_triage(reference, rng)?;
    let body_region = pick_body_region(reference, rng)?;

    Ok(InjuryAssignment {
        injury_type,
        triage_category,
        is_expectant,
        body_region,
        cbrn_contaminated,
    })
}

fn pick_injury(
    reference: &ReferenceData,
    scenario: &str,
    injury_mix_override: Option<&HashMap<String, f64>>,
    rng: &mut ChaCha8Rng,
) -> SimResult<(String, bool)> {
    if let Some(overrides) = injury_mix_override {
        if !overrides.is_empty() {
            // HashMap iteration order is randomized per-process; sort by
            // injury type so the index fed to WeightedIndex is stable
            // across runs (§8 output-determinism-under-seed).
            let mut entries: Vec<(&String, &f64)> = overrides.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let dist = WeightedIndex::new(entries.iter().map(|(_, w)| **w))
                .map_err(|e| SimError::Generation(format!("injury_mix override invalid: {e}")))?;
            let picked = entries[dist.sample(rng)].0.clone();
            return Ok((picked, false));
        }
    }

    let catalog = reference.injury_catalog_for(scenario);
    if catalog.is_empty() {
        return Err(SimError::Configuration(format!(
            "injury catalog empty for scenario '{scenario}' and no conventional fallback"
        )));
    }
    let dist = WeightedIndex::new(catalog.iter().map(|e| e.weight))
        .map_err(|e| SimError::Generation(format!("injury catalog weights invalid: {e}")))?;
    let entry = &catalog[dist.sample(rng)];
    Ok((entry.injury_type.clone(), entry.cbrn_contaminated))
}

fn pick_triage(reference: &ReferenceData, rng: &mut ChaCha8Rng) -> SimResult<(TriageCategory, bool)> {
    let prior = reference.triage_prior();
    let dist = WeightedIndex::new(prior.iter().map(|(_, _, w)| *w))
        .map_err(|e| SimError::Generation(format!("triage prior invalid: {e}")))?;
    let (category, is_expectant, _) = prior[dist.sample(rng)];
    Ok((category, is_expectant))
}

fn pick_body_region(reference: &ReferenceData, rng: &mut ChaCha8Rng) -> SimResult<BodyRegion> {
    let prior = reference.body_region_prior();
    let dist = WeightedIndex::new(prior.iter().map(|(_, w)| *w))
        .map_err(|e| SimError::Generation(format!("body region prior invalid: {e}")))?;
    let (name, _) = prior[dist.sample(rng)];
    Ok(match name {
        "extremity" => BodyRegion::Extremity,
        "junctional" => BodyRegion::Junctional,
        _ => BodyRegion::Central,
    })
}

/// Approximate the elevated Role-2 RTD probability for minor T3 injuries
/// (§4.5 "Special handling"); consulted by the Flow Simulator, not here.
pub fn is_minor_t3(triage: TriageCategory, injury_type: &str) -> bool {
    triage == TriageCategory::T3 && !injury_type.contains("amputation") && !injury_type.contains("blast")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::ReferenceData;
    use rand::SeedableRng;

    #[test]
    fn test_assign_conventional_scenario() {
        let reference = ReferenceData::load().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let assignment = assign(&reference, "conventional", None, &mut rng).unwrap();
        assert!(!assignment.injury_type.is_empty());
    }

    #[test]
    fn test_unknown_scenario_falls_back() {
        let reference = ReferenceData::load().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let assignment = assign(&reference, "unknown-scenario", None, &mut rng).unwrap();
        assert!(!assignment.injury_type.is_empty());
    }

    #[test]
    fn test_injury_mix_override_is_respected() {
        let reference = ReferenceData::load().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut overrides = HashMap::new();
        overrides.insert("custom-injury".to_string(), 1.0);
        let assignment = assign(&reference, "conventional", Some(&overrides), &mut rng).unwrap();
        assert_eq!(assignment.injury_type, "custom-injury");
    }

    #[test]
    fn test_injury_mix_override_determinism_independent_of_insertion_order() {
        let reference = ReferenceData::load().unwrap();

        let mut overrides_a = HashMap::new();
        overrides_a.insert("gunshot-wound".to_string(), 0.5);
        overrides_a.insert("blast-fragmentation".to_string(), 0.3);
        overrides_a.insert("burns".to_string(), 0.2);

        let mut overrides_b = HashMap::new();
        overrides_b.insert("burns".to_string(), 0.2);
        overrides_b.insert("gunshot-wound".to_string(), 0.5);
        overrides_b.insert("blast-fragmentation".to_string(), 0.3);

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let a = assign(&reference, "conventional", Some(&overrides_a), &mut rng_a).unwrap();
        let b = assign(&reference, "conventional", Some(&overrides_b), &mut rng_b).unwrap();
        assert_eq!(a.injury_type, b.injury_type);
    }
}
