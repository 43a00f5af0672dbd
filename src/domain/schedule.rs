//! Temporal Scheduler (C2)
//!
//! Distributes `total_patients` casualties over `days_of_fighting x 24` hours
//! using a smooth intraday intensity curve, a per-day tempo shape, warfare
//! scenario weighting, and probabilistic mass-casualty clustering. Invoked
//! exactly once per job; the canonical bug this design avoids is chunking
//! the scheduler itself, which would duplicate patients (§9).

use chrono::Duration as ChronoDuration;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

use crate::constants::{
    DAYTIME_HOUR_RANGE, HOUR_ZERO_DEGENERATE_SHARE, HOUR_ZERO_TARGET_SHARE,
    MASS_CASUALTY_WINDOW_HOURS, MIDNIGHT_MULTIPLIER, OVERNIGHT_HOUR_END, OVERNIGHT_REDUCTION,
};
use crate::domain::request::{JobRequest, Tempo};
use crate::domain::types::ScheduleEntry;
use crate::error::{SimError, SimResult};

/// Builds the full schedule for a job. The scheduler is deterministic given
/// `(request, seed)`, satisfying the output-determinism-under-seed property.
pub fn build_schedule(req: &JobRequest) -> SimResult<Vec<ScheduleEntry>> {
    if req.total_patients == 0 {
        return Err(SimError::ScheduleBuild(
            "total_patients is 0; nothing to schedule".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(req.seed);
    let total_hours = (req.days_of_fighting as usize) * 24;

    let hour_weights = compute_hour_weights(req, total_hours);
    let hour_counts = distribute_counts(&hour_weights, req.total_patients)?;

    let scenario_weights = normalize_weights(&req.warfare_types)?;
    let scenario_names: Vec<&String> = scenario_weights.iter().map(|(k, _)| k).collect();
    let scenario_dist = WeightedIndex::new(scenario_weights.iter().map(|(_, w)| *w))
        .map_err(|e| SimError::ScheduleBuild(format!("warfare weights invalid: {e}")))?;

    let front_dist = WeightedIndex::new(req.fronts.iter().map(|f| f.casualty_share))
        .map_err(|e| SimError::ScheduleBuild(format!("front shares invalid: {e}")))?;

    let mass_casualty_probability = base_mass_casualty_probability(req);

    let mut entries = Vec::with_capacity(req.total_patients as usize);
    let mut next_cluster_id: u64 = 0;

    for hour in 0..total_hours {
        let count = hour_counts[hour];
        if count == 0 {
            continue;
        }

        let scenario = scenario_names[scenario_dist.sample(&mut rng)].clone();
        let hour_start = req.base_date + ChronoDuration::hours(hour as i64);

        let is_mass_event = count > 1 && rng.gen::<f64>() < mass_casualty_probability;
        let cluster_id = if is_mass_event {
            next_cluster_id += 1;
            Some(next_cluster_id)
        } else {
            None
        };
        let cluster_center_secs = if is_mass_event {
            Some(rng.gen_range(0.0..3600.0))
        } else {
            None
        };

        for _ in 0..count {
            let offset_secs = if let Some(center) = cluster_center_secs {
                let window_secs = MASS_CASUALTY_WINDOW_HOURS * 3600.0;
                (center + rng.gen_range(-window_secs..window_secs)).clamp(0.0, 3599.0)
            } else {
                rng.gen_range(0.0..3600.0)
            };

            let instant = hour_start + ChronoDuration::seconds(offset_secs as i64);
            let front_idx = front_dist.sample(&mut rng);

            entries.push(ScheduleEntry {
                injury_instant: instant,
                front_id: req.fronts[front_idx].id.clone(),
                warfare_scenario: scenario.clone(),
                is_mass_casualty_member: is_mass_event,
                cluster_id,
            });
        }
    }

    entries.sort_by_key(|e| e.injury_instant);

    if entries.len() as u64 != req.total_patients {
        return Err(SimError::ScheduleBuild(format!(
            "schedule produced {} entries, expected {}",
            entries.len(),
            req.total_patients
        )));
    }

    Ok(entries)
}

/// Smooth 24-hour baseline (low overnight, peaking mid-afternoon), scaled by
/// the per-day tempo shape, with the overnight reduction band applied.
fn compute_hour_weights(req: &JobRequest, total_hours: usize) -> Vec<f64> {
    let days = req.days_of_fighting as usize;
    let mut weights = vec![0.0f64; total_hours];

    for hour in 0..total_hours {
        let day = hour / 24;
        let hour_of_day = (hour % 24) as f64;

        // Gaussian bell centered at 15:00, floor 0.2 so no hour is ever zero.
        let intraday = 0.2 + 0.8 * (-((hour_of_day - 15.0).powi(2)) / (2.0 * 5.0_f64.powi(2))).exp();

        let daily = tempo_multiplier(req.tempo, day, days);

        let mut w = intraday * daily;

        let hour_num = hour_of_day as u32;
        if hour_num <= OVERNIGHT_HOUR_END {
            w *= 1.0 - OVERNIGHT_REDUCTION;
        }
        if hour_num == 0 {
            w *= MIDNIGHT_MULTIPLIER;
        }

        weights[hour] = w.max(1e-6);
    }

    weights
}

fn tempo_multiplier(tempo: Tempo, day: usize, days: usize) -> f64 {
    match tempo {
        Tempo::Sustained => 1.0,
        Tempo::Surge => {
            if days <= 1 {
                1.0
            } else {
                let center = (days as f64 - 1.0) / 2.0;
                let sigma = (days as f64 / 3.0).max(1.0);
                0.4 + 1.2 * (-((day as f64 - center).powi(2)) / (2.0 * sigma.powi(2))).exp()
            }
        }
        Tempo::Decisive => {
            if days <= 1 {
                1.0
            } else if day < days / 2 {
                0.5
            } else {
                1.8
            }
        }
    }
}

/// Convert hour weights into integer counts summing exactly to
/// `total_patients`. Corrects both ordinary rounding slack and the
/// degenerate-hour-0 concentration described in §4.2 step 4. The
/// redistribution loop carries a progress counter and bails if an iteration
/// makes no progress, preventing starvation (§4.2 termination guard).
fn distribute_counts(weights: &[f64], total_patients: u64) -> SimResult<Vec<u64>> {
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(SimError::ScheduleBuild("hour weights sum to zero".to_string()));
    }

    let mut counts: Vec<u64> = weights
        .iter()
        .map(|w| ((w / sum) * total_patients as f64).round() as u64)
        .collect();

    reconcile_rounding(&mut counts, total_patients)?;
    enforce_hour_zero_cap(&mut counts, total_patients);
    reconcile_rounding(&mut counts, total_patients)?;

    Ok(counts)
}

fn reconcile_rounding(counts: &mut [u64], total_patients: u64) -> SimResult<()> {
    let mut current: i64 = counts.iter().map(|&c| c as i64).sum();
    let target = total_patients as i64;
    let mut guard = counts.len() as u64 + total_patients + 1;

    while current != target {
        if guard == 0 {
            return Err(SimError::ScheduleBuild(
                "rounding reconciliation made no progress".to_string(),
            ));
        }
        guard -= 1;

        if current < target {
            let idx = counts
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0);
            counts[idx] += 1;
            current += 1;
        } else {
            let idx = counts
                .iter()
                .enumerate()
                .filter(|(_, &c)| c > 0)
                .max_by(|a, b| a.1.cmp(b.1))
                .map(|(i, _)| i);
            match idx {
                Some(idx) => {
                    counts[idx] -= 1;
                    current -= 1;
                }
                None => {
                    return Err(SimError::ScheduleBuild(
                        "cannot reduce counts below zero to reach target".to_string(),
                    ))
                }
            }
        }
    }

    Ok(())
}

/// If hour 0 absorbed more than `HOUR_ZERO_DEGENERATE_SHARE` of the total,
/// force it down to `HOUR_ZERO_TARGET_SHARE` and move the excess into the
/// daytime band (§4.2 step 4).
fn enforce_hour_zero_cap(counts: &mut [u64], total_patients: u64) {
    if counts.is_empty() || total_patients == 0 {
        return;
    }

    let hour_zero_share = counts[0] as f64 / total_patients as f64;
    if hour_zero_share <= HOUR_ZERO_DEGENERATE_SHARE {
        return;
    }

    let target = (total_patients as f64 * HOUR_ZERO_TARGET_SHARE).floor() as u64;
    let excess = counts[0].saturating_sub(target);
    counts[0] = target;

    let (day_start, day_end) = DAYTIME_HOUR_RANGE;
    let daytime_hours: Vec<usize> = (0..counts.len())
        .filter(|&h| {
            let hod = (h % 24) as u32;
            hod >= day_start && hod <= day_end
        })
        .collect();

    if daytime_hours.is_empty() {
        counts[0] += excess;
        return;
    }

    let base = excess / daytime_hours.len() as u64;
    let mut remainder = excess % daytime_hours.len() as u64;
    for &h in &daytime_hours {
        counts[h] += base;
        if remainder > 0 {
            counts[h] += 1;
            remainder -= 1;
        }
    }
}

fn base_mass_casualty_probability(req: &JobRequest) -> f64 {
    const BASE: f64 = 0.02;
    (BASE * req.intensity.mass_casualty_scale()).min(0.5)
}

/// Returns `(name, weight)` pairs sorted by name so the index fed to
/// `WeightedIndex` is stable across process runs: `HashMap` iteration order
/// is randomized per-process, which would otherwise make the scenario drawn
/// for a given PRNG sample nondeterministic (§8 output-determinism-under-seed).
fn normalize_weights(weights: &HashMap<String, f64>) -> SimResult<Vec<(String, f64)>> {
    let sum: f64 = weights.values().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Err(SimError::ScheduleBuild(
            "warfare-scenario weights are not normalizable".to_string(),
        ));
    }
    let mut pairs: Vec<(String, f64)> = weights.iter().map(|(k, v)| (k.clone(), *v)).collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{Intensity, OutputFormat, OutputOptions};
    use crate::domain::types::FrontConfig;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn single_front_request(total: u64, days: u32, seed: u64) -> JobRequest {
        let mut warfare = HashMap::new();
        warfare.insert("conventional".to_string(), 1.0);
        let mut nat = HashMap::new();
        nat.insert("UKR".to_string(), 1.0);

        JobRequest {
            total_patients: total,
            days_of_fighting: days,
            base_date: chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            warfare_types: warfare,
            intensity: Intensity::Medium,
            tempo: Tempo::Sustained,
            environmental_conditions: vec![],
            special_events: vec![],
            fronts: vec![FrontConfig {
                id: "east".to_string(),
                casualty_share: 1.0,
                nationality_mix: nat,
                facility_chain_override: None,
            }],
            injury_mix: HashMap::new(),
            output: OutputOptions {
                formats: vec![OutputFormat::Structured],
                compression: false,
                encryption_key: None,
            },
            chunk_size: None,
            seed,
            extensions: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_exact_count() {
        let req = single_front_request(10, 1, 42);
        let schedule = build_schedule(&req).unwrap();
        assert_eq!(schedule.len(), 10);
    }

    #[test]
    fn test_exact_count_large() {
        let req = single_front_request(2500, 1, 7);
        let schedule = build_schedule(&req).unwrap();
        assert_eq!(schedule.len(), 2500);
    }

    #[test]
    fn test_intensity_independence_of_count() {
        let mut low = single_front_request(500, 3, 1);
        let mut extreme = single_front_request(500, 3, 1);
        low.intensity = Intensity::Low;
        extreme.intensity = Intensity::Extreme;
        assert_eq!(
            build_schedule(&low).unwrap().len(),
            build_schedule(&extreme).unwrap().len()
        );
    }

    #[test]
    fn test_schedule_sorted_by_instant() {
        let req = single_front_request(300, 2, 3);
        let schedule = build_schedule(&req).unwrap();
        for pair in schedule.windows(2) {
            assert!(pair[0].injury_instant <= pair[1].injury_instant);
        }
    }

    #[test]
    fn test_hour_zero_not_degenerate() {
        let req = single_front_request(1000, 4, 99);
        let schedule = build_schedule(&req).unwrap();
        let hour_zero = schedule
            .iter()
            .filter(|e| e.injury_instant.timestamp() % 86400 < 3600)
            .count();
        assert!((hour_zero as f64 / schedule.len() as f64) <= 0.06);
    }

    #[test]
    fn test_determinism_under_seed() {
        let req = single_front_request(200, 2, 123);
        let a = build_schedule(&req).unwrap();
        let b = build_schedule(&req).unwrap();
        let a_instants: Vec<_> = a.iter().map(|e| e.injury_instant).collect();
        let b_instants: Vec<_> = b.iter().map(|e| e.injury_instant).collect();
        assert_eq!(a_instants, b_instants);
    }

    #[test]
    fn test_zero_total_rejected() {
        let req = single_front_request(0, 1, 1);
        assert!(build_schedule(&req).is_err());
    }

    #[test]
    fn test_determinism_independent_of_warfare_type_insertion_order() {
        let mut req_a = single_front_request(500, 3, 77);
        req_a.warfare_types = HashMap::new();
        req_a.warfare_types.insert("conventional".to_string(), 0.5);
        req_a.warfare_types.insert("artillery".to_string(), 0.3);
        req_a.warfare_types.insert("drone".to_string(), 0.2);

        let mut req_b = req_a.clone();
        req_b.warfare_types = HashMap::new();
        req_b.warfare_types.insert("drone".to_string(), 0.2);
        req_b.warfare_types.insert("conventional".to_string(), 0.5);
        req_b.warfare_types.insert("artillery".to_string(), 0.3);

        let a = build_schedule(&req_a).unwrap();
        let b = build_schedule(&req_b).unwrap();
        let a_scenarios: Vec<_> = a.iter().map(|e| e.warfare_scenario.clone()).collect();
        let b_scenarios: Vec<_> = b.iter().map(|e| e.warfare_scenario.clone()).collect();
        assert_eq!(a_scenarios, b_scenarios);
    }
}
