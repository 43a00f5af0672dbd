//! Flow Simulator (C5)
//!
//! The hardest subsystem: walks one patient from point of injury through the
//! evacuation chain, emitting a movement timeline and a terminal outcome.
//! Step order always checks RTD before KIA before continuing onward (§4.5).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Triangular};

use crate::domain::injury::{self, InjuryAssignment};
use crate::domain::reference::{ReferenceData, TriangularParams};
use crate::domain::types::{
    Facility, FinalStatus, ScheduleEntry, TimelineEvent, TimelineEventType,
};
use crate::error::{SimError, SimResult};

/// Salt distinguishing this component's PRNG stream from the demographic
/// generator's, which seeds directly from `job_seed.wrapping_add(patient_id)`.
const PATIENT_STREAM_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Rough decontamination dwell inserted at POI and Role1 for CBRN-marked
/// injuries, ahead of the facility's normal evacuation dwell.
const CBRN_DECON_PARAMS: TriangularParams = TriangularParams {
    min: 0.25,
    mode: 0.75,
    max: 2.0,
};

/// Derive the seed for the shared injury-assignment + flow-simulation PRNG
/// stream for one patient. Demographics uses its own, unsalted, stream.
pub fn patient_seed(job_seed: u64, patient_id: u64) -> u64 {
    job_seed
        .wrapping_add(patient_id)
        .wrapping_add(PATIENT_STREAM_SALT)
}

pub struct FlowOutcome {
    pub timeline: Vec<TimelineEvent>,
    pub final_status: FinalStatus,
    pub last_facility: String,
}

/// Simulate one patient's movement timeline along `chain`, starting at
/// `chain[0]` (conventionally POI) at the injury instant.
pub fn simulate(
    reference: &ReferenceData,
    entry: &ScheduleEntry,
    assignment: &InjuryAssignment,
    chain: &[Facility],
    rng: &mut ChaCha8Rng,
) -> SimResult<FlowOutcome> {
    if chain.len() < 2 {
        return Err(SimError::Configuration(
            "facility chain must have at least two echelons".to_string(),
        ));
    }

    let injury_timestamp = entry.injury_instant;
    let mut h = 0.0f64;
    let mut timeline = Vec::new();

    timeline.push(arrival_event(chain[0], injury_timestamp, h));

    let pre_kia_p = reference.pre_role1_kia_probability(assignment.triage_category);
    if rng.gen::<f64>() < pre_kia_p {
        let dt = sample_triangular(reference.pre_role1_kia_timing(), rng)?;
        h += dt;
        timeline.push(terminal_event(
            TimelineEventType::Kia,
            chain[0],
            injury_timestamp,
            h,
        ));
        return Ok(FlowOutcome {
            timeline,
            final_status: FinalStatus::Kia,
            last_facility: chain[0].as_str().to_string(),
        });
    }

    if assignment.cbrn_contaminated {
        h += sample_triangular(CBRN_DECON_PARAMS, rng)?;
    }

    let mut idx = 0usize;
    loop {
        let from = chain[idx];
        let to = chain[idx + 1];
        let timing = reference.hop_timing(assignment.triage_category, from, to)?;

        let dwell = sample_triangular(timing.dwell, rng)?;
        timeline.push(evacuation_start_event(from, to, injury_timestamp, h, dwell));
        h += dwell;

        let transit = sample_triangular(timing.transit, rng)?;
        timeline.push(transit_start_event(from, to, injury_timestamp, h, transit));
        h += transit;

        timeline.push(arrival_event(to, injury_timestamp, h));

        if assignment.cbrn_contaminated && to == Facility::Role1 {
            h += sample_triangular(CBRN_DECON_PARAMS, rng)?;
        }

        let mut outcome = reference.outcome_probs(assignment.triage_category, to)?;
        if to == Facility::Role2 && injury::is_minor_t3(assignment.triage_category, &assignment.injury_type)
        {
            outcome.rtd = (outcome.rtd * 1.3).min(0.95);
        }

        // A RTD/KIA bound: the dwell a patient would otherwise have spent at
        // this facility before evacuating onward.
        let terminal_timing = TriangularParams::new(0.0, timing.dwell.mode * 0.5, timing.dwell.mode.max(0.1));

        if rng.gen::<f64>() < outcome.rtd {
            h += sample_triangular(terminal_timing, rng)?;
            timeline.push(terminal_event(TimelineEventType::Rtd, to, injury_timestamp, h));
            return Ok(FlowOutcome {
                timeline,
                final_status: FinalStatus::Rtd,
                last_facility: to.as_str().to_string(),
            });
        }

        if rng.gen::<f64>() < outcome.kia {
            h += sample_triangular(terminal_timing, rng)?;
            timeline.push(terminal_event(TimelineEventType::Kia, to, injury_timestamp, h));
            return Ok(FlowOutcome {
                timeline,
                final_status: FinalStatus::Kia,
                last_facility: to.as_str().to_string(),
            });
        }

        if to == Facility::Role4 {
            timeline.push(terminal_event(TimelineEventType::Remains, to, injury_timestamp, h));
            return Ok(FlowOutcome {
                timeline,
                final_status: FinalStatus::RemainsRole4,
                last_facility: to.as_str().to_string(),
            });
        }

        idx += 1;
        if idx + 1 >= chain.len() {
            return Err(SimError::Internal(
                "facility chain exhausted before a terminal outcome was reached".to_string(),
            ));
        }
    }
}

fn sample_triangular(params: TriangularParams, rng: &mut ChaCha8Rng) -> SimResult<f64> {
    if params.max <= params.min {
        return Ok(params.min.max(0.0));
    }
    let nudge = (params.max - params.min) * 1e-6;
    let mode = params.mode.clamp(params.min + nudge, params.max - nudge);
    let dist = Triangular::new(params.min, params.max, mode)
        .map_err(|e| SimError::Configuration(format!("triangular distribution invalid: {e}")))?;
    Ok(dist.sample(rng).max(0.0))
}

fn timestamp_at(injury_timestamp: DateTime<Utc>, hours_since_injury: f64) -> DateTime<Utc> {
    let nanos = (hours_since_injury * 3_600.0 * 1e9).round() as i64;
    let seconds = nanos / 1_000_000_000;
    injury_timestamp + ChronoDuration::seconds(seconds)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn arrival_event(facility: Facility, injury_timestamp: DateTime<Utc>, h: f64) -> TimelineEvent {
    TimelineEvent {
        event_type: TimelineEventType::Arrival,
        facility_name: Some(facility.as_str().to_string()),
        timestamp: timestamp_at(injury_timestamp, h),
        hours_since_injury: round1(h),
        from_facility: None,
        to_facility: None,
        evacuation_duration_hours: None,
        transit_duration_hours: None,
    }
}

fn evacuation_start_event(
    from: Facility,
    to: Facility,
    injury_timestamp: DateTime<Utc>,
    h: f64,
    dwell_hours: f64,
) -> TimelineEvent {
    TimelineEvent {
        event_type: TimelineEventType::EvacuationStart,
        facility_name: Some(from.as_str().to_string()),
        timestamp: timestamp_at(injury_timestamp, h),
        hours_since_injury: round1(h),
        from_facility: Some(from.as_str().to_string()),
        to_facility: Some(to.as_str().to_string()),
        evacuation_duration_hours: Some(round1(dwell_hours)),
        transit_duration_hours: None,
    }
}

fn transit_start_event(
    from: Facility,
    to: Facility,
    injury_timestamp: DateTime<Utc>,
    h: f64,
    transit_hours: f64,
) -> TimelineEvent {
    TimelineEvent {
        event_type: TimelineEventType::TransitStart,
        facility_name: None,
        timestamp: timestamp_at(injury_timestamp, h),
        hours_since_injury: round1(h),
        from_facility: Some(from.as_str().to_string()),
        to_facility: Some(to.as_str().to_string()),
        evacuation_duration_hours: None,
        transit_duration_hours: Some(round1(transit_hours)),
    }
}

fn terminal_event(
    event_type: TimelineEventType,
    facility: Facility,
    injury_timestamp: DateTime<Utc>,
    h: f64,
) -> TimelineEvent {
    TimelineEvent {
        event_type,
        facility_name: Some(facility.as_str().to_string()),
        timestamp: timestamp_at(injury_timestamp, h),
        hours_since_injury: round1(h),
        from_facility: None,
        to_facility: None,
        evacuation_duration_hours: None,
        transit_duration_hours: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TriageCategory;
    use rand::SeedableRng;

    fn entry_at(hour: i64) -> ScheduleEntry {
        use chrono::TimeZone;
        ScheduleEntry {
            injury_instant: chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + ChronoDuration::hours(hour),
            front_id: "east".to_string(),
            warfare_scenario: "conventional".to_string(),
            is_mass_casualty_member: false,
            cluster_id: None,
        }
    }

    fn assignment(triage: TriageCategory, cbrn: bool) -> InjuryAssignment {
        InjuryAssignment {
            injury_type: "gunshot-wound".to_string(),
            triage_category: triage,
            is_expectant: false,
            body_region: crate::domain::types::BodyRegion::Extremity,
            cbrn_contaminated: cbrn,
        }
    }

    #[test]
    fn test_timeline_starts_with_poi_arrival_at_zero() {
        let reference = ReferenceData::load().unwrap();
        let chain = Facility::default_chain();
        let entry = entry_at(0);
        let assignment = assignment(TriageCategory::T2, false);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let outcome = simulate(&reference, &entry, &assignment, &chain, &mut rng).unwrap();
        let first = &outcome.timeline[0];
        assert_eq!(first.event_type, TimelineEventType::Arrival);
        assert_eq!(first.facility_name.as_deref(), Some("POI"));
        assert_eq!(first.hours_since_injury, 0.0);
    }

    #[test]
    fn test_timeline_ends_in_a_terminal_event() {
        let reference = ReferenceData::load().unwrap();
        let chain = Facility::default_chain();
        for seed in 0..50u64 {
            let entry = entry_at(0);
            let assignment = assignment(TriageCategory::T1, false);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let outcome = simulate(&reference, &entry, &assignment, &chain, &mut rng).unwrap();
            let last = outcome.timeline.last().unwrap();
            assert!(matches!(
                last.event_type,
                TimelineEventType::Kia | TimelineEventType::Rtd | TimelineEventType::Remains
            ));
            match outcome.final_status {
                FinalStatus::Kia => assert_eq!(last.event_type, TimelineEventType::Kia),
                FinalStatus::Rtd => assert_eq!(last.event_type, TimelineEventType::Rtd),
                FinalStatus::RemainsRole4 => assert_eq!(last.event_type, TimelineEventType::Remains),
            }
        }
    }

    #[test]
    fn test_hours_since_injury_never_decreases() {
        let reference = ReferenceData::load().unwrap();
        let chain = Facility::default_chain();
        let entry = entry_at(0);
        let assignment = assignment(TriageCategory::T3, false);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let outcome = simulate(&reference, &entry, &assignment, &chain, &mut rng).unwrap();
        for pair in outcome.timeline.windows(2) {
            assert!(pair[1].hours_since_injury >= pair[0].hours_since_injury);
        }
    }

    #[test]
    fn test_timestamp_matches_hours_since_injury_within_rounding_tolerance() {
        // `hours_since_injury` is rounded to 0.1h (round1) for display while
        // `timestamp` is derived from the full-precision sampled hour offset,
        // so the two can differ by up to half a rounding step (0.05h = 180s).
        let reference = ReferenceData::load().unwrap();
        let chain = Facility::default_chain();
        let entry = entry_at(3);
        let assignment = assignment(TriageCategory::T2, false);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let outcome = simulate(&reference, &entry, &assignment, &chain, &mut rng).unwrap();
        for event in &outcome.timeline {
            let expected = entry.injury_instant
                + ChronoDuration::seconds((event.hours_since_injury * 3600.0).round() as i64);
            let drift = (event.timestamp - expected).num_seconds().abs();
            assert!(
                drift <= 180,
                "timestamp {} drifted {drift}s from hours_since_injury-derived {expected}",
                event.timestamp
            );
        }
    }

    #[test]
    fn test_cbrn_path_does_not_error() {
        let reference = ReferenceData::load().unwrap();
        let chain = Facility::default_chain();
        let entry = entry_at(0);
        let assignment = assignment(TriageCategory::T2, true);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(simulate(&reference, &entry, &assignment, &chain, &mut rng).is_ok());
    }

    #[test]
    fn test_patient_seed_differs_from_plain_job_seed_offset() {
        assert_ne!(patient_seed(42, 7), 42u64.wrapping_add(7));
    }
}
