//! Per-job execution: materialize the schedule once, then generate and
//! write patients in chunks, checking cancellation and resource limits at
//! each chunk boundary (§4.7, §5). The schedule itself is never chunked —
//! chunking it would duplicate patients (§9).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cancellation::CancellationToken;
use crate::domain::reference::ReferenceData;
use crate::domain::request::{JobRequest, OutputFormat};
use crate::domain::types::{Facility, FinalStatus, FrontConfig, Patient, ScheduleEntry};
use crate::domain::{demographics, flow, injury, schedule};
use crate::error::{SimError, SimResult};
use crate::job::{JobId, JobSummary, OutputFile as JobOutputFile, ProgressDetails};
use crate::output::{MultiWriter, OutputFile as WriterOutputFile};
use crate::resource::{ResourceLimits, ResourceTracker};
use crate::store::JobStore;

/// Average serialized bytes per patient, used only to scale the runner's
/// memory estimate; not an exact accounting of process RSS.
const AVG_PATIENT_RECORD_BYTES: u64 = 800;

/// Decorrelates nationality draws from the demographic and injury/flow
/// streams so changing one does not perturb the others under a fixed seed.
const NATIONALITY_STREAM_SALT: u64 = 0xD6E8_FEB8_6659_FD93;

/// Run one job to a terminal state, persisting every transition. Never
/// returns an error: a pipeline failure is recorded on the job itself.
pub async fn run(
    id: JobId,
    request: JobRequest,
    reference: Arc<ReferenceData>,
    store: Arc<JobStore>,
    output_dir: PathBuf,
    limits: ResourceLimits,
    token: CancellationToken,
) {
    if let Err(e) = run_inner(id, &request, &reference, &store, &output_dir, limits, &token).await {
        mark_failed(&store, id, &e);
    }
}

async fn run_inner(
    id: JobId,
    request: &JobRequest,
    reference: &ReferenceData,
    store: &JobStore,
    output_dir: &Path,
    limits: ResourceLimits,
    token: &CancellationToken,
) -> SimResult<()> {
    let mut state = store.get(id)?;
    state.start()?;
    store.update(&state)?;

    let schedule = schedule::build_schedule(request)?;
    let total = schedule.len() as u64;

    let mut writer = MultiWriter::open(
        output_dir,
        &id.to_string(),
        &request.output,
        Some(crate::constants::DEFAULT_WRITER_FLUSH_INTERVAL),
    )?;
    let mut tracker = ResourceTracker::new(limits);
    let mut summary = JobSummary::default();
    let chunk_size = request.effective_chunk_size();
    let mut processed: u64 = 0;

    for (chunk_index, chunk) in schedule.chunks(chunk_size).enumerate() {
        if token.is_cancelled() {
            writer.abort();
            state.cancel()?;
            store.update(&state)?;
            return Ok(());
        }

        for entry in chunk {
            let patient = match generate_patient(reference, request, entry, processed) {
                Ok(p) => p,
                Err(e) => {
                    writer.abort();
                    return Err(e);
                }
            };
            record_summary(&mut summary, &patient);
            if let Err(e) = writer.append(&patient) {
                writer.abort();
                return Err(e);
            }
            processed += 1;
        }

        tracker.record_memory_estimate(processed.saturating_mul(AVG_PATIENT_RECORD_BYTES));
        if let Err(e) = tracker.check() {
            writer.abort();
            state.fail(&e)?;
            store.update(&state)?;
            return Ok(());
        }

        state.record_progress(ProgressDetails {
            processed,
            total,
            phase: "materialize".to_string(),
            phase_description: format!("chunk {}", chunk_index + 1),
        });
        store.update(&state)?;

        tokio::task::yield_now().await;
    }

    if token.is_cancelled() {
        writer.abort();
        state.cancel()?;
        store.update(&state)?;
        return Ok(());
    }

    let outputs = writer.close()?;
    state.complete(
        summary,
        outputs.into_iter().map(to_job_output_file).collect(),
    )?;
    store.update(&state)?;
    Ok(())
}

fn generate_patient(
    reference: &ReferenceData,
    request: &JobRequest,
    entry: &ScheduleEntry,
    patient_id: u64,
) -> SimResult<Patient> {
    let front = request
        .fronts
        .iter()
        .find(|f| f.id == entry.front_id)
        .ok_or_else(|| {
            SimError::Configuration(format!(
                "schedule references unknown front {}",
                entry.front_id
            ))
        })?;

    let nationality = pick_nationality(front, request.seed, patient_id)?;
    let nat_profile = reference.nationality(&nationality)?;
    let demographics = demographics::generate(nat_profile, request.seed, patient_id)?;

    let injury_mix_override = request.injury_mix.get(&entry.warfare_scenario);
    let mut patient_rng = ChaCha8Rng::seed_from_u64(flow::patient_seed(request.seed, patient_id));
    let assignment = injury::assign(
        reference,
        &entry.warfare_scenario,
        injury_mix_override,
        &mut patient_rng,
    )?;

    let chain = front
        .facility_chain_override
        .clone()
        .unwrap_or_else(Facility::default_chain);
    let outcome = flow::simulate(reference, entry, &assignment, &chain, &mut patient_rng)?;

    Ok(Patient {
        id: patient_id,
        demographics,
        nationality,
        front_id: entry.front_id.clone(),
        injury_type: assignment.injury_type,
        triage_category: assignment.triage_category,
        is_expectant: assignment.is_expectant,
        body_region: assignment.body_region,
        injury_timestamp: entry.injury_instant,
        movement_timeline: outcome.timeline,
        final_status: outcome.final_status,
        last_facility: outcome.last_facility,
    })
}

fn pick_nationality(front: &FrontConfig, job_seed: u64, patient_id: u64) -> SimResult<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(
        job_seed
            .wrapping_add(patient_id)
            .wrapping_add(NATIONALITY_STREAM_SALT),
    );
    let mut entries: Vec<(&String, &f64)> = front.nationality_mix.iter().collect();
    if entries.is_empty() {
        return Err(SimError::Configuration(format!(
            "front {} has no nationality distribution",
            front.id
        )));
    }
    // HashMap iteration order is randomized per-process; sort by nationality
    // code so the index fed to WeightedIndex is stable across runs (§8).
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let dist = WeightedIndex::new(entries.iter().map(|(_, w)| **w)).map_err(|e| {
        SimError::Generation(format!(
            "front {} nationality weights invalid: {e}",
            front.id
        ))
    })?;
    Ok(entries[dist.sample(&mut rng)].0.clone())
}

fn record_summary(summary: &mut JobSummary, patient: &Patient) {
    match patient.final_status {
        FinalStatus::Kia => summary.kia_count += 1,
        FinalStatus::Rtd => summary.rtd_count += 1,
        FinalStatus::RemainsRole4 => summary.remains_count += 1,
    }
    *summary
        .nationality_histogram
        .entry(patient.nationality.clone())
        .or_insert(0) += 1;
    *summary
        .injury_histogram
        .entry(patient.injury_type.clone())
        .or_insert(0) += 1;
}

fn to_job_output_file(f: WriterOutputFile) -> JobOutputFile {
    JobOutputFile {
        format: match f.format {
            OutputFormat::Structured => "structured".to_string(),
            OutputFormat::Tabular => "tabular".to_string(),
        },
        path: f.path.to_string_lossy().to_string(),
        bytes_written: f.bytes_written,
        compressed: f.compressed,
        encrypted: f.encrypted,
    }
}

fn mark_failed(store: &JobStore, id: JobId, error: &SimError) {
    if let Ok(mut state) = store.get(id) {
        let _ = state.fail(error);
        let _ = store.update(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_pick_nationality_determinism_independent_of_insertion_order() {
        let mut mix_a = HashMap::new();
        mix_a.insert("UKR".to_string(), 0.6);
        mix_a.insert("USA".to_string(), 0.3);
        mix_a.insert("RUS".to_string(), 0.1);

        let mut mix_b = HashMap::new();
        mix_b.insert("RUS".to_string(), 0.1);
        mix_b.insert("UKR".to_string(), 0.6);
        mix_b.insert("USA".to_string(), 0.3);

        let front_a = FrontConfig {
            id: "east".to_string(),
            casualty_share: 1.0,
            nationality_mix: mix_a,
            facility_chain_override: None,
        };
        let front_b = FrontConfig {
            id: "east".to_string(),
            casualty_share: 1.0,
            nationality_mix: mix_b,
            facility_chain_override: None,
        };

        for patient_id in 0..20u64 {
            let a = pick_nationality(&front_a, 99, patient_id).unwrap();
            let b = pick_nationality(&front_b, 99, patient_id).unwrap();
            assert_eq!(a, b);
        }
    }
}
