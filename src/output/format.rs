//! Record framing for the two recognized output formats (§4.6, §6): a
//! structured record array and a flat tabular projection. Both read the same
//! `Patient` values; only the framing differs.

use std::io::Write;

use super::writer::Layer;
use crate::domain::request::OutputFormat;
use crate::domain::types::Patient;
use crate::error::{OutputError, SimResult};

const TABULAR_COLUMNS: &[&str] = &[
    "id",
    "given_name",
    "family_name",
    "gender",
    "rank",
    "national_id",
    "nationality",
    "front_id",
    "injury_type",
    "triage_category",
    "is_expectant",
    "body_region",
    "injury_timestamp",
    "final_status",
    "last_facility",
    "movement_timeline",
];

/// Owns the destination writer and emits one format's framing around a
/// stream of `Patient` records: header once, one record per `append`,
/// footer once on `finish`.
pub enum BodyWriter {
    Structured {
        sink: Box<dyn Layer>,
        wrote_any: bool,
    },
    Tabular {
        csv: csv::Writer<Box<dyn Layer>>,
    },
}

impl BodyWriter {
    pub fn open(format: OutputFormat, sink: Box<dyn Layer>) -> SimResult<Self> {
        match format {
            OutputFormat::Structured => {
                let mut sink = sink;
                sink.write_all(b"[")
                    .map_err(|e| OutputError::Io(e.to_string()))?;
                Ok(BodyWriter::Structured {
                    sink,
                    wrote_any: false,
                })
            }
            OutputFormat::Tabular => {
                let mut csv = csv::WriterBuilder::new().from_writer(sink);
                csv.write_record(TABULAR_COLUMNS)
                    .map_err(|e| OutputError::Serialization(e.to_string()))?;
                Ok(BodyWriter::Tabular { csv })
            }
        }
    }

    pub fn append(&mut self, patient: &Patient) -> SimResult<()> {
        match self {
            BodyWriter::Structured { sink, wrote_any } => {
                if *wrote_any {
                    sink.write_all(b",\n")
                        .map_err(|e| OutputError::Io(e.to_string()))?;
                }
                serde_json::to_writer(&mut *sink, patient)
                    .map_err(|e| OutputError::Serialization(e.to_string()))?;
                *wrote_any = true;
                Ok(())
            }
            BodyWriter::Tabular { csv } => {
                let row = tabular_row(patient);
                csv.write_record(&row)
                    .map_err(|e| OutputError::Serialization(e.to_string()))?;
                Ok(())
            }
        }
    }

    pub fn flush(&mut self) -> SimResult<()> {
        match self {
            BodyWriter::Structured { sink, .. } => {
                sink.flush().map_err(|e| OutputError::Io(e.to_string()))?
            }
            BodyWriter::Tabular { csv } => csv.flush().map_err(|e| OutputError::Io(e.to_string()))?,
        }
        Ok(())
    }

    /// Write the closing frame and hand back the inner writer so outer
    /// layers (compression, encryption) can finalize themselves.
    pub fn finish(self) -> SimResult<Box<dyn Layer>> {
        match self {
            BodyWriter::Structured { mut sink, .. } => {
                sink.write_all(b"]\n")
                    .map_err(|e| OutputError::Io(e.to_string()))?;
                Ok(sink)
            }
            BodyWriter::Tabular { csv } => csv
                .into_inner()
                .map_err(|e| OutputError::Io(e.to_string()).into()),
        }
    }
}

fn tabular_row(patient: &Patient) -> Vec<String> {
    vec![
        patient.id.to_string(),
        patient.demographics.given_name.clone(),
        patient.demographics.family_name.clone(),
        patient.demographics.gender.clone(),
        patient.demographics.rank.clone(),
        patient.demographics.national_id.clone(),
        patient.nationality.clone(),
        patient.front_id.clone(),
        patient.injury_type.clone(),
        patient.triage_category.as_str().to_string(),
        patient.is_expectant.to_string(),
        format!("{:?}", patient.body_region),
        patient.injury_timestamp.to_rfc3339(),
        format!("{:?}", patient.final_status),
        patient.last_facility.clone(),
        encode_timeline(patient),
    ]
}

/// Delimited-scalar encoding of the nested movement timeline: events
/// separated by `|`, fields within an event separated by `:`.
fn encode_timeline(patient: &Patient) -> String {
    patient
        .movement_timeline
        .iter()
        .map(|event| {
            format!(
                "{:?}:{}:{}:{:.1}",
                event.event_type,
                event.facility_name.as_deref().unwrap_or(""),
                event.timestamp.to_rfc3339(),
                event.hours_since_injury
            )
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{BodyRegion, Demographics, FinalStatus, TriageCategory};
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Layer for SharedBuf {
        fn finish_layer(self: Box<Self>) -> std::io::Result<Box<dyn Write + Send>> {
            Ok(self)
        }
    }

    fn sample_patient() -> Patient {
        Patient {
            id: 1,
            demographics: Demographics {
                given_name: "Oleksandr".into(),
                family_name: "Shevchenko".into(),
                gender: "male".into(),
                rank: "Private".into(),
                national_id: "UKR-2026-00001".into(),
            },
            nationality: "UKR".into(),
            front_id: "east".into(),
            injury_type: "gunshot-wound".into(),
            triage_category: TriageCategory::T2,
            is_expectant: false,
            body_region: BodyRegion::Extremity,
            injury_timestamp: Utc::now(),
            movement_timeline: vec![],
            final_status: FinalStatus::Rtd,
            last_facility: "Role2".into(),
        }
    }

    #[test]
    fn test_structured_framing_produces_valid_json_array() {
        let shared = SharedBuf(Arc::new(Mutex::new(Vec::new())));
        let mut writer = BodyWriter::open(OutputFormat::Structured, Box::new(shared.clone())).unwrap();
        writer.append(&sample_patient()).unwrap();
        writer.append(&sample_patient()).unwrap();
        writer.finish().unwrap();
        let bytes = shared.0.lock().unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_tabular_header_matches_columns() {
        let shared = SharedBuf(Arc::new(Mutex::new(Vec::new())));
        let writer = BodyWriter::open(OutputFormat::Tabular, Box::new(shared.clone())).unwrap();
        writer.finish().unwrap();
        let bytes = shared.0.lock().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("id,given_name"));
    }
}
