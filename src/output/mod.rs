//! Output Writer (C6): turns a patient stream into one or more framed,
//! optionally compressed and encrypted, files on disk.

pub mod compress;
pub mod crypto;
pub mod format;
pub mod writer;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::request::{OutputFormat, OutputOptions};
use crate::domain::types::Patient;
use crate::error::SimResult;

pub use writer::Writer;

/// Descriptor of one completed output file, surfaced on `JobState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub format: OutputFormat,
    pub path: PathBuf,
    pub bytes_written: u64,
    pub compressed: bool,
    pub encrypted: bool,
    pub records_written: u64,
}

/// Holds one `Writer` per requested format and multiplexes every patient
/// record to all of them (§4.6 "two writers may be multiplexed").
pub struct MultiWriter {
    writers: Vec<Writer>,
}

impl MultiWriter {
    pub fn open(
        output_dir: &Path,
        job_id: &str,
        options: &OutputOptions,
        flush_interval: Option<usize>,
    ) -> SimResult<Self> {
        let mut writers = Vec::with_capacity(options.formats.len());
        for format in &options.formats {
            let ext = match format {
                OutputFormat::Structured => "json",
                OutputFormat::Tabular => "csv",
            };
            let suffix = match (options.compression, options.encryption_key.is_some()) {
                (true, true) => ".gz.enc",
                (true, false) => ".gz",
                (false, true) => ".enc",
                (false, false) => "",
            };
            let path = output_dir.join(format!("{job_id}.{ext}{suffix}"));
            writers.push(Writer::open_stream(*format, &path, options, flush_interval)?);
        }
        Ok(Self { writers })
    }

    pub fn append(&mut self, patient: &Patient) -> SimResult<()> {
        for writer in &mut self.writers {
            writer.append(patient)?;
        }
        Ok(())
    }

    pub fn close(self) -> SimResult<Vec<OutputFile>> {
        let mut outputs = Vec::with_capacity(self.writers.len());
        for writer in self.writers {
            outputs.push(writer.close()?);
        }
        Ok(outputs)
    }

    pub fn abort(self) {
        for writer in self.writers {
            writer.abort();
        }
    }
}
