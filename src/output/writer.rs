//! Output Writer (C6): OpenStream/Append/Close over a layered sink. Memory
//! use is bounded independent of total patient count: each layer buffers at
//! most one flush-interval's worth of records. Writes are atomic via a
//! temp-file-then-rename; a partial temp file is removed on any error path.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::constants::DEFAULT_WRITER_FLUSH_INTERVAL;
use crate::domain::request::{OutputFormat, OutputOptions};
use crate::domain::types::Patient;
use crate::error::{OutputError, SimResult};

use super::compress;
use super::crypto;
use super::format::BodyWriter;

/// A layer in the write chain (file, compression, encryption). Each layer
/// knows how to finalize itself and hand back the next inner writer.
pub trait Layer: Write + Send {
    fn finish_layer(self: Box<Self>) -> io::Result<Box<dyn Write + Send>>;
}

pub struct FileLayer(pub File);

impl Write for FileLayer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Layer for FileLayer {
    fn finish_layer(self: Box<Self>) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(self.0))
    }
}

/// One open output stream for a single format. Holds the temp file until
/// `close`, at which point it is renamed into place.
pub struct Writer {
    body: BodyWriter,
    temp_file: NamedTempFile,
    final_path: PathBuf,
    flush_interval: usize,
    records_since_flush: usize,
    records_written: u64,
    format: OutputFormat,
    compressed: bool,
    encrypted: bool,
}

impl Writer {
    pub fn open_stream(
        format: OutputFormat,
        final_path: &Path,
        options: &OutputOptions,
        flush_interval: Option<usize>,
    ) -> SimResult<Self> {
        let dir = final_path.parent().unwrap_or_else(|| Path::new("."));
        let temp_file = NamedTempFile::new_in(dir).map_err(|e| OutputError::Io(e.to_string()))?;
        let handle = temp_file
            .reopen()
            .map_err(|e| OutputError::Io(e.to_string()))?;

        let mut layer: Box<dyn Layer> = Box::new(FileLayer(handle));
        let encrypted = options.encryption_key.is_some();
        if let Some(key) = &options.encryption_key {
            layer = crypto::wrap(layer, key)?;
        }
        let compressed = options.compression;
        if compressed {
            layer = compress::wrap(layer);
        }

        let body = BodyWriter::open(format, layer)?;

        Ok(Self {
            body,
            temp_file,
            final_path: final_path.to_path_buf(),
            flush_interval: flush_interval
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_WRITER_FLUSH_INTERVAL),
            records_since_flush: 0,
            records_written: 0,
            format,
            compressed,
            encrypted,
        })
    }

    pub fn append(&mut self, patient: &Patient) -> SimResult<()> {
        self.body.append(patient)?;
        self.records_written += 1;
        self.records_since_flush += 1;
        if self.records_since_flush >= self.flush_interval {
            self.body.flush()?;
            self.records_since_flush = 0;
        }
        Ok(())
    }

    /// Finalize the stream and atomically install it at `final_path`.
    pub fn close(self) -> SimResult<super::OutputFile> {
        let outermost = self.body.finish()?;
        // Finalize the outermost layer (e.g. write the gzip trailer), then
        // flush what it hands back: a dynamic-dispatch flush() still reaches
        // a still-buffering inner layer (encryption's last partial frame).
        let mut remaining = outermost
            .finish_layer()
            .map_err(|e| OutputError::Io(e.to_string()))?;
        remaining.flush().map_err(|e| OutputError::Io(e.to_string()))?;
        drop(remaining);

        let bytes_written = self
            .temp_file
            .as_file()
            .metadata()
            .map(|m| m.len())
            .unwrap_or(0);

        self.temp_file
            .persist(&self.final_path)
            .map_err(|e| OutputError::Io(e.error.to_string()))?;

        Ok(super::OutputFile {
            format: self.format,
            path: self.final_path,
            bytes_written,
            compressed: self.compressed,
            encrypted: self.encrypted,
            records_written: self.records_written,
        })
    }

    /// Abort the stream on error, removing the partial temp file.
    pub fn abort(self) {
        drop(self.temp_file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::OutputOptions;
    use crate::domain::types::{BodyRegion, Demographics, FinalStatus, TriageCategory};
    use std::io::Read;

    fn sample_patient(id: u64) -> Patient {
        Patient {
            id,
            demographics: Demographics {
                given_name: "Ivan".into(),
                family_name: "Petrov".into(),
                gender: "male".into(),
                rank: "Private".into(),
                national_id: "RUS-2026-00042".into(),
            },
            nationality: "RUS".into(),
            front_id: "north".into(),
            injury_type: "blast-fragmentation".into(),
            triage_category: TriageCategory::T1,
            is_expectant: false,
            body_region: BodyRegion::Central,
            injury_timestamp: chrono::Utc::now(),
            movement_timeline: vec![],
            final_status: FinalStatus::Kia,
            last_facility: "Role1".into(),
        }
    }

    #[test]
    fn test_plain_structured_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let options = OutputOptions {
            formats: vec![OutputFormat::Structured],
            compression: false,
            encryption_key: None,
        };
        let path = dir.path().join("out.json");
        let mut writer = Writer::open_stream(OutputFormat::Structured, &path, &options, None).unwrap();
        writer.append(&sample_patient(1)).unwrap();
        writer.append(&sample_patient(2)).unwrap();
        let output = writer.close().unwrap();

        let mut content = String::new();
        std::fs::File::open(&output.path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(output.records_written, 2);
    }

    #[test]
    fn test_compressed_and_encrypted_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let key = vec![3u8; 32];
        let options = OutputOptions {
            formats: vec![OutputFormat::Structured],
            compression: true,
            encryption_key: Some(key.clone()),
        };
        let path = dir.path().join("out.json.gz.enc");
        let mut writer = Writer::open_stream(OutputFormat::Structured, &path, &options, Some(1)).unwrap();
        writer.append(&sample_patient(1)).unwrap();
        let output = writer.close().unwrap();
        assert!(output.compressed);
        assert!(output.encrypted);
        assert!(output.bytes_written > 0);
    }
}
