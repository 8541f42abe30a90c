//! Folder sink - newline-delimited JSON files, one per batch
//!
//! Filenames are `<source_name>_<UTC millis>_<sequence>.json[.gz]`.
//! Each batch is written to `<final>.tmp`, fsynced, then renamed, so a
//! crash never leaves a partial file under the final name and the batch
//! is acknowledged only after the rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, BytesMut};
use chrono::Utc;
use flate2::write::GzEncoder;

use sluice_config::Compression;
use sluice_event::CanonicalLog;

use crate::error::SinkError;

/// Rough per-record size used to presize the serialization buffer
const RECORD_SIZE_HINT: usize = 256;

/// Writes batches as NDJSON files into a directory
pub struct FolderSink {
    dir: PathBuf,
    compression: Compression,
    source_name: String,
    sequence: AtomicU64,
}

impl FolderSink {
    /// Create a sink writing into `dir` for the named source
    pub fn new(dir: PathBuf, compression: Compression, source_name: impl Into<String>) -> Self {
        Self {
            dir,
            compression,
            source_name: source_name.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Write one batch; returns the serialized (pre-compression) size.
    pub async fn deliver(&self, batch: &[CanonicalLog]) -> Result<u64, SinkError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut buf = BytesMut::with_capacity(batch.len() * RECORD_SIZE_HINT);
        for log in batch {
            buf.put_slice(log.to_json_line().as_bytes());
            buf.put_u8(b'\n');
        }
        let bytes = buf.len() as u64;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let filename = format!(
            "{}_{}_{}.json{}",
            self.source_name,
            Utc::now().timestamp_millis(),
            sequence,
            self.compression.extension()
        );

        self.write_atomic(&filename, &buf)?;

        tracing::debug!(
            source = %self.source_name,
            file = %filename,
            records = batch.len(),
            bytes,
            "batch written to folder"
        );

        Ok(bytes)
    }

    /// Write `payload` to `<dir>/<filename>` via tmp + fsync + rename.
    fn write_atomic(&self, filename: &str, payload: &[u8]) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| SinkError::io(self.dir.display().to_string(), e))?;

        let final_path = self.dir.join(filename);
        let tmp_path = self.dir.join(format!("{filename}.tmp"));
        let tmp_display = tmp_path.display().to_string();

        let file = File::create(&tmp_path).map_err(|e| SinkError::io(&tmp_display, e))?;
        let file = self
            .write_payload(file, payload)
            .map_err(|e| SinkError::io(&tmp_display, e))?;
        file.sync_all().map_err(|e| SinkError::io(&tmp_display, e))?;

        fs::rename(&tmp_path, &final_path)
            .map_err(|e| SinkError::io(final_path.display().to_string(), e))
    }

    /// Write the payload plainly or through gzip, handing back the file
    /// for the final fsync.
    fn write_payload(&self, mut file: File, payload: &[u8]) -> std::io::Result<File> {
        match self.compression {
            Compression::None => {
                file.write_all(payload)?;
                Ok(file)
            }
            Compression::Gzip { level } => {
                let mut encoder = GzEncoder::new(file, flate2::Compression::new(level));
                encoder.write_all(payload)?;
                encoder.finish()
            }
        }
    }
}

#[cfg(test)]
#[path = "folder_test.rs"]
mod folder_test;
