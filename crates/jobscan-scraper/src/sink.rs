//! Destinations for extracted job header records.

use std::io::Write;

use thiserror::Error;

use crate::types::JobHeaderRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing records: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize record for {job_url}: {source}")]
    Serialize {
        job_url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Receives records in run order.
pub trait ResultSink {
    /// # Errors
    ///
    /// Returns [`SinkError`] if the record cannot be written.
    fn write_record(&mut self, record: &JobHeaderRecord) -> Result<(), SinkError>;

    /// Flushes buffered output. Called once after the last record.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if flushing fails.
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &JobHeaderRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record).map_err(|e| SinkError::Serialize {
            job_url: record.job_url.clone(),
            source: e,
        })?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes every record of `records` to `sink`, then finishes it.
///
/// # Errors
///
/// Stops at the first [`SinkError`].
pub fn write_all<S: ResultSink + ?Sized>(
    sink: &mut S,
    records: &[JobHeaderRecord],
) -> Result<(), SinkError> {
    for record in records {
        sink.write_record(record)?;
    }
    sink.finish()
}
