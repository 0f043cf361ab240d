use crate::error::{ProcessingError, Result};
use crate::models::RawObservation;
use crate::settings::{Delimiter, PipelineSettings};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Pull-based supplier of raw observation rows, one bounded chunk at a time.
pub trait ObservationSource {
    /// Next chunk of rows, or `None` once the source is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Vec<RawObservation>>>;
}

impl<S: ObservationSource + ?Sized> ObservationSource for &mut S {
    fn next_chunk(&mut self) -> Result<Option<Vec<RawObservation>>> {
        (**self).next_chunk()
    }
}

#[derive(Debug, Clone, Copy)]
struct RowLayout {
    delimiter: Delimiter,
    svid_column: usize,
    time_column: usize,
    snr_column: usize,
    required_columns: usize,
}

impl RowLayout {
    fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            delimiter: settings.delimiter,
            svid_column: settings.svid_column,
            time_column: settings.time_column,
            snr_column: settings.snr_column(),
            required_columns: settings.required_columns(),
        }
    }
}

/// Chunked reader for converted measurement files.
///
/// Only the SVID, time and SNR columns are read. Rows with a non-positive
/// SVID come from other block types and are ignored, as are rows too short
/// to hold the configured columns.
pub struct ObservationReader<R: BufRead = BufReader<File>> {
    reader: R,
    layout: RowLayout,
    chunk_size: usize,
    header_rows: usize,
    line_count: usize,
    ignored_lines: usize,
    exhausted: bool,
}

impl ObservationReader<BufReader<File>> {
    pub fn open(path: &Path, settings: &PipelineSettings) -> Result<Self> {
        let file = File::open(path)?;
        debug!(path = %path.display(), chunk_size = settings.chunk_size, "Opened observation file");
        Ok(Self::from_reader(
            BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file),
            settings,
        ))
    }
}

impl<R: BufRead> ObservationReader<R> {
    pub fn from_reader(reader: R, settings: &PipelineSettings) -> Self {
        Self {
            reader,
            layout: RowLayout::from_settings(settings),
            chunk_size: settings.chunk_size.max(1),
            header_rows: settings.header_rows,
            line_count: 0,
            ignored_lines: 0,
            exhausted: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn ignored_lines(&self) -> usize {
        self.ignored_lines
    }

    /// Parse one data line; `Ok(None)` for lines that are not measurement rows.
    fn parse_line(&self, line: &str) -> Result<Option<RawObservation>> {
        let parts: Vec<&str> = match self.layout.delimiter {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Comma => line.split(',').map(|s| s.trim()).collect(),
        };

        if parts.len() < self.layout.required_columns {
            return Ok(None);
        }

        let svid = parts[self.layout.svid_column]
            .parse::<i64>()
            .map_err(|_| self.invalid_field("SVID", parts[self.layout.svid_column]))?;

        if svid <= 0 {
            return Ok(None);
        }

        let time = parts[self.layout.time_column]
            .parse::<f64>()
            .map_err(|_| self.invalid_field("time", parts[self.layout.time_column]))?;

        let snr = parts[self.layout.snr_column]
            .parse::<f64>()
            .map_err(|_| self.invalid_field("SNR", parts[self.layout.snr_column]))?;

        Ok(Some(RawObservation::new(svid, time, snr)))
    }

    fn invalid_field(&self, name: &str, value: &str) -> ProcessingError {
        ProcessingError::InvalidFormat(format!(
            "Line {}: invalid {} '{}'",
            self.line_count, name, value
        ))
    }
}

impl<R: BufRead> ObservationSource for ObservationReader<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<RawObservation>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut line = String::new();

        while chunk.len() < self.chunk_size {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.exhausted = true;
                break;
            }
            self.line_count += 1;

            // Skip header lines
            if self.line_count <= self.header_rows {
                continue;
            }

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            match self.parse_line(&line)? {
                Some(observation) => chunk.push(observation),
                None => self.ignored_lines += 1,
            }
        }

        if chunk.is_empty() {
            return Ok(None);
        }

        Ok(Some(chunk))
    }
}

/// In-memory source with a fixed chunk size.
pub struct MemorySource {
    rows: std::vec::IntoIter<RawObservation>,
    chunk_size: usize,
}

impl MemorySource {
    pub fn new(rows: Vec<RawObservation>, chunk_size: usize) -> Self {
        Self {
            rows: rows.into_iter(),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ObservationSource for MemorySource {
    fn next_chunk(&mut self) -> Result<Option<Vec<RawObservation>>> {
        let chunk: Vec<RawObservation> = self.rows.by_ref().take(self.chunk_size).collect();
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}
