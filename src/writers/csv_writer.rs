use crate::error::Result;
use crate::models::S4Record;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Delimited S4 table: satellite,minute,s4,sample_count,mean_snr_db
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_records(&self, records: &[S4Record], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(records, file)?;
        debug!(path = %path.display(), records = records.len(), "Wrote CSV table");
        Ok(())
    }

    pub fn write_to<W: Write>(&self, records: &[S4Record], writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);

        if records.is_empty() {
            writer.write_record(["satellite", "minute", "s4", "sample_count", "mean_snr_db"])?;
        }

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_records(&self, path: &Path) -> Result<Vec<S4Record>> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;

        reader
            .deserialize::<S4Record>()
            .map(|row| row.map_err(Into::into))
            .collect()
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
