use crate::error::{ProcessingError, Result};
use crate::models::{S4Record, SatelliteCode};
use crate::utils::constants::DEFAULT_ROW_GROUP_SIZE;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write S4 records in batches of `batch_size` rows.
    pub fn write_records(&self, records: &[S4Record], path: &Path, batch_size: usize) -> Result<()> {
        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in records.chunks(batch_size.max(1)) {
            let batch = self.records_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        debug!(path = %path.display(), records = records.len(), "Wrote Parquet table");
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new("satellite", DataType::Utf8, false),
            Field::new(
                "minute",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Field::new("s4", DataType::Float64, false),
            Field::new("sample_count", DataType::UInt64, false),
            Field::new("mean_snr_db", DataType::Float64, false),
        ];

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(&self, records: &[S4Record], schema: Arc<Schema>) -> Result<RecordBatch> {
        let satellites: Vec<String> = records.iter().map(|r| r.satellite.to_string()).collect();
        let minutes: Vec<i64> = records.iter().map(|r| r.minute.timestamp_millis()).collect();
        let s4: Vec<f64> = records.iter().map(|r| r.s4).collect();
        let sample_counts: Vec<u64> = records.iter().map(|r| r.sample_count).collect();
        let mean_snr: Vec<f64> = records.iter().map(|r| r.mean_snr_db).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(satellites)),
                Arc::new(TimestampMillisecondArray::from(minutes).with_timezone("UTC")),
                Arc::new(Float64Array::from(s4)),
                Arc::new(UInt64Array::from(sample_counts)),
                Arc::new(Float64Array::from(mean_snr)),
            ],
        )?;

        Ok(batch)
    }

    /// Read up to `limit` records back from a table written by this writer.
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<S4Record>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;

            let satellites = column::<StringArray>(&batch, 0, "satellite")?;
            let minutes = column::<TimestampMillisecondArray>(&batch, 1, "minute")?;
            let s4 = column::<Float64Array>(&batch, 2, "s4")?;
            let sample_counts = column::<UInt64Array>(&batch, 3, "sample_count")?;
            let mean_snr = column::<Float64Array>(&batch, 4, "mean_snr_db")?;

            for i in 0..batch.num_rows() {
                if records.len() >= limit {
                    return Ok(records);
                }

                let minute = DateTime::from_timestamp_millis(minutes.value(i)).ok_or_else(|| {
                    ProcessingError::InvalidFormat("Invalid minute in Parquet file".to_string())
                })?;

                records.push(S4Record {
                    satellite: satellites.value(i).parse::<SatelliteCode>()?,
                    minute,
                    s4: s4.value(i),
                    sample_count: sample_counts.value(i),
                    mean_snr_db: mean_snr.value(i),
                });
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, index: usize, name: &str) -> Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::decode;
    use crate::models::observation::gps_seconds_to_utc;
    use tempfile::NamedTempFile;

    fn records(n: usize) -> Vec<S4Record> {
        (0..n)
            .map(|i| S4Record {
                satellite: decode(1 + (i % 30) as i64),
                minute: gps_seconds_to_utc(60.0 * i as f64).unwrap(),
                s4: 0.01 * i as f64,
                sample_count: 50,
                mean_snr_db: 42.0,
            })
            .collect()
    }

    #[test]
    fn test_write_empty_records() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_records(&[], temp_file.path(), 100)?;
        assert_eq!(writer.get_file_info(temp_file.path())?.total_rows, 0);
        Ok(())
    }

    #[test]
    fn test_round_trip_sample() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let written = records(25);

        writer.write_records(&written, temp_file.path(), 10)?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 25);

        let read = writer.read_sample_records(temp_file.path(), 12)?;
        assert_eq!(read.len(), 12);
        assert_eq!(read[..], written[..12]);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_records(&records(3), temp_file.path(), 100);
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
