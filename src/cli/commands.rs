use crate::cli::args::{Cli, Commands, OutputFormat, PipelineArgs};
use crate::converter::{find_raw_files, ConversionWorkspace, SbfConverter};
use crate::error::{ProcessingError, Result};
use crate::models::decode;
use crate::processors::{IntegrityReport, StreamingPipeline};
use crate::settings::PipelineSettings;
use crate::utils::filename::{generate_default_output_filename, output_filename_for};
use crate::utils::constants::DEFAULT_ROW_GROUP_SIZE;
use crate::utils::progress::ProgressReporter;
use crate::writers::{write_table, ParquetWriter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn run(cli: Cli) -> Result<()> {
    let base_settings = PipelineSettings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            input_file,
            output_file,
            compression,
            report_json,
            no_progress,
            pipeline,
        } => {
            let settings = apply_overrides(base_settings, &pipeline)?;
            let output_file = output_file.unwrap_or_else(generate_default_output_filename);

            println!("Computing S4 index...");
            println!("Input file: {}", input_file.display());
            println!("Output file: {}", output_file.display());
            println!("Chunk size: {}", settings.chunk_size);

            let cancel = cancel_on_ctrl_c();
            let (records, report) = tokio::task::spawn_blocking(move || {
                let progress = ProgressReporter::new_row_counter("Streaming observations...", no_progress);
                let pipeline = StreamingPipeline::from_settings(&settings)?.with_cancel_flag(cancel);
                let result = pipeline.process_file(&input_file, &settings, Some(&progress))?;
                progress.finish_with_message(&format!("Computed {} S4 windows", result.0.len()));

                println!("\n{}", pipeline.checker().generate_summary(&result.1));
                Ok::<_, ProcessingError>(result)
            })
            .await??;

            if let Some(path) = report_json {
                write_report_json(&report, &path)?;
            }

            if records.is_empty() {
                println!("No S4 windows computed, writing an empty table");
            } else {
                println!("Writing {} records...", records.len());
            }
            write_table(&records, &output_file, &compression, DEFAULT_ROW_GROUP_SIZE)?;

            if report.cancelled {
                println!("Processing cancelled - partial results written");
            } else {
                println!("Processing complete!");
            }
        }

        Commands::ProcessDirectory {
            input_dir,
            output_dir,
            extension,
            converter,
            format,
            compression,
            max_workers,
            keep_going,
            pipeline,
        } => {
            let settings = apply_overrides(base_settings, &pipeline)?;
            let raw_files = find_raw_files(&input_dir, &extension)?;

            println!("Processing receiver files...");
            println!("Input directory: {}", input_dir.display());
            println!("Output directory: {}", output_dir.display());
            println!("Files found: {}, Workers: {}", raw_files.len(), max_workers);

            if raw_files.is_empty() {
                println!("No files with extension '{}' found", extension);
                return Ok(());
            }

            std::fs::create_dir_all(&output_dir)?;

            // Converted text files live in the workspace until it is dropped
            let workspace = ConversionWorkspace::new(SbfConverter::new(converter))?;
            let progress = ProgressReporter::new(raw_files.len() as u64, "Converting...", false);
            let mut converted = Vec::with_capacity(raw_files.len());

            for (i, raw) in raw_files.iter().enumerate() {
                match workspace.convert(raw).await {
                    Ok(path) => converted.push((raw.clone(), path)),
                    Err(e) if keep_going => {
                        warn!(file = %raw.display(), error = %e, "Skipping file");
                        progress.println(&format!("Skipping {}: {}", raw.display(), e));
                    }
                    Err(e) => return Err(e),
                }
                progress.update(i as u64 + 1);
            }
            progress.finish_with_message(&format!("Converted {} files", converted.len()));

            let results = tokio::task::spawn_blocking(move || {
                process_converted_files(&converted, &settings, &output_dir, format, &compression, max_workers)
            })
            .await??;

            let mut total_windows = 0;
            for (output, report) in &results {
                total_windows += report.total_windows;
                println!(
                    "{}: {} windows, {} scintillation events",
                    output.display(),
                    report.total_windows,
                    report.scintillation_events.len()
                );
            }

            drop(workspace);
            println!(
                "Processed {} files, {} S4 windows in total",
                results.len(),
                total_windows
            );
        }

        Commands::Decode { svids } => {
            for svid in svids {
                println!("{:>5} -> {}", svid, decode(svid));
            }
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;
            println!("\n{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing up to {} records):", sample);
                match writer.read_sample_records(&file, sample) {
                    Ok(records) => {
                        for (i, record) in records.iter().enumerate() {
                            println!(
                                "{}. {} at {}: S4={:.4} ({} samples, mean C/N0 {:.1} dB-Hz)",
                                i + 1,
                                record.satellite,
                                record.minute.format("%Y-%m-%d %H:%M"),
                                record.s4,
                                record.sample_count,
                                record.mean_snr_db
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Layer CLI flags over the loaded settings.
pub fn apply_overrides(mut settings: PipelineSettings, args: &PipelineArgs) -> Result<PipelineSettings> {
    if let Some(chunk_size) = args.chunk_size {
        settings.chunk_size = chunk_size;
    }
    if let Some(header_rows) = args.header_rows {
        settings.header_rows = header_rows;
    }
    if let Some(signal) = args.signal {
        settings.signal = signal;
    }
    if let Some(policy) = args.invalid_snr {
        settings.invalid_snr = policy;
    }
    if let Some(week) = args.gps_week {
        settings.gps_week = Some(week);
    }
    if !args.satellites.is_empty() {
        settings.satellites = args.satellites.clone();
    }
    if let Some(threshold) = args.threshold {
        settings.scintillation_threshold = threshold;
    }

    settings.check()?;
    Ok(settings)
}

/// Run one pipeline per converted file on a dedicated thread pool.
fn process_converted_files(
    files: &[(PathBuf, PathBuf)],
    settings: &PipelineSettings,
    output_dir: &Path,
    format: OutputFormat,
    compression: &str,
    max_workers: usize,
) -> Result<Vec<(PathBuf, IntegrityReport)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()
        .map_err(|e| ProcessingError::Config(e.to_string()))?;

    let processed = AtomicUsize::new(0);

    pool.install(|| {
        files
            .par_iter()
            .map(|(raw, converted)| {
                let pipeline = StreamingPipeline::from_settings(settings)?;
                let (records, report) = pipeline
                    .process_file(converted, settings, None)
                    .map_err(|e| {
                        error!(file = %raw.display(), error = %e, "Processing failed");
                        e
                    })?;

                let output = output_filename_for(raw, output_dir, format.extension());
                write_table(&records, &output, compression, DEFAULT_ROW_GROUP_SIZE)?;

                let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                info!(file = %raw.display(), windows = records.len(), done = count, "Wrote S4 table");
                Ok((output, report))
            })
            .collect()
    })
}

fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current chunk");
            handle.store(true, Ordering::Relaxed);
        }
    });
    flag
}

fn write_report_json(report: &IntegrityReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    info!(path = %path.display(), "Wrote processing report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Signal;
    use clap::Parser;
    use std::ffi::OsStr;

    #[test]
    fn test_apply_overrides() {
        let args = PipelineArgs {
            chunk_size: Some(64),
            signal: Some(Signal::Secondary),
            satellites: vec!["G05".to_string()],
            ..Default::default()
        };

        let settings = apply_overrides(PipelineSettings::default(), &args).unwrap();
        assert_eq!(settings.chunk_size, 64);
        assert_eq!(settings.signal, Signal::Secondary);
        assert_eq!(settings.satellites, vec!["G05".to_string()]);
        assert_eq!(settings.header_rows, PipelineSettings::default().header_rows);
    }

    #[tokio::test]
    async fn test_process_empty_input_writes_header_only_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("log_measurements.txt");
        std::fs::write(&input, b"").unwrap();
        let output = dir.path().join("out").join("s4.csv");

        let cli = Cli::try_parse_from([
            OsStr::new("s4-processor"),
            OsStr::new("process"),
            OsStr::new("--input-file"),
            input.as_os_str(),
            OsStr::new("--output-file"),
            output.as_os_str(),
            OsStr::new("--no-progress"),
        ])
        .unwrap();
        run(cli).await.unwrap();

        let contents = std::fs::read_to_string(&output).unwrap();
        assert_eq!(contents.trim(), "satellite,minute,s4,sample_count,mean_snr_db");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = PipelineArgs {
            chunk_size: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(PipelineSettings::default(), &args).is_err());
    }
}
