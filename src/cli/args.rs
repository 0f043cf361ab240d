use crate::settings::{InvalidSnrPolicy, Signal};
use crate::utils::constants::{DEFAULT_CONVERTER_BINARY, DEFAULT_RAW_EXTENSION};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s4-processor")]
#[command(about = "Streaming S4 scintillation index computation from GNSS receiver C/N0")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Pipeline overrides shared by the processing commands; unset flags keep the settings file value.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    #[arg(long, help = "Rows per chunk")]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "Leading header rows to skip")]
    pub header_rows: Option<usize>,

    #[arg(long, value_enum, help = "C/N0 column to use")]
    pub signal: Option<Signal>,

    #[arg(long, value_enum, help = "Handling of unavailable or non-positive SNR values")]
    pub invalid_snr: Option<InvalidSnrPolicy>,

    #[arg(long, help = "GPS week to add when the time column is a time-of-week")]
    pub gps_week: Option<u32>,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Only keep these satellites (e.g. G01,E11)"
    )]
    pub satellites: Vec<String>,

    #[arg(long, help = "S4 value above which a window is reported as scintillation")]
    pub threshold: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute S4 for one converted observation file
    Process {
        #[arg(short, long, help = "Converted observation text file")]
        input_file: PathBuf,

        #[arg(
            short,
            long,
            help = "Output table (.csv or .parquet) [default: output/s4-{YYMMDD}.csv]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "Write the processing report as JSON")]
        report_json: Option<PathBuf>,

        #[arg(long, default_value = "false")]
        no_progress: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Convert and process every raw receiver file in a directory
    ProcessDirectory {
        #[arg(short, long, help = "Directory containing raw receiver files")]
        input_dir: PathBuf,

        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        #[arg(long, default_value = DEFAULT_RAW_EXTENSION, help = "Raw file extension")]
        extension: String,

        #[arg(long, default_value = DEFAULT_CONVERTER_BINARY, help = "Binary-to-text converter")]
        converter: PathBuf,

        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[arg(long, default_value = "false", help = "Skip files that fail to convert")]
        keep_going: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print canonical satellite codes for receiver SVIDs
    Decode {
        #[arg(required = true, allow_negative_numbers = true)]
        svids: Vec<i64>,
    },

    /// Display information about a Parquet S4 table
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}
