//! rflux - Command-line interface for Recovery Flux
//!
//! Commands:
//! - score: Score every day in the input (batch mode)
//! - patterns: Detect correlations across metrics and goals
//! - weekly: Roll scored days up into calendar weeks
//! - validate: Validate input records
//! - config: Print the effective configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use recovery_flux::encoder::{OutputEncoder, OutputEnvelope};
use recovery_flux::schema::{InputReader, InputRecord, SCHEMA_VERSION};
use recovery_flux::types::{DailySample, GoalObservation};
use recovery_flux::{ComputeError, FluxConfig, FluxProcessor, FLUX_VERSION, PRODUCER_NAME};

/// rflux - Personal-baseline recovery, strain and sleep scoring
#[derive(Parser)]
#[command(name = "rflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Score daily wearable samples against personal baselines", long_about = None)]
struct Cli {
    /// Configuration file (JSON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every day in the input
    Score {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Detect patterns between metrics and tracked goals
    Patterns {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Summarize scored days by calendar week
    Weekly {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Validate input records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config,

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct IoArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Input format
    #[arg(long, default_value = "ndjson")]
    input_format: InputFormat,

    /// Output format
    #[arg(long, default_value = "ndjson")]
    output_format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one envelope per line)
    Ndjson,
    /// JSON array of envelopes
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Score { io } => cmd_score(&io, load_config(config_path)?),
        Commands::Patterns { io } => cmd_patterns(&io, load_config(config_path)?),
        Commands::Weekly { io } => cmd_weekly(&io, load_config(config_path)?),
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),
        Commands::Config => {
            println!("{}", load_config(config_path)?.to_json_pretty()?);
            Ok(())
        }
        Commands::Doctor { json } => cmd_doctor(config_path, json),
    }
}

fn cmd_score(io: &IoArgs, config: FluxConfig) -> Result<(), FluxCliError> {
    let (samples, _) = read_input(&io.input, &io.input_format)?;
    let mut processor = FluxProcessor::new(config)?;
    processor.ingest_all(samples)?;

    // Late days may have been rescored, so read final reports from the store
    let reports: Vec<_> = processor
        .records()
        .into_iter()
        .filter_map(|record| record.report)
        .collect();

    let encoder = OutputEncoder::new();
    let envelopes: Vec<_> = reports.into_iter().map(|r| encoder.wrap(r)).collect();
    write_output(&io.output, &format_output(&envelopes, &io.output_format)?)
}

fn cmd_patterns(io: &IoArgs, config: FluxConfig) -> Result<(), FluxCliError> {
    let (samples, goals) = read_input(&io.input, &io.input_format)?;
    let mut processor = FluxProcessor::new(config)?;
    processor.ingest_all(samples)?;
    let report = processor.detect_patterns(&goals)?;

    let envelopes = vec![OutputEncoder::new().wrap(report)];
    write_output(&io.output, &format_output(&envelopes, &io.output_format)?)
}

fn cmd_weekly(io: &IoArgs, config: FluxConfig) -> Result<(), FluxCliError> {
    let (samples, _) = read_input(&io.input, &io.input_format)?;
    let mut processor = FluxProcessor::new(config)?;
    processor.ingest_all(samples)?;

    let encoder = OutputEncoder::new();
    let envelopes: Vec<_> = processor
        .weekly_summaries()?
        .into_iter()
        .map(|week| encoder.wrap(week))
        .collect();
    write_output(&io.output, &format_output(&envelopes, &io.output_format)?)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), FluxCliError> {
    let records = parse_records(&read_source(input)?, &input_format)?;
    let results = InputReader::validate_records(&records);

    let errors: Vec<ValidationErrorDetail> = results
        .iter()
        .filter_map(|r| {
            r.error.as_ref().map(|e| ValidationErrorDetail {
                index: r.index,
                date: records[r.index].date().to_string(),
                error: e.to_string(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - errors.len(),
        invalid_records: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {} ({}): {}", err.index, err.date, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(FluxCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FluxCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "flux_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Flux version {}", FLUX_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    let config_check = match config_path {
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        },
        Some(path) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        },
        Some(path) => match FluxConfig::from_file(path) {
            Ok(_) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!("Config file valid: {}", path.display()),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
    };
    checks.push(config_check);

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (pass --input <file>)"
    } else {
        "stdin is a pipe (--input - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Flux Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(FluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<FluxConfig, FluxCliError> {
    match path {
        Some(path) => Ok(FluxConfig::from_file(path)?),
        None => Ok(FluxConfig::default()),
    }
}

fn read_source(input: &Path) -> Result<String, FluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(data: &str, format: &InputFormat) -> Result<Vec<InputRecord>, FluxCliError> {
    let records = match format {
        InputFormat::Ndjson => InputReader::parse_ndjson(data)?,
        InputFormat::Json => InputReader::parse_array(data)?,
    };
    Ok(records)
}

fn read_input(
    input: &Path,
    format: &InputFormat,
) -> Result<(Vec<DailySample>, Vec<GoalObservation>), FluxCliError> {
    let records = parse_records(&read_source(input)?, format)?;
    let (samples, goals) = InputReader::split(records)?;
    if samples.is_empty() {
        return Err(FluxCliError::NoSamples);
    }
    Ok((samples, goals))
}

fn format_output<T: serde::Serialize>(
    envelopes: &[OutputEnvelope<T>],
    format: &OutputFormat,
) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for envelope in envelopes {
                lines.push(serde_json::to_string(envelope)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(envelopes)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(envelopes)?),
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), FluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoSamples,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ComputeError> for FluxCliError {
    fn from(e: ComputeError) -> Self {
        FluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            FluxCliError::Compute(e) => compute_error(e),
            FluxCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax"),
            FluxCliError::NoSamples => CliError::new(
                "NO_SAMPLES",
                "No daily samples found in input".to_string(),
                "Ensure input contains records with record_type \"sample\"",
            ),
            FluxCliError::ValidationFailed(count) => CliError::new(
                "VALIDATION_FAILED",
                format!("{} records failed validation", count),
                "Fix validation errors and retry",
            ),
            FluxCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more health checks failed".to_string(),
                "Review the doctor report for details",
            ),
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let message = e.to_string();
    match e {
        ComputeError::InvalidConfig(_) => CliError::new(
            "CONFIG_ERROR",
            message,
            "Run 'rflux config' to see the expected shape",
        ),
        ComputeError::DuplicateSample(_) => CliError::new(
            "DUPLICATE_SAMPLE",
            message,
            "Each date may appear in at most one sample record",
        ),
        ComputeError::DuplicateGoalObservation { .. } => CliError::new(
            "DUPLICATE_GOAL",
            message,
            "Each goal may be observed at most once per date",
        ),
        ComputeError::InvalidInput(_) => CliError::new(
            "INVALID_INPUT",
            message,
            "Run 'rflux validate' for details",
        ),
        ComputeError::ParseError(_) | ComputeError::JsonError(_) => CliError::new(
            "PARSE_ERROR",
            message,
            "Ensure input matches the flux.daily_input.v1 schema",
        ),
        ComputeError::UnalignedWeekStart { .. } | ComputeError::StoreError(_) => {
            CliError::new("COMPUTE_ERROR", message, "Rerun with RUST_LOG=debug for details")
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    date: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
