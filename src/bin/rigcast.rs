//! rigcast CLI - Command-line interface for rigcast
//!
//! Commands:
//! - run: Stream recorded frames to a rig consumer over UDP
//! - transform: Encode recorded frames into wire records (no network)
//! - validate: Check recorded frames against the landmark schema
//! - profile: Print or check a calibration profile

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rigcast::config::Config;
use rigcast::encoder::FrameEncoder;
use rigcast::pipeline::FrameProcessor;
use rigcast::profile::CalibrationProfile;
use rigcast::schema::{FrameEvent, FrameEventAdapter, LandmarkSchema, SCHEMA_VERSION};
use rigcast::transport::TransmitStats;
use rigcast::types::NormalizedFrameRecord;
use rigcast::{RigcastError, PRODUCER_NAME, RIGCAST_VERSION};

/// rigcast - Stream normalized tracking data to avatar rigs
#[derive(Parser)]
#[command(name = "rigcast")]
#[command(version = RIGCAST_VERSION)]
#[command(about = "Normalize tracking frames and stream them over UDP", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream recorded frames (NDJSON) to the rig consumer
    Run {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Destination host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Destination port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Pause between frames in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Print delivery stats as JSON on exit
        #[arg(long)]
        json: bool,
    },

    /// Encode recorded frames into wire records (no network)
    Transform {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Validate recorded frames against the landmark schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the built-in calibration profile, or check a profile file
    Profile {
        /// Profile file to check instead of printing the built-in one
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

/// Settings shared by the frame-processing commands
#[derive(Args)]
struct SettingsArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Calibration profile JSON (overrides config)
    #[arg(long)]
    profile: Option<PathBuf>,
}

impl SettingsArgs {
    fn load(&self) -> Result<Config, CliFailure> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(profile) = &self.profile {
            config.calibration.profile_path = Some(profile.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Run {
            input,
            settings,
            host,
            port,
            interval_ms,
            json,
        } => {
            let mut config = settings.load()?;
            if let Some(host) = host {
                config.transport.host = host;
            }
            if let Some(port) = port {
                config.transport.port = port;
            }
            cmd_run(&input, &config, Duration::from_millis(interval_ms), json)
        }

        Commands::Transform {
            input,
            output,
            input_format,
            output_format,
            settings,
        } => cmd_transform(&input, &output, input_format, output_format, &settings.load()?),

        Commands::Validate {
            input,
            input_format,
            settings,
            json,
        } => cmd_validate(&input, input_format, &settings.load()?, json),

        Commands::Profile { check } => cmd_profile(check.as_deref()),
    }
}

fn cmd_run(
    input: &Path,
    config: &Config,
    interval: Duration,
    json: bool,
) -> Result<(), CliFailure> {
    let processor = FrameProcessor::new(config)?;

    let reader: Box<dyn BufRead> = if is_dash(input) {
        if atty::is(atty::Stream::Stdin) {
            tracing::info!("Reading frames from the terminal, one JSON object per line");
        }
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    tracing::info!(
        "Streaming frames to {}:{}",
        config.transport.host,
        config.transport.port
    );

    let mut malformed = 0usize;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let event = match FrameEventAdapter::parse_line(&line, line_num + 1) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Skipping frame: {}", e);
                malformed += 1;
                continue;
            }
        };

        processor.process(&event.input);

        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    let report = RunReport {
        producer: PRODUCER_NAME.to_string(),
        session_id: processor.session_id().to_string(),
        malformed_lines: malformed,
        stats: processor.stats(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Run Summary");
        println!("===========");
        println!("Session:         {}", report.session_id);
        println!("Frames sent:     {}", report.stats.frames_sent);
        println!("Frames dropped:  {}", report.stats.frames_dropped);
        println!("Bytes sent:      {}", report.stats.bytes_sent);
        println!("Malformed lines: {}", report.malformed_lines);
        if let Some(err) = &report.stats.last_error {
            println!("Last error:      {}", err);
        }
    }

    Ok(())
}

fn cmd_transform(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: &Config,
) -> Result<(), CliFailure> {
    let events = read_events(input, &input_format)?;
    if events.is_empty() {
        return Err(CliFailure::NoFrames);
    }

    let encoder = FrameEncoder::new(Arc::new(config.load_profile()?))
        .with_fallback_resolution(config.frame.fallback_resolution());

    let records: Vec<NormalizedFrameRecord> = events
        .iter()
        .map(|event| {
            let encoded = encoder.encode(&event.input);
            for issue in &encoded.issues {
                tracing::warn!("Frame {}: {}", frame_label(event), issue);
            }
            encoded.record
        })
        .collect();

    let output_data = format_output(&records, &output_format)?;

    if is_dash(output) {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    config: &Config,
    json: bool,
) -> Result<(), CliFailure> {
    let events = read_events(input, &input_format)?;
    let profile = config.load_profile()?;
    let schema = LandmarkSchema::for_profile(&profile);

    let results = FrameEventAdapter::validate_events(&events, &schema);

    let report = ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        profile: profile.label(),
        total_frames: events.len(),
        valid_frames: events.len() - results.len(),
        invalid_frames: results.len(),
        errors: results
            .iter()
            .flat_map(|r| {
                r.errors.iter().map(move |e| ValidationErrorDetail {
                    index: r.index,
                    frame: r.frame,
                    error: e.to_string(),
                    field_omitted: e.omits_field(),
                })
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Profile:        {}", report.profile);
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let frame = err
                    .frame
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let suffix = if err.field_omitted { " (field sent as null)" } else { "" };
                println!("  - Frame {} (index {}): {}{}", frame, err.index, err.error, suffix);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

fn cmd_profile(check: Option<&Path>) -> Result<(), CliFailure> {
    match check {
        Some(path) => {
            let profile = CalibrationProfile::from_file(path)?;
            println!(
                "{}: {} channels, {} swap pairs, {} coupling rules, {} face points",
                profile.label(),
                profile.channel_count(),
                profile.swap_pairs().len(),
                profile.coupling().len(),
                profile.face_indices().len()
            );
        }
        None => println!("{}", CalibrationProfile::builtin().to_json_pretty()?),
    }
    Ok(())
}

// Helper functions

fn is_dash(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_events(input: &Path, format: &InputFormat) -> Result<Vec<FrameEvent>, CliFailure> {
    let input_data = if is_dash(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let events = match format {
        InputFormat::Ndjson => FrameEventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => FrameEventAdapter::parse_array(&input_data)?,
    };
    Ok(events)
}

fn frame_label(event: &FrameEvent) -> String {
    event
        .frame
        .map(|f| f.to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn format_output(
    records: &[NormalizedFrameRecord],
    format: &OutputFormat,
) -> Result<String, CliFailure> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Rigcast(RigcastError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<RigcastError> for CliFailure {
    fn from(e: RigcastError) -> Self {
        CliFailure::Rigcast(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Rigcast(e) => {
                let (code, hint) = match &e {
                    RigcastError::Config(_) => ("CONFIG_ERROR", "Check the TOML configuration"),
                    RigcastError::InvalidProfile(_) => {
                        ("PROFILE_ERROR", "Run 'rigcast profile --check <file>' for details")
                    }
                    RigcastError::Transport(_) => {
                        ("TRANSPORT_ERROR", "Check the destination host and port")
                    }
                    RigcastError::ParseError(_) | RigcastError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches the rigcast.frame.v1 schema",
                    ),
                    _ => ("RIGCAST_ERROR", "Run with --verbose for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct RunReport {
    producer: String,
    session_id: String,
    malformed_lines: usize,
    stats: TransmitStats,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    profile: String,
    total_frames: usize,
    valid_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    frame: Option<u64>,
    error: String,
    field_omitted: bool,
}
