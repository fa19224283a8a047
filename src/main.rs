use anyhow::{Context, Result};
use clap::Parser;
use formguard::calibration::{CalibrationData, CalibrationStore};
use formguard::recording::{read_first_frame, RecordingFrameSource};
use formguard::{
    EventBus, EventFilter, ExerciseKind, FormguardConfig, Session, SessionRunner, StopReason,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "formguard")]
#[command(about = "Exercise form analysis with anti-cheat trust validation")]
#[command(version)]
#[command(long_about = "Replays a recorded pose-landmark session, counts repetitions, \
scores form frame by frame and validates the integrity of the camera feed. \
Prints the session report as JSON when the recording ends.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "formguard.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Subject the session belongs to
    #[arg(short, long, default_value = "anonymous")]
    subject: String,

    /// Exercise being performed (push_up, squat, lunge, sit_up, jumping_jack, bicep_curl)
    #[arg(short, long, default_value = "push_up")]
    exercise: String,

    /// JSON Lines recording to replay
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Calibration store, overrides `session.calibration_path`
    #[arg(long, value_name = "FILE")]
    calibration: Option<PathBuf>,

    /// Capture a calibration from the first frame of the input and exit
    #[arg(long, help = "Record a calibration baseline from the first input frame and exit")]
    calibrate: bool,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write daily-rotated logs into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting formguard v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match FormguardConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }
    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let exercise: ExerciseKind = args.exercise.parse()?;
    let input = args
        .input
        .clone()
        .context("--input is required unless printing or validating configuration")?;
    let calibration_path = args
        .calibration
        .clone()
        .or_else(|| config.session.calibration_path.clone().map(PathBuf::from));

    if args.calibrate {
        let path = calibration_path.context("--calibrate needs a calibration file")?;
        return calibrate(&config, &args.subject, exercise, &input, &path).await;
    }

    let calibrations = match &calibration_path {
        Some(path) if path.exists() => CalibrationStore::load_from_file(path)?,
        Some(path) => {
            warn!("Calibration file {} not found, using defaults", path.display());
            CalibrationStore::new()
        }
        None => CalibrationStore::new(),
    };

    let session = Session::start(
        &config,
        args.subject.clone(),
        exercise,
        &calibrations,
        inspector(&config),
    );
    let event_bus = if args.debug {
        EventBus::with_debug_logging(config.session.event_bus_capacity)
    } else {
        EventBus::new(config.session.event_bus_capacity)
    };
    let filter = if args.debug {
        EventFilter::All
    } else {
        EventFilter::EventTypes(vec!["rep_completed", "trust_updated", "violation_recorded"])
    };
    let live_log = tokio::spawn(event_bus.subscribe_filtered("live", filter).log_until_closed());

    let runner = SessionRunner::new(
        session,
        event_bus,
        Duration::from_secs(config.session.max_duration_seconds),
    );

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received SIGINT signal (Ctrl+C)");
            token.cancel();
        }
    });

    let mut source = RecordingFrameSource::open(&input).await?;
    let (report, reason) = runner.run(&mut source).await;
    match reason {
        StopReason::SourceFailed => warn!("Recording could not be read to the end"),
        reason => info!("Session ended: {:?}", reason),
    }
    // The runner dropped its bus, so the live log drains and stops
    match live_log.await {
        Ok(logged) => debug!("Logged {} live events", logged),
        Err(e) => warn!("Live event log failed: {}", e),
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn calibrate(
    config: &FormguardConfig,
    subject: &str,
    exercise: ExerciseKind,
    input: &Path,
    store_path: &Path,
) -> Result<()> {
    let frame = read_first_frame(input).await?;
    let data = CalibrationData::capture(subject, exercise, &frame, config.analyzer.visibility_floor)?;

    let store = if store_path.exists() {
        CalibrationStore::load_from_file(store_path)?
    } else {
        CalibrationStore::new()
    };
    info!(
        "Captured {} baseline angles for {} ({})",
        data.baseline_angles.len(),
        subject,
        exercise
    );
    store.set(data);
    store.save_to_file(store_path)?;
    println!("✓ Calibration saved to {}", store_path.display());
    Ok(())
}

#[cfg(feature = "frame_analysis")]
fn inspector(config: &FormguardConfig) -> Arc<dyn formguard::FrameInspector> {
    Arc::new(formguard::PixelFrameInspector::new(
        config.trust.static_difference_threshold,
    ))
}

#[cfg(not(feature = "frame_analysis"))]
fn inspector(_config: &FormguardConfig) -> Arc<dyn formguard::FrameInspector> {
    struct NoInspection;

    impl formguard::FrameInspector for NoInspection {
        fn compute_fingerprint(&self, _frame: &formguard::RawFrame) -> Option<String> {
            None
        }

        fn estimate_motion(
            &self,
            _previous: &formguard::RawFrame,
            _current: &formguard::RawFrame,
        ) -> Option<f32> {
            None
        }

        fn is_frame_static(
            &self,
            _previous: &formguard::RawFrame,
            _current: &formguard::RawFrame,
        ) -> Option<bool> {
            None
        }
    }

    Arc::new(NoInspection)
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("formguard={}", log_level)));

    // Logs go to stderr so the JSON report on stdout stays clean
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "formguard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Formguard Configuration File");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", toml::to_string_pretty(&FormguardConfig::default())?);
    Ok(())
}
