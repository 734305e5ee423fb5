use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use pass_trigger::config::{observer_from_degrees, Config};
use pass_trigger::executor::ShellCapture;
use pass_trigger::predict::{
    passes_from, JulianDate, Observer, OrbitalElements, PassWindow, TleLoader,
};
use pass_trigger::scheduler::{Runner, Shutdown, SystemClock};

#[derive(Parser)]
#[command(name = "pass-trigger")]
#[command(about = "Record satellite passes as they happen")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a satellite and run the capture command during every pass
    Run {
        #[command(flatten)]
        target: TargetArgs,
        /// Capture command, `{output}` is replaced with the recording path
        #[arg(long)]
        capture_cmd: Option<String>,
        /// Directory for recordings and pass logs
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the upcoming passes
    Passes {
        #[command(flatten)]
        target: TargetArgs,
        /// Number of passes to list
        #[arg(long, default_value_t = 5)]
        count: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// TLE file containing the satellite
    tle_file: PathBuf,
    /// NORAD catalog number
    satellite_number: u64,
    /// Observer latitude, degrees north
    #[arg(allow_negative_numbers = true)]
    latitude: f64,
    /// Observer longitude, degrees east
    #[arg(allow_negative_numbers = true)]
    longitude: f64,
    /// Observer altitude in meters
    #[arg(long, default_value_t = 0.0)]
    altitude: f64,
    /// Elevation threshold in degrees (overrides the config file)
    #[arg(long, allow_negative_numbers = true)]
    min_elevation: Option<f64>,
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

struct Target {
    config: Config,
    observer: Observer,
    elements: OrbitalElements,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            target,
            capture_cmd,
            output_dir,
        } => run(&target, capture_cmd, output_dir),
        Commands::Passes {
            target,
            count,
            json,
        } => passes(&target, count, json),
    }
}

fn load_target(args: &TargetArgs) -> Option<Target> {
    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path.display(), e);
                return None;
            }
        },
        None => Config::default(),
    };
    if let Some(min_elevation) = args.min_elevation {
        config.schedule.min_elevation_deg = min_elevation;
    }

    let observer = match observer_from_degrees(args.latitude, args.longitude, args.altitude) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };

    let elements = match TleLoader::new(&args.tle_file).find(args.satellite_number) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };

    Some(Target {
        config,
        observer,
        elements,
    })
}

fn run(args: &TargetArgs, capture_cmd: Option<String>, output_dir: Option<PathBuf>) -> ExitCode {
    let Some(target) = load_target(args) else {
        return ExitCode::FAILURE;
    };

    let mut settings = match target.config.watch_settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = output_dir {
        settings.output_dir = dir;
    }

    let stop_grace = match target.config.stop_grace() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let command = capture_cmd.unwrap_or_else(|| target.config.capture.command.clone());
    let launcher = match ShellCapture::new(command, stop_grace) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let elements = &target.elements;
    log::info!(
        "{}: {} model, period {:.1} min, perigee {:.0} km, apogee {:.0} km, epoch {}",
        elements.display_name(),
        elements.model(),
        elements.period_minutes(),
        elements.perigee_altitude_km(),
        elements.apogee_altitude_km(),
        elements.epoch()
    );
    if let Some(decay) = elements.decay_date() {
        if elements.is_decayed(JulianDate::from(chrono::Utc::now())) {
            log::warn!("Elements predict decay at {}, no passes will be found", decay);
        }
    }

    // SIGINT, SIGTERM and SIGHUP all end the loop through the same path.
    let shutdown = Shutdown::new();
    let handler_shutdown = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Termination requested");
        handler_shutdown.trigger();
    }) {
        eprintln!("Error installing signal handler: {}", e);
        return ExitCode::FAILURE;
    }

    let mut runner = Runner::new(
        target.observer,
        target.elements,
        settings,
        SystemClock::new(shutdown.clone()),
        launcher,
    );
    runner.run(&shutdown);
    ExitCode::SUCCESS
}

#[derive(Serialize)]
struct PassSummary {
    norad_id: u64,
    aos: Option<chrono::DateTime<chrono::Utc>>,
    los: Option<chrono::DateTime<chrono::Utc>>,
    tca: Option<chrono::DateTime<chrono::Utc>>,
    duration_s: f64,
    max_elevation_deg: f64,
    aos_azimuth_deg: f64,
    los_azimuth_deg: f64,
}

impl From<&PassWindow> for PassSummary {
    fn from(pass: &PassWindow) -> Self {
        Self {
            norad_id: pass.norad_id,
            aos: pass.aos.to_datetime(),
            los: pass.los.to_datetime(),
            tca: pass.tca.to_datetime(),
            duration_s: pass.duration_seconds(),
            max_elevation_deg: pass.max_elevation.to_degrees(),
            aos_azimuth_deg: pass.aos_azimuth.to_degrees(),
            los_azimuth_deg: pass.los_azimuth.to_degrees(),
        }
    }
}

fn passes(args: &TargetArgs, count: usize, json: bool) -> ExitCode {
    let Some(target) = load_target(args) else {
        return ExitCode::FAILURE;
    };
    let threshold = target.config.schedule.min_elevation_deg.to_radians();

    let now = JulianDate::from(chrono::Utc::now());
    let found: Vec<PassWindow> = passes_from(&target.observer, &target.elements, now, threshold)
        .take(count)
        .collect();

    if json {
        let summaries: Vec<PassSummary> = found.iter().map(PassSummary::from).collect();
        match serde_json::to_string_pretty(&summaries) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if found.is_empty() {
        println!("No passes of {} found", target.elements.display_name());
        return ExitCode::SUCCESS;
    }

    println!(
        "Passes of {} ({} model)",
        target.elements.display_name(),
        target.elements.model()
    );
    println!(
        "  {:<23}  {:<23}  {:>8}  {:>7}  {:>6}  {:>6}",
        "AOS", "LOS", "Duration", "Max El", "AOS Az", "LOS Az"
    );
    for pass in &found {
        println!(
            "  {:<23}  {:<23}  {:>7.0}s  {:>6.1}°  {:>5.0}°  {:>5.0}°",
            pass.aos.to_string(),
            pass.los.to_string(),
            pass.duration_seconds(),
            pass.max_elevation.to_degrees(),
            pass.aos_azimuth.to_degrees(),
            pass.los_azimuth.to_degrees()
        );
    }
    ExitCode::SUCCESS
}
