use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chrono::{DateTime, Utc};
use fh_app::{AppError, AppResult, ReplayFrame, installation_service, replay};
use fh_core::Timestamp;

#[derive(Parser)]
#[command(name = "floorheat")]
#[command(about = "floorheat CLI - radiant floor heating controller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an installation file and print configuration warnings
    Validate {
        /// Path to the installation YAML or JSON file
        installation_path: PathBuf,
    },
    /// List rooms in an installation
    Rooms {
        /// Path to the installation YAML or JSON file
        installation_path: PathBuf,
    },
    /// Replay a scenario against an installation with a simulated clock
    Replay {
        /// Path to the installation YAML or JSON file
        installation_path: PathBuf,
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Start time (RFC 3339); defaults to now
        #[arg(long)]
        start: Option<String>,
        /// Print frames as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { installation_path } => cmd_validate(&installation_path),
        Commands::Rooms { installation_path } => cmd_rooms(&installation_path),
        Commands::Replay {
            installation_path,
            scenario_path,
            start,
            json,
            output,
        } => cmd_replay(
            &installation_path,
            &scenario_path,
            start.as_deref(),
            json,
            output.as_deref(),
        ),
    }
}

fn cmd_validate(installation_path: &Path) -> AppResult<()> {
    println!("Validating installation: {}", installation_path.display());
    let installation = installation_service::load_installation(installation_path)?;
    let warnings = installation_service::validate_installation(&installation)?;
    for warning in &warnings {
        println!("  warning: {warning}");
    }
    println!(
        "✓ Installation is valid ({} rooms, {} warnings)",
        installation.rooms.len(),
        warnings.len()
    );
    Ok(())
}

fn cmd_rooms(installation_path: &Path) -> AppResult<()> {
    let installation = installation_service::load_installation(installation_path)?;
    let rooms = installation_service::list_rooms(&installation);

    if rooms.is_empty() {
        println!("No rooms found in installation");
    } else {
        println!("Rooms in '{}':", installation.name);
        for room in rooms {
            println!(
                "  {} - {} (base: {}, switch: {}, every {}s, features: {})",
                room.id,
                room.name,
                room.base_source,
                room.heater_switch,
                room.update_interval_seconds,
                room.features.join(",")
            );
        }
    }
    Ok(())
}

fn cmd_replay(
    installation_path: &Path,
    scenario_path: &Path,
    start: Option<&str>,
    json: bool,
    output: Option<&Path>,
) -> AppResult<()> {
    let installation = installation_service::load_installation(installation_path)?;
    let scenario = replay::load_scenario(scenario_path)?;
    let start = parse_start(start)?;

    let frames = replay::replay(&installation, &scenario, start)?;
    debug!(
        scenario = scenario.name.as_deref().unwrap_or("unnamed"),
        frames = frames.len(),
        %start,
        "replay finished"
    );
    let rendered = if json {
        serde_json::to_string_pretty(&frames)
            .map_err(|e| AppError::Scenario(format!("Failed to serialize frames: {e}")))?
    } else {
        render_table(&frames)
    };

    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        println!("✓ Wrote {} frames to {}", frames.len(), path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}

fn parse_start(start: Option<&str>) -> AppResult<Timestamp> {
    match start {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AppError::InvalidInput(format!("--start '{raw}': {e}"))),
    }
}

fn render_table(frames: &[ReplayFrame]) -> String {
    let mut out = format!(
        "{:>6}  {:<16} {:>7} {:>7} {:>7} {:>7} {:<5} {:<7}\n",
        "minute", "room", "base", "target", "offset", "trend", "heat", "mode"
    );
    for frame in frames {
        for room in &frame.rooms {
            out.push_str(&format!(
                "{:>6}  {:<16} {:>7.2} {:>7.2} {:>7.3} {:>7.3} {:<5} {:<7}\n",
                frame.minute,
                room.room,
                room.base_setpoint,
                room.final_setpoint,
                room.offsets.total,
                room.trend_cph,
                if room.is_heating { "on" } else { "off" },
                room.mode
            ));
        }
        for issued in &frame.commands {
            out.push_str(&format!("{:>6}  -> {} {}\n", "", issued.entity, issued.command));
        }
        for error in &frame.errors {
            out.push_str(&format!("{:>6}  !! {}\n", "", error));
        }
    }
    out
}
