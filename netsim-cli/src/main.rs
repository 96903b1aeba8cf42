//! Command-line front end: load the config and a script, run it, save logs.

mod config_file;
mod logger;
mod parser;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, LevelFilter};

use netsim::Simulation;

#[derive(Parser)]
#[command(name = "netsim", about = "Discrete-time network simulator", version)]
struct Args {
    /// Scenario script to execute
    #[arg(default_value = "script.txt")]
    script: PathBuf,

    /// Directory the per-device logs are written to
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Configuration file, created with defaults if absent
    #[arg(short, long, default_value = "config.txt")]
    config: PathBuf,

    /// Show per-frame diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.quiet {
        LevelFilter::Error
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logger::init(level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(target: "netsim", "{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let cfg = config_file::load_or_create(&args.config)
        .map_err(|e| format!("{}: {e}", args.config.display()))?;

    let text = fs::read_to_string(&args.script)
        .map_err(|e| format!("{}: {e}", args.script.display()))?;
    let instructions =
        parser::parse_script(&text).map_err(|e| format!("{}: {e}", args.script.display()))?;

    let mut sim = Simulation::new(cfg);
    sim.run(instructions).map_err(|e| e.to_string())?;
    sim.save_logs(&args.output)
        .map_err(|e| format!("writing logs to {}: {e}", args.output.display()))?;
    Ok(())
}
