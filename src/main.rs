use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::sync::Arc;

use frameweave::cli::{Args, Command, run_command};
use frameweave::paths;
use frameweave::server::{ApiServer, SharedApiState};
use frameweave::settings::{AppSettings, SETTINGS_FILE};

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = paths::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {:#}", e);
    }

    init_logger(&args, &path_config)?;
    debug!("Command-line args: {:?}", args);

    let settings_path = paths::config_file(SETTINGS_FILE, &path_config);
    info!("Config path: {}", settings_path.display());
    let settings = AppSettings::load(&settings_path)?;

    match &args.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(settings.server_port);
            let state = Arc::new(SharedApiState::new(settings));
            ApiServer::new(port, state).run();
            Ok(())
        }
        command => {
            let output = run_command(command, &settings)?;
            println!("{}", output);
            Ok(())
        }
    }
}

/// 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
fn init_logger(args: &Args, path_config: &paths::PathConfig) -> Result<()> {
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| paths::data_file("frameweave.log", path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = log_level.to_string().to_lowercase();
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}
