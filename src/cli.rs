use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::interpolator::{InterpolationRequest, interpolation_steps};
use crate::motion::{
    ExpandedMotionParams, ForwardTransform, InferenceLog, ReverseTransform, SimpleMotionParams,
};
use crate::settings::AppSettings;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Format: motion settings v", crate::motion::codec::FORMAT_VERSION, "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Motion settings transformer for key-frame interpolation
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging to file (default: frameweave.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Expand simple motion params (JSON file) into backend settings
    Forward {
        #[arg(value_name = "SIMPLE_JSON")]
        input: PathBuf,
        /// Key frame count (default: number of frame strengths)
        #[arg(short = 'n', long = "frames", value_name = "N")]
        frames: Option<usize>,
    },
    /// Rebuild simple motion params from expanded backend settings (JSON file)
    Reverse {
        #[arg(value_name = "EXPANDED_JSON")]
        input: PathBuf,
        /// Fail on formatted strings that hold no entries
        #[arg(long)]
        strict: bool,
    },
    /// Rebuild simple motion params from an inference log record
    LoadLog {
        #[arg(value_name = "LOG_JSON")]
        input: PathBuf,
    },
    /// Print the inference request that would be dispatched
    Request {
        #[arg(value_name = "SIMPLE_JSON")]
        input: PathBuf,
        /// Key frame image uuid, in timeline order
        #[arg(short = 'i', long = "image", value_name = "UUID")]
        images: Vec<Uuid>,
    },
    /// Interpolation steps for a clip duration in seconds
    Steps {
        #[arg(value_name = "SECONDS")]
        seconds: f64,
    },
    /// Run the REST API
    Serve {
        /// Port (default: from settings)
        #[arg(short = 'p', long = "port", value_name = "PORT")]
        port: Option<u16>,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Run a one-shot command and return its printable output.
///
/// `Serve` is long running and handled by the binary.
pub fn run_command(command: &Command, settings: &AppSettings) -> Result<String> {
    match command {
        Command::Forward { input, frames } => {
            let params: SimpleMotionParams = read_json(input)?;
            let frames = frames.unwrap_or_else(|| params.frame_count());
            let expanded = ForwardTransform::new(params.buffer)
                .with_context_length(settings.context_length)
                .apply(&params, frames)?;
            Ok(serde_json::to_string_pretty(&expanded)?)
        }
        Command::Reverse { input, strict } => {
            let expanded: ExpandedMotionParams = read_json(input)?;
            let mut transform = ReverseTransform::new(expanded.buffer);
            if *strict {
                transform = transform.strict();
            }
            Ok(serde_json::to_string_pretty(&transform.apply(&expanded)?)?)
        }
        Command::LoadLog { input } => {
            let log: InferenceLog = read_json(input)?;
            match log.load_simple_params()? {
                Some(simple) => Ok(serde_json::to_string_pretty(&simple)?),
                None => Ok("No data available".to_string()),
            }
        }
        Command::Request { input, images } => {
            let params: SimpleMotionParams = read_json(input)?;
            let expanded = ForwardTransform::new(params.buffer)
                .with_context_length(settings.context_length)
                .apply(&params, params.frame_count())?;
            let request = InterpolationRequest::interpolation(
                &settings.backend,
                &expanded,
                images,
                settings.queue_inference,
            )?;
            Ok(serde_json::to_string_pretty(&request)?)
        }
        Command::Steps { seconds } => Ok(interpolation_steps(*seconds).to_string()),
        Command::Serve { .. } => anyhow::bail!("serve is not a one-shot command"),
    }
}
