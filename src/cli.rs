use clap::Parser;
use std::path::PathBuf;

use crate::config::FitMode;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Dry-run flipbook targets headlessly: discover frames on disk, simulate
/// tracker found/lost events and log every frame change.
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Scene JSON file (default: FLIPBOOK_CONFIG, then ./flipbook.json)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ad-hoc PNG prefix instead of a scene file (e.g. anim/frame_)
    #[arg(short = 'p', long = "prefix", value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Directory frame URLs resolve against (default: scene file directory)
    #[arg(short = 'r', long = "root", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Override playback rate for every target
    #[arg(long = "fps", value_name = "FPS")]
    pub fps: Option<f64>,

    /// Override probe upper bound for every target
    #[arg(long = "max-index", value_name = "N")]
    pub max_index: Option<u32>,

    /// Override fit mode for every target (width, height, stretch)
    #[arg(long = "fit", value_name = "MODE")]
    pub fit: Option<String>,

    /// Only simulate this target (default: all)
    #[arg(short = 't', long = "target", value_name = "NAME")]
    pub target: Option<String>,

    /// Simulated time of the found event (ms)
    #[arg(long = "found-at", value_name = "MS", default_value_t = 0.0)]
    pub found_at: f64,

    /// Simulated time of the lost event (ms)
    #[arg(long = "lost-at", value_name = "MS")]
    pub lost_at: Option<f64>,

    /// Total simulated time (ms)
    #[arg(short = 'd', long = "duration", value_name = "MS", default_value_t = 2000.0)]
    pub duration: f64,

    /// Frame loop interval (ms)
    #[arg(long = "tick", value_name = "MS", default_value_t = 16.0)]
    pub tick: f64,

    /// Enable logging to file (default: platform data dir/flipbook.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    pub fn fit_mode(&self) -> Option<FitMode> {
        self.fit.as_deref().map(FitMode::from)
    }
}
