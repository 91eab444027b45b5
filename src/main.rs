use clap::Parser;
use log::info;

use flipbook::cli::Args;
use flipbook::paths;
use flipbook::runner::run_app;
use flipbook::shell::init_logging;

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    let log_path = match &args.log_file {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(paths::default_log_file()),
        None => None,
    };
    if let Some(path) = &log_path {
        paths::ensure_parent(path)?;
    }
    init_logging(args.verbosity, log_path.as_deref())?;

    info!("Flipbook {} starting...", env!("CARGO_PKG_VERSION"));
    run_app(args)
}
