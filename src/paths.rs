use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Scene file name looked up in the working and platform config directories
pub const SCENE_FILE: &str = "flipbook.json";
/// Default log file name
pub const LOG_FILE: &str = "flipbook.log";

/// Overrides for default file locations
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Scene file from CLI or ENV
    pub scene_file: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI arg → ENV var (FLIPBOOK_CONFIG) → None (use defaults)
    pub fn from_env_and_cli(cli_file: Option<PathBuf>) -> Self {
        let scene_file = cli_file.or_else(|| {
            std::env::var("FLIPBOOK_CONFIG")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        });

        Self { scene_file }
    }
}

/// Locate the scene file
///
/// Priority:
/// 1. CLI --config argument
/// 2. FLIPBOOK_CONFIG environment variable
/// 3. `flipbook.json` in the working directory, if it exists
/// 4. Platform config directory from dirs-next, if the file exists there
///
/// Platform paths:
/// - Linux: ~/.config/flipbook/flipbook.json
/// - macOS: ~/Library/Application Support/flipbook/flipbook.json
/// - Windows: %APPDATA%\flipbook\flipbook.json
pub fn scene_file(config: &PathConfig) -> Option<PathBuf> {
    if let Some(path) = &config.scene_file {
        return Some(path.clone());
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let local = current_dir.join(SCENE_FILE);
        if local.exists() {
            return Some(local);
        }
    }

    dirs_next::config_dir()
        .map(|dir| dir.join("flipbook").join(SCENE_FILE))
        .filter(|path| path.exists())
}

/// Default log location (platform data directory, "." as fallback)
pub fn default_log_file() -> PathBuf {
    dirs_next::data_dir()
        .map(|dir| dir.join("flipbook"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOG_FILE)
}

/// Create the parent directory of `path` if needed
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Directory frame URLs resolve against: explicit root, else the scene
/// file's directory, else the working directory
pub fn frame_root(explicit: Option<&Path>, scene_file: Option<&Path>) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }
    scene_file
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
