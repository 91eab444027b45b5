//! Sequence and target configuration
//!
//! Every knob a host can set on a flipbook lives here:
//! - `SequenceConfig`: one player (prefix, fps, padding, probe range, sizing)
//! - `TargetConfig`: one tracked target with a prefix per asset kind
//! - `SceneConfig`: all targets of a scene, loaded from JSON
//!
//! All structs deserialize with defaults, so a JSON file only needs the
//! fields it wants to override.

use std::fmt;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

/// Default playback rate (frames per second)
pub const DEFAULT_FPS: f64 = 12.0;
/// Default number of digits in a frame number (`frame_007.png`)
pub const DEFAULT_ZERO_PAD: usize = 3;
/// Default upper bound (exclusive) for frame probing
pub const DEFAULT_MAX_INDEX: u32 = 300;
/// Default size of the fixed axis of the display surface (scene units)
pub const DEFAULT_UNIT_WIDTH: f64 = 1.0;

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidFps(f64),
    InvalidRange { start: u32, max: u32 },
    InvalidUnitWidth(f64),
    InvalidTimeout(f64),
    DuplicateTarget(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Config parse error: {}", e),
            ConfigError::InvalidFps(fps) => write!(f, "fps must be positive, got {}", fps),
            ConfigError::InvalidRange { start, max } => {
                write!(f, "max_index ({}) must be greater than start_index ({})", max, start)
            }
            ConfigError::InvalidUnitWidth(w) => write!(f, "unit_width must be positive, got {}", w),
            ConfigError::InvalidTimeout(ms) => {
                write!(f, "ready_timeout_ms must be positive, got {}", ms)
            }
            ConfigError::DuplicateTarget(name) => write!(f, "Duplicate target name: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Image format of a frame sequence. One player per kind and target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Png,
    Jpeg,
    Webp,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Png, AssetKind::Jpeg, AssetKind::Webp];

    /// File extension probed for this kind (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Png => "png",
            AssetKind::Jpeg => "jpg",
            AssetKind::Webp => "webp",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How the display surface derives its size from the first frame.
///
/// - `Width`: width = unit, height = unit * aspect
/// - `Height`: height = unit, width = unit / aspect
/// - `Stretch`: unit x unit square, image is stretched to fill it
///
/// Unrecognized strings parse as `Width` (with a warning).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FitMode {
    #[default]
    Width,
    Height,
    Stretch,
}

impl FitMode {
    /// Strict parse, `None` for unknown names
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "width" => Some(FitMode::Width),
            "height" => Some(FitMode::Height),
            "stretch" => Some(FitMode::Stretch),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Width => "width",
            FitMode::Height => "height",
            FitMode::Stretch => "stretch",
        }
    }

    /// Surface size for a fixed-axis `unit` and an image `aspect` (height / width).
    pub fn size_for(self, unit: f64, aspect: f64) -> (f64, f64) {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        match self {
            FitMode::Width => (unit, unit * aspect),
            FitMode::Height => (unit / aspect, unit),
            FitMode::Stretch => (unit, unit),
        }
    }
}

impl From<&str> for FitMode {
    fn from(name: &str) -> Self {
        FitMode::parse(name).unwrap_or_else(|| {
            warn!("Unknown fit mode '{}', using 'width'", name);
            FitMode::Width
        })
    }
}

impl From<String> for FitMode {
    fn from(name: String) -> Self {
        FitMode::from(name.as_str())
    }
}

impl From<FitMode> for String {
    fn from(fit: FitMode) -> Self {
        fit.as_str().to_string()
    }
}

/// Probe parameters: which URLs to try and in which range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub prefix: String,
    pub extension: String,
    pub start_index: u32,
    pub max_index: u32,
    pub zero_pad: usize,
}

impl DiscoveryConfig {
    /// Candidate URL for a frame index: `{prefix}{index:0pad}.{ext}`.
    ///
    /// Indices wider than `zero_pad` are written in full, never truncated.
    pub fn frame_url(&self, index: u32) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.zero_pad
        )
    }

    /// Digits needed to print the largest probed index
    pub fn required_pad(&self) -> usize {
        digit_count(self.max_index.saturating_sub(1))
    }

    /// False when some probed indices are wider than `zero_pad`
    pub fn pad_is_sufficient(&self) -> bool {
        self.zero_pad >= self.required_pad()
    }
}

fn digit_count(mut n: u32) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Settings of a single sequence player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Path/URL up to the frame number, e.g. `./animations/target1/frame_`
    pub prefix: String,
    /// Frame file extension without the dot
    pub extension: String,
    pub fps: f64,
    pub zero_pad: usize,
    pub start_index: u32,
    /// Exclusive upper bound of the probe range
    pub max_index: u32,
    pub unit_width: f64,
    pub fit: FitMode,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            extension: AssetKind::Png.extension().to_string(),
            fps: DEFAULT_FPS,
            zero_pad: DEFAULT_ZERO_PAD,
            start_index: 0,
            max_index: DEFAULT_MAX_INDEX,
            unit_width: DEFAULT_UNIT_WIDTH,
            fit: FitMode::Width,
        }
    }
}

impl SequenceConfig {
    /// Config with a prefix and everything else at defaults
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            prefix: self.prefix.clone(),
            extension: self.extension.clone(),
            start_index: self.start_index,
            max_index: self.max_index,
            zero_pad: self.zero_pad,
        }
    }

    /// Time each frame stays on screen
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps
    }

    /// Check invariants. A too-small `zero_pad` is only reported, not rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        if self.max_index <= self.start_index {
            return Err(ConfigError::InvalidRange {
                start: self.start_index,
                max: self.max_index,
            });
        }
        if !(self.unit_width.is_finite() && self.unit_width > 0.0) {
            return Err(ConfigError::InvalidUnitWidth(self.unit_width));
        }
        let discovery = self.discovery();
        if !discovery.pad_is_sufficient() {
            warn!(
                "zero_pad {} is narrower than max_index {} needs ({} digits): indices past {} will not match padded names",
                self.zero_pad,
                self.max_index,
                discovery.required_pad(),
                10u64.pow(self.zero_pad as u32).saturating_sub(1)
            );
        }
        Ok(())
    }
}

/// One tracked target and the sequences bound to it.
///
/// A player is created for every kind whose prefix is non-empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Target identifier, matched against tracker events
    pub name: String,
    pub png_prefix: String,
    pub jpg_prefix: String,
    pub webp_prefix: String,
    pub fps: f64,
    pub unit_width: f64,
    pub fit: FitMode,
    pub zero_pad: usize,
    pub start_index: u32,
    pub max_index: u32,
    /// Give up waiting for slow players after this long (ms). `None` waits forever.
    pub ready_timeout_ms: Option<f64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: "target".to_string(),
            png_prefix: String::new(),
            jpg_prefix: String::new(),
            webp_prefix: String::new(),
            fps: DEFAULT_FPS,
            unit_width: DEFAULT_UNIT_WIDTH,
            fit: FitMode::Width,
            zero_pad: DEFAULT_ZERO_PAD,
            start_index: 0,
            max_index: DEFAULT_MAX_INDEX,
            ready_timeout_ms: None,
        }
    }
}

impl TargetConfig {
    /// Target with a single PNG sequence
    pub fn png(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            png_prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn prefix(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Png => &self.png_prefix,
            AssetKind::Jpeg => &self.jpg_prefix,
            AssetKind::Webp => &self.webp_prefix,
        }
    }

    /// Player configs for every kind with a prefix, in `AssetKind::ALL` order
    pub fn sequences(&self) -> Vec<(AssetKind, SequenceConfig)> {
        AssetKind::ALL
            .iter()
            .copied()
            .filter(|kind| !self.prefix(*kind).trim().is_empty())
            .map(|kind| {
                let config = SequenceConfig {
                    prefix: self.prefix(kind).trim().to_string(),
                    extension: kind.extension().to_string(),
                    fps: self.fps,
                    zero_pad: self.zero_pad,
                    start_index: self.start_index,
                    max_index: self.max_index,
                    unit_width: self.unit_width,
                    fit: self.fit,
                };
                (kind, config)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ms) = self.ready_timeout_ms {
            if !(ms.is_finite() && ms > 0.0) {
                return Err(ConfigError::InvalidTimeout(ms));
            }
        }
        for (_, sequence) in self.sequences() {
            sequence.validate()?;
        }
        Ok(())
    }
}

/// All targets of a scene
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub targets: Vec<TargetConfig>,
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let scene: SceneConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        scene.validate()?;
        Ok(scene)
    }

    /// Load and validate a JSON scene file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
            target.validate()?;
        }
        Ok(())
    }
}
