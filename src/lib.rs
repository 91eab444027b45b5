//! FLIPBOOK - image-sequence animations bound to AR target visibility
//!
//! Discovers numbered frame sequences, reports readiness, and plays/pauses
//! them as an external tracker finds and loses targets.

// Core engine (discovery, player, controller, events, probe workers)
pub mod core;

// Host seams and ambient modules
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod paths;
pub mod runner;
pub mod scene;
pub mod shell;

// Re-export commonly used types from core
pub use core::controller::TargetController;
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter, TargetEventEmitter};
pub use core::player::{PlayerState, Readiness, SequencePlayer};
pub use core::probe::{FrameProbe, FsProbe, ProbeOutcome};

pub use config::{AssetKind, FitMode, SceneConfig, SequenceConfig, TargetConfig};
pub use diagnostics::{DiagnosticsSink, LogSink, MemorySink};
pub use scene::{DisplaySurface, SceneHost};
pub use shell::Shell;
