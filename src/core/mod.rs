//! Core engine - discovery, playback, readiness/visibility coordination
//!
//! Independent of any scene framework: hosts plug in through
//! `scene::SceneHost` and `probe::FrameProbe`.

pub mod controller;
pub mod discovery;
pub mod event_bus;
pub mod player;
pub mod probe;
pub mod sequence_events;
pub mod workers;

// Re-exports for convenience
pub use controller::TargetController;
pub use discovery::{DiscoveryResult, FrameDiscoverer, FrameSet};
pub use event_bus::{EventBus, EventEmitter, TargetEventEmitter};
pub use player::{PlayerState, Readiness, ReadyEvent, SequencePlayer};
pub use probe::{FrameProbe, FsProbe, MapProbe, ProbeOutcome, ProbeRequest, ProbeResponse};
pub use workers::{ProbeWorker, WorkerGone};
