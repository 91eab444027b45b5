//! Tracker, readiness and playback events.

use crate::config::AssetKind;

// === Tracker (input) ===

/// Tracked marker entered recognition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetFoundEvent {
    pub target: String,
}

/// Tracked marker left recognition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetLostEvent {
    pub target: String,
}

// === Controller (output) ===

/// One player finished discovery. Emitted exactly once per player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceReadyEvent {
    pub target: String,
    pub kind: AssetKind,
    pub ok: bool,
    pub count: usize,
}

/// Every player of a target has reported (or the wait timed out)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetsReadyEvent {
    pub target: String,
    pub timed_out: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackStartedEvent {
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackStoppedEvent {
    pub target: String,
}
