//! Sequence player - discovery + looped playback of one frame sequence
//!
//! **States**:
//! ```text
//! Idle -> Discovering -> ReadyStopped <-> Playing
//!                     \-> ReadyEmpty (terminal)
//! ```
//!
//! # Timing Model
//!
//! Tick-driven: the host calls `tick(dt_ms)` from its frame loop. Elapsed
//! time since `start()` accumulates and the index is the number of whole
//! frame durations in it, wrapping forever. Nothing is subtracted per tick,
//! so coarse or irregular ticks land on the same frame as fine uniform ones,
//! even when `1000 / fps` has no exact binary form.
//!
//! # Deferred Start
//!
//! `start()` before discovery finishes is latched and honored the moment
//! frames are known. `stop()` before that clears the latch. Neither ever
//! fails, in any state.

use log::{debug, info, trace, warn};

use crate::config::{AssetKind, SequenceConfig};
use crate::scene::{DisplaySurface, Material, SurfaceSize};

use super::discovery::{DiscoveryResult, DiscoveryStep, FrameDiscoverer, FrameSet};
use super::probe::{FrameProbe, ProbeRequest, ProbeResponse};

/// Lifecycle of a player
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Discovering,
    ReadyStopped,
    Playing,
    /// Discovery found nothing; playback is impossible
    ReadyEmpty,
}

/// Readiness flag. Leaves `Pending` exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready(usize),
    Empty,
}

impl Readiness {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// Emitted once per player when discovery finishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadyEvent {
    pub ok: bool,
    pub count: usize,
}

/// Playback position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_frame: usize,
    pub elapsed_ms: f64,
    pub frame_duration_ms: f64,
}

impl PlaybackState {
    fn rewind(&mut self) {
        self.current_frame = 0;
        self.elapsed_ms = 0.0;
    }
}

/// What the caller should do after feeding the player
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerStep {
    /// Answer this probe and pass the response to `on_probe_result`
    Probe(ProbeRequest),
    /// Discovery finished
    Ready(ReadyEvent),
    /// Nothing to do
    Idle,
}

/// Plays one frame sequence on one display surface
pub struct SequencePlayer {
    kind: AssetKind,
    config: SequenceConfig,
    state: PlayerState,
    readiness: Readiness,
    discoverer: Option<FrameDiscoverer>,
    frames: FrameSet,
    aspect_ratio: Option<f64>,
    playback: PlaybackState,
    deferred_start: bool,
    surface: Option<Box<dyn DisplaySurface>>,
}

impl std::fmt::Debug for SequencePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencePlayer")
            .field("kind", &self.kind)
            .field("prefix", &self.config.prefix)
            .field("state", &self.state)
            .field("readiness", &self.readiness)
            .field("frames", &self.frames.len())
            .field("playback", &self.playback)
            .field("deferred_start", &self.deferred_start)
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}

impl SequencePlayer {
    pub fn new(kind: AssetKind, config: SequenceConfig) -> Self {
        let frame_duration_ms = config.frame_duration_ms();
        Self {
            kind,
            config,
            state: PlayerState::Idle,
            readiness: Readiness::Pending,
            discoverer: None,
            frames: FrameSet::default(),
            aspect_ratio: None,
            playback: PlaybackState {
                is_playing: false,
                current_frame: 0,
                elapsed_ms: 0.0,
                frame_duration_ms,
            },
            deferred_start: false,
            surface: None,
        }
    }

    /// Player that drives `surface` from the start
    pub fn with_surface(mut self, surface: Box<dyn DisplaySurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    // === Accessors ===

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn frames(&self) -> &FrameSet {
        &self.frames
    }

    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing
    }

    pub fn current_frame(&self) -> usize {
        self.playback.current_frame
    }

    /// URL of the frame currently shown, if any
    pub fn current_url(&self) -> Option<&str> {
        self.frames.get(self.playback.current_frame)
    }

    pub fn deferred_start(&self) -> bool {
        self.deferred_start
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Surface size for the discovered aspect, `None` before frames are known
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        let aspect = self.aspect_ratio?;
        let (width, height) = self.config.fit.size_for(self.config.unit_width, aspect);
        Some(SurfaceSize { width, height })
    }

    // === Discovery ===

    /// Host element finished loading: begin discovery (Idle -> Discovering)
    pub fn on_host_loaded(&mut self) -> PlayerStep {
        if self.state != PlayerState::Idle {
            warn!(
                "Player {} ({}): host loaded twice, ignoring",
                self.config.prefix, self.kind
            );
            return PlayerStep::Idle;
        }
        debug!("Player {} ({}): discovering frames", self.config.prefix, self.kind);
        self.state = PlayerState::Discovering;
        let mut discoverer = FrameDiscoverer::new(self.config.discovery());
        let step = discoverer.begin();
        self.discoverer = Some(discoverer);
        self.apply_discovery_step(step)
    }

    /// Feed the answer to the last `PlayerStep::Probe`
    pub fn on_probe_result(&mut self, response: ProbeResponse) -> PlayerStep {
        if response.request.kind != self.kind {
            warn!(
                "Player {} ({}): got probe answer for {}",
                self.config.prefix, self.kind, response.request.kind
            );
            return PlayerStep::Idle;
        }
        let Some(discoverer) = self.discoverer.as_mut() else {
            trace!("Player {}: probe answer outside discovery", self.config.prefix);
            return PlayerStep::Idle;
        };
        let step = discoverer.on_probe(response.request.index, response.outcome);
        self.apply_discovery_step(step)
    }

    /// Run discovery to completion inline. Returns the readiness event.
    pub fn discover_with(&mut self, probe: &dyn FrameProbe) -> Option<ReadyEvent> {
        let mut step = self.on_host_loaded();
        loop {
            match step {
                PlayerStep::Probe(request) => {
                    step = self.on_probe_result(request.resolve(probe));
                }
                PlayerStep::Ready(event) => return Some(event),
                PlayerStep::Idle => return None,
            }
        }
    }

    fn apply_discovery_step(&mut self, step: DiscoveryStep) -> PlayerStep {
        match step {
            DiscoveryStep::Probe { index, url } => PlayerStep::Probe(ProbeRequest {
                kind: self.kind,
                index,
                url,
            }),
            DiscoveryStep::Complete(result) => PlayerStep::Ready(self.finish_discovery(result)),
            DiscoveryStep::Stale => PlayerStep::Idle,
        }
    }

    fn finish_discovery(&mut self, result: DiscoveryResult) -> ReadyEvent {
        self.discoverer = None;
        self.frames = result.frames;
        self.aspect_ratio = result.aspect_ratio;

        if self.frames.is_empty() {
            info!("Player {} ({}): no frames found", self.config.prefix, self.kind);
            self.state = PlayerState::ReadyEmpty;
            self.readiness = Readiness::Empty;
            self.deferred_start = false;
            return ReadyEvent { ok: false, count: 0 };
        }

        let count = self.frames.len();
        info!("Player {} ({}): {} frames ready", self.config.prefix, self.kind, count);
        self.state = PlayerState::ReadyStopped;
        self.readiness = Readiness::Ready(count);
        self.layout_surface();

        if self.deferred_start {
            debug!("Player {}: honoring deferred start", self.config.prefix);
            self.start();
        }
        ReadyEvent { ok: true, count }
    }

    // === Surface ===

    /// Hand over the display surface. If frames are already known it is
    /// sized and shows the current frame right away.
    pub fn attach_surface(&mut self, surface: Box<dyn DisplaySurface>) {
        self.surface = Some(surface);
        if self.has_frames() {
            self.layout_surface();
        }
    }

    /// Size, material, first texture and preload. Showing frame 0 here
    /// means nothing blank flashes up when playback starts.
    fn layout_surface(&mut self) {
        let size = self.surface_size();
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Some(size) = size {
            surface.set_size(size);
        }
        surface.set_material(Material::default());
        if let Some(url) = self.frames.get(self.playback.current_frame) {
            surface.set_source(url);
        }
        surface.preload(self.frames.as_slice());
    }

    /// Make the surface visible. False when there is no surface or no frames.
    pub fn show(&mut self) -> bool {
        if !self.has_frames() {
            return false;
        }
        match self.surface.as_mut() {
            Some(surface) => {
                surface.set_visible(true);
                true
            }
            None => false,
        }
    }

    /// Hide the surface. False when there is no surface.
    pub fn hide(&mut self) -> bool {
        match self.surface.as_mut() {
            Some(surface) => {
                surface.set_visible(false);
                true
            }
            None => false,
        }
    }

    fn show_current_frame(&mut self) {
        let Some(url) = self.frames.get(self.playback.current_frame) else {
            return;
        };
        if let Some(surface) = self.surface.as_mut() {
            surface.set_source(url);
        }
    }

    // === Playback ===

    /// Start looping from frame 0. Latched if frames are not known yet.
    pub fn start(&mut self) {
        match self.state {
            PlayerState::Idle | PlayerState::Discovering => {
                if !self.deferred_start {
                    trace!("Player {}: start deferred until ready", self.config.prefix);
                }
                self.deferred_start = true;
            }
            PlayerState::ReadyEmpty | PlayerState::Playing => {}
            PlayerState::ReadyStopped => {
                self.deferred_start = false;
                self.state = PlayerState::Playing;
                self.playback.is_playing = true;
                self.playback.rewind();
                self.show_current_frame();
                debug!("Player {} ({}): playing", self.config.prefix, self.kind);
            }
        }
    }

    /// Stop and rewind to frame 0. Pending ticks become no-ops.
    pub fn stop(&mut self) {
        match self.state {
            PlayerState::Idle | PlayerState::Discovering => {
                if self.deferred_start {
                    trace!("Player {}: deferred start cancelled", self.config.prefix);
                }
                self.deferred_start = false;
            }
            PlayerState::ReadyEmpty | PlayerState::ReadyStopped => {}
            PlayerState::Playing => {
                self.state = PlayerState::ReadyStopped;
                self.playback.is_playing = false;
                self.playback.rewind();
                self.show_current_frame();
                debug!("Player {} ({}): stopped", self.config.prefix, self.kind);
            }
        }
    }

    /// Advance playback by `dt_ms`. Returns the new frame index if it changed.
    ///
    /// The index is derived from the total time since `start()`, so it does not
    /// depend on how that time was split into ticks.
    pub fn tick(&mut self, dt_ms: f64) -> Option<usize> {
        if self.state != PlayerState::Playing || self.frames.is_empty() {
            return None;
        }
        if !(dt_ms.is_finite() && dt_ms > 0.0) {
            return None;
        }
        let before = boundaries_crossed(self.playback.elapsed_ms, self.config.fps);
        self.playback.elapsed_ms += dt_ms;
        let after = boundaries_crossed(self.playback.elapsed_ms, self.config.fps);
        if after == before {
            return None;
        }

        let len = self.frames.len() as u64;
        let previous = self.playback.current_frame;
        self.playback.current_frame = (after % len) as usize;
        trace!(
            "Player {}: {} boundary(ies), frame {} -> {}",
            self.config.prefix,
            after - before,
            previous,
            self.playback.current_frame
        );

        if self.playback.current_frame == previous {
            return None;
        }
        self.show_current_frame();
        Some(self.playback.current_frame)
    }
}

/// Tolerance, in frames, for landing exactly on a boundary
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Whole frame durations contained in `elapsed_ms` at `fps`
fn boundaries_crossed(elapsed_ms: f64, fps: f64) -> u64 {
    // elapsed * fps first: both are usually integral, so the product is exact
    let frames = elapsed_ms * fps / 1000.0;
    (frames + BOUNDARY_EPSILON).floor().max(0.0) as u64
}
