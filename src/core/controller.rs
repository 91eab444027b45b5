//! Target controller - binds sequence players to one tracked target.
//!
//! The controller owns a player per configured asset kind and reconciles
//! two independent streams:
//!
//! - readiness: each player reports once when its discovery finishes; the
//!   target is "all ready" only when every player has reported (empty
//!   ones included)
//! - visibility: the tracker says found/lost at any time
//!
//! A found that arrives before all-ready is latched (`start_on_ready`) and
//! replayed when readiness resolves. A lost always clears that latch.
//!
//! # Driving it
//!
//! ```ignore
//! let mut target = TargetController::new(&config, Box::new(host), Box::new(LogSink))?;
//! target.spawn_discovery(Arc::new(FsProbe::new(root)));  // or discover_with(&probe)
//! loop {
//!     target.update(dt_ms);          // drains probe answers, advances frames
//! }
//! // tracker callbacks:
//! target.on_target_found();
//! target.on_target_lost();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use log::Level;

use crate::config::{AssetKind, ConfigError, TargetConfig};
use crate::diagnostics::DiagnosticsSink;
use crate::scene::SceneHost;

use super::event_bus::{BoxedEvent, TargetEventEmitter, downcast_event};
use super::player::{PlayerStep, ReadyEvent, SequencePlayer};
use super::probe::{FrameProbe, ProbeOutcome, ProbeRequest, ProbeResponse};
use super::sequence_events::{
    AssetsReadyEvent, PlaybackStartedEvent, PlaybackStoppedEvent, SequenceReadyEvent,
    TargetFoundEvent, TargetLostEvent,
};
use super::workers::{ProbeWorker, WorkerGone};

pub struct TargetController {
    name: String,
    players: IndexMap<AssetKind, SequencePlayer>,
    host: Box<dyn SceneHost>,
    diagnostics: Box<dyn DiagnosticsSink>,
    emitter: TargetEventEmitter,
    worker: Option<ProbeWorker>,
    /// Requests submitted to the worker and not answered yet, one per player
    in_flight: IndexMap<AssetKind, ProbeRequest>,
    host_loaded: bool,
    all_ready: bool,
    /// Last tracker state: found and not lost since
    visible: bool,
    /// Found arrived before all-ready
    start_on_ready: bool,
    ready_timeout_ms: Option<f64>,
    waited_ms: f64,
}

impl std::fmt::Debug for TargetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetController")
            .field("name", &self.name)
            .field("players", &self.players)
            .field("host_loaded", &self.host_loaded)
            .field("all_ready", &self.all_ready)
            .field("visible", &self.visible)
            .field("start_on_ready", &self.start_on_ready)
            .finish_non_exhaustive()
    }
}

impl TargetController {
    /// Build players for every kind with a prefix. Kinds without one are skipped.
    pub fn new(
        config: &TargetConfig,
        host: Box<dyn SceneHost>,
        diagnostics: Box<dyn DiagnosticsSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let players: IndexMap<AssetKind, SequencePlayer> = config
            .sequences()
            .into_iter()
            .map(|(kind, sequence)| (kind, SequencePlayer::new(kind, sequence)))
            .collect();

        diagnostics.report(
            Level::Debug,
            &config.name,
            &format!("created with {} sequence(s)", players.len()),
        );

        Ok(Self {
            name: config.name.clone(),
            players,
            host,
            diagnostics,
            emitter: TargetEventEmitter::dummy(),
            worker: None,
            in_flight: IndexMap::new(),
            host_loaded: false,
            all_ready: false,
            visible: false,
            start_on_ready: false,
            ready_timeout_ms: config.ready_timeout_ms,
            waited_ms: 0.0,
        })
    }

    /// Broadcast readiness and playback events through `emitter`
    pub fn with_emitter(mut self, emitter: TargetEventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    // === Accessors ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn players(&self) -> impl Iterator<Item = &SequencePlayer> {
        self.players.values()
    }

    pub fn player(&self, kind: AssetKind) -> Option<&SequencePlayer> {
        self.players.get(&kind)
    }

    pub fn is_all_ready(&self) -> bool {
        self.all_ready
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Found arrived before readiness and is still waiting
    pub fn start_on_ready(&self) -> bool {
        self.start_on_ready
    }

    /// Every player has finished discovery
    pub fn is_discovery_complete(&self) -> bool {
        self.players.values().all(|p| p.readiness().is_resolved())
    }

    // === Discovery ===

    /// Host element loaded: start discovery on every player.
    /// Returns the first probe of each player.
    pub fn on_host_loaded(&mut self) -> Vec<ProbeRequest> {
        if self.host_loaded {
            self.report(Level::Warn, "host loaded twice, ignoring");
            return Vec::new();
        }
        self.host_loaded = true;

        let kinds: Vec<AssetKind> = self.players.keys().copied().collect();
        let mut requests = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let step = match self.players.get_mut(&kind) {
                Some(player) => player.on_host_loaded(),
                None => continue,
            };
            if let Some(request) = self.handle_step(kind, step) {
                requests.push(request);
            }
        }
        self.check_all_ready(false);
        requests
    }

    /// Feed a probe answer to its player. Returns that player's next probe.
    pub fn on_probe_result(&mut self, response: ProbeResponse) -> Option<ProbeRequest> {
        let kind = response.request.kind;
        let step = match self.players.get_mut(&kind) {
            Some(player) => player.on_probe_result(response),
            None => {
                self.report(Level::Warn, &format!("probe answer for unknown kind {}", kind));
                return None;
            }
        };
        self.handle_step(kind, step)
    }

    /// Run all discovery inline against a blocking probe
    pub fn discover_with(&mut self, probe: &dyn FrameProbe) {
        let mut pending: VecDeque<ProbeRequest> = self.on_host_loaded().into();
        while let Some(request) = pending.pop_front() {
            if let Some(next) = self.on_probe_result(request.resolve(probe)) {
                pending.push_back(next);
            }
        }
    }

    /// Start discovery on a background probe thread; `update()` collects answers
    pub fn spawn_discovery(&mut self, probe: Arc<dyn FrameProbe>) {
        let worker = ProbeWorker::spawn(probe, &self.name);
        let mut alive = true;
        for request in self.on_host_loaded() {
            alive &= self.submit(&worker, request);
        }
        if alive {
            self.worker = Some(worker);
        } else {
            self.abandon_worker(worker);
        }
    }

    fn handle_step(&mut self, kind: AssetKind, step: PlayerStep) -> Option<ProbeRequest> {
        match step {
            PlayerStep::Probe(request) => Some(request),
            PlayerStep::Ready(event) => {
                self.on_player_ready(kind, event);
                None
            }
            PlayerStep::Idle => None,
        }
    }

    fn on_player_ready(&mut self, kind: AssetKind, event: ReadyEvent) {
        self.emitter.emit(SequenceReadyEvent {
            target: self.name.clone(),
            kind,
            ok: event.ok,
            count: event.count,
        });

        if !event.ok {
            self.report(Level::Info, &format!("{} sequence is empty, nothing to show", kind));
        } else {
            self.report(Level::Info, &format!("{} sequence ready ({} frames)", kind, event.count));
            match self.host.create_surface(&self.name, kind) {
                Some(surface) => {
                    let visible = self.visible;
                    if let Some(player) = self.players.get_mut(&kind) {
                        player.attach_surface(surface);
                        player.hide();
                        // Started through its own latch (readiness timed out earlier)
                        if visible && player.is_playing() {
                            player.show();
                            self.emit_started();
                        }
                    }
                }
                None => self.report(
                    Level::Warn,
                    &format!("scene has no display surface for {}, skipping it", kind),
                ),
            }
        }

        self.check_all_ready(false);
    }

    fn check_all_ready(&mut self, timed_out: bool) {
        if self.all_ready || !self.host_loaded {
            return;
        }
        if !timed_out && !self.is_discovery_complete() {
            return;
        }
        self.all_ready = true;
        self.report(
            if timed_out { Level::Warn } else { Level::Info },
            if timed_out {
                "readiness wait timed out, continuing without slow sequences"
            } else {
                "assets ready"
            },
        );
        self.emitter.emit(AssetsReadyEvent {
            target: self.name.clone(),
            timed_out,
        });

        if self.start_on_ready {
            self.start_on_ready = false;
            self.start_all();
        }
    }

    // === Visibility ===

    pub fn on_target_found(&mut self) {
        self.visible = true;
        if self.all_ready {
            self.start_all();
        } else {
            if !self.start_on_ready {
                self.report(Level::Debug, "found before ready, start deferred");
            }
            self.start_on_ready = true;
        }
    }

    /// Always cancels a deferred start
    pub fn on_target_lost(&mut self) {
        self.visible = false;
        self.start_on_ready = false;
        self.stop_all();
    }

    /// Route a bus event. True if it was a tracker event for this target.
    pub fn dispatch(&mut self, event: &BoxedEvent) -> bool {
        if let Some(found) = downcast_event::<TargetFoundEvent>(event) {
            if found.target == self.name {
                self.on_target_found();
                return true;
            }
        } else if let Some(lost) = downcast_event::<TargetLostEvent>(event) {
            if lost.target == self.name {
                self.on_target_lost();
                return true;
            }
        }
        false
    }

    fn start_all(&mut self) {
        let mut missing = Vec::new();
        let mut started = false;
        for (kind, player) in self.players.iter_mut() {
            let was_playing = player.is_playing();
            player.start();
            started |= !was_playing && player.is_playing();
            if player.has_frames() && !player.show() {
                missing.push(*kind);
            }
        }
        for kind in missing {
            self.report(Level::Warn, &format!("no display surface to show for {}", kind));
        }
        if started {
            self.emit_started();
        }
    }

    fn stop_all(&mut self) {
        let mut stopped = false;
        for player in self.players.values_mut() {
            stopped |= player.is_playing();
            player.stop();
            player.hide();
        }
        if stopped {
            self.emitter.emit(PlaybackStoppedEvent {
                target: self.name.clone(),
            });
        }
    }

    fn emit_started(&self) {
        self.emitter.emit(PlaybackStartedEvent {
            target: self.name.clone(),
        });
    }

    // === Frame loop ===

    /// Advance playback of every player by `dt_ms`; also runs the readiness timeout
    pub fn tick(&mut self, dt_ms: f64) {
        if let Some(timeout) = self.ready_timeout_ms {
            if self.host_loaded && !self.all_ready {
                if dt_ms.is_finite() && dt_ms > 0.0 {
                    self.waited_ms += dt_ms;
                }
                if self.waited_ms >= timeout {
                    self.check_all_ready(true);
                }
            }
        }
        for player in self.players.values_mut() {
            player.tick(dt_ms);
        }
    }

    /// Drain background probe answers, then `tick`
    pub fn update(&mut self, dt_ms: f64) {
        self.pump_worker();
        self.tick(dt_ms);
    }

    fn pump_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        loop {
            match worker.try_recv() {
                Ok(Some(response)) => {
                    self.in_flight.shift_remove(&response.request.kind);
                    if let Some(next) = self.on_probe_result(response) {
                        if !self.submit(&worker, next) {
                            self.abandon_worker(worker);
                            return;
                        }
                    }
                }
                Ok(None) => break,
                Err(WorkerGone) => {
                    self.abandon_worker(worker);
                    return;
                }
            }
        }
        // Discovery cannot restart, so the thread is done once every player reported
        if !self.is_discovery_complete() {
            self.worker = Some(worker);
        }
    }

    /// Hand a request to the worker. False if the worker is gone.
    fn submit(&mut self, worker: &ProbeWorker, request: ProbeRequest) -> bool {
        self.in_flight.insert(request.kind, request.clone());
        worker.submit(request)
    }

    /// The probe thread died: every unanswered frame counts as missing, so
    /// each sequence ends where it got to and readiness still resolves.
    fn abandon_worker(&mut self, worker: ProbeWorker) {
        drop(worker);
        self.report(
            Level::Warn,
            "probe worker stopped unexpectedly, remaining frames treated as missing",
        );
        let mut pending: VecDeque<ProbeRequest> =
            self.in_flight.drain(..).map(|(_, request)| request).collect();
        while let Some(request) = pending.pop_front() {
            let response = ProbeResponse {
                request,
                outcome: ProbeOutcome::Missing,
            };
            if let Some(next) = self.on_probe_result(response) {
                pending.push_back(next);
            }
        }
    }

    fn report(&self, level: Level, message: &str) {
        self.diagnostics.report(level, &self.name, message);
    }
}
