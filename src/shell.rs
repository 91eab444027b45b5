//! Scene shell - every target controller of a scene plus the event bus.
//!
//! The shell is the host-facing entry: the tracker emits found/lost on the
//! bus, the frame loop calls `update(dt)`, and the shell routes events to
//! the controller owning that target.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::{ConfigError, SceneConfig};
use crate::core::controller::TargetController;
use crate::core::event_bus::{EventBus, EventEmitter, TargetEventEmitter};
use crate::core::probe::FrameProbe;
use crate::diagnostics::DiagnosticsSink;
use crate::scene::SceneHost;

/// Controllers of one scene and the bus connecting them to the tracker
pub struct Shell {
    pub event_bus: EventBus,
    controllers: Vec<TargetController>,
}

impl Shell {
    /// One controller per target. `host` and `diagnostics` are cloned into each.
    pub fn from_scene<H, D>(scene: &SceneConfig, host: H, diagnostics: D) -> Result<Self, ConfigError>
    where
        H: SceneHost + Clone + 'static,
        D: DiagnosticsSink + Clone + 'static,
    {
        scene.validate()?;
        let event_bus = EventBus::new();
        let mut controllers = Vec::with_capacity(scene.targets.len());
        for target in &scene.targets {
            let controller =
                TargetController::new(target, Box::new(host.clone()), Box::new(diagnostics.clone()))?
                    .with_emitter(TargetEventEmitter::from_emitter(event_bus.emitter()));
            controllers.push(controller);
        }
        info!("Scene shell: {} target(s)", controllers.len());
        Ok(Self {
            event_bus,
            controllers,
        })
    }

    pub fn controllers(&self) -> &[TargetController] {
        &self.controllers
    }

    pub fn controller(&self, name: &str) -> Option<&TargetController> {
        self.controllers.iter().find(|c| c.name() == name)
    }

    pub fn controller_mut(&mut self, name: &str) -> Option<&mut TargetController> {
        self.controllers.iter_mut().find(|c| c.name() == name)
    }

    /// Handle for the tracker to emit `TargetFoundEvent`/`TargetLostEvent`
    pub fn tracker(&self) -> EventEmitter {
        self.event_bus.emitter()
    }

    /// Blocking discovery for every target
    pub fn discover_with(&mut self, probe: &dyn FrameProbe) {
        for controller in &mut self.controllers {
            controller.discover_with(probe);
        }
    }

    /// Background discovery, one probe thread per target
    pub fn spawn_discovery(&mut self, probe: Arc<dyn FrameProbe>) {
        for controller in &mut self.controllers {
            controller.spawn_discovery(Arc::clone(&probe));
        }
    }

    /// Route queued bus events to their controllers. Returns how many were handled.
    ///
    /// Drains the whole queue; observers of controller output should
    /// `subscribe` instead of polling.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        for event in self.event_bus.poll() {
            for controller in &mut self.controllers {
                if controller.dispatch(&event) {
                    handled += 1;
                }
            }
        }
        if handled > 0 {
            debug!("Scene shell: routed {} tracker event(s)", handled);
        }
        handled
    }

    /// One frame: route tracker events, then advance every controller
    pub fn update(&mut self, dt_ms: f64) {
        self.process_events();
        for controller in &mut self.controllers {
            controller.update(dt_ms);
        }
    }

    pub fn all_ready(&self) -> bool {
        self.controllers.iter().all(|c| c.is_all_ready())
    }
}

/// Initialize logging.
///
/// Verbosity: 0 = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ = trace.
/// Console logging respects `RUST_LOG`; file logging uses the level as given.
pub fn init_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(path) = log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
        info!("Logging to file: {} (level: {:?})", path.display(), level);
    } else {
        let default_level = level.as_str().to_ascii_lowercase();
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}
