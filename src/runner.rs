//! Headless runner - entry point of the `flipbook` binary.
//!
//! Loads a scene, discovers frames on disk on background probe threads,
//! then plays a scripted tracker timeline (found at X, lost at Y) against a
//! fixed-interval frame loop and logs every frame change.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{info, trace, warn};

use crate::cli::Args;
use crate::config::{AssetKind, SceneConfig, TargetConfig};
use crate::core::probe::FsProbe;
use crate::core::sequence_events::{SequenceReadyEvent, TargetFoundEvent, TargetLostEvent};
use crate::diagnostics::LogSink;
use crate::paths::{self, PathConfig};
use crate::scene::HeadlessHost;
use crate::shell::Shell;

/// Build the scene from CLI flags and/or the scene file
pub fn load_scene(args: &Args) -> Result<(SceneConfig, Option<std::path::PathBuf>)> {
    let (mut scene, scene_file) = if let Some(prefix) = &args.prefix {
        let scene = SceneConfig {
            targets: vec![TargetConfig::png("cli", prefix.clone())],
        };
        (scene, None)
    } else {
        let path_config = PathConfig::from_env_and_cli(args.config.clone());
        let Some(path) = paths::scene_file(&path_config) else {
            bail!("No scene file found; pass --config FILE or --prefix PREFIX");
        };
        let scene = SceneConfig::load(&path)
            .with_context(|| format!("Failed to load scene: {}", path.display()))?;
        (scene, Some(path))
    };

    for target in &mut scene.targets {
        if let Some(fps) = args.fps {
            target.fps = fps;
        }
        if let Some(max_index) = args.max_index {
            target.max_index = max_index;
        }
        if let Some(fit) = args.fit_mode() {
            target.fit = fit;
        }
    }
    if let Some(name) = &args.target {
        scene.targets.retain(|t| &t.name == name);
        if scene.targets.is_empty() {
            bail!("Target '{}' not in scene", name);
        }
    }
    scene.validate().context("Invalid scene")?;

    Ok((scene, scene_file))
}

/// Run the headless simulation
pub fn run_app(args: Args) -> Result<()> {
    trace!("Command-line args: {:?}", args);
    if !(args.tick.is_finite() && args.tick > 0.0) {
        bail!("--tick must be positive");
    }

    let (scene, scene_file) = load_scene(&args)?;
    let root = paths::frame_root(args.root.as_deref(), scene_file.as_deref());
    info!("Frame root: {}", root.display());

    let host = HeadlessHost::new();
    let mut shell = Shell::from_scene(&scene, host.clone(), LogSink)?;
    shell.event_bus.subscribe::<SequenceReadyEvent, _>(|e| {
        info!("{} {}: ready ok={} count={}", e.target, e.kind, e.ok, e.count);
    });
    shell.spawn_discovery(Arc::new(FsProbe::new(root)));

    let tracker = shell.tracker();
    let names: Vec<String> = scene.targets.iter().map(|t| t.name.clone()).collect();
    let mut last_frames: HashMap<(String, AssetKind), usize> = HashMap::new();
    let mut found_sent = false;
    let mut lost_sent = false;
    let mut now = 0.0;

    while now <= args.duration {
        if !found_sent && now >= args.found_at {
            for name in &names {
                tracker.emit(TargetFoundEvent { target: name.clone() });
            }
            info!("t={:.0}ms: target(s) found", now);
            found_sent = true;
        }
        if let Some(lost_at) = args.lost_at {
            if !lost_sent && now >= lost_at {
                for name in &names {
                    tracker.emit(TargetLostEvent { target: name.clone() });
                }
                info!("t={:.0}ms: target(s) lost", now);
                lost_sent = true;
            }
        }

        shell.update(args.tick);

        for controller in shell.controllers() {
            for player in controller.players() {
                if !player.is_playing() {
                    last_frames.remove(&(controller.name().to_string(), player.kind()));
                    continue;
                }
                let key = (controller.name().to_string(), player.kind());
                let frame = player.current_frame();
                if last_frames.insert(key, frame) != Some(frame) {
                    info!(
                        "t={:.0}ms: {} {} frame {} ({})",
                        now,
                        controller.name(),
                        player.kind(),
                        frame,
                        player.current_url().unwrap_or("-")
                    );
                }
            }
        }

        std::thread::sleep(Duration::from_secs_f64(args.tick / 1000.0));
        now += args.tick;
    }

    for controller in shell.controllers() {
        if !controller.is_all_ready() {
            warn!("{}: discovery still running after {}ms", controller.name(), args.duration);
        }
        for player in controller.players() {
            let visible = host
                .surface(controller.name(), player.kind())
                .map(|s| s.state().visible)
                .unwrap_or(false);
            println!(
                "{}\t{}\t{:?}\t{} frame(s)\tframe {}\tvisible={}",
                controller.name(),
                player.kind(),
                player.state(),
                player.frames().len(),
                player.current_frame(),
                visible
            );
        }
    }

    Ok(())
}
