use flipbook::config::{AssetKind, TargetConfig};
use flipbook::core::probe::MapProbe;
use flipbook::core::sequence_events::{SequenceReadyEvent, TargetFoundEvent, TargetLostEvent};
use flipbook::scene::HeadlessHost;
use flipbook::{MemorySink, PlayerState, SceneConfig, Shell, TargetController};

const PREFIX: &str = "seq/frame_";

fn target(fps: f64) -> TargetConfig {
    TargetConfig {
        fps,
        zero_pad: 3,
        ..TargetConfig::png("poster", PREFIX)
    }
}

fn probe(frames: u32) -> MapProbe {
    let probe = MapProbe::new();
    for i in 0..frames {
        probe.insert(format!("{PREFIX}{i:03}.png"), 640, 360);
    }
    probe
}

fn controller(config: &TargetConfig, host: &HeadlessHost) -> TargetController {
    TargetController::new(config, Box::new(host.clone()), Box::new(MemorySink::new()))
        .expect("valid target config")
}

/// Ticks at cumulative 0, 100, 250 and 999 ms show frames 0, 1, 2 and 4
#[test]
fn five_frames_at_ten_fps_found_at_zero() {
    let config = target(10.0);
    let host = HeadlessHost::new();
    let mut target = controller(&config, &host);

    target.on_target_found();
    target.discover_with(&probe(5));

    let mut observed = Vec::new();
    let mut now = 0.0;
    for t in [0.0, 100.0, 250.0, 999.0] {
        target.tick(t - now);
        now = t;
        observed.push(target.player(AssetKind::Png).unwrap().current_frame());
    }
    assert_eq!(observed, vec![0, 1, 2, 4]);

    let surface = host.surface("poster", AssetKind::Png).unwrap().state();
    assert!(surface.visible);
    assert_eq!(surface.source.as_deref(), Some("seq/frame_004.png"));
    // 640x360 at unit width 1
    let size = surface.size.unwrap();
    assert_eq!(size.width, 1.0);
    assert!((size.height - 0.5625).abs() < 1e-12);
}

#[test]
fn frame_index_is_independent_of_tick_granularity() {
    let schedules: [&[f64]; 4] = [
        &[0.0, 5.0, 40.0, 55.0, 0.0, 300.0, 12.0, 88.0],
        &[62.5; 8],
        &[500.0],
        &[1.0; 500],
    ];

    for schedule in schedules {
        let total: f64 = schedule.iter().sum();
        let host = HeadlessHost::new();
        let mut target = controller(&target(8.0), &host);
        target.discover_with(&probe(3));
        target.on_target_found();
        for &dt in schedule {
            target.tick(dt);
        }
        // 125 ms per frame
        let crossings = (total / 125.0).floor() as usize;
        assert_eq!(total, 500.0);
        assert_eq!(
            target.player(AssetKind::Png).unwrap().current_frame(),
            crossings % 3,
            "schedule {:?}",
            schedule
        );
    }
}

#[test]
fn boundaries_are_exact_at_inexact_frame_durations() {
    // (fps, tick ms, ticks): every total lands exactly on a frame boundary
    let cases: [(f64, f64, usize); 3] = [(30.0, 10.0, 10), (7.0, 1.0, 1000), (60.0, 16.0, 1000)];

    for (fps, dt, ticks) in cases {
        let total = dt * ticks as f64;
        let boundaries = (total * fps / 1000.0).round() as usize;

        let sliced_host = HeadlessHost::new();
        let mut sliced = controller(&target(fps), &sliced_host);
        sliced.discover_with(&probe(5));
        sliced.on_target_found();
        for _ in 0..ticks {
            sliced.tick(dt);
        }

        let whole_host = HeadlessHost::new();
        let mut whole = controller(&target(fps), &whole_host);
        whole.discover_with(&probe(5));
        whole.on_target_found();
        whole.tick(total);

        let frame = |t: &TargetController| t.player(AssetKind::Png).unwrap().current_frame();
        assert_eq!(frame(&sliced), boundaries % 5, "{} fps, {} x {}ms", fps, ticks, dt);
        assert_eq!(frame(&whole), boundaries % 5, "{} fps, one {}ms tick", fps, total);
    }
}

#[test]
fn contiguous_run_after_leading_gap() {
    let config = TargetConfig {
        start_index: 0,
        ..target(12.0)
    };
    let probe = MapProbe::new();
    for i in [2u32, 3, 4, 5, 7, 8] {
        probe.insert(format!("{PREFIX}{i:03}.png"), 100, 100);
    }
    let host = HeadlessHost::new();
    let mut target = controller(&config, &host);
    target.discover_with(&probe);

    let player = target.player(AssetKind::Png).unwrap();
    let frames: Vec<&str> = player.frames().iter().collect();
    assert_eq!(
        frames,
        vec![
            "seq/frame_002.png",
            "seq/frame_003.png",
            "seq/frame_004.png",
            "seq/frame_005.png"
        ]
    );
    // 2 leading misses, 4 hits, 1 terminating miss
    assert_eq!(probe.probe_count(), 7);
}

#[test]
fn empty_sequence_reports_not_ok_and_creates_nothing() {
    let config = TargetConfig {
        max_index: 20,
        ..target(12.0)
    };
    let scene = SceneConfig {
        targets: vec![config],
    };
    let host = HeadlessHost::new();
    let mut shell = Shell::from_scene(&scene, host.clone(), MemorySink::new()).unwrap();

    let ready = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&ready);
    shell.event_bus.subscribe::<SequenceReadyEvent, _>(move |e| {
        sink.lock().unwrap().push(e.clone());
    });

    shell.tracker().emit(TargetFoundEvent { target: "poster".into() });
    shell.update(0.0);
    shell.discover_with(&MapProbe::new());
    shell.update(100.0);

    let ready = ready.lock().unwrap();
    assert_eq!(ready.len(), 1);
    assert!(!ready[0].ok);
    assert_eq!(ready[0].count, 0);
    assert_eq!(host.surface_count(), 0);

    let player = shell.controller("poster").unwrap().player(AssetKind::Png).unwrap();
    assert_eq!(player.state(), PlayerState::ReadyEmpty);
    assert!(!player.is_playing());
}

#[test]
fn found_then_lost_before_ready_never_autostarts() {
    let host = HeadlessHost::new();
    let scene = SceneConfig {
        targets: vec![target(10.0)],
    };
    let mut shell = Shell::from_scene(&scene, host.clone(), MemorySink::new()).unwrap();

    let tracker = shell.tracker();
    tracker.emit(TargetFoundEvent { target: "poster".into() });
    tracker.emit(TargetLostEvent { target: "poster".into() });
    shell.update(16.0);
    shell.discover_with(&probe(4));
    shell.update(500.0);

    let target = shell.controller("poster").unwrap();
    assert!(target.is_all_ready());
    let player = target.player(AssetKind::Png).unwrap();
    assert_eq!(player.state(), PlayerState::ReadyStopped);
    assert_eq!(player.current_frame(), 0);
    assert!(!host.surface("poster", AssetKind::Png).unwrap().state().visible);
}

#[test]
fn lost_then_found_restarts_from_first_frame() {
    let host = HeadlessHost::new();
    let mut target = controller(&target(10.0), &host);
    target.discover_with(&probe(5));

    target.on_target_found();
    target.tick(330.0);
    assert_eq!(target.player(AssetKind::Png).unwrap().current_frame(), 3);

    target.on_target_lost();
    let surface = host.surface("poster", AssetKind::Png).unwrap();
    assert!(!surface.state().visible);
    assert_eq!(surface.state().source.as_deref(), Some("seq/frame_000.png"));

    target.on_target_found();
    let player = target.player(AssetKind::Png).unwrap();
    assert_eq!(player.current_frame(), 0);
    assert_eq!(player.playback().elapsed_ms, 0.0);
    assert!(surface.state().visible);
}
