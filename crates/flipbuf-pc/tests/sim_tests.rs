//! End-to-end runs of the simulator.

use flipbuf_core::DisplayConfig;
use flipbuf_pc::{run, SimConfig, SimError};

fn small(frames: u32) -> SimConfig {
    SimConfig {
        display: DisplayConfig::new(96, 64).with_copy_timeout(100),
        frames,
        box_size: 12,
        ..SimConfig::default()
    }
}

// ============================================================================
// Steady state
// ============================================================================

#[test]
fn every_frame_is_flipped_and_reconciled() {
    let report = run(&small(60)).expect("simulation");

    assert_eq!(report.stats.frames, 60);
    assert_eq!(report.flips, 60);
    assert_eq!(report.stats.timeouts, 0);
    assert_eq!(u64::from(report.stats.areas_copied), u64::from(report.transfers));
    // First frame copies the whole screen.
    assert!(report.stats.pixels_copied >= 96 * 64);
}

#[test]
fn full_panel_resolution_runs() {
    let config = SimConfig {
        frames: 5,
        ..SimConfig::default()
    };
    let report = run(&config).expect("simulation");
    assert_eq!(report.stats.frames, 5);
}

#[test]
fn slow_engine_within_timeout_is_accounted() {
    let config = SimConfig {
        engine_latency_ms: 4,
        ..small(10)
    };
    let report = run(&config).expect("simulation");
    assert_eq!(report.engine_busy_ms, 4 * u64::from(report.transfers));
}

// ============================================================================
// Failure injection
// ============================================================================

#[test]
fn stalled_engine_drops_the_frame() {
    let config = SimConfig {
        stall_at_frame: Some(7),
        ..small(20)
    };
    match run(&config) {
        Err(SimError::FrameDropped { frame, reason }) => {
            assert_eq!(frame, 7);
            assert!(reason.contains("timeout"), "reason: {reason}");
        }
        other => panic!("expected a dropped frame, got {other:?}"),
    }
}

#[test]
fn engine_slower_than_timeout_drops_first_frame() {
    let config = SimConfig {
        engine_latency_ms: 500,
        ..small(3)
    };
    assert!(matches!(
        run(&config),
        Err(SimError::FrameDropped { frame: 0, .. })
    ));
}

#[test]
fn unsupported_resolution_fails_bring_up() {
    let config = SimConfig {
        display: DisplayConfig::new(5000, 8),
        frames: 1,
        ..SimConfig::default()
    };
    assert!(matches!(run(&config), Err(SimError::Init(_))));
}

// ============================================================================
// Frame dump
// ============================================================================

#[test]
fn dump_writes_png_of_front_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("front.png");
    let config = SimConfig {
        dump: Some(path.clone()),
        ..small(8)
    };
    run(&config).expect("simulation");

    let img = image::open(&path).expect("png").to_rgb8();
    assert_eq!(img.dimensions(), (96, 64));
}

#[test]
fn dump_to_missing_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimConfig {
        dump: Some(dir.path().join("missing").join("front.png")),
        ..small(2)
    };
    assert!(matches!(run(&config), Err(SimError::Image { .. })));
}
