//! Drives the bouncing-box scene through a [`DisplayDriver`] built on the
//! simulated hardware, checking after every vertical blanking that the panel
//! shows the surface the driver thinks is in front and that both surfaces
//! hold the same frame.

use std::path::PathBuf;

use flipbuf_core::scene::BouncingBox;
use flipbuf_core::{
    DirtyRegionSet, DisplayConfig, DisplayDriver, FlushFlag, FlushStats, Rect, RenderPass,
    Surface,
};

use crate::dump;
use crate::error::SimError;
use crate::sim::{LatencyEngine, SimPanel, SimTimingGenerator};

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub display: DisplayConfig,
    pub frames: u32,
    pub box_size: u16,
    /// Simulated duration of each block copy.
    pub engine_latency_ms: u32,
    /// Stall the accelerator before this frame is flushed.
    pub stall_at_frame: Option<u32>,
    /// Write the front surface as PNG once all frames ran.
    pub dump: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            frames: 120,
            box_size: 48,
            engine_latency_ms: 0,
            stall_at_frame: None,
            dump: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimReport {
    pub stats: FlushStats,
    /// Flips latched by the timing generator at vertical blanking.
    pub flips: u32,
    pub transfers: u32,
    pub engine_busy_ms: u64,
}

/// Run `config.frames` frames. Stops at the first dropped frame or broken
/// invariant.
pub fn run(config: &SimConfig) -> Result<SimReport, SimError> {
    let DisplayConfig { width, height, .. } = config.display;
    let len = config.display.framebuffer_len();
    let mut buf_a = vec![0u16; len];
    let mut buf_b = vec![0u16; len];
    let surface_a = Surface::new(&mut buf_a, width, height)?;
    let surface_b = Surface::new(&mut buf_b, width, height)?;

    let flag = FlushFlag::new();
    let mut panel = SimPanel::default();
    let mut driver = DisplayDriver::initialize(
        config.display,
        surface_a,
        surface_b,
        &mut panel,
        SimTimingGenerator::new(),
        LatencyEngine::new(config.engine_latency_ms),
        &flag,
    )
    .map_err(|e| SimError::Init(e.to_string()))?;

    let mut scene = BouncingBox::new(width, height, config.box_size);
    let mut dirty = DirtyRegionSet::new();

    for frame in 0..config.frames {
        if config.stall_at_frame == Some(frame) {
            log::warn!("sim: stalling accelerator at frame {}", frame);
            driver.engine_mut().stall();
        }

        scene.begin_frame(&mut dirty);
        let target = driver.draw_target();
        let areas: Vec<Rect> = dirty.unmerged().collect();
        let passes = areas.len().max(1);

        for pass in 0..passes {
            if let Some(area) = areas.get(pass) {
                scene.render_area(driver.surface_mut(target), *area);
            }
            driver
                .flush(&RenderPass {
                    target,
                    dirty: &dirty,
                    last: pass + 1 == passes,
                })
                .map_err(|e| SimError::FrameDropped {
                    frame,
                    reason: e.to_string(),
                })?;
            if !flag.take() {
                return Err(SimError::NotSignalled { frame });
            }
        }

        driver.timing_mut().vblank();
        let shown = driver
            .timing()
            .active()
            .and_then(|addr| driver.surfaces().id_of(addr));
        if shown != Some(driver.front()) {
            return Err(SimError::ScanoutMismatch {
                frame,
                shown,
                front: driver.front(),
            });
        }
        let surfaces = driver.surfaces();
        if !surfaces.get(target).same_content(surfaces.get(target.other())) {
            return Err(SimError::SurfacesDiverged { frame });
        }
        log::trace!("sim: frame {} on {:?}, {} areas", frame, target, areas.len());
    }

    if let Some(path) = &config.dump {
        dump::write_png(driver.surface(driver.front()), path)?;
        log::info!("sim: front surface written to {}", path.display());
    }

    let report = SimReport {
        stats: *driver.stats(),
        flips: driver.timing().flips(),
        transfers: driver.engine().transfers(),
        engine_busy_ms: driver.engine().busy_ms(),
    };
    log::info!(
        "sim: {} frames, {} flips, {} transfers, {} ms in accelerator",
        report.stats.frames,
        report.flips,
        report.transfers,
        report.engine_busy_ms
    );
    Ok(report)
}
