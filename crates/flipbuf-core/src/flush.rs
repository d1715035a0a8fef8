//! Flush coordinator: runs after every render pass and, on the last pass of
//! a frame, hands the new frame to the timing generator and reconciles the
//! other surface.
//!
//! Ordering on the last pass:
//! 1. stage the new front surface and request a flip at vertical blanking,
//! 2. copy every unmerged dirty area from the new front into the old front,
//! 3. signal the renderer.
//!
//! The renderer only draws into the old front again after step 3, so the
//! flip that the hardware applies at the next blanking edge always finds a
//! complete frame.

use flipbuf_hal::{BlockCopyEngine, FlushNotifier, ReloadMode, TimingGenerator};

use crate::config::PERF_LOG_INTERVAL;
use crate::copier::{check_region, CopyError, RegionCopier};
use crate::geometry::{DirtyRegionSet, Rect};
use crate::surface::{SurfaceId, SurfacePair};

/// One completed render pass, as reported by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderPass<'d> {
    /// Surface the pass drew into.
    pub target: SurfaceId,
    /// Areas redrawn during the whole current frame.
    pub dirty: &'d DirtyRegionSet,
    /// This pass completes the frame.
    pub last: bool,
}

/// Error flushing a render pass, generic over the accelerator (`CE`) and
/// timing generator (`TE`) error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushError<CE, TE> {
    /// A dirty area is inverted or outside the surfaces. Nothing was
    /// touched.
    InvalidRegion(Rect),
    /// The accelerator did not finish copying this area. The flip has been
    /// requested but the old front is stale inside the area; the frame is
    /// dropped and the renderer was not signalled.
    AcceleratorTimeout(Rect),
    /// The accelerator reported a transfer or configuration fault.
    Accelerator(CE),
    /// The timing generator rejected the flip request.
    TimingGenerator(TE),
}

impl<CE, TE> From<CopyError<CE>> for FlushError<CE, TE> {
    fn from(e: CopyError<CE>) -> Self {
        match e {
            CopyError::InvalidRegion(r) => FlushError::InvalidRegion(r),
            CopyError::Timeout(r) => FlushError::AcceleratorTimeout(r),
            CopyError::Engine(e) => FlushError::Accelerator(e),
        }
    }
}

impl<CE: core::fmt::Debug, TE: core::fmt::Debug> core::fmt::Display for FlushError<CE, TE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FlushError::InvalidRegion(r) => write!(f, "dirty area {r:?} outside surface"),
            FlushError::AcceleratorTimeout(r) => {
                write!(f, "accelerator timeout copying {r:?}, frame dropped")
            }
            FlushError::Accelerator(e) => write!(f, "accelerator fault: {e:?}"),
            FlushError::TimingGenerator(e) => write!(f, "timing generator error: {e:?}"),
        }
    }
}

/// Running counters, logged every [`PERF_LOG_INTERVAL`] frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Frames whose last pass was flushed successfully.
    pub frames: u32,
    /// Render passes seen, final or not.
    pub passes: u32,
    pub areas_copied: u32,
    /// Merged areas skipped during reconciliation.
    pub areas_skipped: u32,
    pub pixels_copied: u64,
    pub timeouts: u32,
}

/// Per-pass flush logic. Holds no surface state of its own; the surfaces
/// and swap state are passed in by the owning driver.
#[derive(Debug, Default)]
pub struct FlushCoordinator {
    copier: RegionCopier,
    stats: FlushStats,
}

impl FlushCoordinator {
    pub fn new(copier: RegionCopier) -> Self {
        Self {
            copier,
            stats: FlushStats::default(),
        }
    }

    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    /// Handle one completed render pass.
    ///
    /// Non-final passes are acknowledged immediately without touching the
    /// hardware. On the final pass the notifier is only called once every
    /// unmerged area has been copied; on error it is not called at all.
    pub fn flush<E, T, N>(
        &mut self,
        surfaces: &mut SurfacePair<'_>,
        engine: &mut E,
        timing: &mut T,
        notifier: &mut N,
        pass: &RenderPass<'_>,
    ) -> Result<(), FlushError<E::Error, T::Error>>
    where
        E: BlockCopyEngine,
        T: TimingGenerator,
        N: FlushNotifier,
    {
        self.stats.passes = self.stats.passes.wrapping_add(1);

        if !pass.last {
            log::trace!("flush: intermediate pass into {:?}", pass.target);
            notifier.flush_ready();
            return Ok(());
        }

        // Reject bad input before the flip request so a renderer bug leaves
        // the display untouched.
        for rect in pass.dirty.unmerged() {
            check_region(rect, surfaces.get(pass.target)).map_err(FlushError::InvalidRegion)?;
        }

        let new_front = pass.target;
        let old_front = new_front.other();

        timing
            .set_next_frame_source(surfaces.get(new_front).base_address())
            .map_err(FlushError::TimingGenerator)?;
        timing
            .request_flip(ReloadMode::VerticalBlanking)
            .map_err(FlushError::TimingGenerator)?;
        // The hardware will latch the new front at the next blanking edge
        // whatever happens below.
        surfaces.swap_state_mut().present(new_front);
        log::trace!("flush: flip to {:?} requested", new_front);

        let (src, dst) = surfaces.split(new_front);
        for area in pass.dirty.iter() {
            if area.merged {
                self.stats.areas_skipped = self.stats.areas_skipped.wrapping_add(1);
                continue;
            }
            if let Err(e) = self.copier.copy_region(engine, area.rect, src, dst) {
                match &e {
                    CopyError::Timeout(r) => {
                        self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
                        log::error!("flush: accelerator timeout on {:?}, frame dropped", r);
                    }
                    CopyError::Engine(err) => {
                        log::warn!("flush: accelerator fault {:?}", err);
                    }
                    CopyError::InvalidRegion(_) => {}
                }
                return Err(e.into());
            }
            self.stats.areas_copied = self.stats.areas_copied.wrapping_add(1);
            self.stats.pixels_copied += area.rect.area() as u64;
            log::trace!("flush: copied {:?} {:?} -> {:?}", area.rect, new_front, old_front);
        }

        self.stats.frames = self.stats.frames.wrapping_add(1);
        log::debug!(
            "flush: frame {} presented from {:?}, {} areas",
            self.stats.frames,
            new_front,
            pass.dirty.len()
        );
        if self.stats.frames % PERF_LOG_INTERVAL == 0 {
            log::info!(
                "flush: frames={} passes={} copied={} skipped={} pixels={} timeouts={}",
                self.stats.frames,
                self.stats.passes,
                self.stats.areas_copied,
                self.stats.areas_skipped,
                self.stats.pixels_copied,
                self.stats.timeouts
            );
        }

        notifier.flush_ready();
        Ok(())
    }
}
