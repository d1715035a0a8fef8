//! Display driver facade: owns the surfaces and the platform handles, and
//! exposes the direct-render contract to the renderer.

use core::sync::atomic::{AtomicBool, Ordering};

use flipbuf_hal::{
    BlockCopyEngine, FlushNotifier, FrameAddress, PanelBringUp, ReloadMode, TimingGenerator,
};

use crate::config::DisplayConfig;
use crate::copier::RegionCopier;
use crate::flush::{FlushCoordinator, FlushError, FlushStats, RenderPass};
use crate::surface::{Surface, SurfaceId, SurfacePair, SwapState};

/// Error bringing up the display. All variants are fatal: there is no
/// degraded mode without a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError<PE, TE> {
    /// A surface does not match the configured resolution, or the two
    /// surfaces differ in geometry.
    SurfaceGeometry(SurfaceId),
    /// Panel bring-up failed.
    Panel(PE),
    /// The timing generator rejected the initial frame source.
    TimingGenerator(TE),
}

impl<PE: core::fmt::Debug, TE: core::fmt::Debug> core::fmt::Display for InitError<PE, TE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InitError::SurfaceGeometry(id) => write!(f, "surface {id:?} does not match the panel"),
            InitError::Panel(e) => write!(f, "panel bring-up failed: {e:?}"),
            InitError::TimingGenerator(e) => write!(f, "timing generator error: {e:?}"),
        }
    }
}

/// Draw-buffer descriptor handed to the renderer.
///
/// Both buffers are full-size: the renderer draws each frame directly into
/// one of them rather than into a partial tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBuffers {
    pub buf1: FrameAddress,
    pub buf2: FrameAddress,
    /// Pixels per buffer, including stride padding.
    pub size_px: usize,
    pub hor_res: u16,
    pub ver_res: u16,
    pub direct_mode: bool,
}

/// [`FlushNotifier`] backed by an atomic flag the renderer polls.
#[derive(Debug, Default)]
pub struct FlushFlag(AtomicBool);

impl FlushFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Consume a pending "flush complete" signal.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Acquire)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl FlushNotifier for &FlushFlag {
    fn flush_ready(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Owns both surfaces, the block-copy engine `E`, the timing generator `T`
/// and the renderer's completion callback `N`.
pub struct DisplayDriver<'a, E, T, N> {
    config: DisplayConfig,
    surfaces: SurfacePair<'a>,
    engine: E,
    timing: T,
    notifier: N,
    coordinator: FlushCoordinator,
}

impl<'a, E, T, N> DisplayDriver<'a, E, T, N>
where
    E: BlockCopyEngine,
    T: TimingGenerator,
    N: FlushNotifier,
{
    /// Bring up the panel, latch surface A as the displayed frame and
    /// register `notifier` as the renderer's post-pass callback.
    ///
    /// Call exactly once at startup.
    pub fn initialize<P: PanelBringUp>(
        config: DisplayConfig,
        surface_a: Surface<'a>,
        surface_b: Surface<'a>,
        panel: &mut P,
        mut timing: T,
        engine: E,
        notifier: N,
    ) -> Result<Self, InitError<P::Error, T::Error>> {
        for (id, s) in [(SurfaceId::A, &surface_a), (SurfaceId::B, &surface_b)] {
            if s.width() != config.width || s.height() != config.height {
                return Err(InitError::SurfaceGeometry(id));
            }
        }
        let surfaces = SurfacePair::new(surface_a, surface_b)
            .map_err(|_| InitError::SurfaceGeometry(SurfaceId::B))?;

        panel
            .bring_up(config.width, config.height)
            .map_err(InitError::Panel)?;

        let front = surfaces.get(SurfaceId::A).base_address();
        timing
            .set_next_frame_source(front)
            .map_err(InitError::TimingGenerator)?;
        timing
            .request_flip(ReloadMode::Immediate)
            .map_err(InitError::TimingGenerator)?;

        log::info!(
            "display: {}x{} up, A at {:#x}, B at {:#x}",
            config.width,
            config.height,
            front,
            surfaces.get(SurfaceId::B).base_address()
        );

        Ok(Self {
            config,
            surfaces,
            engine,
            timing,
            notifier,
            coordinator: FlushCoordinator::new(RegionCopier::new(config.copy_timeout_ms)),
        })
    }

    /// Renderer entry point, called after every render pass.
    pub fn flush(&mut self, pass: &RenderPass<'_>) -> Result<(), FlushError<E::Error, T::Error>> {
        self.coordinator.flush(
            &mut self.surfaces,
            &mut self.engine,
            &mut self.timing,
            &mut self.notifier,
            pass,
        )
    }

    pub fn draw_buffers(&self) -> DrawBuffers {
        let a = self.surfaces.get(SurfaceId::A);
        DrawBuffers {
            buf1: a.base_address(),
            buf2: self.surfaces.get(SurfaceId::B).base_address(),
            size_px: a.stride() as usize * a.height() as usize,
            hor_res: self.config.width,
            ver_res: self.config.height,
            direct_mode: true,
        }
    }

    /// Surface the renderer must draw the next frame into.
    pub fn draw_target(&self) -> SurfaceId {
        self.surfaces.swap_state().draw
    }

    /// Surface scanned out once the last requested flip is applied.
    pub fn front(&self) -> SurfaceId {
        self.surfaces.swap_state().front
    }

    pub fn swap_state(&self) -> SwapState {
        self.surfaces.swap_state()
    }

    pub fn surface(&self, id: SurfaceId) -> &Surface<'a> {
        self.surfaces.get(id)
    }

    /// Mutable access for the renderer. Only draw into
    /// [`draw_target`](Self::draw_target) between flushes.
    pub fn surface_mut(&mut self, id: SurfaceId) -> &mut Surface<'a> {
        self.surfaces.get_mut(id)
    }

    pub fn surfaces(&self) -> &SurfacePair<'a> {
        &self.surfaces
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn stats(&self) -> &FlushStats {
        self.coordinator.stats()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn timing(&self) -> &T {
        &self.timing
    }

    pub fn timing_mut(&mut self) -> &mut T {
        &mut self.timing
    }
}
