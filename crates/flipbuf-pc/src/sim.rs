//! Host stand-ins for the panel, the LTDC-style timing generator and the
//! DMA2D-style accelerator.

use flipbuf_core::SoftwareBlockCopy;
use flipbuf_hal::{
    BlockCopyEngine, BlockTransfer, FrameAddress, PanelBringUp, PollStatus, ReloadMode,
    TimingGenerator, TransferHandle,
};

use crate::error::SimError;

/// Largest resolution the simulated panel accepts.
pub const MAX_RESOLUTION: u16 = 4096;

/// Accepts any resolution up to [`MAX_RESOLUTION`].
#[derive(Debug, Default)]
pub struct SimPanel {
    pub powered: bool,
}

impl PanelBringUp for SimPanel {
    type Error = SimError;

    fn bring_up(&mut self, width: u16, height: u16) -> Result<(), Self::Error> {
        if width == 0 || height == 0 || width > MAX_RESOLUTION || height > MAX_RESOLUTION {
            return Err(SimError::UnsupportedResolution { width, height });
        }
        self.powered = true;
        log::debug!("sim panel: {}x{} powered", width, height);
        Ok(())
    }
}

/// Timing generator with a shadow and an active frame-pointer register.
///
/// A vertical-blanking reload request is only applied by [`vblank`](Self::vblank),
/// which the simulation calls once per refresh.
#[derive(Debug, Default)]
pub struct SimTimingGenerator {
    shadow: Option<FrameAddress>,
    active: Option<FrameAddress>,
    reload_pending: bool,
    vblanks: u32,
    flips: u32,
}

impl SimTimingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame pointer currently being scanned out.
    pub fn active(&self) -> Option<FrameAddress> {
        self.active
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_pending
    }

    pub fn vblanks(&self) -> u32 {
        self.vblanks
    }

    pub fn flips(&self) -> u32 {
        self.flips
    }

    /// Enter vertical blanking. Returns the newly latched frame pointer if a
    /// reload was pending.
    pub fn vblank(&mut self) -> Option<FrameAddress> {
        self.vblanks += 1;
        if !self.reload_pending {
            return None;
        }
        self.reload_pending = false;
        self.active = self.shadow;
        self.flips += 1;
        self.active
    }
}

impl TimingGenerator for SimTimingGenerator {
    type Error = SimError;

    fn set_next_frame_source(&mut self, addr: FrameAddress) -> Result<(), Self::Error> {
        self.shadow = Some(addr);
        Ok(())
    }

    fn request_flip(&mut self, at: ReloadMode) -> Result<(), Self::Error> {
        if self.shadow.is_none() {
            return Err(SimError::NoFrameSource);
        }
        match at {
            ReloadMode::Immediate => {
                self.active = self.shadow;
                self.reload_pending = false;
            }
            ReloadMode::VerticalBlanking => self.reload_pending = true,
        }
        Ok(())
    }
}

/// CPU block copy that takes `latency_ms` of simulated time per transfer
/// and can be stalled to model a hung accelerator.
#[derive(Debug, Default)]
pub struct LatencyEngine {
    inner: SoftwareBlockCopy,
    latency_ms: u32,
    stalled: bool,
    pending: Option<TransferHandle>,
    busy_ms: u64,
}

impl LatencyEngine {
    pub fn new(latency_ms: u32) -> Self {
        Self {
            latency_ms,
            ..Self::default()
        }
    }

    /// From now on transfers never complete.
    pub fn stall(&mut self) {
        self.stalled = true;
    }

    /// Simulated time spent waiting on transfers.
    pub fn busy_ms(&self) -> u64 {
        self.busy_ms
    }

    pub fn transfers(&self) -> u32 {
        self.inner.transfers()
    }
}

impl BlockCopyEngine for LatencyEngine {
    type Error = SimError;

    unsafe fn begin_block_copy(
        &mut self,
        xfer: &BlockTransfer,
    ) -> Result<TransferHandle, Self::Error> {
        if let Some(TransferHandle(id)) = self.pending {
            return Err(SimError::EngineBusy(id));
        }
        let handle = if self.stalled {
            TransferHandle(u32::MAX)
        } else {
            // SAFETY: forwarded caller contract.
            match unsafe { self.inner.begin_block_copy(xfer) } {
                Ok(handle) => handle,
                Err(never) => match never {},
            }
        };
        self.pending = Some(handle);
        Ok(handle)
    }

    fn poll_done(
        &mut self,
        handle: TransferHandle,
        timeout_ms: u32,
    ) -> Result<PollStatus, Self::Error> {
        if self.pending != Some(handle) {
            return Ok(PollStatus::Done);
        }
        if self.stalled || self.latency_ms > timeout_ms {
            // A hung transfer keeps the engine busy.
            self.busy_ms += u64::from(timeout_ms);
            return Ok(PollStatus::TimedOut);
        }
        self.busy_ms += u64::from(self.latency_ms);
        self.pending = None;
        Ok(PollStatus::Done)
    }
}
