#![no_std]

/// One RGB565 pixel as stored in a surface and scanned out by the panel layer.
pub type Pixel = u16;

/// Bus address of a surface's first pixel, as programmed into the timing
/// generator's frame-pointer register.
pub type FrameAddress = usize;

/// A 2-D memory-to-memory block transfer.
///
/// `src` and `dst` point at the top-left pixel of the block. After each line
/// of `width` pixels the engine skips `src_line_offset` (resp.
/// `dst_line_offset`) pixels to reach the start of the next line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTransfer {
    pub src: *const Pixel,
    pub dst: *mut Pixel,
    /// Pixels per line.
    pub width: u16,
    /// Number of lines.
    pub height: u16,
    pub src_line_offset: u16,
    pub dst_line_offset: u16,
}

/// Opaque identifier for a transfer started by a [`BlockCopyEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferHandle(pub u32);

/// Result of waiting on a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The engine reported transfer complete.
    Done,
    /// The timeout elapsed before the engine reported completion.
    TimedOut,
}

/// Abstracts the rectangular block-copy accelerator (DMA2D on STM32).
///
/// Implementations only ever service one transfer at a time; callers must
/// wait for a transfer with [`poll_done`](Self::poll_done) before starting
/// the next one.
pub trait BlockCopyEngine {
    type Error: core::fmt::Debug;

    /// Configure and start a block transfer.
    ///
    /// # Safety
    ///
    /// Every line described by `xfer` must lie inside a live allocation for
    /// both `src` (readable) and `dst` (writable), the two blocks must not
    /// overlap, and neither may be accessed by anything else until
    /// `poll_done` returns [`PollStatus::Done`] for the returned handle.
    unsafe fn begin_block_copy(&mut self, xfer: &BlockTransfer)
        -> Result<TransferHandle, Self::Error>;

    /// Busy-wait until the transfer completes or `timeout_ms` elapses.
    fn poll_done(&mut self, handle: TransferHandle, timeout_ms: u32)
        -> Result<PollStatus, Self::Error>;
}

/// When a pending frame-source change takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    /// Shadow registers are copied to the active set right away.
    Immediate,
    /// Shadow registers are copied during the next vertical blanking period.
    VerticalBlanking,
}

/// Abstracts the display timing generator (LTDC on STM32).
pub trait TimingGenerator {
    type Error: core::fmt::Debug;

    /// Stage `addr` as the next frame source without reloading.
    fn set_next_frame_source(&mut self, addr: FrameAddress) -> Result<(), Self::Error>;

    /// Schedule the staged frame source to become active. Must not block
    /// waiting for the reload to happen.
    fn request_flip(&mut self, at: ReloadMode) -> Result<(), Self::Error>;
}

/// Panel and timing-generator bring-up, run once before the first frame.
pub trait PanelBringUp {
    type Error: core::fmt::Debug;

    /// Power the panel and configure the timing generator for a
    /// `width` x `height` RGB565 layer.
    fn bring_up(&mut self, width: u16, height: u16) -> Result<(), Self::Error>;
}

/// The renderer's "flush complete" callback.
///
/// Called exactly once per flushed render pass, after which the renderer may
/// draw again.
pub trait FlushNotifier {
    fn flush_ready(&mut self);
}

impl<N: FlushNotifier + ?Sized> FlushNotifier for &mut N {
    fn flush_ready(&mut self) {
        (**self).flush_ready();
    }
}
