//! CPU implementation of the block-copy contract.
//!
//! Used where no accelerator exists (host simulation, tests) and as the
//! reference behaviour the DMA2D driver must match.

use flipbuf_hal::{BlockCopyEngine, BlockTransfer, PollStatus, TransferHandle};

/// Copies line by line on the CPU. Transfers complete before
/// `begin_block_copy` returns.
#[derive(Debug, Default)]
pub struct SoftwareBlockCopy {
    issued: u32,
}

impl SoftwareBlockCopy {
    pub const fn new() -> Self {
        Self { issued: 0 }
    }

    /// Number of transfers performed so far.
    pub fn transfers(&self) -> u32 {
        self.issued
    }
}

impl BlockCopyEngine for SoftwareBlockCopy {
    type Error = core::convert::Infallible;

    unsafe fn begin_block_copy(
        &mut self,
        xfer: &BlockTransfer,
    ) -> Result<TransferHandle, Self::Error> {
        let width = xfer.width as usize;
        let src_pitch = width + xfer.src_line_offset as usize;
        let dst_pitch = width + xfer.dst_line_offset as usize;

        for line in 0..xfer.height as usize {
            // SAFETY: the caller guarantees every line lies inside the two
            // non-overlapping allocations.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    xfer.src.add(line * src_pitch),
                    xfer.dst.add(line * dst_pitch),
                    width,
                );
            }
        }

        self.issued = self.issued.wrapping_add(1);
        Ok(TransferHandle(self.issued))
    }

    fn poll_done(
        &mut self,
        _handle: TransferHandle,
        _timeout_ms: u32,
    ) -> Result<PollStatus, Self::Error> {
        Ok(PollStatus::Done)
    }
}
