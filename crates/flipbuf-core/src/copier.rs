//! Region copier: moves one rectangle between the two surfaces using the
//! block-copy accelerator.

use flipbuf_hal::{BlockCopyEngine, BlockTransfer, PollStatus};

use crate::geometry::Rect;
use crate::surface::Surface;

/// Error copying a single region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyError<E> {
    /// The rectangle is inverted or does not fit the surfaces.
    InvalidRegion(Rect),
    /// The accelerator did not report completion in time.
    Timeout(Rect),
    /// The accelerator reported a fault.
    Engine(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for CopyError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CopyError::InvalidRegion(r) => write!(f, "region {r:?} outside surface"),
            CopyError::Timeout(r) => write!(f, "accelerator timeout copying {r:?}"),
            CopyError::Engine(e) => write!(f, "accelerator fault: {e:?}"),
        }
    }
}

/// Check that `rect` can be copied on a surface of this geometry.
pub fn check_region(rect: Rect, surface: &Surface<'_>) -> Result<(), Rect> {
    if rect.fits_within(surface.width(), surface.height()) {
        Ok(())
    } else {
        Err(rect)
    }
}

/// Describe the transfer that copies `rect` from `src` to `dst` at the same
/// coordinates. The line offsets skip the part of each line outside `rect`.
///
/// Returns `None` when `rect` does not fit either surface.
pub fn block_transfer(rect: Rect, src: &Surface<'_>, dst: &mut Surface<'_>) -> Option<BlockTransfer> {
    check_region(rect, src).ok()?;
    check_region(rect, dst).ok()?;

    let width = rect.width();
    let src_start = rect.y1 as usize * src.stride() as usize + rect.x1 as usize;
    let dst_start = rect.y1 as usize * dst.stride() as usize + rect.x1 as usize;

    Some(BlockTransfer {
        src: src.as_slice()[src_start..].as_ptr(),
        dst: dst.as_mut_slice()[dst_start..].as_mut_ptr(),
        width,
        height: rect.height(),
        src_line_offset: src.stride() - width,
        dst_line_offset: dst.stride() - width,
    })
}

/// Copies rectangles between surfaces, waiting at most `timeout_ms` for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionCopier {
    timeout_ms: u32,
}

impl RegionCopier {
    pub const fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Copy the pixels of `rect` from `src` into `dst`, blocking until the
    /// accelerator finishes or the timeout elapses.
    pub fn copy_region<E: BlockCopyEngine>(
        &self,
        engine: &mut E,
        rect: Rect,
        src: &Surface<'_>,
        dst: &mut Surface<'_>,
    ) -> Result<(), CopyError<E::Error>> {
        let xfer = block_transfer(rect, src, dst).ok_or(CopyError::InvalidRegion(rect))?;

        // SAFETY: `block_transfer` only describes lines inside both surfaces,
        // `src` and `dst` are distinct borrows so the blocks cannot overlap,
        // and both borrows outlive the wait below.
        let handle = unsafe { engine.begin_block_copy(&xfer) }.map_err(CopyError::Engine)?;

        match engine
            .poll_done(handle, self.timeout_ms)
            .map_err(CopyError::Engine)?
        {
            PollStatus::Done => Ok(()),
            PollStatus::TimedOut => Err(CopyError::Timeout(rect)),
        }
    }
}

impl Default for RegionCopier {
    fn default() -> Self {
        Self::new(crate::config::COPY_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_skips_rest_of_line() {
        let mut a = std::vec![0u16; 800 * 480];
        let mut b = std::vec![0u16; 800 * 480];
        let src = Surface::new(&mut a, 800, 480).unwrap();
        let mut dst = Surface::new(&mut b, 800, 480).unwrap();

        let xfer = block_transfer(Rect::new(10, 10, 50, 50), &src, &mut dst).unwrap();
        assert_eq!(xfer.width, 41);
        assert_eq!(xfer.height, 41);
        assert_eq!(xfer.src_line_offset, 800 - 41);
        assert_eq!(xfer.dst_line_offset, 800 - 41);
        let start = (10 * 800 + 10) * core::mem::size_of::<u16>();
        assert_eq!(xfer.src as usize, src.base_address() + start);
        assert_eq!(xfer.dst as usize, dst.base_address() + start);
    }

    #[test]
    fn transfer_uses_padded_stride() {
        let mut a = [0u16; 16 * 4];
        let mut b = [0u16; 16 * 4];
        let src = Surface::with_stride(&mut a, 10, 4, 16).unwrap();
        let mut dst = Surface::with_stride(&mut b, 10, 4, 16).unwrap();

        let xfer = block_transfer(Rect::new(2, 1, 5, 3), &src, &mut dst).unwrap();
        assert_eq!(xfer.width, 4);
        assert_eq!(xfer.src_line_offset, 12);
    }

    #[test]
    fn default_timeout_matches_config() {
        assert_eq!(RegionCopier::default().timeout_ms(), crate::config::COPY_TIMEOUT_MS);
        assert_eq!(RegionCopier::new(5).timeout_ms(), 5);
    }

    #[test]
    fn transfer_rejects_out_of_bounds() {
        let mut a = [0u16; 8 * 8];
        let mut b = [0u16; 8 * 8];
        let src = Surface::new(&mut a, 8, 8).unwrap();
        let mut dst = Surface::new(&mut b, 8, 8).unwrap();

        assert!(block_transfer(Rect::new(0, 0, 8, 7), &src, &mut dst).is_none());
        assert!(block_transfer(Rect::new(5, 0, 4, 7), &src, &mut dst).is_none());
    }
}
