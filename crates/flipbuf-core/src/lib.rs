//! Platform-agnostic double-buffered flush pipeline for a direct-mode LCD.
//!
//! The renderer draws whole frames into one of two full-size surfaces. After
//! the last render pass of a frame, [`DisplayDriver::flush`] asks the timing
//! generator to scan out that surface from the next vertical blanking on,
//! copies the frame's dirty areas into the other surface with the block-copy
//! accelerator, and only then tells the renderer it may draw again.
//!
//! Generic over the traits in `flipbuf-hal` so it runs against the STM32
//! DMA2D/LTDC drivers on target and against [`SoftwareBlockCopy`] on a host.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod copier;
pub mod driver;
pub mod flush;
pub mod geometry;
pub mod scene;
pub mod software;
pub mod surface;

pub use config::{DisplayConfig, COPY_TIMEOUT_MS, MAX_DIRTY_AREAS};
pub use copier::{CopyError, RegionCopier};
pub use driver::{DisplayDriver, DrawBuffers, FlushFlag, InitError};
pub use flush::{FlushCoordinator, FlushError, FlushStats, RenderPass};
pub use geometry::{DirtyArea, DirtyRegionSet, Rect};
pub use software::SoftwareBlockCopy;
pub use surface::{rgb565, Surface, SurfaceError, SurfaceId, SurfacePair, SwapState};

pub use flipbuf_hal as hal;
