//! Display geometry and pipeline tuning constants.

/// How long the region copier waits for the accelerator before giving up.
pub const COPY_TIMEOUT_MS: u32 = 10_000;

/// Capacity of a [`DirtyRegionSet`](crate::geometry::DirtyRegionSet).
///
/// Matches the toolkit's invalidation buffer; once it overflows the toolkit
/// invalidates the whole screen instead.
pub const MAX_DIRTY_AREAS: usize = 32;

/// Number of frames between performance log outputs.
pub const PERF_LOG_INTERVAL: u32 = 120;

/// Static description of the panel the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Horizontal resolution in pixels.
    pub width: u16,
    /// Vertical resolution in pixels.
    pub height: u16,
    /// Accelerator completion timeout for a single region copy.
    pub copy_timeout_ms: u32,
}

impl DisplayConfig {
    /// 800x480 OTM8009A panel on the STM32F469 discovery board.
    pub const OTM8009A: Self = Self::new(800, 480);

    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            copy_timeout_ms: COPY_TIMEOUT_MS,
        }
    }

    pub const fn with_copy_timeout(mut self, timeout_ms: u32) -> Self {
        self.copy_timeout_ms = timeout_ms;
        self
    }

    /// Pixels in one unpadded framebuffer.
    pub const fn framebuffer_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::OTM8009A
    }
}
