//! Framebuffer surfaces and the A/B swap bookkeeping.

use flipbuf_hal::{FrameAddress, Pixel};

use crate::geometry::Rect;

/// Pack 8-bit RGB into an RGB565 pixel.
pub const fn rgb565(r: u8, g: u8, b: u8) -> Pixel {
    (((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3)
}

/// Error building a [`Surface`] from a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceError {
    /// Width or height is zero.
    Empty,
    /// Stride is smaller than the width.
    StrideTooSmall { width: u16, stride: u16 },
    /// The buffer holds fewer than `stride * height` pixels.
    BufferTooSmall { needed: usize, len: usize },
}

/// A fixed-size framebuffer the panel can scan out.
///
/// The pixel storage is borrowed for `'a`; on target it is a `'static`
/// buffer placed in external SDRAM.
pub struct Surface<'a> {
    pixels: &'a mut [Pixel],
    width: u16,
    height: u16,
    stride: u16,
}

impl<'a> Surface<'a> {
    /// Wrap an unpadded buffer (`stride == width`).
    pub fn new(pixels: &'a mut [Pixel], width: u16, height: u16) -> Result<Self, SurfaceError> {
        Self::with_stride(pixels, width, height, width)
    }

    /// Wrap a buffer whose lines are `stride` pixels apart.
    pub fn with_stride(
        pixels: &'a mut [Pixel],
        width: u16,
        height: u16,
        stride: u16,
    ) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::Empty);
        }
        if stride < width {
            return Err(SurfaceError::StrideTooSmall { width, stride });
        }
        let needed = stride as usize * height as usize;
        if pixels.len() < needed {
            return Err(SurfaceError::BufferTooSmall {
                needed,
                len: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Distance between the starts of two consecutive lines, in pixels.
    pub fn stride(&self) -> u16 {
        self.stride
    }

    /// Address of the top-left pixel, as handed to the timing generator.
    pub fn base_address(&self) -> FrameAddress {
        self.pixels.as_ptr() as FrameAddress
    }

    pub fn bounds(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.stride as usize + x as usize
    }

    /// Read one pixel. Panics when `(x, y)` is outside the surface.
    pub fn pixel(&self, x: u16, y: u16) -> Pixel {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.pixels[self.index(x, y)]
    }

    /// Write one pixel. Panics when `(x, y)` is outside the surface.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: Pixel) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    /// The visible pixels of line `y`.
    pub fn line(&self, y: u16) -> &[Pixel] {
        let start = self.index(0, y);
        &self.pixels[start..start + self.width as usize]
    }

    pub fn line_mut(&mut self, y: u16) -> &mut [Pixel] {
        let start = self.index(0, y);
        &mut self.pixels[start..start + self.width as usize]
    }

    pub fn fill(&mut self, color: Pixel) {
        for y in 0..self.height {
            self.line_mut(y).fill(color);
        }
    }

    /// Fill the part of `rect` that lies on the surface.
    pub fn fill_rect(&mut self, rect: Rect, color: Pixel) {
        let Some(clip) = rect.intersection(&self.bounds()) else {
            return;
        };
        for y in clip.y1..=clip.y2 {
            self.line_mut(y)[clip.x1 as usize..=clip.x2 as usize].fill(color);
        }
    }

    /// Raw storage including stride padding.
    pub fn as_slice(&self) -> &[Pixel] {
        &*self.pixels
    }

    pub fn as_mut_slice(&mut self) -> &mut [Pixel] {
        &mut *self.pixels
    }

    /// True when both surfaces have the same geometry and visible content.
    pub fn same_content(&self, other: &Surface<'_>) -> bool {
        self.width == other.width
            && self.height == other.height
            && (0..self.height).all(|y| self.line(y) == other.line(y))
    }
}

impl core::fmt::Debug for Surface<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Surface")
            .field("base", &format_args!("{:#x}", self.base_address()))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish()
    }
}

/// Names one of the two surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    A,
    B,
}

impl SurfaceId {
    pub fn other(self) -> Self {
        match self {
            SurfaceId::A => SurfaceId::B,
            SurfaceId::B => SurfaceId::A,
        }
    }
}

/// Which surface is scanned out and which one the renderer draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapState {
    /// Surface the timing generator scans out once the last requested
    /// flip has been applied.
    pub front: SurfaceId,
    /// Surface the renderer must draw the next frame into.
    pub draw: SurfaceId,
}

impl SwapState {
    /// State after bring-up: A is on screen and, as in the toolkit's direct
    /// mode, the first frame is drawn into A as well.
    pub const INITIAL: Self = Self {
        front: SurfaceId::A,
        draw: SurfaceId::A,
    };

    /// Record a flip request for `new_front`.
    pub fn present(&mut self, new_front: SurfaceId) {
        self.front = new_front;
        self.draw = new_front.other();
    }
}

/// The two equally sized framebuffers plus their swap state.
pub struct SurfacePair<'a> {
    a: Surface<'a>,
    b: Surface<'a>,
    swap: SwapState,
}

impl<'a> SurfacePair<'a> {
    /// Pair two surfaces. Returns them back when their geometry differs.
    pub fn new(a: Surface<'a>, b: Surface<'a>) -> Result<Self, (Surface<'a>, Surface<'a>)> {
        if a.width != b.width || a.height != b.height || a.stride != b.stride {
            return Err((a, b));
        }
        Ok(Self {
            a,
            b,
            swap: SwapState::INITIAL,
        })
    }

    pub fn get(&self, id: SurfaceId) -> &Surface<'a> {
        match id {
            SurfaceId::A => &self.a,
            SurfaceId::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> &mut Surface<'a> {
        match id {
            SurfaceId::A => &mut self.a,
            SurfaceId::B => &mut self.b,
        }
    }

    /// Borrow `source` for reading and the other surface for writing.
    pub fn split(&mut self, source: SurfaceId) -> (&Surface<'a>, &mut Surface<'a>) {
        match source {
            SurfaceId::A => (&self.a, &mut self.b),
            SurfaceId::B => (&self.b, &mut self.a),
        }
    }

    /// Identify a surface by its base address.
    pub fn id_of(&self, addr: FrameAddress) -> Option<SurfaceId> {
        if addr == self.a.base_address() {
            Some(SurfaceId::A)
        } else if addr == self.b.base_address() {
            Some(SurfaceId::B)
        } else {
            None
        }
    }

    pub fn swap_state(&self) -> SwapState {
        self.swap
    }

    pub(crate) fn swap_state_mut(&mut self) -> &mut SwapState {
        &mut self.swap
    }

    pub fn width(&self) -> u16 {
        self.a.width
    }

    pub fn height(&self) -> u16 {
        self.a.height
    }
}
