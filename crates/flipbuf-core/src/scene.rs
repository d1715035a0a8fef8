//! Bouncing-box demo used by the firmware and the host simulator to drive
//! the pipeline the way a retained-mode toolkit would: invalidate, join,
//! then redraw and flush one unmerged area per pass.

use flipbuf_hal::Pixel;

use crate::geometry::{DirtyRegionSet, Rect};
use crate::surface::{rgb565, Surface};

pub const BACKGROUND: Pixel = rgb565(20, 20, 30);
pub const BOX_COLOR: Pixel = rgb565(255, 160, 0);

/// A square moving at constant velocity, reflecting off the screen edges.
#[derive(Debug, Clone)]
pub struct BouncingBox {
    screen: Rect,
    size: u16,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    first_frame: bool,
}

impl BouncingBox {
    /// `size` is clamped so the box always fits on screen.
    pub fn new(width: u16, height: u16, size: u16) -> Self {
        let size = size.clamp(1, width.min(height));
        Self {
            screen: Rect::full(width, height),
            size,
            x: 0,
            y: 0,
            dx: 3,
            dy: 2,
            first_frame: true,
        }
    }

    pub fn with_velocity(mut self, dx: i32, dy: i32) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    /// Current box rectangle.
    pub fn rect(&self) -> Rect {
        let x = self.x as u16;
        let y = self.y as u16;
        Rect::new(x, y, x + self.size - 1, y + self.size - 1)
    }

    fn advance(&mut self) {
        let max_x = (self.screen.width() - self.size) as i32;
        let max_y = (self.screen.height() - self.size) as i32;

        self.x += self.dx;
        if self.x < 0 || self.x > max_x {
            self.dx = -self.dx;
            self.x = self.x.clamp(0, max_x);
        }
        self.y += self.dy;
        if self.y < 0 || self.y > max_y {
            self.dy = -self.dy;
            self.y = self.y.clamp(0, max_y);
        }
    }

    /// Invalidate the whole screen on the next frame, e.g. after a dropped
    /// frame left the surfaces out of step.
    pub fn redraw_all(&mut self) {
        self.first_frame = true;
    }

    /// Step the animation and record what must be redrawn this frame.
    ///
    /// The first frame invalidates the whole screen.
    pub fn begin_frame(&mut self, dirty: &mut DirtyRegionSet) {
        dirty.clear();
        if self.first_frame {
            self.first_frame = false;
            dirty.invalidate(self.screen, self.screen);
            return;
        }
        dirty.invalidate(self.rect(), self.screen);
        self.advance();
        dirty.invalidate(self.rect(), self.screen);
        dirty.join();
    }

    /// Redraw everything inside `area`.
    pub fn render_area(&self, surface: &mut Surface<'_>, area: Rect) {
        surface.fill_rect(area, BACKGROUND);
        if let Some(visible) = self.rect().intersection(&area) {
            surface.fill_rect(visible, BOX_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_invalidates_screen() {
        let mut scene = BouncingBox::new(64, 48, 8);
        let mut dirty = DirtyRegionSet::new();
        scene.begin_frame(&mut dirty);
        assert_eq!(dirty.unmerged().collect::<std::vec::Vec<_>>(), [Rect::full(64, 48)]);
    }

    #[test]
    fn small_step_joins_old_and_new_box() {
        let mut scene = BouncingBox::new(64, 48, 8).with_velocity(2, 1);
        let mut dirty = DirtyRegionSet::new();
        scene.begin_frame(&mut dirty);
        scene.begin_frame(&mut dirty);

        assert_eq!(dirty.len(), 2);
        let unmerged: std::vec::Vec<_> = dirty.unmerged().collect();
        assert_eq!(unmerged, [Rect::new(0, 0, 9, 8)]);
    }

    #[test]
    fn redraw_all_invalidates_screen_once() {
        let mut scene = BouncingBox::new(64, 48, 8);
        let mut dirty = DirtyRegionSet::new();
        scene.begin_frame(&mut dirty);
        scene.begin_frame(&mut dirty);
        scene.redraw_all();
        scene.begin_frame(&mut dirty);
        assert_eq!(dirty.unmerged().collect::<std::vec::Vec<_>>(), [Rect::full(64, 48)]);
        scene.begin_frame(&mut dirty);
        assert_ne!(dirty.unmerged().next(), Some(Rect::full(64, 48)));
    }

    #[test]
    fn bounces_inside_screen() {
        let mut scene = BouncingBox::new(20, 10, 8).with_velocity(7, 5);
        let mut dirty = DirtyRegionSet::new();
        for _ in 0..50 {
            scene.begin_frame(&mut dirty);
            assert!(scene.rect().fits_within(20, 10));
        }
    }
}
