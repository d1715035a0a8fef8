//! Rectangles and the per-frame dirty area list.

use crate::config::MAX_DIRTY_AREAS;

/// Rectangle with inclusive pixel bounds `(x1, y1)`-`(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl Rect {
    pub const fn new(x1: u16, y1: u16, x2: u16, y2: u16) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rectangle covering a whole `width` x `height` grid.
    pub const fn full(width: u16, height: u16) -> Self {
        Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
    }

    /// Build from a top-left corner and a size. Returns `None` for an empty
    /// size or when the far edge does not fit in `u16`.
    pub fn from_origin_size(x: u16, y: u16, width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let x2 = x.checked_add(width - 1)?;
        let y2 = y.checked_add(height - 1)?;
        Some(Self::new(x, y, x2, y2))
    }

    /// True when the corners are ordered (`x1 <= x2`, `y1 <= y2`).
    pub fn is_ordered(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// True when the rectangle is ordered and lies inside a
    /// `width` x `height` grid.
    pub fn fits_within(&self, width: u16, height: u16) -> bool {
        self.is_ordered() && self.x2 < width && self.y2 < height
    }

    /// Width in pixels. Only meaningful for ordered rectangles.
    pub fn width(&self) -> u16 {
        self.x2 - self.x1 + 1
    }

    /// Height in pixels. Only meaningful for ordered rectangles.
    pub fn height(&self) -> u16 {
        self.y2 - self.y1 + 1
    }

    pub fn area(&self) -> u32 {
        self.width() as u32 * self.height() as u32
    }

    pub fn contains_point(&self, x: u16, y: u16) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x1 >= self.x1 && other.x2 <= self.x2 && other.y1 >= self.y1 && other.y2 <= self.y2
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x1 <= other.x2 && self.x2 >= other.x1 && self.y1 <= other.y2 && self.y2 >= other.y1
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        ))
    }

    /// Smallest rectangle covering both.
    pub fn bounding(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }
}

/// One entry of a [`DirtyRegionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyArea {
    pub rect: Rect,
    /// The area was absorbed into another entry of the set and must not be
    /// copied on its own.
    pub merged: bool,
}

/// Returned when a [`DirtyRegionSet`] has no room left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSetFull(pub Rect);

/// Ordered list of areas redrawn during the current frame.
///
/// Built by the renderer. The flush pipeline only reads it; the
/// [`invalidate`](Self::invalidate) and [`join`](Self::join) helpers exist
/// for renderers that do not track invalidation themselves.
#[derive(Debug, Clone, Default)]
pub struct DirtyRegionSet {
    areas: heapless::Vec<DirtyArea, MAX_DIRTY_AREAS>,
}

impl DirtyRegionSet {
    pub const fn new() -> Self {
        Self {
            areas: heapless::Vec::new(),
        }
    }

    /// Append an area that must be copied.
    pub fn push(&mut self, rect: Rect) -> Result<(), RegionSetFull> {
        self.push_area(DirtyArea { rect, merged: false })
    }

    /// Append an area that was absorbed by another entry.
    pub fn push_merged(&mut self, rect: Rect) -> Result<(), RegionSetFull> {
        self.push_area(DirtyArea { rect, merged: true })
    }

    pub fn push_area(&mut self, area: DirtyArea) -> Result<(), RegionSetFull> {
        self.areas.push(area).map_err(|a| RegionSetFull(a.rect))
    }

    /// Flag the entry at `index` as absorbed. Returns false if out of range.
    pub fn mark_merged(&mut self, index: usize) -> bool {
        match self.areas.get_mut(index) {
            Some(area) => {
                area.merged = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.areas.clear();
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirtyArea> + '_ {
        self.areas.iter()
    }

    /// Areas that still have to be copied, in insertion order.
    pub fn unmerged(&self) -> impl Iterator<Item = Rect> + '_ {
        self.areas.iter().filter(|a| !a.merged).map(|a| a.rect)
    }

    /// Record `rect` as redrawn on a `screen`-sized display.
    ///
    /// The rectangle is clipped to the screen and dropped when an existing
    /// unmerged area already covers it. When the set is full the whole
    /// screen is invalidated instead.
    pub fn invalidate(&mut self, rect: Rect, screen: Rect) {
        let Some(clipped) = rect.intersection(&screen) else {
            return;
        };
        if self.unmerged().any(|r| r.contains(&clipped)) {
            return;
        }
        if self.push(clipped).is_err() {
            self.areas.clear();
            // Cannot fail: the set was just emptied.
            let _ = self.push(screen);
        }
    }

    /// Fold overlapping areas together.
    ///
    /// Two unmerged areas that share pixels are replaced by their bounding
    /// box when it is smaller than their summed areas; the absorbed one is
    /// flagged merged. Inverted areas are never joined.
    pub fn join(&mut self) {
        let n = self.areas.len();
        for into in 0..n {
            if self.areas[into].merged {
                continue;
            }
            for from in 0..n {
                if from == into || self.areas[from].merged || self.areas[into].merged {
                    continue;
                }
                let a = self.areas[into].rect;
                let b = self.areas[from].rect;
                // Inverted areas are left for the flush to reject.
                if !a.is_ordered() || !b.is_ordered() || !a.intersects(&b) {
                    continue;
                }
                let joined = a.bounding(&b);
                if joined.area() < a.area() + b.area() {
                    self.areas[into].rect = joined;
                    self.areas[from].merged = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_dimensions() {
        let r = Rect::new(10, 10, 50, 50);
        assert_eq!(r.width(), 41);
        assert_eq!(r.height(), 41);
        assert_eq!(r.area(), 41 * 41);
    }

    #[test]
    fn fits_within_rejects_edge_and_inverted() {
        assert!(Rect::new(0, 0, 799, 479).fits_within(800, 480));
        assert!(!Rect::new(0, 0, 800, 479).fits_within(800, 480));
        assert!(!Rect::new(0, 0, 799, 480).fits_within(800, 480));
        assert!(!Rect::new(20, 0, 10, 5).fits_within(800, 480));
    }

    #[test]
    fn from_origin_size() {
        assert_eq!(Rect::from_origin_size(5, 6, 10, 2), Some(Rect::new(5, 6, 14, 7)));
        assert_eq!(Rect::from_origin_size(5, 6, 0, 2), None);
        assert_eq!(Rect::from_origin_size(u16::MAX, 0, 2, 1), None);
    }

    #[test]
    fn intersection_and_bounding() {
        let a = Rect::new(0, 0, 9, 9);
        let b = Rect::new(5, 5, 14, 14);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 9, 9)));
        assert_eq!(a.bounding(&b), Rect::new(0, 0, 14, 14));
        assert_eq!(a.intersection(&Rect::new(10, 0, 12, 2)), None);
    }

    #[test]
    fn invalidate_clips_and_skips_covered() {
        let screen = Rect::full(100, 50);
        let mut set = DirtyRegionSet::new();
        set.invalidate(Rect::new(90, 40, 120, 70), screen);
        set.invalidate(Rect::new(92, 42, 95, 45), screen);
        set.invalidate(Rect::new(200, 200, 210, 210), screen);
        assert_eq!(set.len(), 1);
        assert_eq!(set.unmerged().next(), Some(Rect::new(90, 40, 99, 49)));
    }

    #[test]
    fn invalidate_overflow_falls_back_to_full_screen() {
        let screen = Rect::full(800, 480);
        let mut set = DirtyRegionSet::new();
        for i in 0..=MAX_DIRTY_AREAS as u16 {
            set.invalidate(Rect::new(i * 20, 0, i * 20 + 5, 5), screen);
        }
        assert_eq!(set.len(), 1);
        assert_eq!(set.unmerged().next(), Some(screen));
    }

    #[test]
    fn join_marks_absorbed_area() {
        let mut set = DirtyRegionSet::new();
        set.push(Rect::new(0, 0, 19, 19)).unwrap();
        set.push(Rect::new(10, 10, 29, 29)).unwrap();
        set.push(Rect::new(100, 100, 109, 109)).unwrap();
        set.join();

        let areas: std::vec::Vec<_> = set.iter().copied().collect();
        assert_eq!(areas[0].rect, Rect::new(0, 0, 29, 29));
        assert!(!areas[0].merged);
        assert!(areas[1].merged);
        assert!(!areas[2].merged);
        assert_eq!(set.unmerged().count(), 2);
    }

    #[test]
    fn join_keeps_areas_when_union_is_wasteful() {
        let mut set = DirtyRegionSet::new();
        // Diagonal slivers touching at one pixel: bounding box is much larger.
        set.push(Rect::new(0, 0, 99, 0)).unwrap();
        set.push(Rect::new(99, 0, 99, 99)).unwrap();
        set.join();
        assert_eq!(set.unmerged().count(), 2);
    }

    #[test]
    fn join_skips_inverted_area() {
        let mut set = DirtyRegionSet::new();
        set.push(Rect::new(0, 0, 19, 19)).unwrap();
        set.push(Rect::new(15, 15, 5, 5)).unwrap();
        set.join();

        let areas: std::vec::Vec<_> = set.iter().copied().collect();
        assert_eq!(areas[0].rect, Rect::new(0, 0, 19, 19));
        assert!(!areas[1].merged);
        assert_eq!(areas[1].rect, Rect::new(15, 15, 5, 5));
    }

    #[test]
    fn mark_merged_hides_area_from_unmerged() {
        let mut set = DirtyRegionSet::new();
        set.push(Rect::new(0, 0, 9, 9)).unwrap();
        set.push(Rect::new(20, 20, 29, 29)).unwrap();

        assert!(set.mark_merged(0));
        assert!(!set.mark_merged(2));
        assert_eq!(set.len(), 2);
        let left: std::vec::Vec<_> = set.unmerged().collect();
        assert_eq!(left, [Rect::new(20, 20, 29, 29)]);
    }
}
