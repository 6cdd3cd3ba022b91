//! Axis-aligned rectangles in pixel coordinates.

/// Axis-aligned rectangle with a top-left origin and an exclusive far edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge, saturating on overflow.
    pub fn right(&self) -> usize {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating on overflow.
    pub fn bottom(&self) -> usize {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Area shared by both rectangles.
    pub fn intersection_area(&self, other: &Rect) -> usize {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return 0;
        }
        (x1 - x0) * (y1 - y0)
    }

    /// Shared area divided by the smaller rectangle's area.
    pub fn overlap_ratio(&self, other: &Rect) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f32 / smaller as f32
    }
}

#[cfg(test)]
mod tests {
    use super::Rect;

    #[test]
    fn intersection_handles_disjoint_and_nested() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 5, 5);
        assert_eq!(a.intersection_area(&b), 0);

        let c = Rect::new(2, 3, 4, 4);
        assert_eq!(a.intersection_area(&c), 16);
        assert!((a.overlap_ratio(&c) - 1.0).abs() < 1e-6);
        assert!(a.contains_rect(&c));
        assert!(!c.contains_rect(&a));
    }

    #[test]
    fn overlap_ratio_uses_smaller_box() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(2, 0, 4, 4);
        assert!((a.overlap_ratio(&b) - 0.5).abs() < 1e-6);
    }
}
