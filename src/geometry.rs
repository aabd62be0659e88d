//! Screen geometry primitives shared by the layout engine, frames and the display gateway.
use serde::{Deserialize, Serialize};

/// An x, y coordinate pair in root-window space.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Absolute x coordinate
    pub x: i32,
    /// Absolute y coordinate
    pub y: i32,
}

impl Point {
    /// Construct a new [Point].
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two points, used by directional focus search
    /// (spec.md §4.5, "Focus movement").
    pub fn manhattan_distance(&self, other: &Point) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }
}

/// An on-screen rectangle: top-left corner plus extent. Used for monitor rects,
/// usable rects, tiled/floating geometries and frame geometries alike.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// x-coordinate of the top-left corner
    pub x: i32,
    /// y-coordinate of the top-left corner
    pub y: i32,
    /// width in pixels
    pub w: u32,
    /// height in pixels
    pub h: u32,
}

impl Rect {
    /// Construct a new [Rect].
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// The center point of this rectangle, used for directional neighbor search.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w as i32 / 2, self.y + self.h as i32 / 2)
    }

    /// Shrink this rectangle by `px` on every side, clamping to zero size rather
    /// than going negative. Used to apply gaps (spec.md §4.3).
    pub fn shrink(&self, px: u32) -> Rect {
        let shrink_w = (px as i64 * 2).min(self.w as i64) as u32;
        let shrink_h = (px as i64 * 2).min(self.h as i64) as u32;
        Rect {
            x: self.x + px as i32,
            y: self.y + px as i32,
            w: self.w.saturating_sub(shrink_w),
            h: self.h.saturating_sub(shrink_h),
        }
    }

    /// Inset this rectangle on all four sides by `px`, used to compute a client's
    /// geometry inside its frame: `(outer+inner, outer+inner, w - 2*(outer+inner),
    /// h - 2*(outer+inner))` per spec.md §4.2.
    pub fn inset(&self, px: u32) -> Rect {
        Rect {
            x: self.x + px as i32,
            y: self.y + px as i32,
            w: self.w.saturating_sub(px * 2),
            h: self.h.saturating_sub(px * 2),
        }
    }

    /// Split this rect vertically at `ratio` (0.0-1.0) into a left and right part.
    pub fn split_vertical(&self, ratio: f32) -> (Rect, Rect) {
        let left_w = (self.w as f32 * ratio).round() as u32;
        (
            Rect::new(self.x, self.y, left_w, self.h),
            Rect::new(self.x + left_w as i32, self.y, self.w - left_w, self.h),
        )
    }

    /// Split this rect horizontally at `ratio` (0.0-1.0) into a top and bottom part.
    pub fn split_horizontal(&self, ratio: f32) -> (Rect, Rect) {
        let top_h = (self.h as f32 * ratio).round() as u32;
        (
            Rect::new(self.x, self.y, self.w, top_h),
            Rect::new(self.x, self.y + top_h as i32, self.w, self.h - top_h),
        )
    }

    /// Whether this rect is wider than it is tall. The BSP layout splits a leaf
    /// along its longer dimension on insertion (spec.md §4.3).
    pub fn is_wider_than_tall(&self) -> bool {
        self.w >= self.h
    }

    /// Scale this rect to `factor` of its width and height, centered within
    /// itself. Used for the floating-center default (spec.md §4.5) and the
    /// scratchpad geometry (spec.md §4.5, 80%x60%).
    pub fn centered_scaled(&self, w_factor: f64, h_factor: f64) -> Rect {
        let w = (self.w as f64 * w_factor).round() as u32;
        let h = (self.h as f64 * h_factor).round() as u32;
        Rect {
            x: self.x + (self.w as i64 - w as i64) as i32 / 2,
            y: self.y + (self.h as i64 - h as i64) as i32 / 2,
            w,
            h,
        }
    }

    /// Translate this rect by a percentage of `bounds`' width/height, used by
    /// `move <dir>` on floating windows (spec.md §4.5, "monitor-relative 5%").
    pub fn translated_by_fraction(&self, bounds: &Rect, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x + (bounds.w as f64 * dx).round() as i32,
            y: self.y + (bounds.h as f64 * dy).round() as i32,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(Rect::new(0, 0, 100, 100), 10, Rect::new(10, 10, 80, 80); "simple")]
    #[test_case(Rect::new(0, 0, 10, 10), 10, Rect::new(10, 10, 0, 0); "clamped to zero")]
    #[test]
    fn shrink_works(r: Rect, px: u32, expected: Rect) {
        assert_eq!(r.shrink(px), expected);
    }

    #[test]
    fn split_vertical_sums_to_original_width() {
        let r = Rect::new(0, 0, 1000, 800);
        let (left, right) = r.split_vertical(0.5);

        assert_eq!(left.w + right.w, r.w);
        assert_eq!(left.x, r.x);
        assert_eq!(right.x, left.x + left.w as i32);
    }

    #[test]
    fn center_is_midpoint() {
        let r = Rect::new(0, 0, 100, 200);
        assert_eq!(r.center(), Point::new(50, 100));
    }

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.manhattan_distance(&b), 7);
        assert_eq!(b.manhattan_distance(&a), 7);
    }
}
