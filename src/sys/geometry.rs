use serde::{Deserialize, Serialize};

use crate::layout_engine::Direction;

/// Upper bound for any per-edge inset (gaps, border width).
pub const MAX_INSET: i32 = 4096;

/// An integer box in global layout coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool { self.width <= 0 || self.height <= 0 }

    pub fn max_x(&self) -> i32 { self.x.saturating_add(self.width) }

    pub fn max_y(&self) -> i32 { self.y.saturating_add(self.height) }

    pub fn center(&self) -> (i32, i32) {
        (self.x.saturating_add(self.width / 2), self.y.saturating_add(self.height / 2))
    }

    /// Largest inset that still leaves a non-negative box.
    pub fn max_inset(&self) -> i32 { (self.width.min(self.height) / 2).clamp(0, MAX_INSET) }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        !self.is_empty() && x >= self.x && x < self.max_x() && y >= self.y && y < self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    pub fn with_origin(self, x: i32, y: i32) -> Self { Self { x, y, ..self } }

    pub fn with_size(self, width: i32, height: i32) -> Self { Self { width, height, ..self } }

    /// Shrinks every edge by `amount`, never below an empty box.
    pub fn inset(self, amount: i32) -> Self {
        let twice = amount.saturating_mul(2);
        Self {
            x: self.x.saturating_add(amount),
            y: self.y.saturating_add(amount),
            width: self.width.saturating_sub(twice).max(0),
            height: self.height.saturating_sub(twice).max(0),
        }
    }

    /// Position of a point relative to this box, where 0.0 and 1.0 are the
    /// box edges.
    pub fn normalized_at(&self, x: i32, y: i32) -> (f64, f64) {
        let nx = if self.width > 0 {
            (x - self.x) as f64 / self.width as f64
        } else {
            0.0
        };
        let ny = if self.height > 0 {
            (y - self.y) as f64 / self.height as f64
        } else {
            0.0
        };
        (nx, ny)
    }

    pub fn distance_to(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Direction {
    /// Whether an offset `(dx, dy)` from a reference point lies in this
    /// direction. Offsets on the diagonal match both neighbouring directions.
    pub fn matches_offset(self, dx: i32, dy: i32) -> bool {
        match self {
            Direction::Left => dx < 0 && dy.abs() <= dx.abs(),
            Direction::Right => dx > 0 && dy.abs() <= dx.abs(),
            Direction::Up => dy < 0 && dx.abs() <= dy.abs(),
            Direction::Down => dy > 0 && dx.abs() <= dy.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point_excludes_far_edges() {
        let r = Rect::new(10, 10, 100, 50);
        assert!(r.contains_point(10, 10));
        assert!(r.contains_point(109, 59));
        assert!(!r.contains_point(110, 30));
        assert!(!Rect::new(0, 0, 0, 10).contains_point(0, 0));
    }

    #[test]
    fn inset_never_goes_negative() {
        assert_eq!(Rect::new(0, 0, 100, 40).inset(5), Rect::new(5, 5, 90, 30));
        assert_eq!(Rect::new(0, 0, 6, 6).inset(5), Rect::new(5, 5, 0, 0));
    }

    #[test]
    fn normalized_position_is_relative_to_origin() {
        let r = Rect::new(1920, 0, 1000, 500);
        assert_eq!(r.normalized_at(2170, 250), (0.25, 0.5));
        assert_eq!(Rect::default().normalized_at(5, 5), (0.0, 0.0));
    }

    #[test]
    fn direction_offsets() {
        assert!(Direction::Right.matches_offset(100, 20));
        assert!(!Direction::Right.matches_offset(-100, 0));
        assert!(Direction::Up.matches_offset(0, -10));
        assert!(!Direction::Up.matches_offset(30, -10));
    }
}
