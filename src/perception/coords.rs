//! Scaling between UI-tree (input) coordinates and screenshot pixels.
//!
//! `uiautomator` bounds and `input tap` share the device's logical display
//! space, but `screencap` may deliver a differently sized raster (display
//! size overrides, downscaled captures). Nothing assumes a 1:1 mapping.
use crate::perception::types::{Bounds, ScreenSize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    from: ScreenSize,
    to: ScreenSize,
}

impl CoordinateMapper {
    pub fn new(from: ScreenSize, to: ScreenSize) -> Self {
        Self { from, to }
    }

    pub fn identity(size: ScreenSize) -> Self {
        Self::new(size, size)
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.to, self.from)
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    fn scale(&self) -> (f64, f64) {
        let sx = if self.from.width == 0 {
            1.0
        } else {
            self.to.width as f64 / self.from.width as f64
        };
        let sy = if self.from.height == 0 {
            1.0
        } else {
            self.to.height as f64 / self.from.height as f64
        };
        (sx, sy)
    }

    pub fn map_point(&self, x: i32, y: i32) -> (i32, i32) {
        if self.is_identity() {
            return (x, y);
        }
        let (sx, sy) = self.scale();
        (
            (x as f64 * sx).round() as i32,
            (y as f64 * sy).round() as i32,
        )
    }

    pub fn map_bounds(&self, b: &Bounds) -> Bounds {
        let (x1, y1) = self.map_point(b.x1, b.y1);
        let (x2, y2) = self.map_point(b.x2, b.y2);
        Bounds::new(x1, y1, x2, y2)
    }
}
