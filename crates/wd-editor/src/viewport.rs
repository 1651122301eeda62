//! Pan and zoom.

use wd_core::config::ZoomConfig;
use wd_core::geometry::Point;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    /// Screen-space offset of the canvas origin.
    pub pan: Point,
    limits: ZoomConfig,
}

impl Viewport {
    pub fn new(limits: ZoomConfig) -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ORIGIN,
            limits,
        }
    }

    /// Set the zoom level, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.limits.min, self.limits.max);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * self.limits.increment);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / self.limits.increment);
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan = self.pan.offset(dx, dy);
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(
            canvas.x * self.zoom + self.pan.x,
            canvas.y * self.zoom + self.pan.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::new(ZoomConfig::default());
        for _ in 0..50 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, 5.0);
        for _ in 0..50 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, 0.1);
        vp.reset_zoom();
        assert_eq!(vp.zoom, 1.0);
    }

    #[test]
    fn screen_canvas_mapping() {
        let mut vp = Viewport::new(ZoomConfig::default());
        vp.pan_by(100.0, 50.0);
        vp.set_zoom(2.0);
        let c = vp.screen_to_canvas(Point::new(300.0, 250.0));
        assert_eq!(c, Point::new(100.0, 100.0));
        assert_eq!(vp.canvas_to_screen(c), Point::new(300.0, 250.0));
    }
}
