//! Canvas setup: device pixel ratio handling and coordinate helpers.
//!
//! egui already renders at the native pixel density, so the adapter here is
//! mostly bookkeeping: it keeps the logical (points) and physical (pixels)
//! sizes of the canvas in sync and snaps thin lines onto the pixel grid.

mod color;
mod draw;

pub use color::{Palette, glow_stops, parse_color, resolve_color};
pub use draw::CanvasPainter;

use eframe::egui;

use crate::types::{CanvasOptions, Point};

/// Logical vs. physical size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DpiAdapter {
    pub dpr: f32,
    pub logical_width: f32,
    pub logical_height: f32,
    pub actual_width: u32,
    pub actual_height: u32,
}

impl DpiAdapter {
    pub fn new(logical_width: f32, logical_height: f32, dpr: f32) -> Self {
        let dpr = sanitize_dpr(dpr);
        Self {
            dpr,
            logical_width,
            logical_height,
            actual_width: (logical_width * dpr).round().max(0.0) as u32,
            actual_height: (logical_height * dpr).round().max(0.0) as u32,
        }
    }

    pub fn from_options(options: &CanvasOptions) -> Self {
        Self::new(options.width, options.height, options.device_pixel_ratio)
    }

    /// Recomputes the physical size if the ratio or logical size changed.
    /// Returns `true` when anything was updated.
    pub fn update(&mut self, options: &CanvasOptions) -> bool {
        let next = Self::from_options(options);
        if next == *self {
            return false;
        }
        if next.dpr != self.dpr {
            log::debug!("Device pixel ratio changed: {} -> {}", self.dpr, next.dpr);
        }
        *self = next;
        true
    }

    /// Moves a coordinate onto the centre of a physical pixel so 1px lines
    /// stay sharp.
    pub fn snap(&self, logical: f32) -> f32 {
        ((logical * self.dpr).floor() + 0.5) / self.dpr
    }
}

fn sanitize_dpr(dpr: f32) -> f32 {
    if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 }
}

/// Inverse of [`image_to_canvas_coords`]: remove the offset, then the scale.
pub fn canvas_to_image_coords(
    canvas_x: f32,
    canvas_y: f32,
    scale_x: f32,
    scale_y: f32,
    offset_x: f32,
    offset_y: f32,
) -> (f32, f32) {
    ((canvas_x - offset_x) / scale_x, (canvas_y - offset_y) / scale_y)
}

pub fn image_to_canvas_coords(
    image_x: f32,
    image_y: f32,
    scale_x: f32,
    scale_y: f32,
    offset_x: f32,
    offset_y: f32,
) -> (f32, f32) {
    (image_x * scale_x + offset_x, image_y * scale_y + offset_y)
}

/// Pointer position relative to the canvas' top-left corner.
pub fn mouse_position(pointer: egui::Pos2, canvas_rect: egui::Rect) -> Point {
    Point::from(pointer - canvas_rect.min.to_vec2())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpi_adapter_scales_actual_size() {
        let adapter = DpiAdapter::new(400.0, 300.0, 2.0);
        assert_eq!(adapter.actual_width, 800);
        assert_eq!(adapter.actual_height, 600);

        let fractional = DpiAdapter::new(101.0, 51.0, 1.5);
        assert_eq!(fractional.actual_width, 152);
        assert_eq!(fractional.actual_height, 77);
    }

    #[test]
    fn test_dpi_adapter_invalid_ratio_falls_back_to_one() {
        assert_eq!(DpiAdapter::new(10.0, 10.0, 0.0).dpr, 1.0);
        assert_eq!(DpiAdapter::new(10.0, 10.0, f32::NAN).dpr, 1.0);
    }

    #[test]
    fn test_dpi_adapter_update_reports_change() {
        let mut options = CanvasOptions {
            width: 100.0,
            height: 100.0,
            device_pixel_ratio: 1.0,
        };
        let mut adapter = DpiAdapter::from_options(&options);
        assert!(!adapter.update(&options));

        options.device_pixel_ratio = 2.0;
        assert!(adapter.update(&options));
        assert_eq!(adapter.actual_width, 200);
    }

    #[test]
    fn test_snap_lands_on_pixel_centre() {
        let adapter = DpiAdapter::new(100.0, 100.0, 2.0);
        assert_eq!(adapter.snap(10.0), 10.25);
        let adapter = DpiAdapter::new(100.0, 100.0, 1.0);
        assert_eq!(adapter.snap(10.3), 10.5);
    }

    #[test]
    fn test_coordinate_round_trip() {
        let (cx, cy) = image_to_canvas_coords(640.0, 360.0, 0.4, 0.4, 20.0, 75.0);
        assert!((cx - 276.0).abs() < 1e-4);
        assert!((cy - 219.0).abs() < 1e-4);

        let (ix, iy) = canvas_to_image_coords(cx, cy, 0.4, 0.4, 20.0, 75.0);
        assert!((ix - 640.0).abs() < 1e-3);
        assert!((iy - 360.0).abs() < 1e-3);
    }

    #[test]
    fn test_mouse_position_relative_to_canvas() {
        let rect = egui::Rect::from_min_size(egui::pos2(30.0, 40.0), egui::vec2(200.0, 100.0));
        let p = mouse_position(egui::pos2(35.0, 60.0), rect);
        assert_eq!(p, Point::new(5.0, 20.0));
    }
}
