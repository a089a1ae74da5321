//! Drawing helpers over an egui painter clipped to the canvas.
//!
//! All coordinates are logical and relative to the canvas' top-left corner.

use std::f32::consts::TAU;

use eframe::egui::{self, Color32, Pos2, Rect, Stroke};

use super::{DpiAdapter, Palette, glow_stops, parse_color, resolve_color};
use crate::types::Point;

const GLOW_SEGMENTS: usize = 32;

pub struct CanvasPainter<'a> {
    painter: egui::Painter,
    origin: Pos2,
    adapter: DpiAdapter,
    palette: &'a Palette,
}

impl<'a> CanvasPainter<'a> {
    pub fn new(painter: egui::Painter, canvas_rect: Rect, dpr: f32, palette: &'a Palette) -> Self {
        Self {
            painter,
            origin: canvas_rect.min,
            adapter: DpiAdapter::new(canvas_rect.width(), canvas_rect.height(), dpr),
            palette,
        }
    }

    /// Resolves palette variables and parses the result; unparsable colors
    /// draw as white.
    pub fn color(&self, color: &str) -> Color32 {
        let resolved = resolve_color(color, self.palette);
        parse_color(&resolved).unwrap_or_else(|e| {
            log::trace!("{e}, using white");
            Color32::WHITE
        })
    }

    fn abs(&self, p: Point) -> Pos2 {
        self.origin + Pos2::from(p).to_vec2()
    }

    fn abs_rect(&self, min: Point, width: f32, height: f32) -> Rect {
        Rect::from_min_size(self.abs(min), egui::vec2(width, height))
    }

    fn logical_rect(&self) -> Rect {
        self.abs_rect(
            Point::ZERO,
            self.adapter.logical_width,
            self.adapter.logical_height,
        )
    }

    pub fn clear(&self, color: &str) {
        self.painter
            .rect_filled(self.logical_rect(), 0.0, self.color(color));
    }

    pub fn draw_image(&self, texture: &egui::TextureHandle, top_left: Point, width: f32, height: f32) {
        self.painter.image(
            texture.id(),
            self.abs_rect(top_left, width, height),
            Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );
    }

    /// Thin line snapped to pixel centres.
    pub fn draw_smooth_line(&self, from: Point, to: Point, line_width: f32, color: &str) {
        let snap = |p: Point| self.abs(Point::new(self.adapter.snap(p.x), self.adapter.snap(p.y)));
        self.painter.line_segment(
            [snap(from), snap(to)],
            Stroke::new(line_width, self.color(color)),
        );
    }

    pub fn draw_dashed_rect(
        &self,
        top_left: Point,
        width: f32,
        height: f32,
        color: &str,
        line_width: f32,
        dash: [f32; 2],
    ) {
        let x0 = self.adapter.snap(top_left.x);
        let y0 = self.adapter.snap(top_left.y);
        let corners = [
            Point::new(x0, y0),
            Point::new(x0 + width, y0),
            Point::new(x0 + width, y0 + height),
            Point::new(x0, y0 + height),
            Point::new(x0, y0),
        ];
        let path: Vec<Pos2> = corners.iter().map(|p| self.abs(*p)).collect();
        let stroke = Stroke::new(line_width, self.color(color));
        self.painter
            .extend(egui::Shape::dashed_line(&path, stroke, dash[0], dash[1]));
    }

    /// Dims the whole canvas except `hole`.
    pub fn draw_overlay(&self, hole_top_left: Point, width: f32, height: f32, color: &str) {
        let fill = self.color(color);
        let canvas = self.logical_rect();
        let hole = self
            .abs_rect(hole_top_left, width, height)
            .intersect(canvas);

        if hole.width() <= 0.0 || hole.height() <= 0.0 {
            self.painter.rect_filled(canvas, 0.0, fill);
            return;
        }

        // Top
        self.painter.rect_filled(
            Rect::from_min_max(canvas.min, egui::pos2(canvas.max.x, hole.min.y)),
            0.0,
            fill,
        );
        // Bottom
        self.painter.rect_filled(
            Rect::from_min_max(egui::pos2(canvas.min.x, hole.max.y), canvas.max),
            0.0,
            fill,
        );
        // Left
        self.painter.rect_filled(
            Rect::from_min_max(
                egui::pos2(canvas.min.x, hole.min.y),
                egui::pos2(hole.min.x, hole.max.y),
            ),
            0.0,
            fill,
        );
        // Right
        self.painter.rect_filled(
            Rect::from_min_max(
                egui::pos2(hole.max.x, hole.min.y),
                egui::pos2(canvas.max.x, hole.max.y),
            ),
            0.0,
            fill,
        );
    }

    /// Solid dot with a white ring and an optional radial glow of twice the
    /// dot size.
    pub fn draw_anchor(&self, center: Point, color: &str, size: f32, glow: bool) {
        let resolved = resolve_color(color, self.palette);
        let fill = self.color(&resolved);
        let center = self.abs(center);

        if glow {
            let (start, end) = glow_stops(&resolved);
            let start = parse_color(&start).unwrap_or(fill.gamma_multiply(0.5));
            let end = parse_color(&end).unwrap_or(Color32::TRANSPARENT);
            self.painter
                .add(egui::Shape::mesh(radial_gradient(center, size * 2.0, start, end)));
        }

        self.painter.circle_filled(center, size / 2.0, fill);
        self.painter
            .circle_stroke(center, size / 2.0, Stroke::new(2.0, Color32::WHITE));
    }

    pub fn draw_text(&self, pos: Point, text: impl ToString, color: &str) {
        self.painter.text(
            self.abs(pos),
            egui::Align2::LEFT_BOTTOM,
            text,
            egui::FontId::monospace(12.0),
            self.color(color),
        );
    }
}

/// Triangle fan from `inner` at the centre to `outer` on the rim.
fn radial_gradient(center: Pos2, radius: f32, inner: Color32, outer: Color32) -> egui::epaint::Mesh {
    let mut mesh = egui::epaint::Mesh::default();
    mesh.colored_vertex(center, inner);
    for i in 0..GLOW_SEGMENTS {
        let angle = TAU * i as f32 / GLOW_SEGMENTS as f32;
        mesh.colored_vertex(center + radius * egui::vec2(angle.cos(), angle.sin()), outer);
    }
    let n = GLOW_SEGMENTS as u32;
    for i in 0..n {
        mesh.add_triangle(0, 1 + i, 1 + (i + 1) % n);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radial_gradient_is_closed_fan() {
        let mesh = radial_gradient(
            egui::pos2(10.0, 10.0),
            24.0,
            Color32::RED,
            Color32::TRANSPARENT,
        );
        assert_eq!(mesh.vertices.len(), GLOW_SEGMENTS + 1);
        assert_eq!(mesh.indices.len(), GLOW_SEGMENTS * 3);
        assert_eq!(mesh.vertices[0].color, Color32::RED);
        assert!(mesh.vertices[1..].iter().all(|v| v.color == Color32::TRANSPARENT));
        // Last triangle wraps back to the first rim vertex
        assert_eq!(mesh.indices[mesh.indices.len() - 1], 1);
    }
}
