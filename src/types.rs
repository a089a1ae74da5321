//! Plain value types shared by the canvas, session and export code.

use eframe::egui;

/// A point in either canvas (logical pixel) or image pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<egui::Pos2> for Point {
    fn from(pos: egui::Pos2) -> Self {
        Self::new(pos.x, pos.y)
    }
}

impl From<Point> for egui::Pos2 {
    fn from(point: Point) -> Self {
        egui::pos2(point.x, point.y)
    }
}

/// Rectangle between two anchors, in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropArea {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl CropArea {
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Builds an area from two arbitrary corners, ordering them so that
    /// `top_left` is the component-wise minimum.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            Point::new(a.x.min(b.x), a.y.min(b.y)),
            Point::new(a.x.max(b.x), a.y.max(b.y)),
        )
    }

    pub fn width(&self) -> f32 {
        (self.bottom_right.x - self.top_left.x).abs()
    }

    pub fn height(&self) -> f32 {
        (self.bottom_right.y - self.top_left.y).abs()
    }

    /// Pixel area of the crop; corner order does not matter.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn has_positive_area(&self) -> bool {
        self.bottom_right.x > self.top_left.x && self.bottom_right.y > self.top_left.y
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnchorId {
    First,
    Second,
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnchorId::First => "first",
            AnchorId::Second => "second",
        };
        write!(f, "{}", s)
    }
}

/// A draggable crop corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub id: AnchorId,
    pub point: Point,
    pub is_active: bool,
}

/// How many anchors have been placed so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorStatus {
    #[default]
    None,
    /// Only the first (top-left) anchor is set
    First,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseMode {
    #[default]
    Idle,
    Setting,
    Dragging,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseState {
    pub is_mouse_down: bool,
    pub start_pos: Point,
    pub current_pos: Point,
    pub mode: MouseMode,
    pub dragging_anchor: Option<AnchorId>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasOptions {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

/// A loaded image: `width`/`height` is the displayed size on the canvas,
/// `natural_*` the decoded pixel size.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageInfo {
    pub source: String,
    pub width: f32,
    pub height: f32,
    pub natural_width: u32,
    pub natural_height: u32,
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Snapshot of both anchors, pushed before every committed change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateHistory {
    pub first: Option<Point>,
    pub second: Option<Point>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UiState {
    pub show_coordinates: bool,
    pub show_preview: bool,
    pub is_processing: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            show_coordinates: true,
            show_preview: true,
            is_processing: false,
            error_message: None,
            success_message: None,
        }
    }
}

impl UiState {
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.success_message = None;
        self.error_message = Some(message.into());
    }

    pub fn set_success(&mut self, message: impl Into<String>) {
        self.error_message = None;
        self.success_message = Some(message.into());
    }

    pub fn clear_messages(&mut self) {
        self.error_message = None;
        self.success_message = None;
    }
}

/// Limits applied to anchors while they are placed or dragged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl DragBounds {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: width,
            max_y: height,
        }
    }

    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(self.min_x, self.max_x.max(self.min_x)),
            point.y.clamp(self.min_y, self.max_y.max(self.min_y)),
        )
    }
}

/// Uniform scale plus offset mapping image pixels onto the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl CoordinateTransform {
    /// Fits an image into the canvas, keeping `padding` free on every side
    /// and centering the result.
    pub fn fit(
        image_width: f32,
        image_height: f32,
        canvas_width: f32,
        canvas_height: f32,
        padding: f32,
    ) -> Self {
        if image_width <= 0.0 || image_height <= 0.0 {
            return Self::default();
        }

        let max_w = (canvas_width - padding * 2.0).max(1.0);
        let max_h = (canvas_height - padding * 2.0).max(1.0);
        let scale = (max_w / image_width).min(max_h / image_height);

        Self {
            scale,
            offset_x: (canvas_width - image_width * scale) / 2.0,
            offset_y: (canvas_height - image_height * scale) / 2.0,
        }
    }

    pub fn to_image(&self, canvas: Point) -> Point {
        let (x, y) = crate::canvas::canvas_to_image_coords(
            canvas.x,
            canvas.y,
            self.scale,
            self.scale,
            self.offset_x,
            self.offset_y,
        );
        Point::new(x, y)
    }

    pub fn to_canvas(&self, image: Point) -> Point {
        let (x, y) = crate::canvas::image_to_canvas_coords(
            image.x,
            image.y,
            self.scale,
            self.scale,
            self.offset_x,
            self.offset_y,
        );
        Point::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_pos2_conversion() {
        let point = Point::from(egui::pos2(3.5, -2.0));
        assert_eq!(point, Point::new(3.5, -2.0));
        assert_eq!(egui::Pos2::from(point), egui::pos2(3.5, -2.0));
    }

    #[test]
    fn test_crop_area_from_corners_orders_points() {
        let area = CropArea::from_corners(Point::new(50.0, 10.0), Point::new(20.0, 40.0));
        assert_eq!(area.top_left, Point::new(20.0, 10.0));
        assert_eq!(area.bottom_right, Point::new(50.0, 40.0));
        assert!(area.has_positive_area());
    }

    #[test]
    fn test_crop_area_size_ignores_corner_order() {
        let area = CropArea::new(Point::new(30.0, 30.0), Point::new(10.0, 20.0));
        assert_eq!(area.width(), 20.0);
        assert_eq!(area.height(), 10.0);
        assert_eq!(area.area(), 200.0);
        assert!(!area.has_positive_area());
    }

    #[test]
    fn test_drag_bounds_clamp() {
        let bounds = DragBounds::from_size(100.0, 50.0);
        assert_eq!(bounds.clamp(Point::new(-5.0, 60.0)), Point::new(0.0, 50.0));
        assert_eq!(bounds.clamp(Point::new(40.0, 20.0)), Point::new(40.0, 20.0));
    }

    #[test]
    fn test_fit_centers_wide_image() {
        let t = CoordinateTransform::fit(200.0, 100.0, 440.0, 440.0, 20.0);
        assert!((t.scale - 2.0).abs() < 1e-6);
        assert!((t.offset_x - 20.0).abs() < 1e-6);
        assert!((t.offset_y - 120.0).abs() < 1e-6);
    }

    #[test]
    fn test_transform_round_trip() {
        let t = CoordinateTransform::fit(1920.0, 1080.0, 800.0, 600.0, 20.0);
        let original = Point::new(1234.0, 567.0);
        let back = t.to_image(t.to_canvas(original));
        assert!((back.x - original.x).abs() < 0.01);
        assert!((back.y - original.y).abs() < 0.01);
    }

    #[test]
    fn test_ui_state_messages_are_exclusive() {
        let mut ui = UiState::default();
        ui.set_error("boom");
        ui.set_success("saved");
        assert_eq!(ui.error_message, None);
        assert_eq!(ui.success_message.as_deref(), Some("saved"));
    }
}
