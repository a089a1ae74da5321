//! Anchor placement and dragging.
//!
//! All points are in image pixel space. The first press on an empty image
//! places the first anchor, the next press the second one; a press-drag-release
//! on an empty image places both at once. Pressing on an existing anchor drags
//! it. Every committed change can be undone.

use crate::types::{
    Anchor, AnchorId, AnchorStatus, CropArea, DragBounds, MouseMode, MouseState, Point,
    StateHistory, now_millis,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

type Anchors = (Option<Point>, Option<Point>);

#[derive(Debug)]
pub struct CropSession {
    first: Option<Point>,
    second: Option<Point>,
    mouse: MouseState,
    bounds: DragBounds,
    /// Hit tolerance in image pixels; also the distance that turns a press
    /// into a drag
    hit_radius: f32,
    hovered: Option<AnchorId>,
    /// Anchors as they were when the current press began
    gesture_start: Option<Anchors>,
    history: Vec<StateHistory>,
    history_limit: usize,
}

impl Default for CropSession {
    fn default() -> Self {
        Self::new(DragBounds::from_size(0.0, 0.0), DEFAULT_HISTORY_LIMIT)
    }
}

impl CropSession {
    pub fn new(bounds: DragBounds, history_limit: usize) -> Self {
        Self {
            first: None,
            second: None,
            mouse: MouseState::default(),
            bounds,
            hit_radius: 10.0,
            hovered: None,
            gesture_start: None,
            history: Vec::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Starts over for a new image of the given pixel size.
    pub fn load(&mut self, width: f32, height: f32) {
        let hit_radius = self.hit_radius;
        *self = Self::new(DragBounds::from_size(width, height), self.history_limit);
        self.hit_radius = hit_radius;
    }

    pub fn set_hit_radius(&mut self, radius: f32) {
        if radius.is_finite() && radius > 0.0 {
            self.hit_radius = radius;
        }
    }

    pub fn status(&self) -> AnchorStatus {
        match (self.first, self.second) {
            (None, _) => AnchorStatus::None,
            (Some(_), None) => AnchorStatus::First,
            (Some(_), Some(_)) => AnchorStatus::Both,
        }
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn anchor(&self, id: AnchorId) -> Option<Point> {
        match id {
            AnchorId::First => self.first,
            AnchorId::Second => self.second,
        }
    }

    fn anchor_mut(&mut self, id: AnchorId) -> &mut Option<Point> {
        match id {
            AnchorId::First => &mut self.first,
            AnchorId::Second => &mut self.second,
        }
    }

    /// Placed anchors; the dragged or hovered one is marked active.
    pub fn anchors(&self) -> Vec<Anchor> {
        let active = self.mouse.dragging_anchor.or(self.hovered);
        [AnchorId::First, AnchorId::Second]
            .into_iter()
            .filter_map(|id| {
                self.anchor(id).map(|point| Anchor {
                    id,
                    point,
                    is_active: active == Some(id),
                })
            })
            .collect()
    }

    /// Nearest anchor within the hit radius.
    pub fn anchor_at(&self, point: Point) -> Option<AnchorId> {
        [AnchorId::First, AnchorId::Second]
            .into_iter()
            .filter_map(|id| self.anchor(id).map(|p| (id, p.distance(point))))
            .filter(|(_, d)| *d <= self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn crop_area(&self) -> Option<CropArea> {
        match (self.first, self.second) {
            (Some(a), Some(b)) => Some(CropArea::from_corners(a, b)),
            _ => None,
        }
    }

    /// Rubber band shown while a press-drag on an empty image is in progress.
    pub fn preview_area(&self) -> Option<CropArea> {
        let dragging_out = self.mouse.mode == MouseMode::Setting
            && self.first.is_none()
            && self.is_drag_gesture();
        dragging_out.then(|| CropArea::from_corners(self.mouse.start_pos, self.mouse.current_pos))
    }

    fn is_drag_gesture(&self) -> bool {
        self.mouse.start_pos.distance(self.mouse.current_pos) > self.hit_radius
    }

    pub fn mouse_down(&mut self, point: Point) {
        let point = self.bounds.clamp(point);
        self.mouse = MouseState {
            is_mouse_down: true,
            start_pos: point,
            current_pos: point,
            mode: MouseMode::Idle,
            dragging_anchor: None,
        };

        if let Some(id) = self.anchor_at(point) {
            log::debug!("Dragging {id} anchor");
            self.mouse.mode = MouseMode::Dragging;
            self.mouse.dragging_anchor = Some(id);
        } else if self.status() != AnchorStatus::Both {
            self.mouse.mode = MouseMode::Setting;
        } else {
            return;
        }

        self.gesture_start = Some((self.first, self.second));
        log::debug!("Mouse down at ({:.1}, {:.1}): {:?}", point.x, point.y, self.mouse.mode);
    }

    pub fn mouse_move(&mut self, point: Point) {
        let point = self.bounds.clamp(point);
        self.mouse.current_pos = point;

        if !self.mouse.is_mouse_down {
            self.hovered = self.anchor_at(point);
            return;
        }

        if let (MouseMode::Dragging, Some(id)) = (self.mouse.mode, self.mouse.dragging_anchor) {
            *self.anchor_mut(id) = Some(point);
        }
    }

    pub fn mouse_up(&mut self, point: Point) {
        if !self.mouse.is_mouse_down {
            return;
        }
        let point = self.bounds.clamp(point);
        self.mouse.current_pos = point;

        match self.mouse.mode {
            MouseMode::Setting => {
                if self.first.is_none() {
                    if self.is_drag_gesture() {
                        self.first = Some(self.mouse.start_pos);
                        self.second = Some(point);
                    } else {
                        self.first = Some(point);
                    }
                } else {
                    self.second = Some(point);
                }
            }
            MouseMode::Dragging => {
                if let Some(id) = self.mouse.dragging_anchor {
                    *self.anchor_mut(id) = Some(point);
                }
            }
            MouseMode::Idle => {}
        }

        if let Some(before) = self.gesture_start.take() {
            if before != (self.first, self.second) {
                self.push_history(before);
            }
        }

        self.mouse = MouseState {
            current_pos: point,
            ..MouseState::default()
        };
        self.hovered = self.anchor_at(point);
    }

    fn push_history(&mut self, (first, second): Anchors) {
        if self.history.len() >= self.history_limit {
            self.history.remove(0);
        }
        self.history.push(StateHistory {
            first,
            second,
            timestamp: now_millis(),
        });
    }

    pub fn history(&self) -> &[StateHistory] {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty() || self.gesture_start.is_some()
    }

    /// Restores the previous anchors. An in-progress gesture is aborted first
    /// and counts as the undo.
    pub fn undo(&mut self) -> bool {
        if self.abort_gesture() {
            return true;
        }
        match self.history.pop() {
            Some(entry) => {
                self.first = entry.first;
                self.second = entry.second;
                log::debug!("Undo to state from {}", entry.timestamp);
                true
            }
            None => false,
        }
    }

    /// Removes both anchors; the removal itself can be undone.
    pub fn reset(&mut self) -> bool {
        self.abort_gesture();
        if self.first.is_none() && self.second.is_none() {
            return false;
        }
        self.push_history((self.first, self.second));
        self.first = None;
        self.second = None;
        self.hovered = None;
        true
    }

    /// Aborts a drag in progress, or clears the anchors when idle.
    pub fn cancel(&mut self) -> bool {
        if self.abort_gesture() {
            return true;
        }
        self.reset()
    }

    fn abort_gesture(&mut self) -> bool {
        let Some((first, second)) = self.gesture_start.take() else {
            return false;
        };
        self.first = first;
        self.second = second;
        self.mouse = MouseState::default();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CropSession {
        let mut s = CropSession::new(DragBounds::from_size(200.0, 100.0), 10);
        s.set_hit_radius(5.0);
        s
    }

    fn click(s: &mut CropSession, x: f32, y: f32) {
        s.mouse_down(Point::new(x, y));
        s.mouse_up(Point::new(x, y));
    }

    #[test]
    fn test_two_clicks_place_both_anchors() {
        let mut s = session();
        assert_eq!(s.status(), AnchorStatus::None);

        click(&mut s, 80.0, 60.0);
        assert_eq!(s.status(), AnchorStatus::First);
        assert_eq!(s.crop_area(), None);

        click(&mut s, 20.0, 10.0);
        assert_eq!(s.status(), AnchorStatus::Both);

        let area = s.crop_area().unwrap();
        assert_eq!(area.top_left, Point::new(20.0, 10.0));
        assert_eq!(area.bottom_right, Point::new(80.0, 60.0));
        assert_eq!(s.mouse().mode, MouseMode::Idle);
    }

    #[test]
    fn test_press_drag_places_both_anchors() {
        let mut s = session();
        s.mouse_down(Point::new(10.0, 10.0));
        s.mouse_move(Point::new(50.0, 40.0));
        assert_eq!(s.mouse().mode, MouseMode::Setting);
        assert!(s.preview_area().is_some());
        assert_eq!(s.status(), AnchorStatus::None);

        s.mouse_up(Point::new(60.0, 45.0));
        assert_eq!(s.status(), AnchorStatus::Both);
        assert_eq!(
            s.crop_area(),
            Some(CropArea::new(Point::new(10.0, 10.0), Point::new(60.0, 45.0)))
        );
        assert!(s.preview_area().is_none());
    }

    #[test]
    fn test_points_are_clamped_to_image() {
        let mut s = session();
        click(&mut s, -20.0, 500.0);
        assert_eq!(s.anchor(AnchorId::First), Some(Point::new(0.0, 100.0)));
    }

    #[test]
    fn test_drag_existing_anchor() {
        let mut s = session();
        click(&mut s, 10.0, 10.0);
        click(&mut s, 100.0, 80.0);

        s.mouse_down(Point::new(12.0, 11.0));
        assert_eq!(s.mouse().mode, MouseMode::Dragging);
        assert_eq!(s.mouse().dragging_anchor, Some(AnchorId::First));

        s.mouse_move(Point::new(30.0, 25.0));
        assert_eq!(s.anchor(AnchorId::First), Some(Point::new(30.0, 25.0)));
        assert!(s.anchors().iter().any(|a| a.id == AnchorId::First && a.is_active));

        s.mouse_up(Point::new(35.0, 20.0));
        assert_eq!(s.anchor(AnchorId::First), Some(Point::new(35.0, 20.0)));
        assert_eq!(s.mouse().dragging_anchor, None);
    }

    #[test]
    fn test_press_off_anchor_with_both_placed_is_ignored() {
        let mut s = session();
        click(&mut s, 10.0, 10.0);
        click(&mut s, 100.0, 80.0);
        let history_len = s.history().len();

        click(&mut s, 50.0, 50.0);
        assert_eq!(
            s.crop_area(),
            Some(CropArea::new(Point::new(10.0, 10.0), Point::new(100.0, 80.0)))
        );
        assert_eq!(s.history().len(), history_len);
    }

    #[test]
    fn test_undo_walks_back_through_changes() {
        let mut s = session();
        click(&mut s, 10.0, 10.0);
        click(&mut s, 100.0, 80.0);
        s.mouse_down(Point::new(100.0, 80.0));
        s.mouse_up(Point::new(150.0, 90.0));

        assert!(s.undo());
        assert_eq!(s.anchor(AnchorId::Second), Some(Point::new(100.0, 80.0)));
        assert!(s.undo());
        assert_eq!(s.status(), AnchorStatus::First);
        assert!(s.undo());
        assert_eq!(s.status(), AnchorStatus::None);
        assert!(!s.undo());
    }

    #[test]
    fn test_reset_is_undoable() {
        let mut s = session();
        click(&mut s, 10.0, 10.0);
        click(&mut s, 100.0, 80.0);

        assert!(s.reset());
        assert_eq!(s.status(), AnchorStatus::None);
        assert!(!s.reset());

        assert!(s.undo());
        assert_eq!(s.status(), AnchorStatus::Both);
    }

    #[test]
    fn test_cancel_aborts_drag_in_progress() {
        let mut s = session();
        click(&mut s, 10.0, 10.0);
        click(&mut s, 100.0, 80.0);

        s.mouse_down(Point::new(10.0, 10.0));
        s.mouse_move(Point::new(60.0, 60.0));
        assert!(s.cancel());
        assert_eq!(s.anchor(AnchorId::First), Some(Point::new(10.0, 10.0)));
        assert_eq!(s.mouse().mode, MouseMode::Idle);

        // A release after cancelling must not commit anything
        s.mouse_up(Point::new(60.0, 60.0));
        assert_eq!(s.anchor(AnchorId::First), Some(Point::new(10.0, 10.0)));

        assert!(s.cancel());
        assert_eq!(s.status(), AnchorStatus::None);
    }

    #[test]
    fn test_history_is_capped() {
        let mut s = CropSession::new(DragBounds::from_size(200.0, 100.0), 3);
        s.set_hit_radius(1.0);
        click(&mut s, 10.0, 10.0);
        click(&mut s, 100.0, 80.0);
        for i in 0..5 {
            let from = s.anchor(AnchorId::Second).unwrap();
            s.mouse_down(from);
            s.mouse_up(Point::new(100.0 + i as f32 * 5.0 + 5.0, 80.0));
        }
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn test_load_clears_state() {
        let mut s = session();
        click(&mut s, 10.0, 10.0);
        s.load(50.0, 50.0);
        assert_eq!(s.status(), AnchorStatus::None);
        assert!(!s.can_undo());
        click(&mut s, 80.0, 80.0);
        assert_eq!(s.anchor(AnchorId::First), Some(Point::new(50.0, 50.0)));
    }

    #[test]
    fn test_load_keeps_hit_radius() {
        let mut s = session();
        s.set_hit_radius(20.0);
        s.load(100.0, 100.0);
        click(&mut s, 10.0, 10.0);
        assert_eq!(s.anchor_at(Point::new(25.0, 10.0)), Some(AnchorId::First));
        assert_eq!(s.anchor_at(Point::new(35.0, 10.0)), None);
    }
}
