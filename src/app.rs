use eframe::egui;
use image::DynamicImage;

use crate::canvas::{CanvasPainter, DpiAdapter, mouse_position};
use crate::config::AppConfig;
use crate::export::{
    self, CropResult, ImageSource, crop_area_issues, default_download_name, download_image,
    export_from_image, format_file_size, generate_filename, is_crop_area_valid, load_image,
    validate_image_size,
};
use crate::keyboard::{Keyboard, KeyboardHandler, KeyPress, ShortcutAction, shortcut_tooltip};
use crate::session::CropSession;
use crate::types::{
    AnchorStatus, CanvasOptions, CoordinateTransform, CropArea, DragBounds, ImageInfo, Point,
    UiState, now_millis,
};

const PADDING: f32 = 20.0;
const DASH: [f32; 2] = [5.0, 5.0];

pub struct CropperApp {
    config: AppConfig,
    image: Option<DynamicImage>,
    image_info: Option<ImageInfo>,
    texture: Option<egui::TextureHandle>,
    session: CropSession,
    keyboard: Keyboard,
    ui: UiState,
    transform: CoordinateTransform,
    dpi: DpiAdapter,
    preview: Option<egui::TextureHandle>,
    preview_area: Option<CropArea>,
    last_export: Option<CropResult>,
}

/// Routes shortcut callbacks to the session; confirm is deferred because
/// exporting needs the whole app.
struct ShortcutDispatch<'a> {
    session: &'a mut CropSession,
    ui: &'a mut UiState,
    confirm: bool,
}

impl KeyboardHandler for ShortcutDispatch<'_> {
    fn on_confirm(&mut self) {
        self.confirm = true;
    }

    fn on_cancel(&mut self) {
        if !self.session.cancel() {
            self.ui.clear_messages();
        }
    }

    fn on_reset(&mut self) {
        if self.session.reset() {
            self.ui.clear_messages();
        }
    }

    fn on_undo(&mut self) {
        if !self.session.undo() {
            log::debug!("Nothing to undo");
        }
    }
}

impl CropperApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        initial: Option<String>,
    ) -> Self {
        let mut session = CropSession::new(DragBounds::from_size(0.0, 0.0), config.history_limit);
        session.set_hit_radius(config.hit_radius);

        let mut app = Self {
            keyboard: Keyboard::new(config.shortcuts.clone()),
            session,
            image: None,
            image_info: None,
            texture: None,
            ui: UiState::default(),
            transform: CoordinateTransform::default(),
            dpi: DpiAdapter::new(0.0, 0.0, cc.egui_ctx.pixels_per_point()),
            preview: None,
            preview_area: None,
            last_export: None,
            config,
        };

        if let Some(source) = initial {
            match ImageSource::parse(&source) {
                Ok(source) => app.open_image(&cc.egui_ctx, source),
                Err(e) => app.ui.set_error(e.to_string()),
            }
        }
        app
    }

    fn open_image(&mut self, ctx: &egui::Context, source: ImageSource) {
        let image = match load_image(&source) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("{e}");
                self.ui.set_error(e.to_string());
                return;
            }
        };

        if let Err(reason) = validate_image_size(
            image.width(),
            image.height(),
            self.config.max_image_width,
            self.config.max_image_height,
        ) {
            log::warn!("Rejected {source}: {reason}");
            self.ui.set_error(reason);
            return;
        }

        self.image_info = Some(ImageInfo {
            source: source.file_name(),
            width: image.width() as f32,
            height: image.height() as f32,
            natural_width: image.width(),
            natural_height: image.height(),
        });
        self.session
            .load(image.width() as f32, image.height() as f32);
        self.image = Some(image);
        self.preview = None;
        self.preview_area = None;
        self.last_export = None;
        self.ui.clear_messages();
        self.load_texture(ctx);
    }

    fn load_texture(&mut self, ctx: &egui::Context) {
        if let Some(image) = &self.image {
            let size = [image.width() as _, image.height() as _];
            let image_buffer = image.to_rgba8();
            let pixels = image_buffer.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.texture =
                Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
        }
    }

    fn export_ratio(&self) -> f32 {
        if self.config.hidpi_export {
            self.dpi.dpr
        } else {
            1.0
        }
    }

    fn confirm(&mut self) {
        let (Some(image), Some(area)) = (&self.image, self.session.crop_area()) else {
            self.ui.set_error("Place two anchors before exporting");
            return;
        };

        let issues = crop_area_issues(&area, image.width() as f32, image.height() as f32);
        if !issues.is_empty() {
            log::warn!("Crop area rejected: {issues:?}");
            self.ui.set_error(issues.join("; "));
            return;
        }

        self.ui.is_processing = true;
        let result = export_from_image(image, &area, self.export_ratio());
        self.ui.is_processing = false;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{e}");
                self.ui.set_error(e.to_string());
                return;
            }
        };

        let stem = self
            .image_info
            .as_ref()
            .map(|info| info.source.clone())
            .unwrap_or_default();
        let file_name = if stem.is_empty() {
            default_download_name()
        } else {
            generate_filename(&stem, "cropped", Some(now_millis()))
        };

        let path = match &self.config.output_dir {
            Some(dir) => Some(dir.join(&file_name)),
            None => rfd::FileDialog::new()
                .add_filter("PNG", &["png"])
                .set_file_name(&file_name)
                .save_file(),
        };

        let Some(path) = path else {
            // Dialog dismissed; keep the result for the preview
            self.last_export = Some(result);
            return;
        };

        match download_image(&result, &path) {
            Ok(()) => self.ui.set_success(format!(
                "Saved {} ({}×{}, {})",
                path.display(),
                result.width,
                result.height,
                format_file_size(result.png.len() as u64)
            )),
            Err(e) => {
                log::warn!("{e}");
                self.ui.set_error(e.to_string());
            }
        }
        self.last_export = Some(result);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped_files = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped_files.first() else {
            return;
        };
        if let Some(path) = &file.path {
            self.open_image(ctx, ImageSource::Path(path.clone()));
        } else if let Some(bytes) = &file.bytes {
            self.open_image(ctx, ImageSource::Bytes(bytes.to_vec()));
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let (events, modifiers) = ctx.input(|i| (i.events.clone(), i.modifiers));
        self.keyboard.sync_modifiers(modifiers);

        let mut dispatch = ShortcutDispatch {
            session: &mut self.session,
            ui: &mut self.ui,
            confirm: false,
        };

        let mut handled = Vec::new();
        for event in &events {
            if let egui::Event::Key {
                key,
                physical_key,
                pressed,
                modifiers,
                ..
            } = event
            {
                let press = KeyPress::from_egui(*key, *physical_key, *modifiers);
                if *pressed {
                    if self.keyboard.handle_key_down(&press, &mut dispatch).is_some() {
                        handled.push((*key, *modifiers));
                    }
                } else {
                    self.keyboard.handle_key_up(&press);
                }
            }
        }
        if !handled.is_empty() {
            // Keep focused widgets from acting on the same press
            ctx.input_mut(|i| consume_key_presses(&mut i.events, &handled));
        }

        if dispatch.confirm {
            self.confirm();
        }
    }

    fn pick_image(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg", "bmp", "webp"])
            .pick_file()
        {
            self.open_image(ctx, ImageSource::Path(path));
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open Image").clicked() {
                self.pick_image(ctx);
            }

            if self.texture.is_none() {
                return;
            }
            ui.separator();

            let shortcuts = self.keyboard.shortcuts();
            let export_tip = shortcut_tooltip(ShortcutAction::Confirm, shortcuts);
            let reset_tip = shortcut_tooltip(ShortcutAction::Reset, shortcuts);
            let undo_tip = format!(
                "{} · {} steps",
                shortcut_tooltip(ShortcutAction::Undo, shortcuts),
                self.session.history().len()
            );

            let has_area = match (&self.image_info, self.session.crop_area()) {
                (Some(info), Some(area)) => is_crop_area_valid(
                    &area,
                    info.natural_width as f32,
                    info.natural_height as f32,
                ),
                _ => false,
            };
            if ui
                .add_enabled(has_area, egui::Button::new("Export Crop"))
                .on_hover_text(export_tip)
                .clicked()
            {
                self.confirm();
            }
            if ui
                .add_enabled(self.session.status() != AnchorStatus::None, egui::Button::new("Reset"))
                .on_hover_text(reset_tip)
                .clicked()
            {
                self.session.reset();
            }
            if ui
                .add_enabled(self.session.can_undo(), egui::Button::new("Undo"))
                .on_hover_text(undo_tip)
                .clicked()
            {
                self.session.undo();
            }

            if self.ui.is_processing {
                ui.spinner();
            }

            ui.separator();
            ui.checkbox(&mut self.ui.show_coordinates, "Coordinates");
            ui.checkbox(&mut self.ui.show_preview, "Preview");
            ui.checkbox(&mut self.config.hidpi_export, "HiDPI export")
                .on_hover_text(format!("Export at {}× pixel ratio", self.dpi.dpr));

            if ui.button("Save Settings").clicked() {
                match self.config.save() {
                    Ok(path) => self.ui.set_success(format!("Settings saved to {}", path.display())),
                    Err(e) => self.ui.set_error(e.to_string()),
                }
            }
        });
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if let Some(error) = &self.ui.error_message {
                ui.colored_label(egui::Color32::LIGHT_RED, error);
            } else if let Some(success) = &self.ui.success_message {
                ui.colored_label(egui::Color32::LIGHT_GREEN, success);
            } else {
                ui.label(match self.session.status() {
                    AnchorStatus::None => "Click to place the first anchor, or drag out a rectangle",
                    AnchorStatus::First => "Click to place the second anchor",
                    AnchorStatus::Both => "Drag an anchor to adjust the crop",
                });
            }

            if let Some(info) = &self.image_info {
                ui.separator();
                ui.label(format!(
                    "{} {}×{} (shown at {:.0}×{:.0})",
                    info.source, info.natural_width, info.natural_height, info.width, info.height
                ));
            }
            if let Some(area) = self.session.crop_area() {
                ui.separator();
                ui.label(format!(
                    "Crop {}×{} ({} px²)",
                    area.width().round(),
                    area.height().round(),
                    area.area().round()
                ));
            }
            ui.separator();
            ui.label(format!(
                "Canvas {}×{} pt, {}×{} px",
                self.dpi.logical_width.round(),
                self.dpi.logical_height.round(),
                self.dpi.actual_width,
                self.dpi.actual_height
            ));
        });
        ui.label(self.keyboard.shortcut_descriptions().join("   "));
    }

    fn update_preview(&mut self, ctx: &egui::Context) {
        if !self.ui.show_preview || self.session.mouse().is_mouse_down {
            return;
        }
        let area = self.session.crop_area();
        if area == self.preview_area {
            return;
        }
        self.preview_area = area;
        self.preview = None;

        let (Some(image), Some(area)) = (&self.image, area) else {
            return;
        };
        match export_from_image(image, &area, 1.0) {
            Ok(result) => {
                let thumb = export::thumbnail(&result.image, export::DEFAULT_THUMBNAIL_WIDTH);
                let size = [thumb.width() as _, thumb.height() as _];
                let color_image =
                    egui::ColorImage::from_rgba_unmultiplied(size, thumb.as_flat_samples().as_slice());
                self.preview =
                    Some(ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR));
            }
            Err(e) => log::debug!("No preview: {e}"),
        }
    }

    fn preview_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Preview");
        match &self.preview {
            Some(texture) => {
                ui.add(egui::Image::new(texture).max_width(export::DEFAULT_THUMBNAIL_WIDTH as f32));
            }
            None => {
                ui.label("No crop yet");
            }
        }
        if let Some(result) = &self.last_export {
            ui.separator();
            ui.label(format!(
                "Last export: {}×{} ({})",
                result.image.width(),
                result.image.height(),
                format_file_size(result.png.len() as u64)
            ));
            if ui.button("Copy as data URL").clicked() {
                ui.output_mut(|o| o.copied_text = result.data_url.clone());
                self.ui.set_success("Copied data URL to clipboard");
            }
        }
    }

    fn canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(texture) = &self.texture else {
            ui.centered_and_justified(|ui| {
                ui.label("Open an image or drop one here");
            });
            return;
        };

        let canvas_rect = egui::Rect::from_min_size(ui.cursor().min, ui.available_size());
        let response = ui.allocate_rect(canvas_rect, egui::Sense::click_and_drag());

        let options = CanvasOptions {
            width: canvas_rect.width(),
            height: canvas_rect.height(),
            device_pixel_ratio: ctx.pixels_per_point(),
        };
        self.dpi.update(&options);

        let image_size = texture.size_vec2();
        self.transform = CoordinateTransform::fit(
            image_size.x,
            image_size.y,
            canvas_rect.width(),
            canvas_rect.height(),
            PADDING,
        );
        if let Some(info) = &mut self.image_info {
            info.width = image_size.x * self.transform.scale;
            info.height = image_size.y * self.transform.scale;
        }
        self.session
            .set_hit_radius(self.config.hit_radius / self.transform.scale.max(f32::EPSILON));

        // Pointer
        let (pressed, released, pointer) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.latest_pos(),
            )
        });
        if let Some(pointer) = pointer {
            let image_point = self.transform.to_image(mouse_position(pointer, canvas_rect));
            if pressed && response.hovered() {
                self.session.mouse_down(image_point);
            }
            self.session.mouse_move(image_point);
            if released {
                self.session.mouse_up(image_point);
            }
        }

        // Drawing
        let painter = CanvasPainter::new(
            ui.painter_at(canvas_rect),
            canvas_rect,
            self.dpi.dpr,
            &self.config.palette,
        );
        painter.clear("var(--canvas-bg)");

        let image_origin = self.transform.to_canvas(Point::ZERO);
        let display_w = image_size.x * self.transform.scale;
        let display_h = image_size.y * self.transform.scale;
        painter.draw_image(texture, image_origin, display_w, display_h);

        if let Some(area) = self.session.crop_area().or(self.session.preview_area()) {
            let top_left = self.transform.to_canvas(area.top_left);
            let bottom_right = self.transform.to_canvas(area.bottom_right);
            let (w, h) = (bottom_right.x - top_left.x, bottom_right.y - top_left.y);

            painter.draw_overlay(top_left, w, h, "var(--overlay)");
            painter.draw_dashed_rect(top_left, w, h, "var(--crop-border)", 2.0, DASH);

            if self.ui.show_coordinates {
                painter.draw_text(
                    Point::new(top_left.x, top_left.y - 4.0),
                    format!("{}×{}", area.width().round(), area.height().round()),
                    "var(--text)",
                );
            }
        } else if response.hovered() {
            // Guides through the pointer until the crop is defined
            let cursor = self.transform.to_canvas(self.session.mouse().current_pos);
            let image_end = Point::new(image_origin.x + display_w, image_origin.y + display_h);
            painter.draw_smooth_line(
                Point::new(image_origin.x, cursor.y),
                Point::new(image_end.x, cursor.y),
                1.0,
                "var(--crop-border)",
            );
            painter.draw_smooth_line(
                Point::new(cursor.x, image_origin.y),
                Point::new(cursor.x, image_end.y),
                1.0,
                "var(--crop-border)",
            );
        }

        for anchor in self.session.anchors() {
            let color = if anchor.is_active {
                "var(--anchor-active)"
            } else {
                self.config.anchor_color.as_str()
            };
            let at = self.transform.to_canvas(anchor.point);
            painter.draw_anchor(at, color, self.config.anchor_size, self.config.anchor_glow);

            if self.ui.show_coordinates {
                painter.draw_text(
                    Point::new(at.x + self.config.anchor_size, at.y - self.config.anchor_size / 2.0),
                    format!("{} ({:.0}, {:.0})", anchor.id, anchor.point.x, anchor.point.y),
                    "var(--text)",
                );
            }
        }

        // Holding Ctrl/Cmd shows a readout of the pointer in image pixels
        if self.keyboard.is_modifier_pressed() && response.hovered() {
            let pos = self.session.mouse().current_pos;
            let at = self.transform.to_canvas(pos);
            painter.draw_text(
                Point::new(at.x + 12.0, at.y + 24.0),
                format!("{:.0}, {:.0}", pos.x, pos.y),
                "var(--text)",
            );
        }

        if self.session.mouse().is_mouse_down {
            ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if self.session.anchors().iter().any(|a| a.is_active) {
            ctx.set_cursor_icon(egui::CursorIcon::Grab);
        } else if response.hovered() && self.session.status() != AnchorStatus::Both {
            ctx.set_cursor_icon(egui::CursorIcon::Crosshair);
        }
    }
}

/// Drops the key-down events of shortcuts that already fired.
fn consume_key_presses(events: &mut Vec<egui::Event>, handled: &[(egui::Key, egui::Modifiers)]) {
    events.retain(|event| match event {
        egui::Event::Key {
            key,
            pressed: true,
            modifiers,
            ..
        } => !handled.contains(&(*key, *modifiers)),
        _ => true,
    });
}

impl eframe::App for CropperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle dropped files
        if !ctx.input(|i| i.raw.dropped_files.is_empty()) {
            self.handle_dropped_files(ctx);
        }

        self.handle_keyboard(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ctx, ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.status_bar(ui));

        self.update_preview(ctx);
        if self.ui.show_preview && self.texture.is_some() {
            egui::SidePanel::right("preview")
                .resizable(false)
                .show(ctx, |ui| self.preview_panel(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ctx, ui));
    }
}
