use std::time::Instant;
use eframe::egui;

use crate::brush::{MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH};
use crate::capture::TickOutcome;
use crate::config::Config;
use crate::editor::Editor;
use crate::image_ops::SaveJob;
use crate::mapper::CoordinateMapper;
use crate::texture::{center_rect_in_rect, fit_image_in_rect};

// ============================================================================
// CONSTANTS FOR UI STYLING
// ============================================================================
const BLUR_RANGE: std::ops::RangeInclusive<u32> = 1..=21;
const ADJUST_RANGE: std::ops::RangeInclusive<i32> = -100..=100;
const CANVAS_BACKGROUND_DARK: egui::Color32 = egui::Color32::from_rgb(34, 34, 34);
const CANVAS_BACKGROUND_LIGHT: egui::Color32 = egui::Color32::WHITE;

// ============================================================================
// MAIN APP STRUCT
// ============================================================================

pub struct EditorApp {
    pub(crate) editor: Editor,
    pub(crate) config: Config,
    pub(crate) runtime: tokio::runtime::Handle,

    // Display
    pub(crate) canvas_texture: Option<egui::TextureHandle>,
    pub(crate) texture_revision: Option<u64>,

    // Slider state
    pub(crate) blur_kernel: u32,
    pub(crate) brightness: i32,
    pub(crate) contrast: i32,

    // Saving
    pub(crate) save_job: Option<SaveJob>,
    pub(crate) save_progress: f32,

    pub(crate) status_message: String,
}

// ============================================================================
// INITIALIZATION
// ============================================================================

impl EditorApp {
    pub fn new(editor: Editor, config: Config, runtime: tokio::runtime::Handle) -> Self {
        let blur_kernel = config.editor.default_blur_kernel;
        Self {
            editor,
            config,
            runtime,
            canvas_texture: None,
            texture_revision: None,
            blur_kernel,
            brightness: 0,
            contrast: 0,
            save_job: None,
            save_progress: 0.0,
            status_message: "Open or drop an image to start".to_string(),
        }
    }

    /// Sliders describe the image that was loaded, so a new image starts
    /// from neutral brightness and contrast.
    pub(crate) fn reset_adjustments(&mut self) {
        self.brightness = 0;
        self.contrast = 0;
    }
}

// ============================================================================
// MAIN UPDATE LOOP
// ============================================================================

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.poll_save_job(ctx);
        self.update_live_preview(ctx);

        ctx.set_visuals(if self.editor.preferences().is_dark() {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        self.sync_canvas_texture(ctx);
        self.render_ui(ctx);
    }
}

impl EditorApp {
    fn update_live_preview(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        match self.editor.poll_capture(now) {
            TickOutcome::Stopped => {
                self.status_message = "Live preview stopped: camera disconnected".to_string();
            }
            TickOutcome::Idle | TickOutcome::Frame | TickOutcome::Missed => {}
        }

        if let Some(wait) = self.editor.capture().time_until_next(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn render_ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.render_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            self.render_buttons(ui);
            ui.separator();
            self.render_sliders(ui);
            ui.separator();
            ui.add(egui::ProgressBar::new(self.save_progress).show_percentage());
            ui.label(self.status_message.as_str());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_canvas(ui);
        });
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let can_undo = self.editor.session().can_undo();
            if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() && self.editor.undo() {
                self.status_message = format!("Undo ({} steps left)", self.editor.session().history_len());
            }
            if ui.button("Toggle Theme").clicked() {
                self.editor.preferences_mut().toggle_theme();
            }
        });
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("Open Image").clicked() {
                self.open_image_dialog();
            }
            if ui.button("Save Image").clicked() {
                self.save_image_dialog();
            }
            if ui.button("Reset").clicked() && self.editor.reset() {
                self.reset_adjustments();
                self.status_message = "Reset to original".to_string();
            }
            if ui.button("Grayscale").clicked() && self.editor.grayscale() {
                self.status_message = "Applied grayscale".to_string();
            }
            if ui.button("Gaussian Blur").clicked() {
                self.apply_blur();
            }
            if ui.button("Edge Detection").clicked() && self.editor.detect_edges() {
                self.status_message = "Applied edge detection".to_string();
            }
            if ui.button("Start Live Preview").clicked() {
                match self.editor.start_preview() {
                    Ok(_) => self.status_message = "Live preview running".to_string(),
                    Err(e) => {
                        log::warn!("{}", e);
                        self.status_message = e.to_string();
                    }
                }
            }
            if ui.button("Stop Preview").clicked() && self.editor.is_previewing() {
                self.editor.stop_preview();
                self.status_message = "Live preview stopped".to_string();
            }

            ui.label("Brush Color");
            let mut color = self.editor.brush().color;
            if ui.color_edit_button_srgb(&mut color).changed() {
                self.editor.brush_mut().set_color(color);
            }
        });
    }

    fn render_sliders(&mut self, ui: &mut egui::Ui) {
        let blur = ui.add(
            egui::Slider::new(&mut self.blur_kernel, BLUR_RANGE)
                .step_by(2.0)
                .text("Blur Intensity"),
        );
        if blur.changed() {
            self.apply_blur();
        }

        let brightness = ui.add(egui::Slider::new(&mut self.brightness, ADJUST_RANGE).text("Brightness"));
        let contrast = ui.add(egui::Slider::new(&mut self.contrast, ADJUST_RANGE).text("Contrast"));
        if (brightness.changed() || contrast.changed())
            && self.editor.adjust_brightness_contrast(self.brightness, self.contrast)
        {
            self.status_message = format!("Brightness {:+}, contrast {:+}", self.brightness, self.contrast);
        }

        let mut width = self.editor.brush().width;
        if ui
            .add(egui::Slider::new(&mut width, MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH).text("Brush Size"))
            .changed()
        {
            self.editor.brush_mut().set_width(width);
        }
    }

    fn apply_blur(&mut self) {
        if self.editor.blur(self.blur_kernel) {
            self.status_message = format!("Applied blur ({})", self.blur_kernel);
        }
    }

    // ============================================================================
    // CANVAS
    // ============================================================================

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let min_size = egui::vec2(
            self.config.display.canvas_min_width as f32,
            self.config.display.canvas_min_height as f32,
        );
        let size = ui.available_size().max(min_size);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::drag());

        let background = if self.editor.preferences().is_dark() {
            CANVAS_BACKGROUND_DARK
        } else {
            CANVAS_BACKGROUND_LIGHT
        };
        ui.painter().rect_filled(rect, 0.0, background);
        ui.painter().rect_stroke(rect, 0.0, egui::Stroke::new(1.0, egui::Color32::GRAY));

        match &self.canvas_texture {
            Some(texture) => {
                let image_size = texture.size_vec2();
                let display_size = fit_image_in_rect(image_size, rect.size());
                let image_rect = center_rect_in_rect(display_size, rect);
                ui.painter().image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No image",
                    egui::FontId::proportional(18.0),
                    egui::Color32::GRAY,
                );
            }
        }

        self.handle_canvas_pointer(&response, rect);
    }

    fn handle_canvas_pointer(&mut self, response: &egui::Response, rect: egui::Rect) {
        let pointer = response.interact_pointer_pos().map(|pos| (pos.x, pos.y));

        if response.drag_started() {
            if let Some(pos) = pointer {
                self.editor.begin_stroke(pos);
            }
        }

        if response.dragged() && self.editor.is_drawing() {
            if let Some(pos) = pointer {
                // Mapping uses the whole canvas widget, letterbox included
                let mapper = self.editor.session().image_size().and_then(|image_size| {
                    CoordinateMapper::new(
                        (rect.min.x, rect.min.y),
                        (rect.width(), rect.height()),
                        image_size,
                    )
                });
                self.editor.continue_stroke(pos, mapper);
            }
        }

        if response.drag_released() {
            self.editor.end_stroke();
        }
    }
}
