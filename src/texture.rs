use egui::{Context, TextureOptions};
use image::RgbImage;

use crate::ui::EditorApp;

impl EditorApp {
    /// Uploads the session's current image when it changed since the last
    /// upload. Drops the texture once nothing is left to show.
    pub fn sync_canvas_texture(&mut self, ctx: &Context) {
        let session = self.editor.session();
        let revision = session.revision();
        if self.texture_revision == Some(revision) {
            return;
        }

        match session.current() {
            Some(image) => {
                upload(ctx, &mut self.canvas_texture, image);
                self.texture_revision = Some(revision);
            }
            None => {
                self.canvas_texture = None;
                self.texture_revision = None;
            }
        }
    }
}

fn upload(ctx: &Context, slot: &mut Option<egui::TextureHandle>, image: &RgbImage) {
    // Validate image before updating to prevent white flash
    if image.width() == 0 || image.height() == 0 {
        return;
    }

    let size = [image.width() as usize, image.height() as usize];
    let pixels = image.as_flat_samples();
    let color_image = egui::ColorImage::from_rgb(size, pixels.as_slice());

    // Reuse existing texture - live preview updates every ~30ms
    match slot {
        Some(texture) => texture.set(color_image, TextureOptions::LINEAR),
        None => {
            *slot = Some(ctx.load_texture("canvas", color_image, TextureOptions::LINEAR));
        }
    }
}

/// Largest size with the image's aspect ratio that fits in `container`.
pub fn fit_image_in_rect(image_size: egui::Vec2, container_size: egui::Vec2) -> egui::Vec2 {
    let scale = (container_size.x / image_size.x).min(container_size.y / image_size.y);
    image_size * scale
}

pub fn center_rect_in_rect(content_size: egui::Vec2, container: egui::Rect) -> egui::Rect {
    let offset = (container.size() - content_size) * 0.5;
    egui::Rect::from_min_size(container.min + offset, content_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_preserves_aspect_ratio() {
        let fitted = fit_image_in_rect(egui::vec2(200.0, 100.0), egui::vec2(400.0, 400.0));
        assert_eq!(fitted, egui::vec2(400.0, 200.0));

        let fitted = fit_image_in_rect(egui::vec2(100.0, 300.0), egui::vec2(400.0, 300.0));
        assert_eq!(fitted, egui::vec2(100.0, 300.0));
    }

    #[test]
    fn test_letterboxed_rect_is_centered() {
        let container = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(400.0, 400.0));
        let rect = center_rect_in_rect(egui::vec2(400.0, 200.0), container);
        assert_eq!(rect.min, egui::pos2(10.0, 120.0));
        assert_eq!(rect.max, egui::pos2(410.0, 320.0));
    }
}
