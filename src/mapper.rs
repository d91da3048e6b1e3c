/// Converts pointer positions on the canvas widget into image pixels.
///
/// The widget rect is the full area the image is drawn into. Scaling is done
/// per axis against that rect; when the image is letterboxed inside it the
/// letterbox offset is *not* subtracted, so strokes land slightly off on
/// images whose aspect ratio differs from the widget's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    pub origin: (f32, f32),
    pub display_size: (f32, f32),
    pub image_size: (u32, u32),
}

impl CoordinateMapper {
    /// Returns `None` when the mapping is undefined (zero-sized widget or image).
    pub fn new(origin: (f32, f32), display_size: (f32, f32), image_size: (u32, u32)) -> Option<Self> {
        let (display_w, display_h) = display_size;
        if !(display_w > 0.0 && display_h > 0.0) || image_size.0 == 0 || image_size.1 == 0 {
            return None;
        }
        Some(Self {
            origin,
            display_size,
            image_size,
        })
    }

    pub fn scale(&self) -> (f32, f32) {
        (
            self.image_size.0 as f32 / self.display_size.0,
            self.image_size.1 as f32 / self.display_size.1,
        )
    }

    /// Maps an absolute pointer position. The result may lie outside the
    /// image; drawing clips it.
    pub fn map(&self, pointer: (f32, f32)) -> (i32, i32) {
        let (scale_x, scale_y) = self.scale();
        let x = (pointer.0 - self.origin.0) * scale_x;
        let y = (pointer.1 - self.origin.1) * scale_y;
        (x as i32, y as i32)
    }
}
