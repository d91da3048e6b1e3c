use image::RgbImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::brush::{Brush, UiPreferences};
use crate::camera_controller::{CaptureDevice, CaptureError};
use crate::capture::{CaptureLoop, TickOutcome, TimerId};
use crate::filters::{normalize_kernel_size, Operation};
use crate::image_processor::{ImageLoader, LoaderError};
use crate::mapper::CoordinateMapper;
use crate::session::Session;

/// Failures worth telling the user about. Everything else (missed frames,
/// edits on an empty session) is a silent no-op.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("could not open image: {0}")]
    DecodeFailure(#[source] LoaderError),
    #[error("could not save image: {0}")]
    EncodeFailure(#[source] LoaderError),
    #[error("could not start live preview: {0}")]
    CaptureUnavailable(#[source] CaptureError),
}

/// The current image captured at the moment a save was requested.
pub struct PendingSave {
    image: RgbImage,
    loader: ImageLoader,
}

impl PendingSave {
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), EditorError> {
        let path = path.as_ref();
        self.loader.save(&self.image, path).map_err(EditorError::EncodeFailure)?;
        info!("Saved image to {}", path.display());
        Ok(())
    }
}

/// Ties the session, the capture loop and the brush together and keeps live
/// preview and freehand drawing from touching the same buffer.
pub struct Editor {
    session: Session,
    capture: CaptureLoop,
    device: Box<dyn CaptureDevice>,
    device_index: u32,
    loader: ImageLoader,
    brush: Brush,
    preferences: UiPreferences,
    last_pointer: Option<(f32, f32)>,
}

impl Editor {
    pub fn new(
        session: Session,
        capture: CaptureLoop,
        device: Box<dyn CaptureDevice>,
        device_index: u32,
        brush: Brush,
    ) -> Self {
        Self {
            session,
            capture,
            device,
            device_index,
            loader: ImageLoader::new(),
            brush,
            preferences: UiPreferences::default(),
            last_pointer: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn brush_mut(&mut self) -> &mut Brush {
        &mut self.brush
    }

    pub fn preferences(&self) -> &UiPreferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut UiPreferences {
        &mut self.preferences
    }

    pub fn is_previewing(&self) -> bool {
        self.capture.is_running()
    }

    // ---- files ----

    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EditorError> {
        let path = path.as_ref();
        let image = self.loader.load(path).map_err(EditorError::DecodeFailure)?;
        info!("Opened {} ({}x{})", path.display(), image.width(), image.height());
        self.session.load(image);
        Ok(())
    }

    /// Loads the first file of a drop that decodes. If none does, the last
    /// failure is returned and the session is unchanged.
    pub fn open_dropped(&mut self, paths: &[PathBuf]) -> Result<PathBuf, EditorError> {
        let mut last_error = None;
        for path in paths {
            match self.open(path) {
                Ok(()) => return Ok(path.clone()),
                Err(e) => {
                    warn!("Skipping dropped file {}: {}", path.display(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            EditorError::DecodeFailure(LoaderError::UnsupportedFormat("nothing was dropped".into()))
        }))
    }

    /// Snapshots the current image for writing, or `None` when there is
    /// nothing to save. The snapshot owns its data so it can be written on
    /// another thread while editing continues.
    pub fn prepare_save(&self) -> Option<PendingSave> {
        let image = self.session.current()?.clone();
        Some(PendingSave {
            image,
            loader: self.loader.clone(),
        })
    }

    // ---- edits ----

    pub fn apply(&mut self, operation: Operation) -> bool {
        self.session.apply(operation)
    }

    pub fn grayscale(&mut self) -> bool {
        self.apply(Operation::Grayscale)
    }

    pub fn blur(&mut self, requested_kernel: u32) -> bool {
        self.apply(Operation::Blur {
            kernel_size: normalize_kernel_size(requested_kernel),
        })
    }

    pub fn detect_edges(&mut self) -> bool {
        self.apply(Operation::EdgeDetect)
    }

    pub fn adjust_brightness_contrast(&mut self, brightness: i32, contrast: i32) -> bool {
        self.apply(Operation::BrightnessContrast { brightness, contrast })
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn reset(&mut self) -> bool {
        self.session.reset()
    }

    // ---- freehand drawing ----

    /// Starts a stroke at a pointer position in widget space. Ignored while
    /// live preview is running or nothing is loaded.
    pub fn begin_stroke(&mut self, pointer: (f32, f32)) -> bool {
        if self.capture.is_running() || !self.session.is_loaded() {
            debug!("Stroke ignored: preview running or no image loaded");
            return false;
        }
        self.last_pointer = Some(pointer);
        true
    }

    /// Draws from the previous pointer position to `pointer`. `mapper`
    /// describes the canvas widget the pointer positions are relative to.
    pub fn continue_stroke(&mut self, pointer: (f32, f32), mapper: Option<CoordinateMapper>) -> bool {
        let Some(previous) = self.last_pointer else {
            return false;
        };
        if self.capture.is_running() {
            self.last_pointer = None;
            return false;
        }
        let Some(mapper) = mapper else {
            return false;
        };

        self.last_pointer = Some(pointer);
        let from = mapper.map(previous);
        let to = mapper.map(pointer);
        self.session.draw_stroke(from, to, &self.brush)
    }

    pub fn end_stroke(&mut self) {
        self.last_pointer = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.last_pointer.is_some()
    }

    // ---- live preview ----

    pub fn start_preview(&mut self) -> Result<TimerId, EditorError> {
        // Preview and drawing are exclusive
        self.end_stroke();
        self.capture
            .start(self.device.as_ref(), self.device_index)
            .map_err(EditorError::CaptureUnavailable)
    }

    pub fn stop_preview(&mut self) {
        self.capture.stop();
    }

    pub fn poll_capture(&mut self, now: Instant) -> TickOutcome {
        self.capture.poll(now, &mut self.session)
    }

    pub fn capture(&self) -> &CaptureLoop {
        &self.capture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::{frame, ScriptedDevice};
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn editor_with(device: ScriptedDevice) -> Editor {
        Editor::new(
            Session::default(),
            CaptureLoop::default(),
            Box::new(device),
            0,
            Brush::new([255, 255, 255], 3),
        )
    }

    fn editor() -> Editor {
        editor_with(ScriptedDevice::new(vec![]))
    }

    fn write_png(dir: &TempDir, name: &str, image: &RgbImage) -> PathBuf {
        let path = dir.path().join(name);
        image.save(&path).unwrap();
        path
    }

    fn canvas_mapper(editor: &Editor) -> Option<CoordinateMapper> {
        CoordinateMapper::new((0.0, 0.0), (20.0, 20.0), editor.session().image_size()?)
    }

    #[test]
    fn test_open_and_save() {
        let dir = TempDir::new().unwrap();
        let image = ImageBuffer::from_pixel(10, 10, Rgb([255, 0, 0]));
        let path = write_png(&dir, "red.png", &image);

        let mut editor = editor();
        assert!(editor.prepare_save().is_none());

        editor.open(&path).unwrap();
        assert!(editor.grayscale());

        let out = dir.path().join("out").join("gray.png");
        editor.prepare_save().unwrap().write(&out).unwrap();
        let saved = image::open(&out).unwrap().to_rgb8();
        assert_eq!(Some(&saved), editor.session().current());
    }

    #[test]
    fn test_pending_save_keeps_the_image_it_was_taken_from() {
        let dir = TempDir::new().unwrap();
        let mut editor = editor();
        editor.session.load(ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30])));

        let pending = editor.prepare_save().unwrap();
        editor.grayscale();

        let out = dir.path().join("snapshot.png");
        pending.write(&out).unwrap();
        assert_eq!(image::open(&out).unwrap().to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_failed_open_leaves_session_unchanged() {
        let dir = TempDir::new().unwrap();
        let good = write_png(&dir, "good.png", &ImageBuffer::from_pixel(4, 4, Rgb([9, 9, 9])));
        let mut editor = editor();
        editor.open(&good).unwrap();
        editor.grayscale();
        let before = editor.session().current().cloned();

        let result = editor.open(dir.path().join("missing.png"));
        assert!(matches!(result, Err(EditorError::DecodeFailure(_))));
        assert_eq!(editor.session().current().cloned(), before);
        assert_eq!(editor.session().history_len(), 1);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let good = write_png(&dir, "good.png", &ImageBuffer::from_pixel(4, 4, Rgb([9, 9, 9])));
        let mut editor = editor();
        editor.open(&good).unwrap();

        let result = editor.prepare_save().unwrap().write(dir.path().join("out.unknown"));
        assert!(matches!(result, Err(EditorError::EncodeFailure(_))));
    }

    #[test]
    fn test_open_dropped_takes_first_decodable() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("readme.txt");
        std::fs::write(&text, "hi").unwrap();
        let blue = write_png(&dir, "blue.png", &ImageBuffer::from_pixel(3, 3, Rgb([0, 0, 255])));
        let green = write_png(&dir, "green.png", &ImageBuffer::from_pixel(3, 3, Rgb([0, 255, 0])));

        let mut editor = editor();
        let opened = editor.open_dropped(&[text.clone(), blue.clone(), green]).unwrap();
        assert_eq!(opened, blue);
        assert_eq!(editor.session().current().unwrap().get_pixel(0, 0).0, [0, 0, 255]);

        assert!(editor.open_dropped(&[text]).is_err());
        assert!(editor.open_dropped(&[]).is_err());
        assert_eq!(editor.session().current().unwrap().get_pixel(0, 0).0, [0, 0, 255]);
    }

    #[test]
    fn test_blur_normalizes_even_kernels() {
        let stripes: RgbImage = ImageBuffer::from_fn(12, 12, |x, _| {
            if (x / 3) % 2 == 0 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });

        let mut even = editor();
        even.session.load(stripes.clone());
        even.blur(4);

        let mut odd = editor();
        odd.session.load(stripes);
        odd.blur(5);

        assert_eq!(even.session().current(), odd.session().current());
    }

    #[test]
    fn test_undo_after_reset_through_editor() {
        let stripes: RgbImage = ImageBuffer::from_fn(12, 12, |x, _| {
            if (x / 3) % 2 == 0 { Rgb([200, 40, 90]) } else { Rgb([10, 120, 30]) }
        });
        let mut editor = editor();
        editor.session.load(stripes.clone());
        editor.grayscale();
        editor.blur(5);
        assert!(editor.reset());

        editor.detect_edges();
        editor.adjust_brightness_contrast(30, -30);
        editor.blur(3);
        for _ in 0..3 {
            assert!(editor.undo());
        }
        assert_eq!(editor.session().current(), Some(&stripes));
    }

    #[test]
    fn test_stroke_maps_pointer_into_image() {
        let mut editor = editor();
        editor.session.load(RgbImage::new(40, 40));

        assert!(editor.begin_stroke((2.0, 10.0)));
        let mapper = canvas_mapper(&editor);
        // Canvas is 20x20 for a 40x40 image: everything doubles
        assert!(editor.continue_stroke((18.0, 10.0), mapper));
        editor.end_stroke();

        let current = editor.session().current().unwrap();
        assert_eq!(current.get_pixel(20, 20).0, [255, 255, 255]);
        assert_eq!(current.get_pixel(20, 5).0, [0, 0, 0]);
        assert_eq!(editor.session().history_len(), 0);
        assert!(!editor.continue_stroke((5.0, 5.0), mapper));
    }

    #[test]
    fn test_stroke_skipped_without_mapping() {
        let mut editor = editor();
        editor.session.load(RgbImage::new(10, 10));
        assert!(editor.begin_stroke((1.0, 1.0)));
        assert!(!editor.continue_stroke((5.0, 5.0), None));
        assert!(editor.session().current().unwrap().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_no_drawing_while_previewing() {
        let mut editor = editor_with(ScriptedDevice::new(vec![Ok(frame(7))]));
        editor.session.load(frame(1));

        editor.begin_stroke((0.0, 0.0));
        editor.start_preview().unwrap();
        assert!(!editor.is_drawing());
        assert!(!editor.begin_stroke((0.0, 0.0)));

        assert_eq!(editor.poll_capture(Instant::now()), TickOutcome::Frame);
        assert_eq!(editor.session().current(), Some(&frame(7)));

        editor.stop_preview();
        assert!(editor.begin_stroke((0.0, 0.0)));
    }

    #[test]
    fn test_preview_unavailable() {
        let mut editor = editor_with(ScriptedDevice::broken());
        let result = editor.start_preview();
        assert!(matches!(result, Err(EditorError::CaptureUnavailable(_))));
        assert!(!editor.is_previewing());
        assert_eq!(editor.poll_capture(Instant::now()), TickOutcome::Idle);
    }

    #[test]
    fn test_edits_on_empty_editor_are_noops() {
        let mut editor = editor();
        assert!(!editor.grayscale());
        assert!(!editor.blur(5));
        assert!(!editor.detect_edges());
        assert!(!editor.adjust_brightness_contrast(10, 10));
        assert!(!editor.undo());
        assert!(!editor.reset());
        assert!(!editor.begin_stroke((0.0, 0.0)));
        assert_eq!(editor.session().history_len(), 0);
    }
}
