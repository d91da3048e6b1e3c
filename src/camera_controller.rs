use image::{ImageBuffer, RgbImage};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device could not be opened at all.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// No frame this tick. The next tick may succeed.
    #[error("no frame available: {0}")]
    FrameMiss(String),
    /// The source went away and will not produce more frames.
    #[error("camera disconnected: {0}")]
    Disconnected(String),
}

/// An open live source. Dropping it releases the underlying device.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError>;

    fn resolution(&self) -> (u32, u32);
}

pub trait CaptureDevice {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, CaptureError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Rpicam,
    Raspistill,
}

impl Backend {
    fn program(&self) -> &'static str {
        match self {
            Backend::Rpicam => "rpicam-still",
            Backend::Raspistill => "raspistill",
        }
    }

    fn detect() -> Option<Self> {
        match Command::new("rpicam-still").arg("--help").output() {
            Ok(_) => Some(Backend::Rpicam),
            Err(e) => {
                log::warn!("rpicam-still not found: {}", e);
                match Command::new("raspistill").arg("-?").output() {
                    Ok(_) => Some(Backend::Raspistill),
                    Err(e) => {
                        log::error!("Neither rpicam-still nor raspistill found: {}", e);
                        None
                    }
                }
            }
        }
    }

    fn preview_args(&self, settings: &CameraSettings, index: u32) -> Vec<String> {
        let output = settings.preview_path.to_string_lossy().into_owned();
        match self {
            Backend::Rpicam => vec![
                "--camera".into(), index.to_string(),
                "-o".into(), output,
                "--width".into(), settings.width.to_string(),
                "--height".into(), settings.height.to_string(),
                "--quality".into(), settings.quality.to_string(),
                "--timelapse".into(), settings.refresh_ms.to_string(),
                "--timeout".into(), "0".into(),
                "--nopreview".into(),
            ],
            Backend::Raspistill => vec![
                "-cs".into(), index.to_string(),
                "-o".into(), output,
                "-w".into(), settings.width.to_string(),
                "-h".into(), settings.height.to_string(),
                "-q".into(), settings.quality.to_string(),
                "-tl".into(), settings.refresh_ms.to_string(),
                "-t".into(), "0".into(),
                "-n".into(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    /// JPEG quality (0-100)
    pub quality: u8,
    /// How often the capture process rewrites the preview file
    pub refresh_ms: u64,
    pub preview_path: PathBuf,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            quality: 70,
            refresh_ms: 100,
            preview_path: std::env::temp_dir().join("image_editor_camera_preview.jpg"),
        }
    }
}

/// Camera driven through the libcamera command line tools. A background
/// process keeps overwriting a preview JPEG which every tick decodes.
pub struct CommandCameraDevice {
    settings: CameraSettings,
}

impl CommandCameraDevice {
    pub fn new(settings: CameraSettings) -> Self {
        Self { settings }
    }
}

impl CaptureDevice for CommandCameraDevice {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, CaptureError> {
        if !cfg!(feature = "camera") {
            return Err(CaptureError::Unavailable("built without camera support".into()));
        }

        log::info!("Opening camera {}...", index);
        let backend = Backend::detect()
            .ok_or_else(|| CaptureError::Unavailable("no libcamera tools installed".into()))?;

        // A stale preview from an earlier run would show up as the first frame
        let _ = std::fs::remove_file(&self.settings.preview_path);

        let args = backend.preview_args(&self.settings, index);
        log::info!("Preview command: {} {}", backend.program(), args.join(" "));

        let process = Command::new(backend.program())
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Unavailable(format!("failed to start {}: {}", backend.program(), e)))?;

        log::info!("Camera preview started ({})", backend.program());
        Ok(Box::new(CommandCamera {
            process: Some(process),
            preview_path: self.settings.preview_path.clone(),
            resolution: (self.settings.width, self.settings.height),
        }))
    }

    fn name(&self) -> &'static str {
        "camera"
    }
}

pub struct CommandCamera {
    process: Option<Child>,
    preview_path: PathBuf,
    resolution: (u32, u32),
}

impl FrameSource for CommandCamera {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if let Some(process) = self.process.as_mut() {
            match process.try_wait() {
                Ok(Some(status)) => {
                    return Err(CaptureError::Disconnected(format!("capture process exited with {}", status)));
                }
                Ok(None) => {}
                Err(e) => return Err(CaptureError::Disconnected(e.to_string())),
            }
        }

        if !Path::new(&self.preview_path).exists() {
            return Err(CaptureError::FrameMiss("preview image not written yet".into()));
        }

        // The capture process may be halfway through rewriting the file
        match image::open(&self.preview_path) {
            Ok(img) => Ok(img.to_rgb8()),
            Err(e) => Err(CaptureError::FrameMiss(e.to_string())),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

impl Drop for CommandCamera {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
        if self.preview_path.exists() {
            let _ = std::fs::remove_file(&self.preview_path);
        }
        log::info!("Camera preview stopped");
    }
}

/// Synthetic source for machines without a camera.
pub struct TestPatternDevice {
    width: u32,
    height: u32,
}

impl TestPatternDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl CaptureDevice for TestPatternDevice {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Unavailable(format!(
                "invalid test pattern size {}x{}",
                self.width, self.height
            )));
        }
        log::info!("Opening test pattern source {} ({}x{})", index, self.width, self.height);
        Ok(Box::new(TestPattern {
            width: self.width,
            height: self.height,
            frame: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "test pattern"
    }
}

pub struct TestPattern {
    width: u32,
    height: u32,
    frame: u32,
}

impl FrameSource for TestPattern {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let (width, height, shift) = (self.width, self.height, self.frame.wrapping_mul(4));
        self.frame = self.frame.wrapping_add(1);

        Ok(ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width).wrapping_add(shift) as u8;
            let g = (y * 255 / height) as u8;
            let b = ((x + y) * 255 / (width + height)).wrapping_add(shift / 2) as u8;
            image::Rgb([r, g, b])
        }))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for TestPattern {
    fn drop(&mut self) {
        log::debug!("Test pattern released after {} frames", self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frames_animate() {
        let device = TestPatternDevice::new(64, 48);
        let mut source = device.open(0).unwrap();
        assert_eq!(source.resolution(), (64, 48));

        let first = source.read_frame().unwrap();
        let second = source.read_frame().unwrap();
        assert_eq!(first.dimensions(), (64, 48));
        assert_ne!(first, second);
    }

    #[test]
    fn test_pattern_rejects_zero_size() {
        let device = TestPatternDevice::new(0, 48);
        assert!(matches!(device.open(0), Err(CaptureError::Unavailable(_))));
    }

    #[test]
    fn test_missing_preview_is_a_frame_miss() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut camera = CommandCamera {
            process: None,
            preview_path: dir.path().join("missing.jpg"),
            resolution: (10, 10),
        };
        assert!(matches!(camera.read_frame(), Err(CaptureError::FrameMiss(_))));
    }

    #[test]
    fn test_corrupt_preview_is_a_frame_miss() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("partial.jpg");
        std::fs::write(&path, b"\xff\xd8\xff not really a jpeg").unwrap();
        let mut camera = CommandCamera {
            process: None,
            preview_path: path,
            resolution: (10, 10),
        };
        assert!(matches!(camera.read_frame(), Err(CaptureError::FrameMiss(_))));
    }

    #[test]
    fn test_preview_file_is_decoded_and_cleaned_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("preview.png");
        RgbImage::from_pixel(6, 4, image::Rgb([1, 2, 3])).save(&path).unwrap();

        let mut camera = CommandCamera {
            process: None,
            preview_path: path.clone(),
            resolution: (6, 4),
        };
        let frame = camera.read_frame().unwrap();
        assert_eq!(frame.dimensions(), (6, 4));
        assert_eq!(frame.get_pixel(0, 0).0, [1, 2, 3]);

        drop(camera);
        assert!(!path.exists());
    }

    #[test]
    fn test_rpicam_args_name_camera_and_output() {
        let settings = CameraSettings {
            preview_path: PathBuf::from("/tmp/preview.jpg"),
            ..Default::default()
        };
        let args = Backend::Rpicam.preview_args(&settings, 2);
        assert_eq!(&args[0..2], &["--camera".to_string(), "2".to_string()]);
        assert!(args.contains(&"/tmp/preview.jpg".to_string()));
        let args = Backend::Raspistill.preview_args(&settings, 1);
        assert_eq!(&args[0..2], &["-cs".to_string(), "1".to_string()]);
    }
}
