use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::brush::{Brush, MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH};
use crate::camera_controller::CameraSettings;

pub const CONFIG_FILE: &str = "image_editor_config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub editor: EditorConfig,
    pub brush: Brush,
    pub capture: CaptureConfig,
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub canvas_min_width: u32,
    pub canvas_min_height: u32,
    pub dark_theme: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Maximum undo depth, at least 1; leave out for unbounded history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
    pub default_blur_kernel: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureSourceKind {
    Camera,
    TestPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub source: CaptureSourceKind,
    pub device_index: u32,
    pub frame_interval_ms: u64,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub refresh_ms: u64,
    pub preview_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub default_save_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig {
                width: 1000,
                height: 700,
                canvas_min_width: 640,
                canvas_min_height: 480,
                dark_theme: true,
            },
            editor: EditorConfig {
                history_limit: Some(64),
                default_blur_kernel: 5,
            },
            brush: Brush::default(),
            capture: CaptureConfig {
                source: CaptureSourceKind::Camera,
                device_index: 0,
                frame_interval_ms: 30,
                width: 800,
                height: 600,
                quality: 70,
                refresh_ms: 100,
                preview_file: std::env::temp_dir().join("image_editor_camera_preview.jpg"),
            },
            paths: PathConfig {
                default_save_dir: PathBuf::from("output"),
                config_file: PathBuf::from(CONFIG_FILE),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from(CONFIG_FILE);

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            log::info!("Config file not found, creating default configuration");
            let default_config = Self::first_run();
            default_config.save()?;
            Ok(default_config)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| "Failed to parse configuration file")?;
        config.validate()?;

        log::info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_file(&self.paths.config_file)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(anyhow::anyhow!("Invalid display dimensions"));
        }

        if self.display.canvas_min_width > self.display.width
            || self.display.canvas_min_height > self.display.height
        {
            return Err(anyhow::anyhow!("Canvas area larger than window"));
        }

        if !(MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH).contains(&self.brush.width) {
            return Err(anyhow::anyhow!(
                "Brush width {} outside {}..={}",
                self.brush.width,
                MIN_BRUSH_WIDTH,
                MAX_BRUSH_WIDTH
            ));
        }

        if self.editor.history_limit == Some(0) {
            return Err(anyhow::anyhow!(
                "History limit of 0 disables undo; leave history_limit out for unbounded history"
            ));
        }

        if self.editor.default_blur_kernel == 0 {
            return Err(anyhow::anyhow!("Invalid default blur kernel"));
        }

        if self.capture.frame_interval_ms == 0 {
            return Err(anyhow::anyhow!("Invalid capture frame interval"));
        }

        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow::anyhow!(
                "Invalid capture resolution: {}x{}",
                self.capture.width,
                self.capture.height
            ));
        }

        if self.capture.quality > 100 {
            return Err(anyhow::anyhow!("Invalid JPEG quality: {}", self.capture.quality));
        }

        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.capture.frame_interval_ms)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            width: self.capture.width,
            height: self.capture.height,
            quality: self.capture.quality,
            refresh_ms: self.capture.refresh_ms,
            preview_path: self.capture.preview_file.clone(),
        }
    }
}

// Environment-specific configuration presets
impl Config {
    /// No camera attached: live preview shows a generated test pattern.
    pub fn development_desktop() -> Self {
        Config {
            capture: CaptureConfig {
                source: CaptureSourceKind::TestPattern,
                ..Config::default().capture
            },
            ..Default::default()
        }
    }

    /// Configuration written on first run.
    fn first_run() -> Self {
        if cfg!(feature = "camera") {
            Self::default()
        } else {
            Self::development_desktop()
        }
    }
}
