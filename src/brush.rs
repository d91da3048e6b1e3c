use image::Rgb;
use serde::{Deserialize, Serialize};

pub const MIN_BRUSH_WIDTH: u32 = 1;
pub const MAX_BRUSH_WIDTH: u32 = 30;

/// Colour and stroke width used for freehand drawing. Only changed through
/// explicit configuration (colour picker, size slider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brush {
    pub color: [u8; 3],
    pub width: u32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            width: 5,
        }
    }
}

impl Brush {
    pub fn new(color: [u8; 3], width: u32) -> Self {
        Self {
            color,
            width: width.max(MIN_BRUSH_WIDTH),
        }
    }

    pub fn set_color(&mut self, color: [u8; 3]) {
        self.color = color;
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH);
    }

    pub fn pixel(&self) -> Rgb<u8> {
        Rgb(self.color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiPreferences {
    pub theme: Theme,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self { theme: Theme::Dark }
    }
}

impl UiPreferences {
    pub fn toggle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
    }

    pub fn is_dark(&self) -> bool {
        self.theme == Theme::Dark
    }
}
