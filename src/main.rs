use anyhow::Result;
use eframe::egui;
use log::info;

mod brush;
mod camera_controller;
mod capture;
mod config;
mod editor;
mod filters;
mod history;
mod image_ops;
mod image_processor;
mod mapper;
mod session;
mod texture;
mod ui;

use crate::brush::{Theme, UiPreferences};
use crate::camera_controller::{CaptureDevice, CommandCameraDevice, TestPatternDevice};
use crate::capture::CaptureLoop;
use crate::config::{CaptureSourceKind, Config};
use crate::editor::Editor;
use crate::session::Session;
use crate::ui::EditorApp;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting image editor");

    let config = Config::load()?;
    info!(
        "Configuration loaded: {}x{} window, {:?} capture source",
        config.display.width, config.display.height, config.capture.source
    );

    let device: Box<dyn CaptureDevice> = match config.capture.source {
        CaptureSourceKind::Camera => Box::new(CommandCameraDevice::new(config.camera_settings())),
        CaptureSourceKind::TestPattern => Box::new(TestPatternDevice::new(
            config.capture.width,
            config.capture.height,
        )),
    };

    let mut editor = Editor::new(
        Session::new(config.editor.history_limit),
        CaptureLoop::new(config.frame_interval()),
        device,
        config.capture.device_index,
        config.brush,
    );
    *editor.preferences_mut() = UiPreferences {
        theme: if config.display.dark_theme { Theme::Dark } else { Theme::Light },
    };

    let width = config.display.width as f32;
    let height = config.display.height as f32;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_min_inner_size([
                config.display.canvas_min_width as f32,
                config.display.canvas_min_height as f32,
            ]),
        ..Default::default()
    };

    let runtime = tokio::runtime::Handle::current();

    info!("Launching GUI application...");
    eframe::run_native(
        "Image Editor",
        options,
        Box::new(move |cc| {
            setup_style(&cc.egui_ctx);
            Box::new(EditorApp::new(editor, config, runtime))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))?;

    info!("Application shut down gracefully");
    Ok(())
}

fn setup_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);

    style.text_styles.insert(
        egui::TextStyle::Button,
        egui::FontId::new(15.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Body,
        egui::FontId::new(14.0, egui::FontFamily::Proportional),
    );

    style.spacing.slider_width = 220.0;

    ctx.set_style(style);
}
