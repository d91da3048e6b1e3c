use chrono::{DateTime, Local};
use eframe::egui;
use std::path::PathBuf;
use tokio::sync::oneshot;

use crate::editor::EditorError;
use crate::ui::EditorApp;

/// An encode running on the blocking pool.
pub struct SaveJob {
    pub path: PathBuf,
    receiver: oneshot::Receiver<Result<(), EditorError>>,
}

pub fn default_save_name(now: DateTime<Local>) -> String {
    format!("edit_{}.png", now.format("%Y%m%d_%H%M%S"))
}

impl EditorApp {
    pub fn open_image_dialog(&mut self) {
        let formats = self.editor.loader().supported_formats().to_vec();
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &formats)
            .pick_file()
        {
            match self.editor.open(&path) {
                Ok(()) => {
                    self.reset_adjustments();
                    self.status_message = format!("Loaded image: {}", path.display());
                }
                Err(e) => {
                    log::warn!("{}", e);
                    self.status_message = e.to_string();
                }
            }
        }
    }

    pub fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let paths: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if paths.is_empty() {
            return;
        }

        match self.editor.open_dropped(&paths) {
            Ok(path) => {
                self.reset_adjustments();
                self.status_message = format!("Loaded image: {}", path.display());
            }
            Err(e) => self.status_message = e.to_string(),
        }
    }

    pub fn save_image_dialog(&mut self) {
        if self.save_job.is_some() {
            self.status_message = "A save is already in progress".to_string();
            return;
        }
        let Some(pending) = self.editor.prepare_save() else {
            self.status_message = "No image to save".to_string();
            return;
        };

        self.save_progress = 0.0;
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Files", &["png"])
            .set_directory(&self.config.paths.default_save_dir)
            .set_file_name(&default_save_name(Local::now()))
            .save_file()
        else {
            return;
        };

        self.save_progress = 0.25;
        self.status_message = format!("Saving to {}...", path.display());

        let (sender, receiver) = oneshot::channel();
        let target = path.clone();
        self.runtime.spawn_blocking(move || {
            let _ = sender.send(pending.write(&target));
        });
        self.save_job = Some(SaveJob { path, receiver });
    }

    pub fn poll_save_job(&mut self, ctx: &egui::Context) {
        let Some(job) = self.save_job.as_mut() else {
            return;
        };

        let outcome = match job.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => {
                ctx.request_repaint_after(std::time::Duration::from_millis(50));
                return;
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                log::error!("Save task ended without reporting a result");
                self.save_job = None;
                self.save_progress = 0.0;
                self.status_message = "Save failed".to_string();
                return;
            }
        };

        let path = job.path.clone();
        self.save_job = None;
        match outcome {
            Ok(()) => {
                self.save_progress = 1.0;
                self.status_message = format!("Saved image: {}", path.display());
            }
            Err(e) => {
                self.save_progress = 0.0;
                log::error!("{}", e);
                self.status_message = e.to_string();
            }
        }
    }
}
