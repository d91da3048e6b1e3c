use image::RgbImage;
use log::debug;

use crate::brush::Brush;
use crate::filters::{self, Operation};
use crate::history::HistoryStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
}

/// Editing context: the baseline image, the image being edited and the undo
/// log between them.
///
/// `current` is always set when `source` is. Live frames may set `current`
/// without a source; the session then still counts as empty and every edit
/// is a no-op.
#[derive(Debug, Default)]
pub struct Session {
    source: Option<RgbImage>,
    current: Option<RgbImage>,
    history: HistoryStack,
    revision: u64,
}

impl Session {
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            source: None,
            current: None,
            history: HistoryStack::from_limit(history_limit),
            revision: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.source().is_some() {
            SessionState::Loaded
        } else {
            SessionState::Empty
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == SessionState::Loaded
    }

    pub fn source(&self) -> Option<&RgbImage> {
        self.source.as_ref()
    }

    pub fn current(&self) -> Option<&RgbImage> {
        self.current.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Bumped whenever `current` changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn load(&mut self, image: RgbImage) {
        debug!("Loading {}x{} image into session", image.width(), image.height());
        self.current = Some(image.clone());
        self.source = Some(image);
        self.history.clear();
        self.revision += 1;
    }

    /// Discards every edit since the last load. History is left alone, so
    /// the reset itself cannot be undone.
    pub fn reset(&mut self) -> bool {
        match &self.source {
            Some(source) => {
                self.current = Some(source.clone());
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn apply(&mut self, operation: Operation) -> bool {
        let (Some(source), Some(current)) = (&self.source, &self.current) else {
            debug!("Ignoring {} on empty session", operation.name());
            return false;
        };

        let input = if operation.reads_source() { source } else { current };
        let result = operation.run(input);

        self.history.push(current.clone());
        self.current = Some(result);
        self.revision += 1;
        debug!("Applied {} ({} undo steps)", operation, self.history.len());
        true
    }

    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = Some(previous);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Paints straight into `current`. Strokes are not recorded in history.
    pub fn draw_stroke(&mut self, from: (i32, i32), to: (i32, i32), brush: &Brush) -> bool {
        if self.source.is_none() {
            return false;
        }
        match self.current.as_mut() {
            Some(current) => {
                filters::draw_line(current, from, to, brush.pixel(), brush.width);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Replaces the displayed image with a live frame. Neither `source` nor
    /// history is touched.
    pub fn replace_current(&mut self, frame: RgbImage) {
        self.current = Some(frame);
        self.revision += 1;
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(|image| image.dimensions())
    }
}
