use image::RgbImage;
use std::collections::VecDeque;

/// Undo log of earlier `current` images.
///
/// Entries are owned copies; nothing in the stack aliases the live image, so
/// in-place brush strokes can never reach back into history.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    entries: VecDeque<RgbImage>,
    limit: Option<usize>,
}

impl HistoryStack {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Keeps at most `limit` snapshots, dropping the oldest first. A limit of
    /// zero disables history entirely.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: Some(limit),
        }
    }

    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(limit) => Self::with_limit(limit),
            None => Self::unbounded(),
        }
    }

    pub fn push(&mut self, snapshot: RgbImage) {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return;
            }
            while self.entries.len() >= limit {
                self.entries.pop_front();
                log::debug!("History full ({} entries), evicted oldest snapshot", limit);
            }
        }
        self.entries.push_back(snapshot);
    }

    pub fn pop(&mut self) -> Option<RgbImage> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
