use std::time::{Duration, Instant};

use crate::camera_controller::{CaptureDevice, CaptureError, FrameSource};
use crate::session::Session;

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Identifies one start..stop run of the capture timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is stopped or the interval has not elapsed yet.
    Idle,
    /// A new frame replaced the session's current image.
    Frame,
    /// The source had nothing this tick.
    Missed,
    /// The source went away; the loop stopped itself.
    Stopped,
}

struct Running {
    source: Box<dyn FrameSource>,
    timer: TimerId,
    last_tick: Option<Instant>,
    frames: u64,
    misses: u64,
}

/// Timer-driven frame ingestion. Polled from the UI thread; frames go
/// straight into `Session::replace_current`, bypassing history.
pub struct CaptureLoop {
    interval: Duration,
    running: Option<Running>,
    next_timer: u64,
}

impl Default for CaptureLoop {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl CaptureLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: None,
            next_timer: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Opens the device and starts the timer. Starting while running releases
    /// the previous source first. On failure the loop is left stopped.
    pub fn start(&mut self, device: &dyn CaptureDevice, index: u32) -> Result<TimerId, CaptureError> {
        if self.running.is_some() {
            log::info!("Restarting live preview");
            self.stop();
        }

        let source = device.open(index).map_err(|e| {
            log::error!("Failed to start live preview from {}: {}", device.name(), e);
            e
        })?;

        self.next_timer += 1;
        let timer = TimerId(self.next_timer);
        let (width, height) = source.resolution();
        log::info!(
            "Live preview started from {} {} at {}x{}, every {}ms",
            device.name(),
            index,
            width,
            height,
            self.interval.as_millis()
        );

        self.running = Some(Running {
            source,
            timer,
            last_tick: None,
            frames: 0,
            misses: 0,
        });
        Ok(timer)
    }

    /// Halts the timer and releases the source. No-op when stopped.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            log::info!(
                "Live preview run {} stopped after {} frames ({} missed)",
                running.timer.0,
                running.frames,
                running.misses
            );
            drop(running.source);
        }
    }

    /// Runs a tick if the interval has elapsed since the previous one.
    pub fn poll(&mut self, now: Instant, session: &mut Session) -> TickOutcome {
        let due = match &self.running {
            None => return TickOutcome::Idle,
            Some(running) => match running.last_tick {
                None => true,
                Some(last) => now.saturating_duration_since(last) >= self.interval,
            },
        };
        if !due {
            return TickOutcome::Idle;
        }

        if let Some(running) = self.running.as_mut() {
            running.last_tick = Some(now);
        }
        self.tick(session)
    }

    /// Acquires one frame regardless of the timer.
    pub fn tick(&mut self, session: &mut Session) -> TickOutcome {
        let Some(running) = self.running.as_mut() else {
            return TickOutcome::Idle;
        };

        match running.source.read_frame() {
            Ok(frame) => {
                running.frames += 1;
                session.replace_current(frame);
                TickOutcome::Frame
            }
            Err(CaptureError::Disconnected(reason)) => {
                log::warn!("Live source lost: {}", reason);
                self.stop();
                TickOutcome::Stopped
            }
            Err(e) => {
                running.misses += 1;
                log::debug!("Skipping capture tick: {}", e);
                TickOutcome::Missed
            }
        }
    }

    /// Time left until the next tick is due, for scheduling repaints.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        let running = self.running.as_ref()?;
        Some(match running.last_tick {
            None => Duration::ZERO,
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
        })
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
