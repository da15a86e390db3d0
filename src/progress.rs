// src/progress.rs

//! Shared progress tracking trait and implementations
//!
//! Every deployment phase walks the ordered change set and reports to a
//! `ProgressTracker`: once when the phase starts, with the number of
//! items, then once after each item with the running count.
//!
//! # Design
//!
//! Implementations include:
//! - `SilentProgress`: No-op for scripted/quiet modes
//! - `LogProgress`: Logs progress to tracing
//! - `CallbackProgress`: Forwards `ProgressEvent`s to a closure
//!
//! The CLI adds an indicatif-backed tracker on top of these.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

/// Deployment phase being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Staging,
    Committing,
    Permissions,
    Reverting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staging => write!(f, "Staging"),
            Self::Committing => write!(f, "Committing"),
            Self::Permissions => write!(f, "Setting permissions"),
            Self::Reverting => write!(f, "Reverting"),
        }
    }
}

/// Core trait for progress tracking
///
/// Implementations must not block; the engine calls them inline.
pub trait ProgressTracker: Send + Sync {
    /// A phase is starting with `total` items; position resets to zero
    fn start(&self, phase: Phase, total: u64);

    /// `position` items of the current phase are done
    fn set_position(&self, position: u64);

    /// The current phase is over
    fn finish(&self) {}

    /// Get current position
    fn position(&self) -> u64;

    /// Get total length
    fn length(&self) -> u64;
}

/// Silent progress tracker (no-op)
///
/// Use this for quiet mode, scripted usage, or when progress output
/// is not desired.
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
}

impl SilentProgress {
    /// Create a new silent progress tracker
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn start(&self, _phase: Phase, total: u64) {
        self.length.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Logs progress updates to tracing at info level, roughly ten times per
/// phase. Useful for non-interactive environments.
#[derive(Debug)]
pub struct LogProgress {
    phase: Mutex<Option<Phase>>,
    position: AtomicU64,
    length: AtomicU64,
    /// Log every N items; 0 means "about a tenth of the phase"
    log_interval: u64,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl LogProgress {
    /// Create a new logging progress tracker
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(None),
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
            log_interval: 0,
        }
    }

    /// Set the logging interval
    pub fn with_log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval;
        self
    }

    fn phase_name(&self) -> String {
        match *self.phase.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(phase) => phase.to_string(),
            None => "Progress".to_string(),
        }
    }

    fn interval(&self, length: u64) -> u64 {
        if self.log_interval > 0 {
            self.log_interval
        } else {
            std::cmp::max(1, length / 10)
        }
    }
}

impl ProgressTracker for LogProgress {
    fn start(&self, phase: Phase, total: u64) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = Some(phase);
        self.length.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
        info!("{}: {} item(s)", phase, total);
    }

    fn set_position(&self, position: u64) {
        let old_pos = self.position.swap(position, Ordering::Relaxed);
        let length = self.length.load(Ordering::Relaxed);

        // Log at intervals
        if length > 0 {
            let interval = self.interval(length);
            if position / interval > old_pos / interval || position == length {
                let percent = (position * 100) / length;
                info!("{}: {}% ({}/{})", self.phase_name(), percent, position, length);
            }
        }
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }
}

/// Events emitted by callback progress tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Phase started with a known number of items
    Started { phase: Phase, total: u64 },
    /// Position changed
    Position { current: u64, total: u64 },
    /// Phase finished
    Finished,
}

/// Callback-based progress tracker
///
/// Calls a user-provided function on progress updates.
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
    position: AtomicU64,
    length: AtomicU64,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    /// Create a new callback progress tracker
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
        }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn start(&self, phase: Phase, total: u64) {
        self.length.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Started { phase, total });
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
        let length = self.length.load(Ordering::Relaxed);
        (self.callback)(ProgressEvent::Position {
            current: position,
            total: length,
        });
    }

    fn finish(&self) {
        (self.callback)(ProgressEvent::Finished);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_silent_progress() {
        let progress = SilentProgress::new();

        progress.start(Phase::Staging, 100);
        progress.set_position(50);
        assert_eq!(progress.position(), 50);
        assert_eq!(progress.length(), 100);

        progress.start(Phase::Committing, 3);
        assert_eq!(progress.position(), 0);
    }

    #[test]
    fn test_log_progress() {
        let progress = LogProgress::new().with_log_interval(2);

        progress.start(Phase::Permissions, 4);
        progress.set_position(1);
        progress.set_position(2);
        assert_eq!(progress.position(), 2);
        assert_eq!(progress.length(), 4);
    }

    #[test]
    fn test_callback_progress() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let progress = CallbackProgress::new(move |event| {
            events_clone.lock().unwrap().push(event);
        });

        progress.start(Phase::Staging, 2);
        progress.set_position(1);
        progress.set_position(2);
        progress.finish();

        let captured = events.lock().unwrap();
        assert_eq!(
            *captured,
            vec![
                ProgressEvent::Started {
                    phase: Phase::Staging,
                    total: 2
                },
                ProgressEvent::Position { current: 1, total: 2 },
                ProgressEvent::Position { current: 2, total: 2 },
                ProgressEvent::Finished,
            ]
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Permissions.to_string(), "Setting permissions");
        assert_eq!(Phase::Reverting.to_string(), "Reverting");
    }
}
