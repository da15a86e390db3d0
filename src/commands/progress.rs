// src/commands/progress.rs
//! Progress bars for deployment phases
//!
//! One bar per phase, replaced when the next phase starts.

use indicatif::{ProgressBar, ProgressStyle};
use stagehand::{Phase, ProgressTracker};
use std::sync::Mutex;

/// Terminal progress tracker backed by indicatif
#[derive(Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{msg:>20} ({pos}/{len}) [{bar:40.green/dim}] {percent}%")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    fn with_bar<R>(&self, f: impl FnOnce(&ProgressBar) -> R) -> Option<R> {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(f)
    }
}

impl ProgressTracker for BarProgress {
    fn start(&self, phase: Phase, total: u64) {
        let bar = ProgressBar::new(total);
        bar.set_style(Self::style());
        bar.set_message(phase.to_string());

        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = guard.replace(bar) {
            previous.finish();
        }
    }

    fn set_position(&self, position: u64) {
        self.with_bar(|bar| bar.set_position(position));
    }

    fn finish(&self) {
        self.with_bar(|bar| bar.finish());
    }

    fn position(&self) -> u64 {
        self.with_bar(|bar| bar.position()).unwrap_or(0)
    }

    fn length(&self) -> u64 {
        self.with_bar(|bar| bar.length().unwrap_or(0)).unwrap_or(0)
    }
}
