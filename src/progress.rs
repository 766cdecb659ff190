// src/progress.rs

//! Progress accounting and display for running jobs.
//!
//! A job calls [`ProgressTracker::register`] once with its item count and gets
//! back a [`ProgressHandle`]. The handle carries the job's counters and its
//! progress bar, so the tracker itself keeps no per-job state: when the
//! handle is finished (or dropped) nothing about the job is retained.
//!
//! Several jobs may share one tracker; their bars are stacked through an
//! `indicatif::MultiProgress`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, warn};

use crate::types::ProgressDisplay;

const BAR_TEMPLATE: &str =
    "{prefix:.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({per_sec}, eta {eta})";

/// Process-wide job id source, shared by every tracker.
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Point-in-time copy of a job's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Per-job progress state, owned by the job's draining loop.
pub struct ProgressHandle {
    id: JobId,
    label: String,
    completed: u64,
    total: u64,
    bar: ProgressBar,
}

impl fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("completed", &self.completed)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

impl ProgressHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed,
            total: self.total,
        }
    }

    /// Close the display for this job and return the final counters.
    pub fn finish(self) -> ProgressSnapshot {
        self.bar.finish();
        debug!(
            job = %self.id,
            label = %self.label,
            completed = self.completed,
            total = self.total,
            "progress finished"
        );
        self.snapshot()
    }
}

/// Registers jobs and draws their progress.
pub struct ProgressTracker {
    multi: MultiProgress,
    display: ProgressDisplay,
    style: ProgressStyle,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(ProgressDisplay::default())
    }
}

impl ProgressTracker {
    pub fn new(display: ProgressDisplay) -> Self {
        let target = match display {
            ProgressDisplay::Stderr => ProgressDrawTarget::stderr(),
            ProgressDisplay::Hidden => ProgressDrawTarget::hidden(),
        };

        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self {
            multi: MultiProgress::with_draw_target(target),
            display,
            style,
        }
    }

    /// Tracker that counts but never draws (headless runs, tests, workers).
    pub fn hidden() -> Self {
        Self::new(ProgressDisplay::Hidden)
    }

    pub fn display(&self) -> ProgressDisplay {
        self.display
    }

    /// Create the progress state for a new job with `total` units of work.
    pub fn register(&self, label: &str, total: u64) -> ProgressHandle {
        let id = JobId::next();

        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_prefix(label.to_string());

        debug!(job = %id, label, total, "registered job with progress tracker");

        ProgressHandle {
            id,
            label: label.to_string(),
            completed: 0,
            total,
            bar,
        }
    }

    /// Record `delta` more resolved units for the job behind `handle`.
    ///
    /// `completed` never exceeds `total`; overshooting is clamped and logged.
    pub fn advance(&self, handle: &mut ProgressHandle, delta: u64) {
        let room = handle.total - handle.completed;
        let applied = delta.min(room);

        if applied < delta {
            warn!(
                job = %handle.id,
                delta,
                completed = handle.completed,
                total = handle.total,
                "progress advanced past total; clamping"
            );
        }

        handle.completed += applied;
        handle.bar.inc(applied);
    }
}
