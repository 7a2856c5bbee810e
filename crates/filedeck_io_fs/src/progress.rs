//! Progress records and the collaborators the batch engine is driven with:
//! progress sinks, pacers and the cancel token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::spec::{C_PROGRESS_COMPLETE, CopyError, SpecCopyOptions};

////////////////////////////////////////////////////////////////////////////////
// #region CopyProgress

/// Point-in-time snapshot of batch completion.
///
/// `files_done` counts finished items; the item named by `current_file` is
/// still in flight. The final record of a successful batch carries
/// `current_file == "Complete"` and `percentage == 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyProgress {
    pub current_file: String,
    pub files_done: usize,
    pub total_items: usize,
    pub percentage: f64,
}

impl CopyProgress {
    /// Record emitted right before item `files_done` is processed.
    pub fn starting(current_file: impl Into<String>, files_done: usize, total_items: usize) -> Self {
        let percentage = if total_items == 0 {
            0.0
        } else {
            files_done as f64 / total_items as f64 * 100.0
        };
        Self {
            current_file: current_file.into(),
            files_done,
            total_items,
            percentage,
        }
    }

    /// Record emitted once every item has been copied.
    pub fn complete(total_items: usize) -> Self {
        Self {
            current_file: C_PROGRESS_COMPLETE.to_string(),
            files_done: total_items,
            total_items,
            percentage: 100.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_file == C_PROGRESS_COMPLETE && self.percentage == 100.0
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Sinks

/// Receiver of progress records.
///
/// Notifications are fire-and-forget: implementations must not block the
/// copy and the engine never waits for an acknowledgment.
pub trait CopyProgressSink {
    fn notify(&self, progress: &CopyProgress);
}

impl<F> CopyProgressSink for F
where
    F: Fn(&CopyProgress),
{
    fn notify(&self, progress: &CopyProgress) {
        self(progress)
    }
}

/// A dropped receiver is not an error; the copy keeps going.
impl CopyProgressSink for mpsc::Sender<CopyProgress> {
    fn notify(&self, progress: &CopyProgress) {
        let _ = self.send(progress.clone());
    }
}

/// Sink that discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinkNoop;

impl CopyProgressSink for SinkNoop {
    fn notify(&self, _progress: &CopyProgress) {}
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Pacers

/// Hook run after each successfully copied batch item.
pub trait CopyPacer {
    /// `n_bytes_item` is the number of bytes the item wrote.
    fn pace(&self, n_bytes_item: u64);
}

impl<T: CopyPacer + ?Sized> CopyPacer for &T {
    fn pace(&self, n_bytes_item: u64) {
        (**self).pace(n_bytes_item)
    }
}

/// Pacer that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacerNoop;

impl CopyPacer for PacerNoop {
    fn pace(&self, _n_bytes_item: u64) {}
}

/// Sleeps a fixed delay after each item so a UI can render the update.
///
/// Items at or above `n_bytes_skip` bytes skip the delay; their copy
/// already took long enough to be seen.
#[derive(Debug, Clone, Copy)]
pub struct PacerFixedDelay {
    pub delay: Duration,
    pub n_bytes_skip: Option<u64>,
}

impl CopyPacer for PacerFixedDelay {
    fn pace(&self, n_bytes_item: u64) {
        if self.n_bytes_skip.is_some_and(|n| n_bytes_item >= n) {
            return;
        }
        std::thread::sleep(self.delay);
    }
}

impl SpecCopyOptions {
    /// Pacer described by the `pacing_*` fields.
    pub fn build_pacer(&self) -> Box<dyn CopyPacer> {
        if self.pacing_delay_ms == 0 {
            return Box::new(PacerNoop);
        }
        Box::new(PacerFixedDelay {
            delay: Duration::from_millis(self.pacing_delay_ms),
            n_bytes_skip: self.pacing_skip_bytes,
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Cancellation

/// Shared flag checked between batch items and before each file or subtree.
///
/// Clones observe the same flag, so one clone can be handed to a UI thread
/// while the copy runs on another.
#[derive(Debug, Default, Clone)]
pub struct CopyCancelToken(Arc<AtomicBool>);

impl CopyCancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), CopyError> {
        if self.is_cancelled() {
            return Err(CopyError::Cancelled);
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
