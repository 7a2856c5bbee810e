//! Copy specification models and top-level error types.

use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region Constants

/// Event name GUI bridges publish [`CopyProgress`](crate::progress::CopyProgress) records under.
pub const C_EVENT_COPY_PROGRESS: &str = "copy-progress";

/// `current_file` of the final progress record of a successful batch.
pub const C_PROGRESS_COMPLETE: &str = "Complete";

/// Pacing delay the desktop UI uses so small files still show up in the progress bar.
pub const N_PACING_DELAY_MS_UI: u64 = 50;

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for `copy_tree` and `copy_batch`.
///
/// Deserializable so a GUI bridge can forward its JSON settings unchanged;
/// missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecCopyOptions {
    /// Dereference symlinks met during traversal instead of skipping them.
    pub follow_symlinks: bool,
    /// Delay inserted after each copied batch item, in milliseconds. `0` disables pacing.
    pub pacing_delay_ms: u64,
    /// Items whose copied size reaches this many bytes skip the pacing delay.
    pub pacing_skip_bytes: Option<u64>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors surfaced by probing, tree copy and batch copy.
#[derive(Debug, Error)]
pub enum CopyError {
    /// Path does not exist.
    #[error("Path not found: {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path exists but may not be inspected.
    #[error("Permission denied: {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other stat failure.
    #[error("Failed to stat {}: {source}", .path.display())]
    ProbeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Batch destination is missing or not a directory.
    #[error("Invalid destination {}: {message}", .path.display())]
    InvalidDestination { path: PathBuf, message: String },

    /// None of the batch items exist.
    #[error("No valid items to copy")]
    NoValidItems,

    /// Tree copy source is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Destination lies inside (or is) the source.
    #[error(
        "Source and destination overlap: {} <-> {}",
        .dir_source.display(),
        .dir_destination.display()
    )]
    SourceDestinationOverlap {
        dir_source: PathBuf,
        dir_destination: PathBuf,
    },

    /// I/O failure while copying a file or subtree.
    ///
    /// `source` is either the raw [`io::Error`] or, at batch level, the
    /// nested [`CopyError`] of the item.
    #[error("Failed to copy {}: {source}", .path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    /// The cancel token fired.
    #[error("Copy cancelled")]
    Cancelled,
}

impl CopyError {
    /// Classify a stat failure.
    pub(crate) fn from_probe(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path, source },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::ProbeFailed { path, source },
        }
    }

    pub(crate) fn copy_failed<E>(path: &Path, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::CopyFailed {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    /// Path the error refers to, when it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::ProbeFailed { path, .. }
            | Self::InvalidDestination { path, .. }
            | Self::CopyFailed { path, .. } => Some(path),
            Self::NotADirectory(path) => Some(path),
            Self::SourceDestinationOverlap {
                dir_destination, ..
            } => Some(dir_destination),
            Self::NoValidItems | Self::Cancelled => None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
