//! `filedeck_io_fs` v1:
//! filesystem backend of the filedeck file browser.
//!
//! Modules:
//! - `batch`    : ordered multi-item copy with progress notifications
//! - `tree`     : recursive directory copy
//! - `file`     : single-file copy with mtime transfer
//! - `probe`    : non-link-following path classification
//! - `progress` : progress records, sinks, pacers and the cancel token
//! - `listing`  : one-level directory listing for tree views
//! - `spec`     : options, constants and errors
//! - `report`   : run-time report model
//! - `util`     : shared path helpers

pub mod batch;
pub mod file;
pub mod listing;
pub mod probe;
pub mod progress;
pub mod report;
pub mod spec;
pub mod tree;
mod util;

pub use batch::{BatchCopier, copy_batch};
pub use file::copy_file;
pub use listing::{FileNode, home_dir, list_directory};
pub use probe::{SpecPathProbe, probe_path};
pub use progress::{
    CopyCancelToken, CopyPacer, CopyProgress, CopyProgressSink, PacerFixedDelay, PacerNoop,
    SinkNoop,
};
pub use report::{ReportCopy, ReportCopyBuilder};
pub use spec::{
    C_EVENT_COPY_PROGRESS, C_PROGRESS_COMPLETE, CopyError, N_PACING_DELAY_MS_UI, SpecCopyOptions,
};
pub use tree::copy_tree;
