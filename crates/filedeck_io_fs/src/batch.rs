//! Batch copy orchestration: validation, per-item dispatch and progress.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::file::copy_file;
use crate::probe::{SpecPathProbe, probe_path};
use crate::progress::{CopyCancelToken, CopyPacer, CopyProgress, CopyProgressSink, PacerNoop};
use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{CopyError, SpecCopyOptions};
use crate::tree::copy_tree;
use crate::util::{base_name, display_name};

/// Copies an ordered list of files and directories into one destination.
///
/// Collaborators are injected: the progress sink, an optional pacer
/// (no-op by default) and a cancel token. The copier itself holds no
/// state between runs; overlapping runs against the same destination
/// must be serialized by the caller.
pub struct BatchCopier<'a> {
    sink: &'a dyn CopyProgressSink,
    pacer: Box<dyn CopyPacer + 'a>,
    spec_cp_options: SpecCopyOptions,
    token_cancel: CopyCancelToken,
}

impl<'a> BatchCopier<'a> {
    pub fn new(sink: &'a dyn CopyProgressSink) -> Self {
        Self {
            sink,
            pacer: Box::new(PacerNoop),
            spec_cp_options: SpecCopyOptions::default(),
            token_cancel: CopyCancelToken::new(),
        }
    }

    /// Traversal options. Pacing fields are not consulted here; see [`Self::with_pacer`].
    pub fn with_options(mut self, spec_cp_options: SpecCopyOptions) -> Self {
        self.spec_cp_options = spec_cp_options;
        self
    }

    pub fn with_pacer(mut self, pacer: Box<dyn CopyPacer + 'a>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_cancel_token(mut self, token_cancel: CopyCancelToken) -> Self {
        self.token_cancel = token_cancel;
        self
    }

    /// Copy every existing path of `items` into `dir_destination`, in order.
    ///
    /// Fails before any side effect with [`CopyError::InvalidDestination`]
    /// or [`CopyError::NoValidItems`]. Each item is announced to the sink
    /// before it is processed; an item that vanished since validation is
    /// logged and skipped. The first copy failure aborts the batch as
    /// [`CopyError::CopyFailed`] naming the item, leaving earlier items in
    /// place. A final "Complete" record is sent only on success.
    pub fn copy_batch<P, Q>(&self, items: &[P], dir_destination: Q) -> Result<ReportCopy, CopyError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let path_dir_dst = dir_destination.as_ref();
        validate_destination(path_dir_dst)?;

        let l_items: Vec<&Path> = items
            .iter()
            .map(|item| item.as_ref())
            .filter(|path_item| is_existing_item(path_item))
            .collect();
        if l_items.is_empty() {
            warn!("No valid items to copy into {}", path_dir_dst.display());
            return Err(CopyError::NoValidItems);
        }

        let n_total = l_items.len();
        info!("Copying {n_total} item(s) into {}", path_dir_dst.display());
        let mut builder_cp_report = ReportCopyBuilder::default();
        for (n_idx, path_item) in l_items.into_iter().enumerate() {
            if self.token_cancel.is_cancelled() {
                info!("Copy cancelled after {n_idx} of {n_total} item(s)");
                return Err(CopyError::Cancelled);
            }

            self.sink
                .notify(&CopyProgress::starting(display_name(path_item), n_idx, n_total));

            let spec_probe = match probe_path(path_item) {
                Ok(v) if v.exists => v,
                Ok(_) => {
                    warn!("Source vanished before copy: {}", path_item.display());
                    builder_cp_report.add_item_vanished();
                    continue;
                }
                Err(e) => {
                    warn!("Failed to stat source {}: {e}", path_item.display());
                    builder_cp_report.add_item_vanished();
                    continue;
                }
            };

            match self.copy_item(path_item, &spec_probe, path_dir_dst) {
                Ok(report_item) => {
                    let n_bytes_item = report_item.n_bytes_copied;
                    builder_cp_report.merge(report_item);
                    builder_cp_report.add_item_copied();
                    self.pacer.pace(n_bytes_item);
                }
                Err(CopyError::Cancelled) => {
                    info!("Copy cancelled at {}", path_item.display());
                    return Err(CopyError::Cancelled);
                }
                Err(e) => {
                    error!("Failed to copy {}: {e}", path_item.display());
                    return Err(wrap_item_error(path_item, e));
                }
            }
        }

        self.sink.notify(&CopyProgress::complete(n_total));
        let report = builder_cp_report.build();
        info!("{}", report);
        Ok(report)
    }

    fn copy_item(
        &self,
        path_item: &Path,
        spec_probe: &SpecPathProbe,
        path_dir_dst: &Path,
    ) -> Result<ReportCopy, CopyError> {
        self.token_cancel.check()?;

        let name_item = base_name(path_item).ok_or_else(|| {
            CopyError::copy_failed(
                path_item,
                io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
            )
        })?;
        let path_item_dst = path_dir_dst.join(name_item);

        if spec_probe.is_dir {
            return self.copy_item_tree(path_item, &path_item_dst);
        }

        // The probe resolves one link level; follow the whole chain before dispatch.
        let meta_item = fs::metadata(path_item).map_err(|e| CopyError::copy_failed(path_item, e))?;
        if meta_item.is_dir() {
            return self.copy_item_tree(path_item, &path_item_dst);
        }
        if !meta_item.is_file() {
            warn!("Unsupported file type: {}", path_item.display());
            return Err(CopyError::copy_failed(
                path_item,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "source is neither a regular file nor a directory",
                ),
            ));
        }

        // A link named explicitly stands for its target; stamp the target's mtime.
        let time_modified = if spec_probe.is_symlink {
            meta_item
                .modified()
                .map_err(|e| CopyError::copy_failed(path_item, e))?
        } else {
            spec_probe.time_modified
        };
        debug!(
            "Copying file {} -> {}",
            path_item.display(),
            path_item_dst.display()
        );
        let n_bytes = copy_file(path_item, &path_item_dst, time_modified)?;

        let mut builder_item = ReportCopyBuilder::default();
        builder_item.add_file_copied(n_bytes);
        Ok(builder_item.build())
    }

    fn copy_item_tree(
        &self,
        path_item: &Path,
        path_item_dst: &Path,
    ) -> Result<ReportCopy, CopyError> {
        debug!(
            "Copying directory {} -> {}",
            path_item.display(),
            path_item_dst.display()
        );
        copy_tree(path_item, path_item_dst, &self.spec_cp_options, &self.token_cancel)
    }
}

/// Copy `items` into `dir_destination` with pacing built from `spec_cp_options`.
pub fn copy_batch<P, Q>(
    items: &[P],
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
    sink: &dyn CopyProgressSink,
) -> Result<ReportCopy, CopyError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let pacer = spec_cp_options.build_pacer();
    BatchCopier::new(sink)
        .with_pacer(pacer)
        .with_options(spec_cp_options)
        .copy_batch(items, dir_destination)
}

fn validate_destination(path_dir_dst: &Path) -> Result<(), CopyError> {
    match fs::metadata(path_dir_dst) {
        Ok(meta_dir_dst) if meta_dir_dst.is_dir() => Ok(()),
        Ok(_) => {
            error!("Destination is not a directory: {}", path_dir_dst.display());
            Err(CopyError::InvalidDestination {
                path: path_dir_dst.to_path_buf(),
                message: "destination is not a directory".to_string(),
            })
        }
        Err(e) => {
            error!(
                "Destination directory does not exist: {} ({e})",
                path_dir_dst.display()
            );
            Err(CopyError::InvalidDestination {
                path: path_dir_dst.to_path_buf(),
                message: format!("destination directory does not exist: {e}"),
            })
        }
    }
}

fn is_existing_item(path_item: &Path) -> bool {
    match probe_path(path_item) {
        Ok(spec_probe) => spec_probe.exists,
        Err(e) => {
            debug!("Dropping item {}: {e}", path_item.display());
            false
        }
    }
}

/// Attach the item path to a failure unless the error already names it.
fn wrap_item_error(path_item: &Path, err: CopyError) -> CopyError {
    match err {
        CopyError::CopyFailed { ref path, .. } if path == path_item => err,
        other => CopyError::copy_failed(path_item, other),
    }
}
