//! Non-link-following path classification.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::spec::CopyError;

/// Filesystem facts about one path, captured at probe time.
///
/// `size` and `time_modified` describe the path itself; for a symlink that
/// is the link, not its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPathProbe {
    pub path: PathBuf,
    /// `false` only for a symlink whose target cannot be stat'ed.
    pub exists: bool,
    /// Directory, or symlink whose immediate target is a directory.
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub time_modified: SystemTime,
}

/// Stat `path` without following symlinks.
///
/// A symlink is resolved exactly one level: when its target is a directory
/// the node is reported as a directory. A link pointing at another link is
/// not chased further.
pub fn probe_path<P: AsRef<Path>>(path: P) -> Result<SpecPathProbe, CopyError> {
    let path = path.as_ref();
    let meta_path = fs::symlink_metadata(path).map_err(|e| CopyError::from_probe(path, e))?;

    let b_is_symlink = meta_path.file_type().is_symlink();
    let mut b_is_dir = meta_path.is_dir();
    let mut b_exists = true;
    if b_is_symlink {
        match _stat_link_target(path) {
            Some(meta_target) => b_is_dir = meta_target.is_dir(),
            None => b_exists = false,
        }
    }

    let time_modified = meta_path
        .modified()
        .map_err(|e| CopyError::from_probe(path, e))?;

    Ok(SpecPathProbe {
        path: path.to_path_buf(),
        exists: b_exists,
        is_dir: b_is_dir,
        is_symlink: b_is_symlink,
        size: meta_path.len(),
        time_modified,
    })
}

fn _stat_link_target(path_link: &Path) -> Option<fs::Metadata> {
    let path_target = fs::read_link(path_link).ok()?;
    let path_target = match path_link.parent() {
        Some(path_parent) if path_target.is_relative() => path_parent.join(path_target),
        _ => path_target,
    };
    fs::symlink_metadata(path_target).ok()
}
