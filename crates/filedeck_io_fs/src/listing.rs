//! Shallow directory listing for file-browser views.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::probe::probe_path;
use crate::spec::CopyError;
use crate::util::display_name;

/// One node of a file tree as handed to the UI.
///
/// Directories always carry `children`; an empty list means "expandable,
/// not loaded yet". Files carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    /// RFC 3339, local time zone.
    pub mod_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

/// List `path` one level deep.
///
/// A symlink whose target is a directory is listed as a directory.
/// Children are ordered directories first, then by name. An unreadable
/// directory yields the root node with no children; unreadable entries are
/// left out.
pub fn list_directory<P: AsRef<Path>>(path: P) -> Result<FileNode, CopyError> {
    let path = path.as_ref();
    debug!("Scanning directory: {}", path.display());

    let spec_probe = probe_path(path).inspect_err(|e| {
        error!("Failed to stat path {}: {e}", path.display());
    })?;
    let mut node_root = FileNode {
        name: display_name(path),
        path: path.to_path_buf(),
        is_dir: spec_probe.is_dir,
        size: spec_probe.size,
        mod_time: format_time(spec_probe.time_modified),
        children: None,
    };
    if !node_root.is_dir {
        return Ok(node_root);
    }

    let iter_entries = match fs::read_dir(path) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to read dir {}: {e}", path.display());
            node_root.children = Some(Vec::new());
            return Ok(node_root);
        }
    };

    let mut l_children = Vec::new();
    for entry in iter_entries.flatten() {
        let Ok(meta_entry) = entry.metadata() else {
            continue;
        };
        let b_is_dir = meta_entry.is_dir();
        l_children.push(FileNode {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path.join(entry.file_name()),
            is_dir: b_is_dir,
            size: meta_entry.len(),
            mod_time: meta_entry
                .modified()
                .map(format_time)
                .unwrap_or_default(),
            children: b_is_dir.then(Vec::new),
        });
    }
    l_children.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

    debug!(
        "Scan complete for {}. Found {} items.",
        path.display(),
        l_children.len()
    );
    node_root.children = Some(l_children);
    Ok(node_root)
}

/// Current user's home directory.
pub fn home_dir() -> Result<PathBuf, CopyError> {
    dirs::home_dir().ok_or_else(|| CopyError::NotFound {
        path: PathBuf::from("~"),
        source: io::Error::new(io::ErrorKind::NotFound, "home directory is not available"),
    })
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}
