use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Absolutize `path` and fold `.`/`..` segments without touching the filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut path_out = PathBuf::new();
    for part in _absolutize_path(path).components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                path_out.pop();
            }
            other => path_out.push(other.as_os_str()),
        }
    }
    path_out
}

/// Resolve symlinks where the path (or its parent) exists; fall back to the lexical form.
fn _resolve_path(path: &Path) -> PathBuf {
    let path_norm = normalize_path(path);
    if let Ok(resolved) = fs::canonicalize(&path_norm) {
        return resolved;
    }
    if let (Some(path_parent), Some(name)) = (path_norm.parent(), path_norm.file_name())
        && let Ok(resolved_parent) = fs::canonicalize(path_parent)
    {
        return resolved_parent.join(name);
    }
    path_norm
}

/// `true` when `dst` is `src` or lives underneath it.
pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    _resolve_path(dst).starts_with(_resolve_path(src))
}

/// Final path segment used to name the copy inside the destination directory.
pub(crate) fn base_name(path: &Path) -> Option<String> {
    normalize_path(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Label shown in progress records; never empty.
pub(crate) fn display_name(path: &Path) -> String {
    base_name(path).unwrap_or_else(|| path.display().to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DirectoryCreation

/// Create `path_dir` and any missing parents with the permission bits of `meta_dir_src`.
pub(crate) fn create_dir_like(path_dir: &Path, meta_dir_src: &fs::Metadata) -> io::Result<()> {
    let mut builder_dir = fs::DirBuilder::new();
    builder_dir.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        builder_dir.mode(meta_dir_src.permissions().mode() & 0o7777);
    }
    #[cfg(not(unix))]
    {
        let _ = meta_dir_src;
    }
    builder_dir.create(path_dir)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
