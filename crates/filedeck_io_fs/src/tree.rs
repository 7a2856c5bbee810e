//! Recursive directory copy.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::file::copy_file;
use crate::progress::CopyCancelToken;
use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{CopyError, SpecCopyOptions};
use crate::util::{create_dir_like, is_overlap, normalize_path};

struct SpecTreeContext<'a> {
    spec_cp_options: &'a SpecCopyOptions,
    token_cancel: &'a CopyCancelToken,
    path_dir_dst_root: &'a Path,
    builder_cp_report: ReportCopyBuilder,
    /// `(dev, inode)` of directories entered; only tracked when following symlinks.
    #[cfg_attr(not(unix), allow(dead_code))]
    set_visited_dirs: HashSet<(u64, u64)>,
}

/// Copy directory `dir_source` into `dir_destination`.
///
/// The destination (and missing parents) is created with the source's
/// permission bits, or reused when it already is a directory. Files are
/// overwritten by name. Symlinked entries are skipped unless
/// [`SpecCopyOptions::follow_symlinks`] is set.
///
/// The copy stops at the first failure and returns it; whatever was copied
/// before stays in place. Entries are visited in `read_dir` order.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: &SpecCopyOptions,
    token_cancel: &CopyCancelToken,
) -> Result<ReportCopy, CopyError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = normalize_path(dir_source.as_ref());
    let path_dir_dst = normalize_path(dir_destination.as_ref());

    let meta_dir_src =
        fs::metadata(&path_dir_src).map_err(|e| CopyError::from_probe(&path_dir_src, e))?;
    if !meta_dir_src.is_dir() {
        return Err(CopyError::NotADirectory(path_dir_src));
    }
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(CopyError::SourceDestinationOverlap {
            dir_source: path_dir_src,
            dir_destination: path_dir_dst,
        });
    }

    debug!(
        "Copying tree {} -> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    );
    let mut spec_tree_ctx = SpecTreeContext {
        spec_cp_options,
        token_cancel,
        path_dir_dst_root: &path_dir_dst,
        builder_cp_report: ReportCopyBuilder::default(),
        set_visited_dirs: HashSet::new(),
    };
    walk_directory(
        &path_dir_src,
        &path_dir_dst,
        &meta_dir_src,
        &mut spec_tree_ctx,
    )?;
    Ok(spec_tree_ctx.builder_cp_report.build())
}

fn walk_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    meta_dir_src: &fs::Metadata,
    spec_tree_ctx: &mut SpecTreeContext<'_>,
) -> Result<(), CopyError> {
    spec_tree_ctx.token_cancel.check()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let tuple_dir_identifier = (meta_dir_src.dev(), meta_dir_src.ino());
        if spec_tree_ctx.spec_cp_options.follow_symlinks
            && !spec_tree_ctx.set_visited_dirs.insert(tuple_dir_identifier)
        {
            warn!("Symlink loop detected: {}", path_dir_src.display());
            spec_tree_ctx
                .builder_cp_report
                .add_warning(format!("Symlink loop detected: {}", path_dir_src.display()));
            return Ok(());
        }
    }

    ensure_destination_dir(path_dir_dst, meta_dir_src, spec_tree_ctx)?;

    let iter_entries =
        fs::read_dir(path_dir_src).map_err(|e| CopyError::copy_failed(path_dir_src, e))?;
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| CopyError::copy_failed(path_dir_src, e))?;
        let path_entry_src = entry.path();
        let path_entry_dst = path_dir_dst.join(entry.file_name());
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| CopyError::copy_failed(&path_entry_src, e))?;

        if cfg_file_type.is_dir() {
            let meta_entry = entry
                .metadata()
                .map_err(|e| CopyError::copy_failed(&path_entry_src, e))?;
            walk_directory(&path_entry_src, &path_entry_dst, &meta_entry, spec_tree_ctx)?;
        } else if cfg_file_type.is_symlink() {
            handle_symlink_entry(&path_entry_src, &path_entry_dst, spec_tree_ctx)?;
        } else if cfg_file_type.is_file() {
            let meta_entry = entry
                .metadata()
                .map_err(|e| CopyError::copy_failed(&path_entry_src, e))?;
            copy_file_entry(&path_entry_src, &path_entry_dst, &meta_entry, spec_tree_ctx)?;
        } else {
            warn!("Special file skipped: {}", path_entry_src.display());
            spec_tree_ctx
                .builder_cp_report
                .add_warning(format!("Special file skipped: {}", path_entry_src.display()));
        }
    }
    Ok(())
}

fn ensure_destination_dir(
    path_dir_dst: &Path,
    meta_dir_src: &fs::Metadata,
    spec_tree_ctx: &mut SpecTreeContext<'_>,
) -> Result<(), CopyError> {
    match fs::metadata(path_dir_dst) {
        Ok(meta_dir_dst) if meta_dir_dst.is_dir() => Ok(()),
        Ok(_) => Err(CopyError::copy_failed(
            path_dir_dst,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "destination exists and is not a directory",
            ),
        )),
        Err(_) => {
            create_dir_like(path_dir_dst, meta_dir_src)
                .map_err(|e| CopyError::copy_failed(path_dir_dst, e))?;
            spec_tree_ctx.builder_cp_report.add_dir_created();
            Ok(())
        }
    }
}

fn copy_file_entry(
    path_file_src: &Path,
    path_file_dst: &Path,
    meta_file_src: &fs::Metadata,
    spec_tree_ctx: &mut SpecTreeContext<'_>,
) -> Result<(), CopyError> {
    spec_tree_ctx.token_cancel.check()?;
    let time_modified = meta_file_src
        .modified()
        .map_err(|e| CopyError::copy_failed(path_file_src, e))?;
    let n_bytes = copy_file(path_file_src, path_file_dst, time_modified)?;
    spec_tree_ctx.builder_cp_report.add_file_copied(n_bytes);
    Ok(())
}

fn handle_symlink_entry(
    path_link_src: &Path,
    path_link_dst: &Path,
    spec_tree_ctx: &mut SpecTreeContext<'_>,
) -> Result<(), CopyError> {
    if !spec_tree_ctx.spec_cp_options.follow_symlinks {
        debug!("Symlink skipped: {}", path_link_src.display());
        spec_tree_ctx.builder_cp_report.add_symlink_skipped();
        return Ok(());
    }

    let meta_target = match fs::metadata(path_link_src) {
        Ok(v) => v,
        Err(e) => {
            warn!("Broken symlink skipped: {} ({e})", path_link_src.display());
            spec_tree_ctx.builder_cp_report.add_warning(format!(
                "Broken symlink skipped: {} ({e})",
                path_link_src.display()
            ));
            return Ok(());
        }
    };

    if meta_target.is_dir() && is_overlap(path_link_src, spec_tree_ctx.path_dir_dst_root) {
        warn!("Symlink into destination skipped: {}", path_link_src.display());
        spec_tree_ctx.builder_cp_report.add_warning(format!(
            "Symlink into destination skipped: {}",
            path_link_src.display()
        ));
        Ok(())
    } else if meta_target.is_dir() {
        walk_directory(path_link_src, path_link_dst, &meta_target, spec_tree_ctx)
    } else if meta_target.is_file() {
        copy_file_entry(path_link_src, path_link_dst, &meta_target, spec_tree_ctx)
    } else {
        warn!("Special file target skipped: {}", path_link_src.display());
        spec_tree_ctx.builder_cp_report.add_warning(format!(
            "Special file target skipped: {}",
            path_link_src.display()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use filetime::{FileTime, set_file_mtime};

    use super::copy_tree;
    use crate::progress::CopyCancelToken;
    use crate::spec::{CopyError, SpecCopyOptions};

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    fn read_text(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read text")
    }

    #[test]
    fn copy_tree_reproduces_nested_structure() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("root.txt"), "root");
        write_text(&src.join("a/file1.txt"), "a");
        write_text(&src.join("b/sub/file2.txt"), "b");
        std::fs::create_dir_all(src.join("empty")).expect("mkdir empty");
        set_file_mtime(src.join("b/sub/file2.txt"), FileTime::from_unix_time(1_600_000_000, 0))
            .expect("set mtime");

        let report = copy_tree(
            &src,
            &dst,
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect("copy tree");

        assert_eq!(read_text(&dst.join("root.txt")), "root");
        assert_eq!(read_text(&dst.join("a/file1.txt")), "a");
        assert_eq!(read_text(&dst.join("b/sub/file2.txt")), "b");
        assert!(dst.join("empty").is_dir());
        let meta_file2 = std::fs::metadata(dst.join("b/sub/file2.txt")).expect("metadata");
        assert_eq!(
            FileTime::from_last_modification_time(&meta_file2),
            FileTime::from_unix_time(1_600_000_000, 0)
        );
        assert_eq!(report.cnt_files_copied, 3);
        assert_eq!(report.cnt_dirs_created, 5);
        assert_eq!(report.n_bytes_copied, 6);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn copy_tree_accepts_dot_segments() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("x.txt"), "x");

        let src_dotted = src.join("a").join("..").join(".");
        let dst_dotted = tmp.path().join("out").join("..").join("dst");
        std::fs::create_dir_all(src.join("a")).expect("mkdir a");

        copy_tree(
            &src_dotted,
            &dst_dotted,
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect("copy tree");
        assert_eq!(read_text(&tmp.path().join("dst/x.txt")), "x");
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn copy_tree_reuses_existing_destination() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("shared.txt"), "from src");
        write_text(&dst.join("shared.txt"), "stale destination text");
        write_text(&dst.join("keep.txt"), "keep");

        let report = copy_tree(
            &src,
            &dst,
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect("copy tree");

        assert_eq!(read_text(&dst.join("shared.txt")), "from src");
        assert_eq!(read_text(&dst.join("keep.txt")), "keep");
        assert_eq!(report.cnt_dirs_created, 0);
    }

    #[test]
    fn copy_tree_rejects_file_source() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("file.txt");
        write_text(&src, "x");

        let err = copy_tree(
            &src,
            tmp.path().join("dst"),
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect_err("must fail");
        assert!(matches!(err, CopyError::NotADirectory(_)));
        assert!(!tmp.path().join("dst").exists());
    }

    #[test]
    fn copy_tree_rejects_destination_inside_source() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("a.txt"), "a");

        let err = copy_tree(
            &src,
            src.join("nested"),
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect_err("must fail");
        assert!(matches!(err, CopyError::SourceDestinationOverlap { .. }));
        assert!(!src.join("nested").exists());
    }

    #[test]
    fn copy_tree_fails_when_destination_is_a_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");
        write_text(&dst, "i am a file");

        let err = copy_tree(
            &src,
            &dst,
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect_err("must fail");
        assert!(matches!(err, CopyError::CopyFailed { ref path, .. } if *path == dst));
    }

    #[test]
    fn copy_tree_stops_when_cancelled() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");

        let token_cancel = CopyCancelToken::new();
        token_cancel.cancel();
        let err = copy_tree(&src, &dst, &SpecCopyOptions::default(), &token_cancel)
            .expect_err("must fail");
        assert!(matches!(err, CopyError::Cancelled));
        assert!(!dst.join("a.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_creates_directories_with_source_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("inner/a.txt"), "a");
        std::fs::set_permissions(src.join("inner"), std::fs::Permissions::from_mode(0o750))
            .expect("chmod");

        copy_tree(
            &src,
            &dst,
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect("copy tree");

        let n_mode = std::fs::metadata(dst.join("inner"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(n_mode & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_skips_symlinks_by_default() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("real.txt"), "real");
        write_text(&tmp.path().join("outside/o.txt"), "o");
        symlink(src.join("real.txt"), src.join("link.txt")).expect("file symlink");
        symlink(tmp.path().join("outside"), src.join("link_dir")).expect("dir symlink");

        let report = copy_tree(
            &src,
            &dst,
            &SpecCopyOptions::default(),
            &CopyCancelToken::new(),
        )
        .expect("copy tree");

        assert!(dst.join("real.txt").exists());
        assert!(std::fs::symlink_metadata(dst.join("link.txt")).is_err());
        assert!(std::fs::symlink_metadata(dst.join("link_dir")).is_err());
        assert_eq!(report.cnt_symlinks_skipped, 2);
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_follows_symlinks_when_enabled() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("real.txt"), "real");
        write_text(&tmp.path().join("outside/o.txt"), "o");
        symlink(src.join("real.txt"), src.join("link.txt")).expect("file symlink");
        symlink(tmp.path().join("outside"), src.join("link_dir")).expect("dir symlink");
        symlink(tmp.path().join("gone"), src.join("dangling")).expect("dangling symlink");

        let spec_cp_options = SpecCopyOptions {
            follow_symlinks: true,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, &spec_cp_options, &CopyCancelToken::new())
            .expect("copy tree");

        assert!(!dst.join("link.txt").is_symlink());
        assert_eq!(read_text(&dst.join("link.txt")), "real");
        assert!(!dst.join("link_dir").is_symlink());
        assert_eq!(read_text(&dst.join("link_dir/o.txt")), "o");
        assert!(std::fs::symlink_metadata(dst.join("dangling")).is_err());
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("Broken symlink skipped"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_follow_mode_survives_symlink_loop() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a/file.txt"), "f");
        symlink(&src, src.join("a/back_to_root")).expect("loop symlink");

        let spec_cp_options = SpecCopyOptions {
            follow_symlinks: true,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, &spec_cp_options, &CopyCancelToken::new())
            .expect("copy tree");

        assert_eq!(read_text(&dst.join("a/file.txt")), "f");
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("Symlink loop detected"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_follow_mode_skips_link_to_destination_ancestor() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("out/dst");
        write_text(&src.join("keep.txt"), "k");
        symlink(tmp.path().join("out"), src.join("up")).expect("ancestor symlink");

        let spec_cp_options = SpecCopyOptions {
            follow_symlinks: true,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, &spec_cp_options, &CopyCancelToken::new())
            .expect("copy tree");

        assert_eq!(read_text(&dst.join("keep.txt")), "k");
        assert!(std::fs::symlink_metadata(dst.join("up")).is_err());
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("Symlink into destination skipped"))
        );
    }
}
