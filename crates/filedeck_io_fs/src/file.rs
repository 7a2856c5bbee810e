//! Single-file copy with modification-time transfer.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use filetime::{FileTime, set_file_mtime};

use crate::spec::CopyError;
use crate::util::is_overlap;

/// Copy the bytes of `file_source` to `file_destination`, then stamp the
/// destination with `time_modified`.
///
/// `time_modified` is the source mtime captured by the caller before the
/// copy started. An existing destination is truncated and overwritten; on
/// I/O failure it may be left partial. A source that is not a regular file
/// (after following links) fails before the destination is touched.
/// Returns the number of bytes written.
pub fn copy_file<P, Q>(
    file_source: P,
    file_destination: Q,
    time_modified: SystemTime,
) -> Result<u64, CopyError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = file_source.as_ref();
    let path_file_dst = file_destination.as_ref();

    // Truncating the destination would destroy the source.
    if is_overlap(path_file_src, path_file_dst) {
        return Err(CopyError::SourceDestinationOverlap {
            dir_source: path_file_src.to_path_buf(),
            dir_destination: path_file_dst.to_path_buf(),
        });
    }

    let meta_file_src =
        fs::metadata(path_file_src).map_err(|e| CopyError::copy_failed(path_file_src, e))?;
    if !meta_file_src.is_file() {
        return Err(CopyError::copy_failed(
            path_file_src,
            io::Error::new(io::ErrorKind::InvalidInput, "source is not a regular file"),
        ));
    }

    let mut file_src =
        File::open(path_file_src).map_err(|e| CopyError::copy_failed(path_file_src, e))?;
    let n_bytes = {
        let mut file_dst =
            File::create(path_file_dst).map_err(|e| CopyError::copy_failed(path_file_dst, e))?;
        io::copy(&mut file_src, &mut file_dst)
            .map_err(|e| CopyError::copy_failed(path_file_src, e))?
    };

    set_file_mtime(path_file_dst, FileTime::from_system_time(time_modified))
        .map_err(|e| CopyError::copy_failed(path_file_dst, e))?;
    Ok(n_bytes)
}
