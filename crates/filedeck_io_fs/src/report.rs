//! Copy report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// Aggregate counters and diagnostics for one tree or batch copy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportCopy {
    /// Batch items copied successfully.
    pub cnt_items_copied: u64,
    /// Batch items that disappeared between validation and copy.
    pub cnt_items_vanished: u64,
    /// Regular files written.
    pub cnt_files_copied: u64,
    /// Destination directories created (reused ones are not counted).
    pub cnt_dirs_created: u64,
    /// Symlinked entries left out of the copy.
    pub cnt_symlinks_skipped: u64,
    /// Bytes written across all files.
    pub n_bytes_copied: u64,
    /// Non-fatal warnings collected during traversal/copy.
    pub warnings: Vec<String>,
}

impl ReportCopy {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_items_copied".to_string(), self.cnt_items_copied);
        dict_counts.insert("cnt_items_vanished".to_string(), self.cnt_items_vanished);
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert(
            "cnt_symlinks_skipped".to_string(),
            self.cnt_symlinks_skipped,
        );
        dict_counts.insert("n_bytes_copied".to_string(), self.n_bytes_copied);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} items={} vanished={} files={} dirs={} symlinks_skipped={} bytes={} warnings={}",
            self.cnt_items_copied,
            self.cnt_items_vanished,
            self.cnt_files_copied,
            self.cnt_dirs_created,
            self.cnt_symlinks_skipped,
            self.n_bytes_copied,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COPY]"))
    }
}

/// Mutable accumulator for copy statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportCopyBuilder {
    report: ReportCopy,
}

impl ReportCopyBuilder {
    pub fn add_item_copied(&mut self) {
        self.report.cnt_items_copied += 1;
    }

    pub fn add_item_vanished(&mut self) {
        self.report.cnt_items_vanished += 1;
    }

    /// Count one written file of `n_bytes` bytes.
    pub fn add_file_copied(&mut self, n_bytes: u64) {
        self.report.cnt_files_copied += 1;
        self.report.n_bytes_copied += n_bytes;
    }

    pub fn add_dir_created(&mut self) {
        self.report.cnt_dirs_created += 1;
    }

    pub fn add_symlink_skipped(&mut self) {
        self.report.cnt_symlinks_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    /// Fold a finished sub-report (one batch item) into this one.
    pub fn merge(&mut self, report_sub: ReportCopy) {
        self.report.cnt_items_copied += report_sub.cnt_items_copied;
        self.report.cnt_items_vanished += report_sub.cnt_items_vanished;
        self.report.cnt_files_copied += report_sub.cnt_files_copied;
        self.report.cnt_dirs_created += report_sub.cnt_dirs_created;
        self.report.cnt_symlinks_skipped += report_sub.cnt_symlinks_skipped;
        self.report.n_bytes_copied += report_sub.n_bytes_copied;
        self.report.warnings.extend(report_sub.warnings);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportCopy {
        self.report
    }
}
