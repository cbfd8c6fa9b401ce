//! Batch packaging of compiled notebooks
//!
//! A [`Packager`] bundles `file name -> document` pairs into one archive.
//! [`ZipPackager`] is the default collaborator; tests swap in failing ones.

use crate::config::ArchiveCompression;
use crate::error::PackagingError;
use crate::types::Task;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Packaging collaborator
pub trait Packager: Send + Sync {
    /// Bundle documents keyed by file name into archive bytes
    ///
    /// # Errors
    /// Any failure aborts the export; no task is deleted.
    fn bundle(&self, entries: &BTreeMap<String, String>) -> Result<Vec<u8>, PackagingError>;
}

/// Zip archive packager
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager {
    compression: ArchiveCompression,
}

impl ZipPackager {
    #[inline]
    #[must_use]
    pub fn new(compression: ArchiveCompression) -> Self {
        Self { compression }
    }

    fn method(&self) -> CompressionMethod {
        match self.compression {
            ArchiveCompression::Deflated => CompressionMethod::Deflated,
            ArchiveCompression::Stored => CompressionMethod::Stored,
        }
    }
}

impl Packager for ZipPackager {
    fn bundle(&self, entries: &BTreeMap<String, String>) -> Result<Vec<u8>, PackagingError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(self.method());

        for (name, document) in entries {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(document.as_bytes())?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Keep alphanumerics, spaces, `.` and `_`; drop trailing whitespace
#[must_use]
pub fn sanitize_file_stem(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect();
    kept.trim_end().to_string()
}

/// Archive entries for `tasks`, one per task
///
/// Stems that sanitize to nothing fall back to the task id. Colliding names
/// get a `_2`, `_3`, ... suffix so every task lands in the archive.
#[must_use]
pub fn archive_entries(tasks: &[Task], extension: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();

    for task in tasks {
        let mut stem = sanitize_file_stem(&task.title);
        if stem.is_empty() {
            stem = task.id.to_string();
        }

        let mut name = format!("{stem}{extension}");
        let mut n = 2;
        while entries.contains_key(&name) {
            name = format!("{stem}_{n}{extension}");
            n += 1;
        }
        entries.insert(name, task.document.clone());
    }

    entries
}
