//! Batch resolution: read, parse and resolve many prefabs, never stopping
//! on a single bad document.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cache::ResolutionSnapshot;
use crate::error::ResolveError;
use crate::parser;
use crate::resolver;
use crate::types::PipSize;

/// Supplies raw document text for a path.
pub trait DocumentSource {
    /// Read the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads documents straight from the filesystem.
pub struct FsSource;

impl DocumentSource for FsSource {
    /// Read the file as UTF-8.
    fn read(&self, path: &Path) -> std::io::Result<String> {
        return std::fs::read_to_string(path);
    }
}

/// A document that produced no pip size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Why resolution stopped.
    pub error: ResolveError,
    /// Path of the document.
    pub path: PathBuf,
    /// Source id (file stem).
    pub source: String,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Every failed document, in input order.
    pub failures: Vec<DocumentFailure>,
    /// Every document's result, in input order. Failures are recorded as absences.
    pub snapshot: ResolutionSnapshot,
}

/// The source id of a document: its file name without extension.
pub fn source_id(path: &Path) -> String {
    return path
        .file_stem()
        .map(|stem| return stem.to_string_lossy().into_owned())
        .unwrap_or_default();
}

/// Read, parse and resolve one document.
///
/// # Errors
///
/// Returns `Unreadable` when the source fails, `MalformedDocument` from the
/// parser, or any resolver error.
pub fn resolve_document(source: &impl DocumentSource, path: &Path) -> Result<PipSize, ResolveError> {
    let text = source.read(path).map_err(|e| return ResolveError::Unreadable { reason: e.to_string() })?;
    let document = parser::parse(&text)?;
    debug!(file = %path.display(), entries = document.len(), "parsed");
    return resolver::resolve_pip_size(&document);
}

/// Resolve every path in order. Results are keyed by source id.
pub fn resolve_batch(source: &impl DocumentSource, paths: &[PathBuf]) -> BatchReport {
    let mut report = BatchReport::default();

    for path in paths {
        let id = source_id(path);
        info!(file = %path.display(), "reading");
        match resolve_document(source, path) {
            Ok(size) => report.snapshot.insert(id, Some(size)),
            Err(error) => {
                warn!(file = %path.display(), %error, "no pip size");
                report.snapshot.insert(id.clone(), None);
                report.failures.push(DocumentFailure {
                    error,
                    path: path.clone(),
                    source: id,
                });
            },
        }
    }

    return report;
}
