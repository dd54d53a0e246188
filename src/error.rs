/// Crate-level error types for pipsize diagnostics.
use std::path::PathBuf;

use crate::types::EntryId;

/// Run-level failures. Any of these aborts the whole run; each variant names
/// the file or setting involved so the diagnostic can say how to recover.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache snapshot exists but cannot be trusted.
    #[error("cache corrupt: {}: {reason}", path.display())]
    CacheCorrupt {
        /// Snapshot file that failed to load.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// No cache snapshot exists yet.
    #[error("cache not found: {}", path.display())]
    CacheNotFound {
        /// Path where the snapshot was expected.
        path: PathBuf,
    },

    /// A required file or directory does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A setting required to run was not provided anywhere.
    #[error("missing configuration: `{setting}` is not set")]
    MissingConfiguration {
        /// Name of the environment variable or config key.
        setting: &'static str,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),
}

/// Why a single document produced no pip size. These never abort a batch:
/// the caller records an absence and reports them together at the end.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A reference names an id that is not in the document.
    #[error("dangling reference to &{id}")]
    DanglingReference {
        /// The id that could not be found.
        id: EntryId,
    },

    /// The marker scale is not a decimal literal.
    #[error("invalid scale on &{entry}: {axis} = `{literal}`")]
    InvalidScale {
        /// Component of the scale vector.
        axis: &'static str,
        /// Transform carrying the bad value.
        entry: EntryId,
        /// Raw text of the value.
        literal: String,
    },

    /// The document text is not a sequence of well-formed typed entries.
    #[error("malformed document at line {line}: {reason}")]
    MalformedDocument {
        /// One-based line where parsing gave up.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// An entry on the resolution path lacks a required attribute.
    #[error("&{entry} has no `{attribute}`")]
    MissingAttribute {
        /// Attribute path that was looked up.
        attribute: &'static str,
        /// Entry that was searched.
        entry: EntryId,
    },

    /// The father of the marker Transform is absent or not a Transform.
    #[error("MapDot Transform father not found (m_Father -> &{father})")]
    ParentTransformNotFound {
        /// Target of the `m_Father` reference, `0` when there is none.
        father: EntryId,
    },

    /// Multiplying the two scales left the decimal range.
    #[error("scale product overflows on {axis}")]
    ScaleOverflow {
        /// Component of the scale vector.
        axis: &'static str,
    },

    /// No GameObject matches the marker predicate.
    #[error("MapDot GameObject not found")]
    TargetEntryNotFound,

    /// None of the marker's components is a Transform.
    #[error("MapDot Transform not found")]
    TargetTransformNotFound,

    /// The document source could not produce text for this path.
    #[error("unreadable: {reason}")]
    Unreadable {
        /// The underlying read failure.
        reason: String,
    },
}
