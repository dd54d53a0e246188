//! Resolution cache persistence: versioned envelope, checksum, atomic writes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tracing::info;

use crate::error::Error;
use crate::resolver::parse_decimal;
use crate::types::PipSize;

/// Envelope version written by this build. Any other value is corrupt.
const SNAPSHOT_VERSION: u32 = 1;

/// Resolved pip sizes keyed by source id, in the order they were added.
/// `None` records a source that was tried and produced no pip size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSnapshot {
    /// `(source id, result)` pairs; source ids are unique.
    entries: Vec<(String, Option<PipSize>)>,
}

/// On-disk shape of one snapshot entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredEntry {
    /// Source id (prefab file stem).
    source: String,
    /// Whether a pip size was resolved.
    status: EntryStatus,
    /// Exact decimal text of the x factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<String>,
    /// Exact decimal text of the z factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z: Option<String>,
}

/// Explicit marker distinguishing a value from an absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EntryStatus {
    /// No pip size could be resolved.
    Absent,
    /// `x` and `z` are present.
    Resolved,
}

/// On-disk envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredSnapshot {
    /// Envelope format version.
    version: u32,
    /// SHA-256 over the canonical entry listing.
    checksum: String,
    /// Entries in insertion order. Kept last: TOML tables follow plain keys.
    #[serde(default)]
    entries: Vec<StoredEntry>,
}

impl ResolutionSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Record a result, replacing any earlier result for the same source in place.
    pub fn insert(&mut self, source: impl Into<String>, result: Option<PipSize>) {
        let source = source.into();
        if let Some(slot) = self.entries.iter_mut().find(|(s, _)| return *s == source) {
            slot.1 = result;
            return;
        }
        self.entries.push((source, result));
    }

    /// Result recorded for a source. `Some(None)` is a recorded absence.
    pub fn get(&self, source: &str) -> Option<Option<PipSize>> {
        return self.entries.iter().find(|(s, _)| return s == source).map(|(_, r)| return *r);
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&PipSize>)> {
        return self.entries.iter().map(|(s, r)| return (s.as_str(), r.as_ref()));
    }

    /// Number of recorded sources.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Parse a snapshot from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheCorrupt` if the content is not the expected
    /// envelope, has another version, fails its checksum, repeats a source,
    /// or carries values that are not exact decimals.
    pub fn parse(content: &str, path: &Path) -> Result<Self, Error> {
        let corrupt = |reason: String| {
            return Error::CacheCorrupt {
                path: path.to_path_buf(),
                reason,
            };
        };

        let stored: StoredSnapshot = toml::from_str(content).map_err(|e| return corrupt(e.to_string()))?;
        if stored.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                stored.version
            )));
        }
        let expected = checksum(&stored.entries);
        if stored.checksum != expected {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        let mut snapshot = Self::new();
        for entry in stored.entries {
            if snapshot.get(&entry.source).is_some() {
                return Err(corrupt(format!("duplicate source `{}`", entry.source)));
            }
            let result = decode_entry(&entry).map_err(corrupt)?;
            snapshot.entries.push((entry.source, result));
        }
        return Ok(snapshot);
    }

    /// Read and parse a snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures,
    /// or `Error::CacheCorrupt` if the bytes are not a valid snapshot.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let bytes = match std::fs::read(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CacheNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(b) => b,
        };
        let content = String::from_utf8(bytes).map_err(|e| return Error::CacheCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        return Self::parse(&content, path);
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        let entries: Vec<StoredEntry> = self.iter().map(|(source, result)| return encode_entry(source, result)).collect();
        let stored = StoredSnapshot {
            version: SNAPSHOT_VERSION,
            checksum: checksum(&entries),
            entries,
        };
        return Ok(toml::to_string_pretty(&stored)?);
    }

    /// Write the snapshot to disk, replacing any previous one atomically.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if staging or renaming fails.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let staged = self.stage(path)?;
        commit(&staged, path)?;
        info!(path = %path.display(), entries = self.len(), "wrote resolution cache");
        return Ok(());
    }

    /// Write the serialized snapshot next to `path` without touching `path`.
    /// Returns the staging file, to be passed to [`commit`].
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` or `Error::Io`.
    pub fn stage(&self, path: &Path) -> Result<PathBuf, Error> {
        use std::io::Write as _;

        if let Some(parent) = path.parent().filter(|p| return !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.serialize()?;
        let staged = staging_path(path);
        let mut file = std::fs::File::create(&staged)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        return Ok(staged);
    }
}

/// Move a staged snapshot over the real one in a single rename.
///
/// # Errors
///
/// Returns `Error::Io` if the rename fails.
pub fn commit(staged: &Path, path: &Path) -> Result<(), Error> {
    std::fs::rename(staged, path)?;
    return Ok(());
}

/// `<path>.tmp`, in the same directory so the rename stays on one filesystem.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    return path.with_file_name(name);
}

/// Convert an in-memory result to its stored form.
fn encode_entry(source: &str, result: Option<&PipSize>) -> StoredEntry {
    return match result {
        Some(size) => StoredEntry {
            source: source.to_string(),
            status: EntryStatus::Resolved,
            x: Some(size.x.to_string()),
            z: Some(size.z.to_string()),
        },
        None => StoredEntry {
            source: source.to_string(),
            status: EntryStatus::Absent,
            x: None,
            z: None,
        },
    };
}

/// Convert a stored entry back, checking that status and values agree.
///
/// # Errors
///
/// Returns the corruption reason.
fn decode_entry(entry: &StoredEntry) -> Result<Option<PipSize>, String> {
    return match (entry.status, entry.x.as_deref(), entry.z.as_deref()) {
        (EntryStatus::Absent, None, None) => Ok(None),
        (EntryStatus::Resolved, Some(x), Some(z)) => {
            let exact = |text: &str| {
                return parse_decimal(text)
                    .ok_or_else(|| return format!("`{}` has non-decimal value `{text}`", entry.source));
            };
            Ok(Some(PipSize { x: exact(x)?, z: exact(z)? }))
        },
        _ => Err(format!("`{}` has status and values out of step", entry.source)),
    };
}

/// Hex SHA-256 over one `source\tstatus\tx\tz` line per entry.
fn checksum(entries: &[StoredEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        let status = match entry.status {
            EntryStatus::Absent => "absent",
            EntryStatus::Resolved => "resolved",
        };
        let line = format!(
            "{}\t{status}\t{}\t{}\n",
            entry.source,
            entry.x.as_deref().unwrap_or_default(),
            entry.z.as_deref().unwrap_or_default()
        );
        hasher.update(line.as_bytes());
    }
    return format!("{:x}", hasher.finalize());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::*;

    fn size(x: &str, z: &str) -> PipSize {
        PipSize {
            x: Decimal::from_str(x).unwrap(),
            z: Decimal::from_str(z).unwrap(),
        }
    }

    fn sample() -> ResolutionSnapshot {
        let mut snapshot = ResolutionSnapshot::new();
        snapshot.insert("A", Some(size("1", "2")));
        snapshot.insert("B", None);
        snapshot
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caches").join("pips.toml");

        sample().write(&path).unwrap();
        let loaded = ResolutionSnapshot::read(&path).unwrap();

        assert_eq!(loaded, sample());
        assert_eq!(loaded.get("A"), Some(Some(size("1", "2"))));
        assert_eq!(loaded.get("B"), Some(None));
        assert_eq!(loaded.get("C"), None);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn keeps_decimal_scale_and_order() {
        let mut snapshot = ResolutionSnapshot::new();
        snapshot.insert("Zeta", Some(size("0.30", "1.250")));
        snapshot.insert("Alpha", Some(size("10", "3")));
        let content = snapshot.serialize().unwrap();

        let loaded = ResolutionSnapshot::parse(&content, Path::new("mem")).unwrap();
        let order: Vec<&str> = loaded.iter().map(|(s, _)| s).collect();
        assert_eq!(order, ["Zeta", "Alpha"]);
        assert_eq!(loaded.get("Zeta").unwrap().unwrap().x.to_string(), "0.30");
        assert_eq!(loaded.get("Zeta").unwrap().unwrap().z.to_string(), "1.250");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut snapshot = sample();
        snapshot.insert("A", None);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.iter().next(), Some(("A", None)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResolutionSnapshot::read(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::CacheNotFound { .. }));
    }

    #[test]
    fn corrupted_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pips.toml");
        sample().write(&path).unwrap();

        let tampered = std::fs::read_to_string(&path).unwrap().replace("x = \"1\"", "x = \"7\"");
        std::fs::write(&path, tampered).unwrap();
        let err = ResolutionSnapshot::read(&path).unwrap_err();
        assert!(matches!(err, Error::CacheCorrupt { ref reason, .. } if reason == "checksum mismatch"));

        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x12]).unwrap();
        assert!(matches!(ResolutionSnapshot::read(&path).unwrap_err(), Error::CacheCorrupt { .. }));

        std::fs::write(&path, "version = 1\nchecksum = [\n").unwrap();
        assert!(matches!(ResolutionSnapshot::read(&path).unwrap_err(), Error::CacheCorrupt { .. }));
    }

    #[test]
    fn other_versions_are_corrupt() {
        let content = sample().serialize().unwrap().replace("version = 1", "version = 2");
        let err = ResolutionSnapshot::parse(&content, Path::new("mem")).unwrap_err();
        assert!(matches!(err, Error::CacheCorrupt { ref reason, .. } if reason.contains("version 2")));
    }

    #[test]
    fn inconsistent_entries_are_corrupt() {
        let entries = vec![StoredEntry {
            source: "A".to_string(),
            status: EntryStatus::Absent,
            x: Some("1".to_string()),
            z: None,
        }];
        let stored = StoredSnapshot {
            version: SNAPSHOT_VERSION,
            checksum: checksum(&entries),
            entries,
        };
        let content = toml::to_string_pretty(&stored).unwrap();
        let err = ResolutionSnapshot::parse(&content, Path::new("mem")).unwrap_err();
        assert!(matches!(err, Error::CacheCorrupt { .. }));
    }

    #[test]
    fn interrupted_save_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pips.toml");
        sample().write(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut next = sample();
        next.insert("C", Some(size("4", "4")));
        // Crash after staging, before the rename.
        let staged = next.stage(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(ResolutionSnapshot::read(&path).unwrap(), sample());

        commit(&staged, &path).unwrap();
        assert_eq!(ResolutionSnapshot::read(&path).unwrap(), next);
    }
}
