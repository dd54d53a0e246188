use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::batch::source_id;
use crate::config::Config;
use crate::error::Error;

/// List candidate prefabs directly under `prefab_dir`, sorted by file name.
/// Skips stems on the config's ignore list and files that never mention the
/// marker.
///
/// The marker is matched on raw bytes, so files that are not UTF-8 are still
/// checked. Files that cannot be read at all are kept as candidates.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `prefab_dir` is not a directory.
pub fn find_candidates(prefab_dir: &Path, config: &Config) -> Result<Vec<PathBuf>, Error> {
    if !prefab_dir.is_dir() {
        return Err(Error::FileNotFound {
            path: prefab_dir.to_path_buf(),
        });
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(prefab_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && e.path().extension().is_some_and(|ext| return ext == "prefab"))
    {
        let path = entry.path();
        let stem = source_id(path);
        if config.is_ignored(&stem) {
            debug!(%stem, "ignored");
            continue;
        }

        match std::fs::read(path) {
            Ok(bytes) if mentions(&bytes, config.marker.as_bytes()) => candidates.push(path.to_path_buf()),
            Ok(_) => {},
            Err(e) => {
                // Left to the batch, which records it as unreadable.
                warn!(file = %path.display(), error = %e, "cannot check for marker");
                candidates.push(path.to_path_buf());
            },
        }
    }

    let names: Vec<String> = candidates.iter().map(|p| return source_id(p)).collect();
    info!(?names, "prefabs found");
    return Ok(candidates);
}

/// Whether `needle` occurs anywhere in `haystack`.
fn mentions(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    return haystack.windows(needle.len()).any(|window| return window == needle);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn filters_by_extension_ignore_list_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".pipsize.toml"), "ignore = [\"Player\"]\n").unwrap();
        let prefabs = dir.path().join("prefabs");
        std::fs::create_dir_all(prefabs.join("nested")).unwrap();
        std::fs::write(prefabs.join("Crawler.prefab"), "m_Name: MapDot").unwrap();
        std::fs::write(prefabs.join("Blob.prefab"), "m_Name: BlobMapDot").unwrap();
        std::fs::write(prefabs.join("Player.prefab"), "m_Name: MapDot").unwrap();
        std::fs::write(prefabs.join("Rock.prefab"), "m_Name: Rock").unwrap();
        std::fs::write(prefabs.join("Notes.txt"), "MapDot").unwrap();
        std::fs::write(prefabs.join("nested/Deep.prefab"), "MapDot").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let found = find_candidates(&prefabs, &config).unwrap();

        assert_eq!(found, [prefabs.join("Blob.prefab"), prefabs.join("Crawler.prefab")]);
    }

    #[test]
    fn non_utf8_prefabs_are_still_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        std::fs::write(dir.path().join("Blob.prefab"), "m_Name: MapDot").unwrap();
        std::fs::write(dir.path().join("Broken.prefab"), [0xff, 0xfe, b'M', b'a', b'p', b'D', b'o', b't']).unwrap();
        std::fs::write(dir.path().join("Noise.prefab"), [0xff, 0xfe, b'M', b'a', b'p']).unwrap();

        let found = find_candidates(dir.path(), &config).unwrap();

        assert_eq!(found, [dir.path().join("Blob.prefab"), dir.path().join("Broken.prefab")]);
    }

    #[test]
    fn marker_search_on_bytes() {
        assert!(mentions(b"\xff m_Name: MapDot (1)", b"MapDot"));
        assert!(!mentions(b"Map", b"MapDot"));
        assert!(mentions(b"", b""));
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        let err = find_candidates(&dir.path().join("nope"), &config).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
