use std::path::{Path, PathBuf};

use crate::error::Error;

/// Environment variable naming the game extraction root.
pub const EXTRACT_ROOT_VAR: &str = "GAME_EXTRACT_ROOT";

/// Project configuration loaded from `.pipsize.toml`.
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug)]
pub struct Config {
    /// Snapshot file of the resolution cache.
    pub cache: PathBuf,
    /// Extraction root from the file, lowest-precedence source.
    extract_root: Option<PathBuf>,
    /// Prefab stems never resolved.
    ignore: Vec<String>,
    /// Substring a prefab must contain to be a candidate.
    pub marker: String,
    /// Prefab directory, relative to the extraction root.
    pub prefab_dir: PathBuf,
}

/// Raw TOML structure for `.pipsize.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PipsizeTomlConfig {
    cache: Option<PathBuf>,
    extract_root: Option<PathBuf>,
    #[serde(default)]
    ignore: Vec<String>,
    marker: Option<String>,
    prefab_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from `.pipsize.toml` in the given directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(".pipsize.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::defaults(dir)),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: PipsizeTomlConfig = toml::from_str(&content)?;
        let defaults = Self::defaults(dir);
        return Ok(Self {
            cache: raw.cache.map_or(defaults.cache, |p| return dir.join(p)),
            extract_root: raw.extract_root.map(|p| return dir.join(p)),
            ignore: raw.ignore,
            marker: raw.marker.unwrap_or(defaults.marker),
            prefab_dir: raw.prefab_dir.unwrap_or(defaults.prefab_dir),
        });
    }

    /// Unity export layout, cache under `caches/`, nothing ignored.
    fn defaults(dir: &Path) -> Self {
        return Self {
            cache: dir.join("caches").join("radarPipSizes.toml"),
            extract_root: None,
            ignore: Vec::new(),
            marker: "MapDot".to_string(),
            prefab_dir: Path::new("ExportedProject").join("Assets").join("PrefabInstance"),
        };
    }

    /// Pick the extraction root: the command-line value (which clap already
    /// fills from `GAME_EXTRACT_ROOT`), else the config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingConfiguration` if neither is set.
    pub fn extract_root(&self, from_cli: Option<PathBuf>) -> Result<PathBuf, Error> {
        return from_cli
            .or_else(|| return self.extract_root.clone())
            .ok_or(Error::MissingConfiguration {
                setting: EXTRACT_ROOT_VAR,
            });
    }

    /// Whether a prefab stem is on the ignore list.
    pub fn is_ignored(&self, stem: &str) -> bool {
        return self.ignore.iter().any(|name| return name == stem);
    }
}
