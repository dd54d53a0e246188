//! CLI commands for pipsize: scan, resolve, show.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::info;

use crate::batch::{self, FsSource};
use crate::cache::ResolutionSnapshot;
use crate::config::Config;
use crate::diagnostics;
use crate::error::Error;
use crate::scanner;
use crate::titles::display_title;

/// Exit code when some documents have no pip size.
const EXIT_UNRESOLVED: u8 = 2;

/// Reuse the cache snapshot if one exists; otherwise enumerate prefabs,
/// resolve them all, write the snapshot, and report. With `rebuild` the
/// snapshot is ignored and only replaced once the new one has been written.
///
/// # Errors
///
/// Returns `CacheCorrupt` for an untrustworthy snapshot,
/// `MissingConfiguration` when a rebuild is needed but no root is known,
/// and I/O or enumeration errors.
pub fn scan(root: Option<PathBuf>, cache: Option<PathBuf>, rebuild: bool) -> Result<ExitCode, Error> {
    let config = Config::load(Path::new("."))?;
    let cache_path = cache.unwrap_or_else(|| return config.cache.clone());

    if rebuild {
        info!(path = %cache_path.display(), "rebuilding, previous cache is replaced once resolution finishes");
    } else {
        match ResolutionSnapshot::read(&cache_path) {
            Ok(snapshot) => {
                info!(path = %cache_path.display(), "loaded previous cache");
                info!("if the game extract files have been updated, delete that cache and rerun");
                return Ok(exit_code(print_snapshot(&snapshot)));
            },
            Err(Error::CacheNotFound { .. }) => info!("no cache found, loading from game extractions"),
            Err(e) => return Err(e),
        }
    }

    let extract_root = config.extract_root(root)?;
    let candidates = scanner::find_candidates(&extract_root.join(&config.prefab_dir), &config)?;
    let report = batch::resolve_batch(&FsSource, &candidates);

    report.snapshot.write(&cache_path)?;
    let unresolved = print_snapshot(&report.snapshot);
    diagnostics::print_failures(&report.failures);

    return Ok(exit_code(unresolved));
}

/// `0` when every recorded source resolved, `2` otherwise.
fn exit_code(unresolved: usize) -> ExitCode {
    if unresolved == 0 {
        return ExitCode::SUCCESS;
    }
    return ExitCode::from(EXIT_UNRESOLVED);
}

/// Resolve a single prefab and print its pip size.
/// A document failure is printed and reported with exit code 2.
pub fn resolve(file: &Path) -> ExitCode {
    return match batch::resolve_document(&FsSource, file) {
        Ok(size) => {
            println!("{size}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("{}: {e}", file.display());
            ExitCode::from(EXIT_UNRESOLVED)
        },
    };
}

/// Print the cached snapshot without resolving anything.
///
/// # Errors
///
/// Returns `CacheNotFound` or `CacheCorrupt`.
pub fn show(cache: Option<PathBuf>) -> Result<ExitCode, Error> {
    let cache_path = match cache {
        Some(path) => path,
        None => Config::load(Path::new("."))?.cache,
    };
    let snapshot = ResolutionSnapshot::read(&cache_path)?;
    print_snapshot(&snapshot);
    return Ok(ExitCode::SUCCESS);
}

/// One row per source in snapshot order: id, display title, x and z.
/// Returns the number of unresolved sources.
fn print_snapshot(snapshot: &ResolutionSnapshot) -> usize {
    if snapshot.is_empty() {
        println!("No prefabs recorded");
        return 0;
    }
    let mut unresolved = 0_usize;
    for (source, size) in snapshot.iter() {
        let title = display_title(source);
        match size {
            Some(size) => println!("{source:<28} {title:<20} x={}  z={}", size.x, size.z),
            None => {
                unresolved = unresolved.saturating_add(1);
                println!("{source:<28} {title:<20} unresolved");
            },
        }
    }
    let resolved = snapshot.len().saturating_sub(unresolved);
    println!();
    println!("{resolved} resolved, {unresolved} unresolved");
    return unresolved;
}
