use crate::batch::DocumentFailure;
use crate::config::EXTRACT_ROOT_VAR;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Print per-document failures gathered during a batch.
pub fn print_failures(failures: &[DocumentFailure]) {
    if failures.is_empty() {
        return;
    }
    print_markdown(&render_failures(failures));
}

/// Write markdown to stderr, bolding heading lines.
fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a run-level error as a structured markdown diagnostic:
/// what happened, then how to recover.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::CacheCorrupt { path, reason } => format!("\
# Error: Cache Corrupt

`{}` could not be loaded: {reason}

## Fix

The cached pip sizes cannot be trusted. Delete the snapshot and rerun:

    rm {}
    pipsize scan
", path.display(), path.display()),

        Error::CacheNotFound { path } => format!("\
# Error: Cache Not Found

`{}` does not exist.

## Fix

Run `pipsize scan` to resolve the prefabs and write the snapshot.
", path.display()),

        Error::MissingConfiguration { setting } => format!("\
# Error: Missing Configuration

`{setting}` is not set, so there is nowhere to look for prefabs.

## Fix

Point it at the game extraction root, for example:

    {EXTRACT_ROOT_VAR}=/path/to/extract pipsize scan

or pass `--root`, or set `extract_root` in `.pipsize.toml`.
"),

        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.

## Fix

Check the extraction root and `prefab_dir` in `.pipsize.toml`.
", path.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Correct `.pipsize.toml`.
"),
        Error::TomlSer(e) => format!("\
# Error: TOML Serialization

{e}
"),
    };
}

/// One line per failed document under a heading.
fn render_failures(failures: &[DocumentFailure]) -> String {
    let mut md = format!("# {} prefab(s) without a pip size\n\n", failures.len());
    for failure in failures {
        md.push_str(&format!("- `{}` ({}): {}\n", failure.source, failure.path.display(), failure.error));
    }
    return md;
}
