use std::path::Path;
use std::process::Command;

fn pipsize_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipsize"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd.env_remove("GAME_EXTRACT_ROOT");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn scan_resolves_then_reuses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("radarPipSizes.toml");

    let scan = pipsize_cmd("extract")
        .args(["scan", "--root", "."])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&scan.stdout);
    let stderr = String::from_utf8_lossy(&scan.stderr);
    assert_eq!(scan.status.code(), Some(2), "stderr: {stderr}");
    assert!(stdout.contains("Hygrodere"), "stdout: {stdout}");
    assert!(stdout.contains("x=1.0  z=0.75"), "stdout: {stdout}");
    assert!(stdout.contains("x=5.1  z=5.1"), "stdout: {stdout}");
    assert!(stdout.contains("2 resolved, 1 unresolved"), "stdout: {stdout}");
    assert!(stderr.contains("Turret"), "stderr: {stderr}");
    assert!(stderr.contains("MapDot GameObject not found"), "stderr: {stderr}");

    let written = std::fs::read_to_string(&cache).unwrap();
    assert!(written.contains("\"Blob\""));
    assert!(written.contains("\"Turret\""));
    assert!(!written.contains("Player"), "ignored prefab cached:\n{written}");
    assert!(!written.contains("Rock"), "non-candidate cached:\n{written}");

    // No root at all: only the cache can answer, with the same exit code.
    let again = pipsize_cmd("extract").arg("scan").arg("--cache").arg(&cache).output().unwrap();
    assert_eq!(
        again.status.code(),
        Some(2),
        "cached scan: {}",
        String::from_utf8_lossy(&again.stderr)
    );
    let stdout = String::from_utf8_lossy(&again.stdout);
    assert!(stdout.contains("x=1.0  z=0.75"), "stdout: {stdout}");
    assert!(String::from_utf8_lossy(&again.stderr).contains("loaded previous cache"));

    let show = pipsize_cmd("extract").arg("show").arg("--cache").arg(&cache).output().unwrap();
    assert!(show.status.success());
    assert!(String::from_utf8_lossy(&show.stdout).contains("Thumper"));
}

#[test]
fn root_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("sizes.toml");

    let scan = pipsize_cmd("extract")
        .env("GAME_EXTRACT_ROOT", ".")
        .arg("scan")
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(scan.status.code(), Some(2));
    assert!(cache.exists(), "snapshot not written");
}

#[test]
fn missing_root_without_cache_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("sizes.toml");

    let scan = pipsize_cmd("extract").arg("scan").arg("--cache").arg(&cache).output().unwrap();
    assert_eq!(scan.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&scan.stderr);
    assert!(stderr.contains("Missing Configuration"), "stderr: {stderr}");
    assert!(stderr.contains("GAME_EXTRACT_ROOT"), "stderr: {stderr}");
    assert!(!cache.exists());
}

#[test]
fn corrupt_cache_is_reported_not_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("sizes.toml");
    std::fs::write(&cache, "version = 1\nchecksum = \"nope\"\n").unwrap();

    let scan = pipsize_cmd("extract")
        .args(["scan", "--root", "."])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(scan.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&scan.stderr);
    assert!(stderr.contains("Cache Corrupt"), "stderr: {stderr}");
    assert!(stderr.contains("rm "), "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(&cache).unwrap(), "version = 1\nchecksum = \"nope\"\n");

    let rebuild = pipsize_cmd("extract")
        .args(["scan", "--root", ".", "--rebuild"])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(rebuild.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&rebuild.stdout).contains("Hygrodere"));
}

#[test]
fn resolve_single_prefab() {
    let out = pipsize_cmd("extract")
        .args(["resolve", "ExportedProject/Assets/PrefabInstance/Blob.prefab"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "1.0 0.75");

    let rock = pipsize_cmd("extract")
        .args(["resolve", "ExportedProject/Assets/PrefabInstance/Rock.prefab"])
        .output()
        .unwrap();
    assert_eq!(rock.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&rock.stderr).contains("MapDot GameObject not found"));
}

#[test]
fn show_without_cache_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = pipsize_cmd("extract")
        .arg("show")
        .arg("--cache")
        .arg(dir.path().join("absent.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Cache Not Found"));
}

#[test]
fn rebuild_without_root_keeps_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("sizes.toml");

    let scan = pipsize_cmd("extract")
        .args(["scan", "--root", "."])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(scan.status.code(), Some(2));
    let before = std::fs::read_to_string(&cache).unwrap();

    let rebuild = pipsize_cmd("extract")
        .args(["scan", "--rebuild"])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(rebuild.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&rebuild.stderr).contains("GAME_EXTRACT_ROOT"));
    assert_eq!(std::fs::read_to_string(&cache).unwrap(), before, "failed rebuild touched the cache");

    let wrong_dir = pipsize_cmd("extract")
        .args(["scan", "--rebuild", "--root", "does-not-exist"])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(wrong_dir.status.code(), Some(1));
    assert_eq!(std::fs::read_to_string(&cache).unwrap(), before);
}

#[test]
fn non_utf8_prefab_does_not_abort_scan() {
    let extract = tempfile::tempdir().unwrap();
    let prefabs = extract.path().join("ExportedProject/Assets/PrefabInstance");
    std::fs::create_dir_all(&prefabs).unwrap();
    std::fs::copy(
        "tests/fixtures/extract/ExportedProject/Assets/PrefabInstance/Blob.prefab",
        prefabs.join("Blob.prefab"),
    )
    .unwrap();
    std::fs::write(prefabs.join("Broken.prefab"), [0xff, 0xfe, b'M', b'a', b'p', b'D', b'o', b't']).unwrap();
    let cache = extract.path().join("sizes.toml");

    let scan = Command::new(env!("CARGO_BIN_EXE_pipsize"))
        .current_dir(extract.path())
        .env_remove("GAME_EXTRACT_ROOT")
        .env_remove("RUST_LOG")
        .args(["scan", "--root", "."])
        .arg("--cache")
        .arg(&cache)
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&scan.stdout);
    let stderr = String::from_utf8_lossy(&scan.stderr);
    assert_eq!(scan.status.code(), Some(2), "stderr: {stderr}");
    assert!(stdout.contains("x=1.0  z=0.75"), "stdout: {stdout}");
    assert!(stdout.contains("1 resolved, 1 unresolved"), "stdout: {stdout}");
    assert!(stderr.contains("unreadable"), "stderr: {stderr}");

    let written = std::fs::read_to_string(&cache).unwrap();
    assert!(written.contains("\"Broken\""));
    assert!(written.contains("absent"));
}
