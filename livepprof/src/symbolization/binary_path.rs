//! Locate the binary whose symbols are used for resolution.

use anyhow::{bail, Context, Result};
use log::warn;
use object::{Object, ObjectSection};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the running executable.
///
/// `/proc/self/exe` is authoritative on Linux. When it cannot be read,
/// `argv[0]` is used, searched on `PATH` if it does not open as given.
///
/// # Errors
/// Returns an error if neither `/proc/self/exe` nor `argv[0]` is available
pub fn current_binary() -> Result<PathBuf> {
    if let Ok(exe) = fs::read_link("/proc/self/exe") {
        return Ok(exe);
    }
    let Some(argv0) = env::args_os().next() else {
        bail!("no args[0]");
    };
    let path_var = env::var_os("PATH").unwrap_or_default();
    Ok(find_best_file(Path::new(&argv0), &path_var))
}

/// Resolve `filename` to something that can be opened.
///
/// Falls back to the name as given, the binary might still show up later.
fn find_best_file(filename: &Path, path_var: &std::ffi::OsStr) -> PathBuf {
    if can_open(filename) {
        return filename.to_path_buf();
    }
    env::split_paths(path_var)
        .map(|dir| dir.join(filename))
        .find(|candidate| can_open(candidate))
        .unwrap_or_else(|| filename.to_path_buf())
}

fn can_open(path: &Path) -> bool {
    fs::File::open(path).is_ok()
}

/// Check a target binary before loading it for symbolization
///
/// Missing debug info is not an error, only a degraded experience, so it is
/// reported as a warning.
///
/// # Errors
/// Returns an error if the path does not exist or is not a regular file
pub fn check_target(target_path: &Path) -> Result<()> {
    if !target_path.exists() {
        bail!(
            "Binary not found: {}\n\n\
             Make sure the path is correct and the binary exists.",
            target_path.display()
        );
    }
    if !target_path.is_file() {
        bail!("Not a file: {}", target_path.display());
    }

    let file_data = fs::read(target_path)
        .with_context(|| format!("Failed to read binary: {}", target_path.display()))?;
    let Ok(obj) = object::File::parse(&*file_data) else {
        // Not a valid object file, let the symbolizer report it
        return Ok(());
    };

    let has_debug_info = obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0);
    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);

    if !has_debug_info && !has_symtab {
        warn!("binary stripped, every location will resolve to <unknown>");
    } else if !has_debug_info {
        warn!("no DWARF debug info, source files unavailable");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_binary_exists() {
        let path = current_binary().unwrap();
        assert!(path.is_file(), "{} should be a file", path.display());
    }

    #[test]
    fn test_find_best_file_keeps_unknown_name() {
        let missing = Path::new("this-certainly-does-not-exist");
        let found = find_best_file(missing, std::ffi::OsStr::new("/nonexistent-dir"));
        assert_eq!(found, missing);
    }

    #[test]
    fn test_find_best_file_searches_path() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("some-tool");
        fs::write(&bin, b"#!/bin/sh\n").unwrap();

        let path_var = env::join_paths(["/nonexistent-dir", dir.path().to_str().unwrap()]).unwrap();
        let found = find_best_file(Path::new("some-tool"), &path_var);
        assert_eq!(found, bin);
        assert!(found.is_absolute());
    }

    #[test]
    fn test_check_target_not_found() {
        let err = check_target(Path::new("/nonexistent/path/to/binary")).unwrap_err();
        assert!(err.to_string().contains("Binary not found"));
    }

    #[test]
    fn test_check_target_accepts_current_binary() {
        assert!(check_target(&current_binary().unwrap()).is_ok());
    }
}
