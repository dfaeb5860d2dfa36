//! Filesystem-level precondition checks that run before any kernel state changes.

use crate::errors::{IsomntError, Result};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Anything a `stat` call succeeds on counts as present.
pub fn file_exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

pub fn directory_exists(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// True when the text after the last `.` of the whole path is exactly `iso`.
///
/// Case-sensitive, and the dot may sit in a directory component: `/srv/a.iso`
/// passes, `/srv/a.ISO` and `/srv/iso` do not.
pub fn has_iso_extension(path: &Path) -> bool {
    let bytes = path.as_os_str().as_bytes();
    match bytes.iter().rposition(|b| *b == b'.') {
        Some(dot) => &bytes[dot + 1..] == b"iso",
        None => false,
    }
}

/// Backing-file checks, in order: exists, then `.iso` extension.
pub fn check_image(image: &Path) -> Result<()> {
    if !file_exists(image) {
        return Err(IsomntError::ImageMissing(image.to_path_buf()));
    }
    if !has_iso_extension(image) {
        return Err(IsomntError::NotAnIsoImage(image.to_path_buf()));
    }
    Ok(())
}

pub fn check_target(target: &Path) -> Result<()> {
    if !directory_exists(target) {
        return Err(IsomntError::TargetMissing(target.to_path_buf()));
    }
    Ok(())
}
