//! Parsing helpers for `/proc/mounts` (and the identical `/proc/self/mounts`).
//!
//! Each line is `<source> <mount point> <fstype> <options> <dump> <pass>`.
//! Only the first two fields are required; lookups never cache and are
//! rebuilt from a fresh read of the table every time.
//!
//! The kernel writes paths as raw bytes and only octal-escapes space, tab,
//! newline and backslash, so the table is handled as bytes throughout.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Kernel default location of the live mount table.
pub const PROC_MOUNTS: &str = "/proc/mounts";

/// A single line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    pub source: PathBuf,
    pub mount_point: PathBuf,
    pub fstype: Option<String>,
    pub options: Option<String>,
}

impl MountRecord {
    pub fn new(source: impl Into<PathBuf>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            mount_point: mount_point.into(),
            fstype: None,
            options: None,
        }
    }

    pub fn with_fstype(mut self, fstype: impl Into<String>) -> Self {
        self.fstype = Some(fstype.into());
        self
    }

    /// Source field as a path (the loop device node for image mounts).
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// Render the record back into mount-table form, escaping whitespace.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = escape_mount_path(self.source.as_os_str().as_bytes());
        line.push(b' ');
        line.extend(escape_mount_path(self.mount_point.as_os_str().as_bytes()));
        line.extend_from_slice(
            format!(
                " {} {} 0 0",
                self.fstype.as_deref().unwrap_or("none"),
                self.options.as_deref().unwrap_or("rw"),
            )
            .as_bytes(),
        );
        line
    }
}

/// How a target path is compared against the mount point column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Byte-wise prefix: the record matches when its mount point starts with
    /// the target. `/mnt/iso` therefore also matches `/mnt/iso2`.
    #[default]
    Prefix,
    /// Whole-path equality after trimming trailing slashes.
    Exact,
}

impl MatchPolicy {
    pub fn matches(self, mount_point: &Path, target: &Path) -> bool {
        let mount_point = mount_point.as_os_str().as_bytes();
        let target = target.as_os_str().as_bytes();
        match self {
            MatchPolicy::Prefix => mount_point.starts_with(target),
            MatchPolicy::Exact => trim_trailing_slashes(mount_point) == trim_trailing_slashes(target),
        }
    }
}

/// Snapshot of the mount table, in the kernel's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    records: Vec<MountRecord>,
}

impl MountTable {
    pub fn parse(content: &[u8]) -> Self {
        Self {
            records: parse_mounts(content),
        }
    }

    pub fn records(&self) -> &[MountRecord] {
        &self.records
    }

    /// First record whose mount point matches `target`.
    pub fn find_by_mountpoint(&self, target: &Path, policy: MatchPolicy) -> Option<&MountRecord> {
        self.records
            .iter()
            .find(|record| policy.matches(&record.mount_point, target))
    }

    pub fn is_mountpoint(&self, target: &Path, policy: MatchPolicy) -> bool {
        self.find_by_mountpoint(target, policy).is_some()
    }
}

pub fn parse_mounts(content: &[u8]) -> Vec<MountRecord> {
    content
        .split(|b| *b == b'\n')
        .filter_map(|line| {
            let mut fields = line
                .split(|b| *b == b' ' || *b == b'\t')
                .filter(|field| !field.is_empty());
            let source = fields.next()?;
            let mount_point = fields.next()?;
            Some(MountRecord {
                source: path_from_bytes(&unescape_mount_path(source)),
                mount_point: path_from_bytes(&unescape_mount_path(mount_point)),
                fstype: fields.next().map(lossy),
                options: fields.next().map(lossy),
            })
        })
        .collect()
}

/// Decode the kernel's `\ooo` octal escapes. Anything else passes through.
pub fn unescape_mount_path(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' {
            if let Some(byte) = raw.get(i + 1..i + 4).and_then(octal_byte) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

pub fn escape_mount_path(path: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len());
    for &b in path {
        match b {
            b' ' | b'\t' | b'\n' | b'\\' => out.extend_from_slice(format!("\\{b:03o}").as_bytes()),
            _ => out.push(b),
        }
    }
    out
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    if digits.len() != 3 || !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
        return None;
    }
    let value = digits
        .iter()
        .fold(0u16, |acc, d| acc * 8 + u16::from(d - b'0'));
    u8::try_from(value).ok()
}

fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(bytes))
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn trim_trailing_slashes(path: &[u8]) -> &[u8] {
    let mut end = path.len();
    while end > 1 && path[end - 1] == b'/' {
        end -= 1;
    }
    &path[..end]
}
