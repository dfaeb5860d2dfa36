//! Filesystem probing.

use crate::HalResult;
use std::path::Path;

/// `statfs(2)` magic for ISO9660 (`ISOFS_SUPER_MAGIC`).
pub const ISO9660_MAGIC: i64 = 0x9660;

pub trait ProbeOps {
    /// Filesystem type magic (`f_type`) of the filesystem containing `path`.
    fn filesystem_magic(&self, path: &Path) -> HalResult<i64>;
}
